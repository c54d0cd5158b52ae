// ============================================================================
// ENCODER LINK
// ============================================================================
//
// Connection to the encoder.
//
// The poller only needs single-register reads and writes, so the seam is a
// small blocking trait. `ModbusLink` implements it with the synchronous
// Modbus TCP client; tests and the demo plug in-memory links instead.

use crate::config::DeviceConfig;
use std::io;
use std::net::{SocketAddr, ToSocketAddrs};
use std::time::Duration;
use thiserror::Error;
use tokio_modbus::client::sync::{self, Client as _, Reader as _, Writer as _};
use tokio_modbus::{ExceptionCode, Slave};

#[derive(Debug, Error)]
pub enum LinkError {
    #[error("i/o error: {0}")]
    Io(#[from] io::Error),
    #[error("modbus transport error: {0}")]
    Modbus(#[from] tokio_modbus::Error),
    #[error("device rejected access to register {address}: {code:?}")]
    Exception { address: u16, code: ExceptionCode },
    #[error("device returned no data for register {address}")]
    EmptyResponse { address: u16 },
    #[error("link is not open")]
    NotConnected,
}

impl LinkError {
    /// Whether the transport itself is unusable, as opposed to one request
    /// being refused by a device that is still reachable.
    pub fn is_connection_failure(&self) -> bool {
        match self {
            LinkError::Io(_) | LinkError::Modbus(_) | LinkError::NotConnected => true,
            LinkError::Exception { .. } | LinkError::EmptyResponse { .. } => false,
        }
    }
}

/// Blocking register access to one device
pub trait EncoderLink {
    /// Human-readable peer description for logs.
    fn peer(&self) -> String;
    fn is_open(&self) -> bool;
    fn open(&mut self) -> Result<(), LinkError>;
    /// Shuts the transport down; a no-op when already closed.
    fn close(&mut self);
    fn read_register(&mut self, address: u16) -> Result<u16, LinkError>;
    fn write_register(&mut self, address: u16, value: u16) -> Result<(), LinkError>;
}

/// Modbus TCP holding-register access
pub struct ModbusLink {
    host: String,
    port: u16,
    unit: Slave,
    connect_timeout: Duration,
    request_timeout: Duration,
    ctx: Option<sync::Context>,
}

impl ModbusLink {
    pub fn new(device: &DeviceConfig, connect_timeout: Duration, request_timeout: Duration) -> Self {
        Self {
            host: device.host.clone(),
            port: device.port,
            unit: Slave(device.unit_id),
            connect_timeout,
            request_timeout,
            ctx: None,
        }
    }

    fn resolve(&self) -> Result<SocketAddr, LinkError> {
        (self.host.as_str(), self.port)
            .to_socket_addrs()?
            .next()
            .ok_or_else(|| {
                LinkError::Io(io::Error::new(
                    io::ErrorKind::NotFound,
                    format!("no address found for {}", self.host),
                ))
            })
    }

    fn context(&mut self) -> Result<&mut sync::Context, LinkError> {
        self.ctx.as_mut().ok_or(LinkError::NotConnected)
    }
}

impl EncoderLink for ModbusLink {
    fn peer(&self) -> String {
        format!("{}:{} (unit {})", self.host, self.port, self.unit.0)
    }

    fn is_open(&self) -> bool {
        self.ctx.is_some()
    }

    fn open(&mut self) -> Result<(), LinkError> {
        let addr = self.resolve()?;
        let mut ctx = sync::tcp::connect_slave_with_timeout(addr, self.unit, Some(self.connect_timeout))?;
        ctx.set_timeout(self.request_timeout);
        self.ctx = Some(ctx);
        Ok(())
    }

    fn close(&mut self) {
        let Some(mut ctx) = self.ctx.take() else {
            return;
        };
        match ctx.disconnect() {
            Err(err) => log::warn!("disconnecting from {} failed: {err}", self.peer()),
            _ => log::debug!("closed modbus connection to {}", self.peer()),
        }
    }

    fn read_register(&mut self, address: u16) -> Result<u16, LinkError> {
        let words = self
            .context()?
            .read_holding_registers(address, 1)?
            .map_err(|code| LinkError::Exception { address, code })?;
        words
            .first()
            .copied()
            .ok_or(LinkError::EmptyResponse { address })
    }

    fn write_register(&mut self, address: u16, value: u16) -> Result<(), LinkError> {
        self.context()?
            .write_single_register(address, value)?
            .map_err(|code| LinkError::Exception { address, code })
    }
}
