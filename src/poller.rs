// ============================================================================
// BACKGROUND POLLER
// ============================================================================
//
// The poller owns its link exclusively. Everything it learns is posted to
// the UI as `DashboardCommand`s; the UI talks back only through
// `PollerCommand`s, which are served between two polling cycles on the
// poller's own connection.

use crate::config::{PollTiming, RegisterMap};
use crate::dial::DashboardCommand;
use crate::link::{EncoderLink, LinkError};
use crate::reading::{ConnectionStatus, Direction, RawRegisters, Reading};
use log::{debug, info, trace, warn};
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Longest uninterrupted sleep, so a stop request is noticed during backoff.
const SLEEP_SLICE: Duration = Duration::from_millis(50);

/// Requests from the UI to the poller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollerCommand {
    ToggleDirection,
}

/// What one cycle did, which decides how long to wait before the next
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    Published(Reading),
    /// The device refused a read; status is left alone.
    ReadFailed,
    /// The transport failed; status went to disconnected and the link was closed.
    ConnectionFailed,
    /// Nobody is listening for updates any more.
    UiClosed,
}

pub struct Poller<L: EncoderLink> {
    link: L,
    registers: RegisterMap,
    timing: PollTiming,
    updates: Sender<DashboardCommand>,
    requests: Receiver<PollerCommand>,
    requester: Sender<PollerCommand>,
    stop: Arc<AtomicBool>,
    last_direction: Option<Direction>,
    last_status: Option<ConnectionStatus>,
}

impl<L: EncoderLink> Poller<L> {
    pub fn new(
        link: L,
        registers: RegisterMap,
        timing: PollTiming,
        updates: Sender<DashboardCommand>,
    ) -> Self {
        let (requester, requests) = mpsc::channel();
        Self {
            link,
            registers,
            timing,
            updates,
            requests,
            requester,
            stop: Arc::new(AtomicBool::new(false)),
            last_direction: None,
            last_status: None,
        }
    }

    /// Sender for toggle requests; they are served at the start of the next cycle.
    pub fn requester(&self) -> Sender<PollerCommand> {
        self.requester.clone()
    }

    pub fn stop_flag(&self) -> Arc<AtomicBool> {
        self.stop.clone()
    }

    pub fn link(&self) -> &L {
        &self.link
    }

    pub fn link_mut(&mut self) -> &mut L {
        &mut self.link
    }

    /// Runs one connect/read/publish cycle without sleeping.
    pub fn poll_once(&mut self) -> CycleOutcome {
        self.serve_requests();

        if !self.link.is_open() {
            info!("connecting to encoder at {}", self.link.peer());
            if let Err(err) = self.link.open() {
                return self.connection_lost(err);
            }
        }

        match self.read_registers() {
            Ok(raw) => self.publish(Reading::from_registers(raw)),
            Err(err) if err.is_connection_failure() => self.connection_lost(err),
            Err(err) => {
                warn!("encoder read failed: {err}");
                CycleOutcome::ReadFailed
            }
        }
    }

    /// How long to wait after a cycle ended with `outcome`.
    pub fn pause_after(&self, outcome: &CycleOutcome) -> Duration {
        match outcome {
            CycleOutcome::Published(_) | CycleOutcome::UiClosed => self.timing.interval,
            CycleOutcome::ReadFailed => self.timing.read_error_backoff,
            CycleOutcome::ConnectionFailed => self.timing.connection_backoff + self.timing.interval,
        }
    }

    /// Polls until the stop flag is raised or the UI goes away, then closes the link.
    pub fn run(mut self) -> L {
        debug!("poller started");
        while !self.stop.load(Ordering::Acquire) {
            let outcome = self.poll_once();
            if outcome == CycleOutcome::UiClosed {
                info!("dashboard closed, stopping poller");
                break;
            }
            self.sleep(self.pause_after(&outcome));
        }
        if self.link.is_open() {
            self.link.close();
        }
        debug!("poller stopped");
        self.link
    }

    fn sleep(&self, total: Duration) {
        let deadline = Instant::now() + total;
        loop {
            if self.stop.load(Ordering::Acquire) {
                return;
            }
            let now = Instant::now();
            if now >= deadline {
                return;
            }
            thread::sleep((deadline - now).min(SLEEP_SLICE));
        }
    }

    fn read_registers(&mut self) -> Result<RawRegisters, LinkError> {
        let map = self.registers;
        Ok(RawRegisters {
            direction: self.link.read_register(map.direction)?,
            position: self.link.read_register(map.position)?,
            turns: self.link.read_register(map.turns)?,
            velocity: self.link.read_register(map.velocity)?,
        })
    }

    fn publish(&mut self, reading: Reading) -> CycleOutcome {
        trace!("{reading:?}");
        let mut batch = Vec::with_capacity(4);
        if self.last_status != Some(ConnectionStatus::Connected) {
            info!("connected to encoder at {}", self.link.peer());
            batch.push(DashboardCommand::SetStatus(ConnectionStatus::Connected));
        }
        if self.last_direction != Some(reading.direction) {
            info!("rotation direction is {}", reading.direction);
            batch.push(DashboardCommand::RegenerateTicks(reading.direction));
        }
        batch.push(DashboardCommand::SetNeedle {
            position: reading.position,
            direction: reading.direction,
        });
        batch.push(DashboardCommand::SetReadouts(reading));

        if batch.into_iter().any(|cmd| self.updates.send(cmd).is_err()) {
            return CycleOutcome::UiClosed;
        }
        self.last_status = Some(ConnectionStatus::Connected);
        self.last_direction = Some(reading.direction);
        CycleOutcome::Published(reading)
    }

    fn connection_lost(&mut self, err: LinkError) -> CycleOutcome {
        warn!("encoder connection failed: {err}");
        if self.link.is_open() {
            self.link.close();
        }
        if self.last_status != Some(ConnectionStatus::Disconnected) {
            if self
                .updates
                .send(DashboardCommand::SetStatus(ConnectionStatus::Disconnected))
                .is_err()
            {
                return CycleOutcome::UiClosed;
            }
            self.last_status = Some(ConnectionStatus::Disconnected);
        }
        CycleOutcome::ConnectionFailed
    }

    fn serve_requests(&mut self) {
        loop {
            match self.requests.try_recv() {
                Ok(PollerCommand::ToggleDirection) => self.toggle_direction(),
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => return,
            }
        }
    }

    /// Writes back the complement of the direction register. Failures are only logged.
    fn toggle_direction(&mut self) {
        if !self.link.is_open() {
            warn!("direction toggle ignored: encoder not connected");
            return;
        }
        let address = self.registers.direction;
        let result = self.link.read_register(address).and_then(|raw| {
            let next = Direction::from_register(raw).toggled();
            self.link.write_register(address, next.register_value())?;
            Ok(next)
        });
        match result {
            Ok(next) => info!("requested {next} rotation"),
            Err(err) => warn!("direction toggle failed: {err}"),
        }
    }
}

impl<L: EncoderLink + Send + 'static> Poller<L> {
    pub fn spawn(self) -> io::Result<PollerHandle> {
        let stop = self.stop_flag();
        let requests = self.requester();
        let thread = thread::Builder::new()
            .name("encoder-poller".to_string())
            .spawn(move || {
                self.run();
            })?;
        Ok(PollerHandle {
            stop,
            requests,
            thread,
        })
    }
}

/// UI-side handle on a running poller thread
pub struct PollerHandle {
    stop: Arc<AtomicBool>,
    requests: Sender<PollerCommand>,
    thread: JoinHandle<()>,
}

impl PollerHandle {
    pub fn request(&self, command: PollerCommand) {
        if self.requests.send(command).is_err() {
            warn!("poller is gone, dropping {command:?}");
        }
    }

    /// Raises the stop flag and waits up to `grace` for the thread.
    /// Returns false when the thread was still busy and got detached.
    pub fn shutdown(self, grace: Duration) -> bool {
        self.stop.store(true, Ordering::Release);
        let deadline = Instant::now() + grace;
        while !self.thread.is_finished() {
            if Instant::now() >= deadline {
                warn!("poller did not stop within {grace:?}, detaching");
                return false;
            }
            thread::sleep(Duration::from_millis(10));
        }
        if self.thread.join().is_err() {
            warn!("poller thread panicked");
        }
        true
    }
}
