// ============================================================================
// CRATE LAYOUT & PUBLIC API
// ============================================================================
//
// Compass-dial dashboard for a rotary encoder read over Modbus TCP.
//
// A background `Poller` reads the direction, position, turn and velocity
// registers and posts `DashboardCommand`s to the UI thread, which keeps a
// retained `Dial` and rasterises it into a `pixels` frame every redraw.

pub mod app;
pub mod config;
pub mod dial;
pub mod draw;
pub mod error;
pub mod geometry;
pub mod link;
pub mod poller;
pub mod reading;
pub mod simulator;

pub use app::Dashboard;
pub use config::{
    Color, DashboardConfig, DeviceConfig, DialStyle, NeedleShape, Palette, PollTiming,
    RegisterMap, WindowConfig,
};
pub use dial::{DashboardCommand, Dial};
pub use error::{Error, Result};
pub use link::{EncoderLink, LinkError, ModbusLink};
pub use poller::{CycleOutcome, Poller, PollerCommand, PollerHandle};
pub use reading::{ConnectionStatus, Direction, Reading};
pub use simulator::SimulatedEncoder;
