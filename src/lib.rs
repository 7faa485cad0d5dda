pub mod batch;
pub mod codec;
pub mod config;
pub mod constants;
pub mod emulator;
pub mod error;
pub mod frame;
pub mod params;
pub mod ports;
pub mod session;

// Re-export the session types for easy access
pub use config::SessionConfig;
pub use error::{Error, Result};
pub use frame::{Command, Frame};
pub use params::SessionParams;
pub use ports::{FixedPortLister, PortLister, SystemPortLister};
pub use session::{AckLine, Session, SessionState};
