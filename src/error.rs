// src/error.rs

use std::io;
use thiserror::Error;

/// The primary error type for the `serial-master` library.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Cannot connect to port {port}: {source}")]
    Connect {
        port: String,
        #[source]
        source: tokio_serial::Error,
    },

    #[error("No serial devices available, cannot connect.")]
    NoDevices,

    #[error("Contract violation: {0}")]
    Contract(String),

    #[error("Information loss - {value} exceeds the range of a {width}-byte integer")]
    OutOfRange { value: i128, width: usize },

    #[error("Integer width must be between 1 and {max} bytes, got {width}")]
    InvalidWidth { width: usize, max: usize },

    #[error("Information loss - {0} is not an integer")]
    NotIntegral(String),

    #[error("Invalid length: expected a multiple of {width} bytes, got {actual}")]
    InvalidLength { width: usize, actual: usize },

    #[error("Link I/O error: {0}")]
    Link(#[from] io::Error),

    #[error("Timeout waiting for acknowledgement: {0}")]
    Timeout(#[from] tokio::time::error::Elapsed),

    #[error("Port enumeration failed: {0}")]
    Enumeration(#[from] tokio_serial::Error),

    #[error("Setup rejected: {field} = {value}")]
    SetupRejected { field: &'static str, value: u8 },
}

impl Error {
    pub(crate) fn contract(message: impl Into<String>) -> Self {
        Error::Contract(message.into())
    }

    /// True for the range family: the value or the width itself does not fit.
    pub fn is_range(&self) -> bool {
        matches!(self, Error::OutOfRange { .. } | Error::InvalidWidth { .. })
    }

    /// True when the session that produced this error can no longer be used.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Error::Link(_) | Error::Timeout(_) | Error::Connect { .. })
    }
}

pub type Result<T> = std::result::Result<T, Error>;
