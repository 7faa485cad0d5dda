use crate::constants::{MAX_INT_WIDTH, SETUP_INT_WIDTH, SETUP_PARAM_COUNT};
use crate::error::{Error, Result};

/// Per-session layout negotiated by the setup frame.
///
/// Fixed once the setup frame is acknowledged; every frame of the session is
/// `bytes_per_command()` long and every batch holds exactly `batch_size` frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionParams {
    int_width: usize,
    param_count: usize,
    batch_size: usize,
}

impl SessionParams {
    /// Layout in effect while the setup frame itself is sent: one command of three one-byte values.
    pub const PROVISIONAL: SessionParams = SessionParams {
        int_width: SETUP_INT_WIDTH,
        param_count: SETUP_PARAM_COUNT,
        batch_size: 1,
    };

    pub fn new(int_width: usize, param_count: usize, batch_size: usize) -> Result<Self> {
        if int_width == 0 {
            return Err(Error::contract("int_width must be a positive number of bytes"));
        }
        if int_width > MAX_INT_WIDTH {
            return Err(Error::InvalidWidth {
                width: int_width,
                max: MAX_INT_WIDTH,
            });
        }
        if batch_size == 0 {
            return Err(Error::contract("batch_size must allow at least one command"));
        }
        param_count
            .checked_mul(int_width)
            .and_then(|len| len.checked_add(1))
            .and_then(|len| len.checked_mul(batch_size))
            .ok_or_else(|| Error::contract("batch payload length overflows usize"))?;
        Ok(Self {
            int_width,
            param_count,
            batch_size,
        })
    }

    pub fn int_width(&self) -> usize {
        self.int_width
    }

    pub fn param_count(&self) -> usize {
        self.param_count
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// One operation byte plus `param_count` encoded integers.
    pub fn bytes_per_command(&self) -> usize {
        self.param_count * self.int_width + 1
    }

    /// Length of every wire payload sent under these parameters.
    pub fn payload_len(&self) -> usize {
        self.batch_size * self.bytes_per_command()
    }
}
