//! Command frames.
//!
//! ```text
//! +-------------+-----------------+-----+-----------------+
//! | op (1 byte) | param_1 (width) | ... | param_k (width) |
//! +-------------+-----------------+-----+-----------------+
//! ```
//!
//! The operation byte is written raw (unsigned); parameters go through the codec.

use crate::codec;
use crate::constants::{EMPTY_OPERATION, SETUP_INT_WIDTH, SETUP_SENTINEL};
use crate::error::{Error, Result};
use crate::params::SessionParams;
use bytes::{BufMut, Bytes, BytesMut};
use serde::{Deserialize, Serialize};
use std::ops::Deref;

/// One command for the device: an operation id and its parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "CommandRepr")]
pub struct Command {
    operation_id: u8,
    params: Vec<i64>,
}

#[derive(Deserialize)]
struct CommandRepr {
    operation_id: u8,
    #[serde(default)]
    params: Vec<i64>,
}

impl TryFrom<CommandRepr> for Command {
    type Error = Error;

    fn try_from(repr: CommandRepr) -> Result<Self> {
        Command::new(repr.operation_id, repr.params)
    }
}

impl Command {
    /// Fails if `operation_id` is the setup sentinel, which only the session may send.
    pub fn new(operation_id: u8, params: impl Into<Vec<i64>>) -> Result<Self> {
        if operation_id == SETUP_SENTINEL {
            return Err(Error::contract(format!(
                "operation id 0x{SETUP_SENTINEL:02X} is reserved for the setup frame"
            )));
        }
        Ok(Self {
            operation_id,
            params: params.into(),
        })
    }

    pub fn operation_id(&self) -> u8 {
        self.operation_id
    }

    pub fn params(&self) -> &[i64] {
        &self.params
    }

    pub fn encode(&self, int_width: usize) -> Result<Frame> {
        build_frame(self.operation_id, &self.params, int_width)
    }
}

/// An encoded frame, always `bytes_per_command` bytes long within a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame(Bytes);

impl Frame {
    pub fn operation_id(&self) -> u8 {
        self.0.first().copied().unwrap_or(EMPTY_OPERATION)
    }

    pub fn into_bytes(self) -> Bytes {
        self.0
    }
}

impl Deref for Frame {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.0
    }
}

impl AsRef<[u8]> for Frame {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl From<Frame> for Bytes {
    fn from(frame: Frame) -> Self {
        frame.0
    }
}

/// Operation byte followed by every parameter encoded at `int_width`.
pub fn build_frame(operation_id: u8, params: &[i64], int_width: usize) -> Result<Frame> {
    let encoded = codec::encode_sequence(params, int_width)?;
    let mut frame = BytesMut::with_capacity(1 + encoded.len());
    frame.put_u8(operation_id);
    frame.extend_from_slice(&encoded);
    Ok(Frame(frame.freeze()))
}

/// All-zero padding frame; operation 0 is the device's no-op.
pub fn empty_frame(bytes_per_command: usize) -> Frame {
    Frame(Bytes::from(vec![0u8; bytes_per_command]))
}

/// `[0xFF, int_width, param_count, batch_size]`, each value as a signed single byte.
pub fn setup_frame(params: &SessionParams) -> Result<Frame> {
    let values = [params.int_width(), params.param_count(), params.batch_size()]
        .into_iter()
        .map(setup_value)
        .collect::<Result<Vec<_>>>()?;
    build_frame(SETUP_SENTINEL, &values, SETUP_INT_WIDTH)
}

fn setup_value(value: usize) -> Result<i64> {
    i64::try_from(value).map_err(|_| Error::OutOfRange {
        value: value as i128,
        width: SETUP_INT_WIDTH,
    })
}
