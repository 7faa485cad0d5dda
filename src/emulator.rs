//! Client-side protocol, as implemented by the reference device firmware.
//!
//! The emulator sits on the far end of a link and behaves like the firmware library:
//! a leading `0xFF` byte starts (or restarts) the setup handshake, anything else is the
//! first byte of a batch of exactly `batch_size` frames. Every accepted setup frame and
//! every batch is answered with one empty line.

use crate::codec;
use crate::constants::{ACK_LINE, EMPTY_OPERATION, FIRMWARE_INT_WIDTHS, SETUP_SENTINEL};
use crate::error::{Error, Result};
use crate::params::SessionParams;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::{debug, info};

/// One command slot as the device decoded it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedCommand {
    pub operation_id: u8,
    pub params: Vec<i64>,
}

impl DecodedCommand {
    /// Slot filled by an empty frame.
    pub fn is_padding(&self) -> bool {
        self.operation_id == EMPTY_OPERATION && self.params.iter().all(|&p| p == 0)
    }
}

/// What a single receive step consumed from the link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Received {
    Setup(SessionParams),
    Batch(Vec<DecodedCommand>),
}

#[derive(Debug, Default)]
pub struct DeviceEmulator {
    params: Option<SessionParams>,
}

impl DeviceEmulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn params(&self) -> Option<&SessionParams> {
        self.params.as_ref()
    }

    /// Serves `link` until the master closes it, returning everything received in order.
    pub async fn run<L>(mut self, link: L) -> Result<Vec<Received>>
    where
        L: AsyncRead + AsyncWrite + Unpin,
    {
        let mut link = BufReader::new(link);
        let mut received = Vec::new();
        while let Some(item) = self.receive(&mut link).await? {
            link.write_all(ACK_LINE).await?;
            link.flush().await?;
            received.push(item);
        }
        info!(count = received.len(), "Link closed by master");
        Ok(received)
    }

    /// Reads one setup frame or one batch. `None` means the link ended between messages.
    pub async fn receive<R>(&mut self, link: &mut R) -> Result<Option<Received>>
    where
        R: AsyncBufRead + Unpin,
    {
        let first = match link.fill_buf().await?.first() {
            Some(&byte) => byte,
            None => return Ok(None),
        };

        if first == SETUP_SENTINEL {
            let params = self.protocol_setup(link).await?;
            return Ok(Some(Received::Setup(params)));
        }

        let params = self
            .params
            .ok_or_else(|| Error::contract("batch received before protocol setup"))?;
        let mut payload = vec![0u8; params.payload_len()];
        link.read_exact(&mut payload).await?;
        let commands = payload
            .chunks_exact(params.bytes_per_command())
            .map(|frame| -> Result<DecodedCommand> {
                Ok(DecodedCommand {
                    operation_id: frame[0],
                    params: codec::decode_sequence(&frame[1..], params.int_width())?,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        debug!(slots = commands.len(), "Batch received");
        Ok(Some(Received::Batch(commands)))
    }

    /// Consumes `[0xFF, int_width, param_count, batch_size]` and adopts the new layout.
    pub async fn protocol_setup<R>(&mut self, link: &mut R) -> Result<SessionParams>
    where
        R: AsyncRead + Unpin,
    {
        let mut setup = [0u8; 4];
        link.read_exact(&mut setup).await?;
        let [sentinel, int_width, param_count, batch_size] = setup;

        if sentinel != SETUP_SENTINEL {
            return Err(Error::SetupRejected {
                field: "sentinel",
                value: sentinel,
            });
        }
        if !FIRMWARE_INT_WIDTHS.contains(&usize::from(int_width)) {
            return Err(Error::SetupRejected {
                field: "int_width",
                value: int_width,
            });
        }
        if param_count < 1 {
            return Err(Error::SetupRejected {
                field: "param_count",
                value: param_count,
            });
        }
        if batch_size < 1 {
            return Err(Error::SetupRejected {
                field: "batch_size",
                value: batch_size,
            });
        }

        let params = SessionParams::new(
            usize::from(int_width),
            usize::from(param_count),
            usize::from(batch_size),
        )?;
        info!(int_width, param_count, batch_size, "Protocol defined");
        self.params = Some(params);
        Ok(params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_setup_then_batch() {
        let wire: &[u8] = &[0xFF, 2, 2, 2, 7, 0x04, 0xD2, 0xFF, 0xFF, 0, 0, 0, 0, 0];
        let mut link = BufReader::new(wire);
        let mut device = DeviceEmulator::new();

        let setup = device.receive(&mut link).await.unwrap();
        assert_eq!(setup, Some(Received::Setup(SessionParams::new(2, 2, 2).unwrap())));

        let Some(Received::Batch(commands)) = device.receive(&mut link).await.unwrap() else {
            panic!("expected a batch");
        };
        assert_eq!(
            commands[0],
            DecodedCommand {
                operation_id: 7,
                params: vec![1234, -1]
            }
        );
        assert!(commands[1].is_padding());
        assert_eq!(device.receive(&mut link).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_rejects_unsupported_width() {
        let wire: &[u8] = &[0xFF, 3, 6, 1];
        let mut link = BufReader::new(wire);
        let err = DeviceEmulator::new().receive(&mut link).await.unwrap_err();
        assert!(matches!(
            err,
            Error::SetupRejected {
                field: "int_width",
                value: 3
            }
        ));
    }

    #[tokio::test]
    async fn test_rejects_zero_params_and_batch() {
        let mut device = DeviceEmulator::new();
        let wire: &[u8] = &[0xFF, 2, 0, 1];
        let mut link = BufReader::new(wire);
        assert!(matches!(
            device.receive(&mut link).await,
            Err(Error::SetupRejected { field: "param_count", .. })
        ));
        let wire: &[u8] = &[0xFF, 2, 1, 0];
        let mut link = BufReader::new(wire);
        assert!(matches!(
            device.receive(&mut link).await,
            Err(Error::SetupRejected { field: "batch_size", .. })
        ));
    }

    #[tokio::test]
    async fn test_batch_before_setup() {
        let wire: &[u8] = &[1, 0, 0];
        let mut link = BufReader::new(wire);
        assert!(matches!(
            DeviceEmulator::new().receive(&mut link).await,
            Err(Error::Contract(_))
        ));
    }
}
