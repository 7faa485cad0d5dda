// src/session.rs

use crate::batch;
use crate::config::SessionConfig;
use crate::constants::FIRMWARE_INT_WIDTHS;
use crate::error::{Error, Result};
use crate::frame::{self, Command};
use crate::params::SessionParams;
use crate::ports::{self, PortLister};
use bytes::Bytes;
use std::borrow::Cow;
use std::fmt;
use std::io;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio_serial::{SerialPortBuilderExt, SerialStream};
use tracing::{debug, info, warn};

/// Where a session is in its lifecycle.
///
/// `connect` covers the transient connecting phase; a session value always starts `Connected`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Link open, setup frame not yet acknowledged.
    Connected,
    /// Setup acknowledged; parameters are fixed for the rest of the session.
    Configured(SessionParams),
    /// A link failure ended the session.
    Disconnected,
}

/// One line received from the device, without its line terminator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AckLine(Bytes);

impl AckLine {
    fn from_raw(mut raw: Vec<u8>) -> Self {
        if raw.last() == Some(&b'\n') {
            raw.pop();
        }
        if raw.last() == Some(&b'\r') {
            raw.pop();
        }
        AckLine(Bytes::from(raw))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.0)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for AckLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text())
    }
}

/// A master-side session with one client device.
///
/// The session owns the link exclusively. Exchanges take `&mut self`, so at most one batch
/// is ever outstanding.
#[derive(Debug)]
pub struct Session<L = SerialStream> {
    link: BufReader<L>,
    config: SessionConfig,
    state: SessionState,
}

impl Session<SerialStream> {
    /// Opens `port` and waits out the device's reset before returning.
    pub async fn connect(port: &str, config: SessionConfig) -> Result<Self> {
        info!(port, baud_rate = config.baud_rate, "Trying to connect to port");
        let stream = tokio_serial::new(port, config.baud_rate)
            .open_native_async()
            .map_err(|source| Error::Connect {
                port: port.to_string(),
                source,
            })?;

        info!(warmup = ?config.warmup, "Waiting for device reset to settle...");
        tokio::time::sleep(config.warmup).await;
        info!(port, baud_rate = config.baud_rate, "Successfully connected");

        Ok(Self::from_link(stream, config))
    }

    /// Connects to the first port `lister` reports.
    pub async fn autoconnect(lister: &dyn PortLister, config: SessionConfig) -> Result<Self> {
        let port = ports::first_port(lister)?;
        info!(%port, "Autoconnecting to first available port");
        Self::connect(&port, config).await
    }
}

impl<L> Session<L>
where
    L: AsyncRead + AsyncWrite + Unpin,
{
    /// Wraps an already open link. No warm-up delay is applied.
    pub fn from_link(link: L, config: SessionConfig) -> Self {
        Self {
            link: BufReader::new(link),
            config,
            state: SessionState::Connected,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn params(&self) -> Option<&SessionParams> {
        match &self.state {
            SessionState::Configured(params) => Some(params),
            _ => None,
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Sends the setup frame and fixes the session parameters.
    ///
    /// The setup frame travels as a one-command batch under [`SessionParams::PROVISIONAL`].
    /// Must be called exactly once, before any [`send_batch`](Self::send_batch).
    pub async fn configure(&mut self, int_width: usize, param_count: usize, batch_size: usize) -> Result<()> {
        match self.state {
            SessionState::Connected => {}
            SessionState::Configured(_) => {
                return Err(Error::contract("configure called twice; session parameters are immutable"));
            }
            SessionState::Disconnected => return Err(disconnected()),
        }

        let params = SessionParams::new(int_width, param_count, batch_size)?;
        if !FIRMWARE_INT_WIDTHS.contains(&int_width) {
            warn!(int_width, "Integer width is not one the reference client firmware accepts");
        }

        let setup = frame::setup_frame(&params)?;
        let payload = batch::pad_frames(vec![setup], &SessionParams::PROVISIONAL)?;

        info!(int_width, param_count, batch_size, "--- Sending Setup Frame ---");
        let ack = self.exchange(payload).await?;
        debug!(ack = %ack, "Setup acknowledged");

        self.state = SessionState::Configured(params);
        info!(
            bytes_per_command = params.bytes_per_command(),
            payload_len = params.payload_len(),
            "Session configured"
        );
        Ok(())
    }

    /// Sends one batch and waits for the device's acknowledgement line.
    pub async fn send_batch(&mut self, commands: &[Command]) -> Result<AckLine> {
        let params = match self.state {
            SessionState::Configured(params) => params,
            SessionState::Connected => return Err(Error::contract("send_batch called before configure")),
            SessionState::Disconnected => return Err(disconnected()),
        };

        let payload = batch::assemble(commands, &params)?;
        let ack = self.exchange(payload).await?;
        debug!(commands = commands.len(), ack = %ack, "Batch acknowledged");
        Ok(ack)
    }

    /// Flushes and releases the link.
    pub async fn close(self) -> Result<()> {
        let mut link = self.link.into_inner();
        link.shutdown().await?;
        info!("Session closed");
        Ok(())
    }

    /// Write-then-read with the session marked disconnected on any failure.
    async fn exchange(&mut self, payload: Bytes) -> Result<AckLine> {
        let result = self.write_then_read(payload).await;
        if let Err(e) = &result {
            warn!(error = %e, "Link failure, session disconnected");
            self.state = SessionState::Disconnected;
        }
        result
    }

    async fn write_then_read(&mut self, payload: Bytes) -> Result<AckLine> {
        debug!(bytes = hex::encode(&payload), len = payload.len(), "Serial Write");
        self.link.write_all(&payload).await?;
        self.link.flush().await?;

        let deadline = self.config.response_timeout;
        let read = self.read_line();
        match deadline {
            Some(limit) => tokio::time::timeout(limit, read).await?,
            None => read.await,
        }
    }

    async fn read_line(&mut self) -> Result<AckLine> {
        let mut raw = Vec::new();
        let n = self.link.read_until(b'\n', &mut raw).await?;
        if n == 0 {
            return Err(Error::Link(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "link closed before acknowledgement",
            )));
        }
        debug!(bytes = hex::encode(&raw), "Serial Read");
        Ok(AckLine::from_raw(raw))
    }
}

fn disconnected() -> Error {
    Error::contract("session is disconnected")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, duplex};

    #[test]
    fn test_ack_line_strips_terminator() {
        assert!(AckLine::from_raw(b"\r\n".to_vec()).is_empty());
        assert_eq!(AckLine::from_raw(b"ok\n".to_vec()).text(), "ok");
        assert_eq!(AckLine::from_raw(b"partial".to_vec()).as_bytes(), b"partial");
    }

    #[tokio::test]
    async fn test_send_before_configure() {
        let (host, _device) = duplex(64);
        let mut session = Session::from_link(host, SessionConfig::default());
        let cmd = Command::new(1, vec![]).unwrap();
        assert!(matches!(session.send_batch(&[cmd]).await, Err(Error::Contract(_))));
        assert_eq!(session.state(), SessionState::Connected);
    }

    #[tokio::test]
    async fn test_configure_writes_setup_frame() {
        let (host, mut device) = duplex(64);
        let mut session = Session::from_link(host, SessionConfig::default());

        let device_side = tokio::spawn(async move {
            let mut setup = [0u8; 4];
            device.read_exact(&mut setup).await.unwrap();
            device.write_all(b"\r\n").await.unwrap();
            (setup, device)
        });

        session.configure(2, 6, 20).await.unwrap();
        let (setup, _device) = device_side.await.unwrap();
        assert_eq!(setup, [0xFF, 2, 6, 20]);
        assert_eq!(session.params(), Some(&SessionParams::new(2, 6, 20).unwrap()));
    }

    #[tokio::test]
    async fn test_eof_disconnects_session() {
        let (host, device) = duplex(64);
        drop(device);
        let mut session = Session::from_link(host, SessionConfig::default());
        assert!(session.configure(1, 1, 1).await.unwrap_err().is_fatal());
        assert_eq!(session.state(), SessionState::Disconnected);
        assert!(matches!(session.configure(1, 1, 1).await, Err(Error::Contract(_))));
    }
}
