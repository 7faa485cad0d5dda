use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use serial_master::{Command, Session, SessionConfig, SystemPortLister};

const INT_WIDTH: usize = 2;
const PARAM_COUNT: usize = 6;
const BATCH_SIZE: usize = 1;

const OP_END: u8 = 0;
const OP_REFERENCE: u8 = 1;
const OP_MOVE: u8 = 2;

/// Drives a connected client through a reference / move / end sequence.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Port to open. Defaults to the first port reported by the system.
    #[arg(short, long)]
    port: Option<String>,
    /// Serial baud rate.
    #[arg(short, long, default_value_t = 115_200)]
    baud: u32,
}

fn simple_command(operation_id: u8) -> Result<Vec<Command>> {
    Ok(vec![Command::new(operation_id, vec![0; PARAM_COUNT])?])
}

fn move_command(params: [i64; PARAM_COUNT]) -> Result<Vec<Command>> {
    Ok(vec![Command::new(OP_MOVE, params.to_vec())?])
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    tracing_subscriber::fmt().with_target(false).init();

    let config = SessionConfig::default().with_baud_rate(cli.baud);
    let mut session = match &cli.port {
        Some(port) => Session::connect(port, config).await?,
        None => Session::autoconnect(&SystemPortLister, config).await?,
    };
    session
        .configure(INT_WIDTH, PARAM_COUNT, BATCH_SIZE)
        .await
        .context("Setup handshake failed")?;

    let sequence = [
        ("reference", simple_command(OP_REFERENCE)?),
        ("move", move_command([1500, 2300, 1400, 0, 800, 2000])?),
        ("move", move_command([200, 200, 400, 0, 100, 0])?),
        ("end", simple_command(OP_END)?),
    ];

    for (name, batch) in sequence {
        let ack = session
            .send_batch(&batch)
            .await
            .with_context(|| format!("Failed to send {name} command"))?;
        info!(command = name, ack = ?ack.as_bytes(), "Acknowledged");
    }

    session.close().await?;
    Ok(())
}
