use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use clap_verbosity_flag::{InfoLevel, Verbosity};
use std::fs;
use std::path::{Path, PathBuf};
use std::process;
use std::time::Duration;
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use serial_master::codec::parse_integer;
use serial_master::ports::describe_port_type;
use serial_master::{Command, PortLister, Session, SessionConfig, SystemPortLister};

/// Master side of the fixed-width serial command protocol.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Mode,
    #[command(flatten)]
    verbose: Verbosity<InfoLevel>,
}

#[derive(Subcommand, Debug)]
enum Mode {
    /// List the serial ports reported by the operating system.
    List {
        /// Also print the port type (USB ids, product, manufacturer).
        #[arg(short, long)]
        details: bool,
    },
    /// Configure a session and send one batch.
    Send(SendArgs),
}

#[derive(Args, Debug)]
struct SendArgs {
    /// Port to open. Defaults to the first port reported by the system.
    #[arg(short, long)]
    port: Option<String>,
    /// JSON file with session settings (baud_rate, warmup_ms, response_timeout_ms).
    #[arg(long)]
    config: Option<PathBuf>,
    /// Baud rate, overrides the config file.
    #[arg(short, long)]
    baud: Option<u32>,
    /// Acknowledgement deadline in milliseconds, overrides the config file.
    #[arg(long)]
    timeout_ms: Option<u64>,
    /// Bytes per encoded integer.
    #[arg(long, default_value_t = 2)]
    int_width: usize,
    /// Parameters per command.
    #[arg(long, default_value_t = 6)]
    param_count: usize,
    /// Commands per batch.
    #[arg(long, default_value_t = 1)]
    batch_size: usize,
    /// JSON file holding the batch: [{"operation_id": 2, "params": [...]}, ...].
    #[arg(long, conflicts_with = "operation")]
    batch: Option<PathBuf>,
    /// Operation id of a single command.
    #[arg(required_unless_present = "batch")]
    operation: Option<u8>,
    /// Parameters of the single command.
    #[arg(allow_negative_numbers = true, value_parser = parse_param)]
    params: Vec<i64>,
}

fn parse_param(text: &str) -> std::result::Result<i64, String> {
    parse_integer(text).map_err(|e| e.to_string())
}

fn setup_logging(verbosity: &Verbosity<InfoLevel>) {
    let filter = EnvFilter::builder()
        .with_default_directive(verbosity.tracing_level_filter().into())
        .from_env_lossy();

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(&cli.verbose);

    tokio::select! {
        res = run(cli.command) => {
            if let Err(e) = res {
                error!("Application failed: {:?}", e);
                process::exit(1);
            }
        }
        _ = signal::ctrl_c() => {
            info!("Ctrl+C received, shutting down.");
        }
    }
    Ok(())
}

async fn run(mode: Mode) -> Result<()> {
    match mode {
        Mode::List { details } => list_ports(details),
        Mode::Send(args) => send(args).await,
    }
}

fn list_ports(details: bool) -> Result<()> {
    let lister = SystemPortLister;
    if details {
        let infos = lister.port_infos().context("Failed to enumerate serial ports")?;
        println!("Available devices: {}", infos.len());
        for info in infos {
            println!("- {} [{}]", info.port_name, describe_port_type(&info.port_type));
        }
    } else {
        let ports = lister.list_ports().context("Failed to enumerate serial ports")?;
        println!("Available devices: {}", ports.len());
        for port in ports {
            println!("- {port}");
        }
    }
    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<SessionConfig> {
    let Some(path) = path else {
        return Ok(SessionConfig::default());
    };
    let text = fs::read_to_string(path).with_context(|| format!("Failed to read config file {:?}", path))?;
    serde_json::from_str(&text).with_context(|| format!("Invalid config file {:?}", path))
}

fn load_batch(args: &SendArgs) -> Result<Vec<Command>> {
    if let Some(path) = &args.batch {
        let text = fs::read_to_string(path).with_context(|| format!("Failed to read batch file {:?}", path))?;
        let commands: Vec<Command> =
            serde_json::from_str(&text).with_context(|| format!("Invalid batch file {:?}", path))?;
        return Ok(commands);
    }
    let Some(operation) = args.operation else {
        bail!("either an operation id or --batch is required");
    };
    Ok(vec![Command::new(operation, args.params.clone())?])
}

async fn send(args: SendArgs) -> Result<()> {
    let mut config = load_config(args.config.as_deref())?;
    if let Some(baud) = args.baud {
        config = config.with_baud_rate(baud);
    }
    if let Some(ms) = args.timeout_ms {
        config = config.with_response_timeout(Some(Duration::from_millis(ms)));
    }
    let commands = load_batch(&args)?;

    let mut session = match &args.port {
        Some(port) => Session::connect(port, config).await?,
        None => Session::autoconnect(&SystemPortLister, config).await?,
    };

    session
        .configure(args.int_width, args.param_count, args.batch_size)
        .await
        .context("Setup handshake failed")?;

    let ack = session.send_batch(&commands).await.context("Batch exchange failed")?;
    println!("{ack:?}");
    session.close().await?;
    Ok(())
}
