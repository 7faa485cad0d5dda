use anyhow::{Context, Result};
use clap::Parser;
use clap_verbosity_flag::{InfoLevel, Verbosity};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::fs::File;
use std::path::PathBuf;
use std::time::Instant;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use serial_master::codec::bounds;
use serial_master::{Command, Session, SessionConfig, SystemPortLister};

/// Measures batch round-trip time against a connected client.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Port to open. Defaults to the first port reported by the system.
    #[arg(short, long)]
    port: Option<String>,
    /// Serial baud rate.
    #[arg(short, long, default_value_t = 115_200)]
    baud: u32,
    #[arg(long, default_value_t = 2)]
    int_width: usize,
    #[arg(long, default_value_t = 6)]
    param_count: usize,
    #[arg(long, default_value_t = 20)]
    batch_size: usize,
    /// Number of random batches to send.
    #[arg(short = 'n', long, default_value_t = 50)]
    batches: u32,
    /// Seed for the random commands.
    #[arg(long, default_value_t = 1)]
    seed: u64,
    /// Optional path to a file to write logs to, in addition to the console.
    #[arg(short, long)]
    log_file: Option<PathBuf>,
    #[command(flatten)]
    verbose: Verbosity<InfoLevel>,
}

fn setup_logging(log_file_path: Option<&PathBuf>, verbosity: &Verbosity<InfoLevel>) -> Result<Option<WorkerGuard>> {
    let console_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stdout)
        .with_target(false);

    let (file_layer, guard) = if let Some(path) = log_file_path {
        let log_file = File::create(path).with_context(|| format!("Failed to create log file at: {:?}", path))?;
        let (non_blocking_writer, guard) = tracing_appender::non_blocking(log_file);
        let layer = tracing_subscriber::fmt::layer()
            .with_writer(non_blocking_writer)
            .with_ansi(false)
            .with_target(false);
        (Some(layer), Some(guard))
    } else {
        (None, None)
    };

    let filter = EnvFilter::builder()
        .with_default_directive(verbosity.tracing_level_filter().into())
        .from_env_lossy();

    tracing_subscriber::registry()
        .with(filter)
        .with(console_layer)
        .with(file_layer)
        .init();

    Ok(guard)
}

/// Twenty copies of the same fixed command, truncated to the batch size.
fn sample_batch(param_count: usize, batch_size: usize) -> Result<Vec<Command>> {
    let params: Vec<i64> = [12, 14, 14, 15, 16, 17].into_iter().cycle().take(param_count).collect();
    let command = Command::new(55, params)?;
    Ok(vec![command; batch_size.min(20)])
}

fn random_batch(rng: &mut StdRng, int_width: usize, param_count: usize, batch_size: usize) -> Result<Vec<Command>> {
    let (min, max) = bounds(int_width)?;
    (0..batch_size)
        .map(|_| -> Result<Command> {
            let operation_id = rng.gen_range(1..254u8);
            let params = (0..param_count).map(|_| rng.gen_range(min..=max)).collect::<Vec<i64>>();
            Ok(Command::new(operation_id, params)?)
        })
        .collect()
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let _guard = setup_logging(cli.log_file.as_ref(), &cli.verbose)?;

    let config = SessionConfig::default().with_baud_rate(cli.baud);
    let mut session = match &cli.port {
        Some(port) => Session::connect(port, config).await?,
        None => Session::autoconnect(&SystemPortLister, config).await?,
    };
    session
        .configure(cli.int_width, cli.param_count, cli.batch_size)
        .await
        .context("Setup handshake failed")?;

    let sample = sample_batch(cli.param_count, cli.batch_size)?;
    let start = Instant::now();
    session.send_batch(&sample).await?;
    info!(elapsed = ?start.elapsed(), "Elapsed time for one batch");

    info!(batches = cli.batches, "Stress testing with random batches");
    let mut rng = StdRng::seed_from_u64(cli.seed);
    let random = random_batch(&mut rng, cli.int_width, cli.param_count, cli.batch_size)?;
    let start = Instant::now();
    for _ in 0..cli.batches {
        session.send_batch(&random).await?;
    }
    info!(batches = cli.batches, elapsed = ?start.elapsed(), "Elapsed time for random batches");

    session.close().await?;
    Ok(())
}
