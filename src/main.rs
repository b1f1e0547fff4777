use anyhow::{Context, Result, bail};
use chatter::{Config, Device, Engine, PtyTransport, Runner, SerialTransport, Transport, parse_file};
use clap::Parser;
use std::time::Duration;
use tracing::{Level, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "chatter",
    about = "Run a command/response script against a serial device",
    version
)]
struct Args {
    /// Path to the script file
    #[arg(short, long)]
    script: String,

    /// Serial port to open
    #[arg(short, long, env = "CHATTER_PORT", conflicts_with = "command")]
    port: Option<String>,

    /// Baud rate for the serial port
    #[arg(short, long, env = "CHATTER_BAUD", default_value_t = 115_200)]
    baud: u32,

    /// Program to run in a PTY instead of opening a serial port
    #[arg(short, long)]
    command: Option<String>,

    /// Arguments to pass to the program
    #[arg(trailing_var_arg = true)]
    args: Vec<String>,

    /// Default response timeout in milliseconds
    #[arg(long, default_value_t = 2500)]
    timeout: u64,

    /// How long to wait for queued commands after the script, in milliseconds
    #[arg(long, default_value_t = 10_000)]
    drain: u64,

    /// Maximum number of queued commands
    #[arg(long, default_value_t = Config::DEFAULT_QUEUE_CAPACITY)]
    queue_capacity: usize,

    /// Receive buffer size in bytes
    #[arg(long, default_value_t = Config::DEFAULT_BUFFER_CAPACITY)]
    buffer_capacity: usize,

    /// Maximum number of hooks
    #[arg(long, default_value_t = Config::DEFAULT_HOOK_CAPACITY)]
    hook_capacity: usize,

    /// Log more (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let args = Args::parse();

    let level = match args.verbose {
        0 => Level::WARN,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(level.into()))
        .with_writer(std::io::stderr)
        .init();

    let commands = parse_file(&args.script)
        .with_context(|| format!("Failed to parse script file: {}", args.script))?;

    let transport = open_transport(&args)?;
    let config = Config::new()
        .queue_capacity(args.queue_capacity)
        .buffer_capacity(args.buffer_capacity)
        .hook_capacity(args.hook_capacity);
    let mut engine: Device = Engine::new(config);
    engine.begin(transport, Some(Box::new(std::io::stderr())));

    if args.command.is_some() {
        // Give the program time to start up before sending anything.
        tokio::time::sleep(Duration::from_millis(100)).await;
    }

    Runner::new(engine)
        .default_timeout(Duration::from_millis(args.timeout))
        .final_wait(Duration::from_millis(args.drain))
        .execute(commands)
        .await
        .context("Failed to execute script")?;

    Ok(())
}

fn open_transport(args: &Args) -> Result<Box<dyn Transport>> {
    match (&args.port, &args.command) {
        (Some(port), _) => {
            let serial = SerialTransport::open(port, args.baud)?;
            info!(port = serial.name(), baud = args.baud, "serial port open");
            Ok(Box::new(serial))
        }
        (None, Some(command)) => {
            let pty = PtyTransport::spawn(command, &args.args)?;
            info!(%command, "program spawned");
            Ok(Box::new(pty))
        }
        (None, None) => bail!("Either --port or --command is required"),
    }
}
