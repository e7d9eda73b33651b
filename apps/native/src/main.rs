//! `linkalert`: watch a USB serial device, print its lines and escalate
//! alert lines on the console.

mod config;
mod console;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use actor_runtime::{spawn_actor, LinkHandle};
use alerting::{AlertActor, AlertEngine};
use clap::Parser;
use connection_actors::LinkActor;
use core_types::{SerialProvider, TransportError};
use futures::StreamExt;
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;
use transport_native::{spawn_hotplug_watcher, DeviceFilter, NativeSerialProvider};

use crate::config::{AppConfig, ConfigError, Overrides};
use crate::console::{render_event, ConsoleFeedback};

/// How long each actor gets to finish after shutdown is requested
const SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

#[derive(Parser, Debug)]
#[command(name = "linkalert")]
#[command(about = "Watch a USB serial device and escalate alert lines")]
struct Cli {
    /// TOML config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Serial port to watch (default: first USB serial adapter)
    #[arg(short, long)]
    port: Option<String>,

    /// Baud rate
    #[arg(short, long)]
    baud: Option<u32>,

    /// Framing in compact notation, e.g. 8N1 or 7E1
    #[arg(short, long)]
    framing: Option<String>,

    /// Consider non-USB ports too
    #[arg(long)]
    all_ports: bool,

    /// Wait for `!connect` instead of connecting at startup
    #[arg(long)]
    no_auto_connect: bool,

    /// List candidate devices and exit
    #[arg(long)]
    list: bool,

    /// Debug logging (overrides RUST_LOG)
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Debug, Error)]
enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error("Failed to set up logging: {0}")]
    Logging(String),
    #[error("Console input failed: {0}")]
    Input(#[from] std::io::Error),
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    init_tracing(cli.verbose)?;

    let mut config = match &cli.config {
        Some(path) => AppConfig::load(path)?,
        None => AppConfig::default(),
    };
    config.apply(Overrides {
        port: cli.port.clone(),
        baud: cli.baud,
        framing: cli.framing.clone(),
        no_auto_connect: cli.no_auto_connect,
    })?;

    let filter = DeviceFilter {
        include_non_usb: cli.all_ports,
        only_path: config.port.clone(),
        ..DeviceFilter::default()
    };
    let provider: Arc<dyn SerialProvider> =
        Arc::new(NativeSerialProvider::new(config.link.read_timeout()).with_filter(filter));

    if cli.list {
        for device in provider.list()? {
            match &device.product {
                Some(product) => println!("{}  {}", device.label(), product),
                None => println!("{}", device.label()),
            }
        }
        return Ok(());
    }

    let (mut link, handles) = LinkHandle::new();
    let mut events = link.take_event_receiver();

    let engine = AlertEngine::new(Arc::new(ConsoleFeedback::stdout()), config.alert.clone());
    let alert_task = spawn_actor(
        AlertActor::new(engine, handles.event_tx.clone()),
        handles.alert_rx,
        handles.event_tx.clone(),
    );

    let link_actor = LinkActor::new(
        provider.clone(),
        config.link.clone(),
        handles.state.clone(),
        link.link_sender(),
        handles.event_tx.clone(),
    )
    .with_line_subscriber(link.alert_sender());
    let link_task = spawn_actor(link_actor, handles.link_rx, handles.event_tx);

    let hotplug_task = spawn_hotplug_watcher(
        provider,
        link.clone(),
        Duration::from_millis(config.hotplug_interval_ms),
    );

    let printer = tokio::spawn(async move {
        while let Some(event) = events.next().await {
            println!("{}", render_event(&event, chrono::Local::now().time()));
        }
    });

    println!("linkalert: type a line to send it, !ack to acknowledge an alert, !help for commands");
    let result = command_loop(&link).await;

    hotplug_task.abort();
    link.shutdown().await;
    for task in [link_task, alert_task] {
        if tokio::time::timeout(SHUTDOWN_GRACE, task).await.is_err() {
            tracing::warn!("Actor did not stop within {:?}", SHUTDOWN_GRACE);
        }
    }
    // Ends once the actors have dropped their event senders
    let _ = tokio::time::timeout(SHUTDOWN_GRACE, printer).await;
    result
}

fn init_tracing(verbose: bool) -> Result<(), AppError> {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| AppError::Logging(e.to_string()))
}

/// A line typed at the console.
#[derive(Debug, PartialEq, Eq)]
enum Command {
    Send(String),
    At(String),
    Ack,
    Status,
    List,
    Connect,
    Disconnect,
    Help,
    Quit,
    Empty,
    Unknown(String),
}

fn parse_command(input: &str) -> Command {
    let input = input.trim_end_matches(['\r', '\n']);
    let Some(command) = input.strip_prefix('!') else {
        return if input.trim().is_empty() {
            Command::Empty
        } else {
            Command::Send(input.to_string())
        };
    };

    let (name, arg) = match command.split_once(' ') {
        Some((name, arg)) => (name, arg.trim()),
        None => (command, ""),
    };
    match name.to_ascii_lowercase().as_str() {
        "ack" | "stop" => Command::Ack,
        "at" => Command::At(arg.to_string()),
        "status" => Command::Status,
        "list" => Command::List,
        "connect" => Command::Connect,
        "disconnect" => Command::Disconnect,
        "help" => Command::Help,
        "quit" | "exit" => Command::Quit,
        _ => Command::Unknown(input.to_string()),
    }
}

fn print_help() {
    println!("  <text>          send a line (CRLF appended)");
    println!("  !at <cmd>       send AT<cmd>");
    println!("  !ack            acknowledge the active critical alert");
    println!("  !status         show the link state");
    println!("  !list           list candidate devices");
    println!("  !connect        connect to the first available device");
    println!("  !disconnect     disconnect without reconnecting");
    println!("  !quit           exit");
}

async fn command_loop(link: &LinkHandle) -> Result<(), AppError> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = tokio::signal::ctrl_c() => None,
        };
        // EOF or Ctrl-C
        let Some(line) = line else {
            return Ok(());
        };

        let outcome = match parse_command(&line) {
            Command::Send(text) => {
                // Failures are reported by the link actor's own log events
                link.send(text).await;
                Ok(())
            }
            Command::At(cmd) => {
                link.send_at(&cmd).await;
                Ok(())
            }
            Command::Ack => link.stop_alert(),
            Command::Status => {
                println!("{}", link.state().status_text());
                Ok(())
            }
            Command::List => link.discover().await.map(|devices| {
                if devices.is_empty() {
                    println!("No devices found");
                }
                for device in devices {
                    println!("  {}", device.label());
                }
            }),
            Command::Connect => link.auto_connect(),
            Command::Disconnect => {
                link.disconnect(true).await;
                Ok(())
            }
            Command::Help => {
                print_help();
                Ok(())
            }
            Command::Quit => return Ok(()),
            Command::Empty => Ok(()),
            Command::Unknown(input) => {
                println!("Unknown command: {} (try !help)", input);
                Ok(())
            }
        };
        if let Err(e) = outcome {
            tracing::warn!("{}", e);
        }
    }
}
