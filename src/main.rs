//! Robolink - Remote driving client for TCP-controlled camera robots
//!
//! Connects to a robot over two TCP channels: newline-terminated text
//! commands out, length-prefixed video frames in.

mod config;
mod network;
mod protocol;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use config::Config;
use network::{Endpoints, Session, SessionEvent};
use protocol::{Direction, Mode};

/// Robolink - drive a TCP-controlled robot
#[derive(Parser)]
#[command(name = "robolink")]
#[command(author = "Robolink Contributors")]
#[command(version = "0.1.0")]
#[command(about = "Drive a TCP-controlled camera robot", long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Connect to a robot and drive it interactively
    Drive {
        /// Robot host name or address
        #[arg(long)]
        host: Option<String>,

        /// Command channel port
        #[arg(short, long)]
        port: Option<u16>,

        /// Video channel port (defaults to the command port)
        #[arg(long)]
        video_port: Option<u16>,
    },

    /// Show current configuration
    Config {
        /// Generate sample configuration
        #[arg(long)]
        generate: bool,

        /// Output path for generated config
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show protocol information
    Info,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();

    // Load configuration
    let config = if let Some(config_path) = &cli.config {
        Config::load(config_path)?
    } else {
        Config::load_default().unwrap_or_default()
    };

    match cli.command {
        Commands::Drive { host, port, video_port } => {
            run_drive(config, host, port, video_port).await?;
        }
        Commands::Config { generate, output } => {
            if generate {
                let sample = config::generate_sample_config();
                if let Some(path) = output {
                    std::fs::write(&path, &sample)?;
                    println!("Configuration written to: {}", path.display());
                } else {
                    println!("{}", sample);
                }
            } else {
                println!("{}", toml::to_string_pretty(&config)?);
            }
        }
        Commands::Info => {
            print_protocol_info();
        }
    }

    Ok(())
}

/// Run the interactive drive loop
async fn run_drive(
    config: Config,
    host: Option<String>,
    port: Option<u16>,
    video_port: Option<u16>,
) -> anyhow::Result<()> {
    let endpoints = Endpoints::new(
        host.unwrap_or(config.robot.host.clone()),
        port.unwrap_or(config.robot.command_port),
        video_port.or(config.robot.video_port),
    );

    tracing::info!(
        "Driving as '{}': {} command:{} video:{}",
        config.general.name,
        endpoints.host,
        endpoints.command_port,
        endpoints.video_port
    );

    let mut session = Session::new(endpoints);
    let mut event_rx = session.take_event_receiver().unwrap();

    println!("Connecting...");
    session.connect().await?;

    println!("\n========================================");
    println!("  Robolink Connected");
    println!("========================================");
    println!("  Video: {}", if session.has_video() { "streaming" } else { "unavailable" });
    println!("========================================");
    println!("\nCommands: stop | manual | line | color | figure");
    println!("          sub <n> | power <n> | press <dir> | release");
    println!("          status | quit");
    println!("Press Ctrl+C to disconnect.\n");

    let stdin = tokio::io::BufReader::new(tokio::io::stdin());
    let mut input_lines = tokio::io::AsyncBufReadExt::lines(stdin);

    let mut frames_received: u64 = 0;
    let mut frame_bytes: u64 = 0;

    loop {
        tokio::select! {
            Some(event) = event_rx.recv() => {
                match event {
                    SessionEvent::Connected { command_addr, video_addr } => {
                        tracing::info!(%command_addr, ?video_addr, "connected");
                    }
                    SessionEvent::Disconnected { reason } => {
                        println!("Disconnected: {}", reason);
                        break;
                    }
                    SessionEvent::LogLine(text) => {
                        println!("[robot] {}", text.trim_end());
                    }
                    SessionEvent::VideoFrame(frame) => {
                        frames_received += 1;
                        frame_bytes += frame.len() as u64;
                        tracing::debug!(len = frame.len(), total = frames_received, "frame");
                    }
                    SessionEvent::Error { message } => {
                        tracing::error!("Session error: {}", message);
                    }
                }
            }
            line = input_lines.next_line() => {
                match line? {
                    Some(line) => {
                        if !handle_input(&mut session, line.trim(), frames_received, frame_bytes).await {
                            break;
                        }
                    }
                    None => break,
                }
            }
            _ = tokio::signal::ctrl_c() => {
                println!("\nDisconnecting...");
                break;
            }
        }
    }

    session.disconnect().await;
    tracing::info!("Session ended");

    Ok(())
}

/// Apply one console command to the session. Returns false to quit.
async fn handle_input(
    session: &mut Session,
    line: &str,
    frames_received: u64,
    frame_bytes: u64,
) -> bool {
    let mut parts = line.split_whitespace();
    match (parts.next(), parts.next()) {
        (Some("stop"), _) => session.set_mode(Mode::Stopped).await,
        (Some("manual"), _) => session.set_mode(Mode::Manual).await,
        (Some("line"), _) => session.set_mode(Mode::LineFollow).await,
        (Some("color"), _) => session.set_mode(Mode::ColorFollow).await,
        (Some("figure"), _) => session.set_mode(Mode::Figure).await,
        (Some("sub"), Some(arg)) => match arg.parse() {
            Ok(sub_mode) => session.set_sub_mode(sub_mode).await,
            Err(_) => println!("Usage: sub <0-9>"),
        },
        (Some("power"), Some(arg)) => match arg.parse() {
            Ok(power) => session.set_power(power),
            Err(_) => println!("Usage: power <0-100>"),
        },
        (Some("press"), Some(dir)) => match parse_direction(dir) {
            Some(direction) => session.press_direction(direction).await,
            None => println!("Usage: press <forward|backward|left|right>"),
        },
        (Some("release"), _) => session.release_direction().await,
        (Some("status"), _) => {
            let drive = session.drive();
            println!(
                "mode={:?} sub={} power={} button={} video={} frames={} ({} bytes)",
                drive.mode,
                drive.sub_mode,
                drive.power,
                u8::from(drive.button_pressed),
                session.has_video(),
                frames_received,
                frame_bytes,
            );
        }
        (Some("quit"), _) | (Some("exit"), _) => return false,
        (Some(other), _) => println!("Unknown command: {}", other),
        (None, _) => {}
    }
    true
}

fn parse_direction(arg: &str) -> Option<Direction> {
    match arg {
        "forward" | "f" | "up" => Some(Direction::Forward),
        "backward" | "b" | "down" => Some(Direction::Backward),
        "left" | "l" => Some(Direction::Left),
        "right" | "r" => Some(Direction::Right),
        _ => None,
    }
}

/// Print protocol information
fn print_protocol_info() {
    println!("Robolink Protocol Information");
    println!("=============================\n");

    println!("Default command port: {}", protocol::DEFAULT_COMMAND_PORT);
    println!("Max video frame size: {} bytes", protocol::MAX_FRAME_LEN);
    println!("Video length prefix:  {} bytes, signed little-endian", protocol::LEN_PREFIX_LEN);
    println!("\nCommand format:");
    println!("  <mode*10+sub>                e.g. \"0\" (stopped), \"20\" (line follow)");
    println!("  <mode*10+sub>;<power>;<btn>  manual mode, e.g. \"11;50;1\"");
    println!("\nModes: 0=stopped 1=manual 2=line 3=color 4=figure");
}
