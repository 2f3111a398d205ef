// CLI entry point for Delvers.
//
// Two modes:
//
//   delvers server [OPTIONS]
//     --port <PORT>     Listen port (default: 8999)
//     --data <FILE>     Game data JSON (default: built-in tables)
//     --map <FILE>      World snapshot JSON (default: built-in arena)
//
//   delvers client [OPTIONS]
//     --addr <HOST:PORT>  Server address (default: 127.0.0.1:8999)
//
// The server runs until killed. The client joins and plays headlessly with
// the autopilot until the server goes away. See `server.rs` and
// `game_client.rs` for the moving parts.

use std::thread;
use std::time::Duration;

use delvers_net::autopilot::Autopilot;
use delvers_net::client::ClientConfig;
use delvers_net::error::NetError;
use delvers_net::game_client::GameClient;
use delvers_net::server::{ServerConfig, start_server};
use delvers_sim::{GameData, WorldSnapshot};
use tracing::{error, info};

const CLIENT_TICK: Duration = Duration::from_millis(16);

enum Mode {
    Server(ServerConfig),
    Client { addr: String },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let result = match parse_args() {
        Mode::Server(config) => run_server(config),
        Mode::Client { addr } => run_client(&addr),
    };
    if let Err(e) = result {
        error!(error = %e, "exiting");
        std::process::exit(1);
    }
}

fn run_server(config: ServerConfig) -> Result<(), NetError> {
    let (handle, addr) = start_server(config)?;
    println!("Server listening on {addr}");
    while handle.is_running() {
        thread::sleep(Duration::from_millis(100));
    }
    handle.stop()
}

fn run_client(addr: &str) -> Result<(), NetError> {
    let mut client = GameClient::connect(addr, ClientConfig::default())?;
    let mut pilot = Autopilot::new();
    info!(%addr, "joined");
    loop {
        let applied = match client.tick() {
            Ok(applied) => applied,
            Err(NetError::MailboxClosed) => {
                info!("server closed the connection");
                return Ok(());
            }
            Err(e) => return Err(e),
        };
        pilot.step(&client, &applied)?;
        thread::sleep(CLIENT_TICK);
    }
}

/// Parse command-line arguments. Simple `std::env::args()` matching, no clap.
fn parse_args() -> Mode {
    let args: Vec<String> = std::env::args().collect();
    let Some(mode) = args.get(1) else {
        print_usage();
        std::process::exit(1);
    };
    let mut i = 2;

    match mode.as_str() {
        "server" => {
            let mut config = ServerConfig {
                host: "0.0.0.0".into(),
                ..ServerConfig::default()
            };
            while i < args.len() {
                match args[i].as_str() {
                    "--port" => {
                        i += 1;
                        config.port = args.get(i).and_then(|s| s.parse().ok()).unwrap_or_else(|| {
                            eprintln!("--port requires a valid port number");
                            std::process::exit(1);
                        });
                    }
                    "--data" => {
                        i += 1;
                        config.data = load_or_exit(args.get(i), "--data", |text| {
                            GameData::from_json(text).map_err(NetError::from)
                        });
                    }
                    "--map" => {
                        i += 1;
                        config.snapshot = load_or_exit(args.get(i), "--map", |text| {
                            WorldSnapshot::from_json(text).map_err(NetError::Map)
                        });
                    }
                    other => unknown_argument(other),
                }
                i += 1;
            }
            Mode::Server(config)
        }
        "client" => {
            let mut addr = "127.0.0.1:8999".to_string();
            while i < args.len() {
                match args[i].as_str() {
                    "--addr" => {
                        i += 1;
                        addr = args.get(i).cloned().unwrap_or_else(|| {
                            eprintln!("--addr requires HOST:PORT");
                            std::process::exit(1);
                        });
                    }
                    other => unknown_argument(other),
                }
                i += 1;
            }
            Mode::Client { addr }
        }
        "--help" | "-h" => {
            print_usage();
            std::process::exit(0);
        }
        other => unknown_argument(other),
    }
}

fn load_or_exit<T>(path: Option<&String>, flag: &str, parse: impl FnOnce(&str) -> Result<T, NetError>) -> T {
    let Some(path) = path else {
        eprintln!("{flag} requires a file path");
        std::process::exit(1);
    };
    let loaded = std::fs::read_to_string(path)
        .map_err(NetError::from)
        .and_then(|text| parse(&text));
    match loaded {
        Ok(value) => value,
        Err(e) => {
            eprintln!("Failed to load {path}: {e}");
            std::process::exit(1);
        }
    }
}

fn unknown_argument(arg: &str) -> ! {
    eprintln!("Unknown argument: {arg}");
    print_usage();
    std::process::exit(1);
}

fn print_usage() {
    println!("Usage: delvers <server|client> [OPTIONS]");
    println!();
    println!("Server options:");
    println!("  --port <PORT>       Listen port (default: 8999)");
    println!("  --data <FILE>       Game data JSON (default: built-in)");
    println!("  --map <FILE>        World snapshot JSON (default: built-in arena)");
    println!();
    println!("Client options:");
    println!("  --addr <HOST:PORT>  Server address (default: 127.0.0.1:8999)");
}
