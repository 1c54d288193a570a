//! Server configuration.

use std::time::Duration;

use clap::Parser;
use planeboard_room::RoomConfig;

/// Everything the server needs to start.
#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    /// Address the WebSocket listener binds to.
    pub bind_addr: String,

    /// How long a connection may stay silent (no frames, no pongs)
    /// before it is dropped. Pings go out at 90% of this.
    pub read_timeout: Duration,

    /// Upper bound on one deck lookup.
    pub deck_fetch_timeout: Duration,

    /// Settings for every room.
    pub room: RoomConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:8080".to_string(),
            read_timeout: Duration::from_secs(10),
            deck_fetch_timeout: Duration::from_secs(10),
            room: RoomConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Period between server pings.
    pub fn heartbeat_interval(&self) -> Duration {
        (self.read_timeout * 9 / 10).max(Duration::from_millis(1))
    }
}

/// Planeboard table server
///
/// Every flag can also be set through the environment variable shown in
/// `--help`.
#[derive(Parser, Debug, Clone)]
#[command(name = "planeboard", version, about)]
pub struct Cli {
    /// Port to listen on, on all interfaces
    #[arg(long, env = "PORT")]
    pub port: Option<u16>,

    /// Full bind address; takes precedence over --port
    #[arg(long, env = "PLANEBOARD_ADDR")]
    pub addr: Option<String>,

    /// Seconds a connection may stay silent before it is dropped
    #[arg(
        long,
        env = "PLANEBOARD_READ_TIMEOUT_SECS",
        default_value_t = 10,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub read_timeout_secs: u64,

    /// Seconds allowed for one deck lookup
    #[arg(
        long,
        env = "PLANEBOARD_DECK_TIMEOUT_SECS",
        default_value_t = 10,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub deck_timeout_secs: u64,

    /// Events buffered per connection before it counts as unresponsive
    #[arg(
        long,
        env = "PLANEBOARD_OUTBOUND_QUEUE",
        default_value_t = 256,
        value_parser = clap::value_parser!(u32).range(1..)
    )]
    pub outbound_queue: u32,
}

impl From<Cli> for ServerConfig {
    fn from(cli: Cli) -> Self {
        let mut config = ServerConfig::default();
        if let Some(port) = cli.port {
            config.bind_addr = format!("0.0.0.0:{port}");
        }
        if let Some(addr) = cli.addr {
            config.bind_addr = addr;
        }
        config.read_timeout = Duration::from_secs(cli.read_timeout_secs);
        config.deck_fetch_timeout = Duration::from_secs(cli.deck_timeout_secs);
        config.room.outbound_queue_size = cli.outbound_queue as usize;
        config
    }
}
