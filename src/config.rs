//! Startup configuration.
//!
//! Parsed once from the command line, with environment fallbacks, and passed
//! down by reference. Nothing reads the environment after startup.

use std::net::{IpAddr, Ipv4Addr};
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

pub const DEFAULT_PORT: u16 = 5050;
pub const DEFAULT_ROUTES: &str = "routes";
pub const DEFAULT_SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Parser)]
#[command(name = "canopy", version, about = "Serve a directory-driven HTTP and WebSocket API")]
pub struct Config {
    /// Address to listen on.
    #[arg(long, env = "HOST", default_value_t = IpAddr::V4(Ipv4Addr::UNSPECIFIED))]
    pub host: IpAddr,

    /// First port to try; taken ports are skipped upwards.
    #[arg(short, long, env = "PORT", default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Root of the route tree.
    #[arg(long, env = "ROUTES_DIR", default_value = DEFAULT_ROUTES)]
    pub routes: PathBuf,

    /// How long to wait for connections to drain on shutdown.
    #[arg(long, env = "SHUTDOWN_GRACE", default_value = "5s", value_parser = humantime::parse_duration)]
    pub shutdown_grace: Duration,

    /// Also report the public URL and whether it is reachable.
    #[arg(long)]
    pub public: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: DEFAULT_PORT,
            routes: PathBuf::from(DEFAULT_ROUTES),
            shutdown_grace: DEFAULT_SHUTDOWN_GRACE,
            public: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_flags() {
        let config = Config::try_parse_from([
            "canopy",
            "--host", "127.0.0.1",
            "--port", "8080",
            "--routes", "api",
            "--shutdown-grace", "250ms",
            "--public",
        ])
        .unwrap();

        assert_eq!(config.host, IpAddr::V4(Ipv4Addr::LOCALHOST));
        assert_eq!(config.port, 8080);
        assert_eq!(config.routes, PathBuf::from("api"));
        assert_eq!(config.shutdown_grace, Duration::from_millis(250));
        assert!(config.public);
    }

    #[test]
    fn rejects_bad_durations() {
        assert!(Config::try_parse_from(["canopy", "--shutdown-grace", "soon"]).is_err());
    }
}
