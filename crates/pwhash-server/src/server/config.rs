use anyhow::{Context, bail};
use clap::Parser;
use core::time::Duration;
use pwhash::ServiceConfig;
use std::net::SocketAddr;

/// Runtime configuration for the `pwhash-server` binary.
///
/// All values are parsed from CLI arguments or environment variables (a `.env`
/// file is loaded first), with defaults matching the reference behavior of the
/// service.
#[derive(Parser, Debug, Clone)]
#[command(
    name = "pwhash-server",
    version,
    about = "An HTTP service that digests passwords in the background"
)]
pub struct CliArgs {
    /// Address to listen on.
    ///
    /// Environment variable: `SERVER_ADDR`
    #[arg(long, env = "SERVER_ADDR", default_value_t = String::from("0.0.0.0:8080"))]
    pub server_addr: String,

    /// Delay, in milliseconds, before a submitted password's digest becomes
    /// available.
    ///
    /// Environment variable: `HASH_DELAY_MS`
    #[arg(long, env = "HASH_DELAY_MS", default_value_t = 5_000)]
    pub hash_delay_ms: u64,

    /// Maximum accepted password length in bytes. Longer submissions are
    /// rejected with `412 Precondition Failed`.
    ///
    /// Environment variable: `MAX_PASSWORD_LEN`
    #[arg(long, env = "MAX_PASSWORD_LEN", default_value_t = 128)]
    pub max_password_len: usize,

    /// Seconds to wait, after the listener has stopped, for digests that are
    /// still being computed.
    ///
    /// Environment variable: `SHUTDOWN_TIMEOUT`
    #[arg(long, env = "SHUTDOWN_TIMEOUT", default_value_t = 10)]
    pub shutdown_timeout: u64,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub server_addr: SocketAddr,
    pub shutdown_timeout: Duration,
    pub service: ServiceConfig,
}

impl TryFrom<CliArgs> for ServerConfig {
    type Error = anyhow::Error;

    fn try_from(args: CliArgs) -> Result<Self, Self::Error> {
        if args.max_password_len == 0 {
            bail!("MAX_PASSWORD_LEN must be greater than 0");
        }

        let server_addr = args
            .server_addr
            .parse()
            .with_context(|| format!("invalid SERVER_ADDR `{}`", args.server_addr))?;

        Ok(Self {
            server_addr,
            shutdown_timeout: Duration::from_secs(args.shutdown_timeout),
            service: ServiceConfig {
                hash_delay: Duration::from_millis(args.hash_delay_ms),
                max_password_len: args.max_password_len,
                ..ServiceConfig::default()
            },
        })
    }
}
