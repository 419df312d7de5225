//! Command line interface
//!
//! Flags override the environment as read by [`ServerConfig::from_env`].

use clap::{Parser, Subcommand};

use crate::config::ServerConfig;

/// Ride cancellation service
#[derive(Parser, Debug)]
#[command(name = "ride-api")]
#[command(version)]
#[command(about = "Ride cancellation HTTP API")]
pub struct Cli {
    /// Postgres URL (env: DATABASE_URL). In-memory store when omitted.
    #[arg(long, env = "DATABASE_URL")]
    pub database_url: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Apply the cancellation schema to the database
    Init,

    /// Start the API server (applies the schema first)
    Serve(ServeArgs),
}

/// `serve` overrides; unset flags keep the environment value
#[derive(clap::Args, Debug, Default)]
pub struct ServeArgs {
    /// Address to bind (env: RIDE_API_BIND_ADDR)
    #[arg(long)]
    pub bind_addr: Option<String>,
    /// Port to listen on (env: RIDE_API_PORT)
    #[arg(short, long)]
    pub port: Option<u16>,
    /// HS256 secret, at least 32 bytes (env: RIDE_JWT_SECRET)
    #[arg(long)]
    pub jwt_secret: Option<String>,
    /// Required token issuer (env: RIDE_JWT_ISSUER)
    #[arg(long)]
    pub jwt_issuer: Option<String>,
    /// Required token audience (env: RIDE_JWT_AUDIENCE)
    #[arg(long)]
    pub jwt_audience: Option<String>,
    /// Deadline for each datastore call (env: RIDE_REQUEST_TIMEOUT_SECS)
    #[arg(long)]
    pub request_timeout_secs: Option<u64>,
    /// Policy cache TTL, 0 disables caching (env: RIDE_POLICY_CACHE_TTL_SECS)
    #[arg(long)]
    pub policy_cache_ttl_secs: Option<u64>,
    /// Allow any origin (env: RIDE_ENABLE_CORS)
    #[arg(long)]
    pub enable_cors: bool,
}

impl Cli {
    /// Server configuration for `serve`; `None` for other commands
    pub fn server_config(&self) -> Option<ServerConfig> {
        self.server_config_with(ServerConfig::from_env())
    }

    /// Overlay the command line onto `base`
    pub fn server_config_with(&self, base: ServerConfig) -> Option<ServerConfig> {
        let Commands::Serve(args) = &self.command else {
            return None;
        };
        let database_url = self
            .database_url
            .clone()
            .filter(|u| !u.trim().is_empty())
            .or(base.database_url);

        Some(ServerConfig {
            bind_addr: args.bind_addr.clone().unwrap_or(base.bind_addr),
            port: args.port.unwrap_or(base.port),
            database_url,
            jwt_secret: args.jwt_secret.clone().unwrap_or(base.jwt_secret),
            jwt_issuer: args.jwt_issuer.clone().or(base.jwt_issuer),
            jwt_audience: args.jwt_audience.clone().or(base.jwt_audience),
            request_timeout_secs: args
                .request_timeout_secs
                .unwrap_or(base.request_timeout_secs),
            policy_cache_ttl_secs: args
                .policy_cache_ttl_secs
                .unwrap_or(base.policy_cache_ttl_secs),
            enable_cors: args.enable_cors || base.enable_cors,
        })
    }
}
