// Configuration module entry point
// Loads layered configuration and builds the shared runtime state

mod state;
mod types;

use std::net::SocketAddr;

// Re-export public types
pub use state::AppState;
pub use types::{Config, HealthConfig, HttpConfig, ListingConfig, StorageConfig};

type Builder = config::ConfigBuilder<config::builder::DefaultState>;

impl Config {
    /// Load configuration from specified file path (without extension)
    /// Default config file is "config.toml" when no path specified
    pub fn load_from(config_path: &str) -> Result<Self, config::ConfigError> {
        let settings = with_defaults(config::Config::builder())?
            .add_source(config::File::with_name(config_path).required(false))
            .add_source(config::Environment::with_prefix("PGN").separator("__"))
            .build()?;

        settings.try_deserialize()
    }

    /// Built-in defaults only, no file or environment sources
    #[cfg(test)]
    pub fn defaults() -> Result<Self, config::ConfigError> {
        with_defaults(config::Config::builder())?
            .build()?
            .try_deserialize()
    }

    pub fn get_socket_addr(&self) -> Result<SocketAddr, String> {
        format!("{}:{}", self.server.host, self.server.port)
            .parse()
            .map_err(|e| format!("Invalid address: {e}"))
    }
}

fn with_defaults(builder: Builder) -> Result<Builder, config::ConfigError> {
    builder
        .set_default("server.host", "127.0.0.1")?
        .set_default("server.port", 8000)?
        .set_default("storage.dir", "pgn-files")?
        .set_default("storage.extension", "pgn")?
        .set_default("storage.create_dir", true)?
        .set_default("listing.default_limit", 3)?
        .set_default("listing.max_limit", 100)?
        .set_default("logging.level", "info")?
        .set_default("logging.access_log", true)?
        .set_default("logging.show_headers", false)?
        .set_default("performance.keep_alive_timeout", 75)?
        .set_default("performance.read_timeout", 30)?
        .set_default("performance.write_timeout", 30)?
        .set_default("http.server_name", "pgn-server/0.1")?
        .set_default("http.max_body_size", 10_485_760)? // 10MB
        .set_default("http.cors_allow_origin", "*")?
        .set_default("http.cors_allow_methods", "GET, POST, PUT, DELETE, OPTIONS")?
        .set_default("http.cors_allow_headers", "Content-Type")
}
