// Configuration module entry point
// Loads layered configuration and holds the shared runtime state

mod state;
mod types;

use std::net::SocketAddr;

// Re-export public types
pub use state::AppState;
pub use types::{Config, StorageConfig};

/// Config file used when none is given on the command line
pub const DEFAULT_CONFIG_PATH: &str = "config";

impl Config {
    /// Load configuration from the default path
    pub fn load() -> Result<Self, config::ConfigError> {
        Self::load_from(DEFAULT_CONFIG_PATH)
    }

    /// Load configuration from specified file path (without extension)
    ///
    /// Layers, lowest priority first: built-in defaults, the config file
    /// (optional), `MEDIA_*` environment variables (`MEDIA_SERVER__PORT=3001`).
    pub fn load_from(config_path: &str) -> Result<Self, config::ConfigError> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(config_path).required(false))
            .add_source(
                config::Environment::with_prefix("MEDIA")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 3001)?
            .set_default("storage.videos_dir", "videos")?
            .set_default("storage.downloads_dir", "downloads")?
            .set_default(
                "storage.video_extensions",
                vec!["mp4", "webm", "ogg", "mov", "avi", "mkv"],
            )?
            .set_default("storage.max_upload_size", 1_073_741_824_i64)? // 1GB
            .set_default("storage.stream_buffer_size", 65_536)?
            .set_default("logging.level", "info")?
            .set_default("logging.access_log", true)?
            .set_default("performance.keep_alive", true)?
            .set_default("performance.header_read_timeout", 30)?
            .set_default("http.server_name", "rust-mediaserver/0.1")?
            .set_default("http.enable_cors", true)?
            .build()?;

        settings.try_deserialize()
    }

    pub fn get_socket_addr(&self) -> Result<SocketAddr, String> {
        format!("{}:{}", self.server.host, self.server.port)
            .parse()
            .map_err(|e| format!("Invalid address: {e}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = Config::load_from("definitely-not-a-config-file").unwrap();
        assert_eq!(cfg.storage.videos_dir, "videos");
        assert_eq!(cfg.storage.downloads_dir, "downloads");
        assert_eq!(cfg.storage.max_upload_size, 1_073_741_824);
        assert_eq!(cfg.storage.stream_buffer_size, 65_536);
        assert!(cfg.storage.video_extensions.contains(&"mkv".to_string()));
        assert_eq!(cfg.logging.access_log_format, "combined");
        assert!(cfg.logging.access_log_file.is_none());
    }

    #[test]
    fn test_file_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("media.toml");
        std::fs::write(
            &path,
            "[server]\nport = 9090\n\n[storage]\nvideos_dir = \"/srv/videos\"\nvideo_extensions = [\"mp4\"]\n",
        )
        .unwrap();

        let cfg = Config::load_from(path.to_str().unwrap()).unwrap();
        assert_eq!(cfg.server.port, 9090);
        assert_eq!(cfg.storage.videos_dir, "/srv/videos");
        assert_eq!(cfg.storage.video_extensions, vec!["mp4".to_string()]);
        // Untouched keys keep their defaults
        assert_eq!(cfg.storage.downloads_dir, "downloads");
    }

    #[test]
    fn test_socket_addr() {
        let mut cfg = Config::load_from("definitely-not-a-config-file").unwrap();
        cfg.server.host = "127.0.0.1".to_string();
        cfg.server.port = 3001;
        assert_eq!(cfg.get_socket_addr().unwrap().port(), 3001);

        cfg.server.host = "not an ip".to_string();
        assert!(cfg.get_socket_addr().is_err());
    }
}
