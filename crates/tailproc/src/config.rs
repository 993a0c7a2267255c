use serde::Deserialize;
use std::path::{Path, PathBuf};
use tailproc_core::SupervisorConfig;

// ── ~/.config/tailproc/config.toml ──────────────────────────────────────────

#[derive(Debug, Clone, Deserialize, Default, PartialEq)]
pub struct Config {
	#[serde(default)]
	pub supervisor: SupervisorConfig,
	#[serde(default)]
	pub logging: LoggingConfig,
	#[serde(default)]
	pub server: ServerConfig,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct LoggingConfig {
	/// `tracing_subscriber::EnvFilter` directive; `TAILPROC_LOG` overrides it.
	#[serde(default = "default_filter")]
	pub filter: String,
}

impl Default for LoggingConfig {
	fn default() -> Self {
		Self { filter: default_filter() }
	}
}

fn default_filter() -> String { "info".to_string() }

#[derive(Debug, Clone, Deserialize, Default, PartialEq)]
pub struct ServerConfig {
	pub socket: Option<PathBuf>,
}

pub fn parse_config(content: &str) -> Result<Config, toml::de::Error> {
	toml::from_str(content)
}

/// Reads the config file, falling back to defaults when it is missing or broken.
pub fn load_config(path: &Path) -> Config {
	if path.exists() {
		match std::fs::read_to_string(path) {
			Ok(content) => match parse_config(&content) {
				Ok(config) => return config,
				Err(e) => eprintln!("warning: failed to parse {}: {}", path.display(), e),
			},
			Err(e) => eprintln!("warning: failed to read {}: {}", path.display(), e),
		}
	}
	Config::default()
}
