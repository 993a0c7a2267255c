use std::path::PathBuf;

pub const APP_NAME: &str = "tailproc";

/// XDG-style locations for the config file, socket and pid file.
#[derive(Debug, Clone)]
pub struct Paths {
	pub app_name: String,
	state_override: Option<PathBuf>,
	socket_override: Option<PathBuf>,
}

impl Paths {
	pub fn new(app_name: impl Into<String>) -> Self {
		Self {
			app_name: app_name.into(),
			state_override: None,
			socket_override: None,
		}
	}

	pub fn with_state_dir(mut self, dir: impl Into<PathBuf>) -> Self {
		self.state_override = Some(dir.into());
		self
	}

	pub fn with_socket(mut self, socket: Option<PathBuf>) -> Self {
		self.socket_override = socket;
		self
	}

	pub fn state_dir(&self) -> PathBuf {
		if let Some(dir) = &self.state_override {
			dir.clone()
		} else if let Ok(dir) = std::env::var("XDG_STATE_HOME") {
			PathBuf::from(dir).join(&self.app_name)
		} else if let Some(home) = home_dir() {
			home.join(".local").join("state").join(&self.app_name)
		} else {
			PathBuf::from("/tmp").join(&self.app_name)
		}
	}

	pub fn config_dir(&self) -> PathBuf {
		if let Ok(dir) = std::env::var("XDG_CONFIG_HOME") {
			PathBuf::from(dir).join(&self.app_name)
		} else if let Some(home) = home_dir() {
			home.join(".config").join(&self.app_name)
		} else {
			PathBuf::from("/tmp").join(&self.app_name).join("config")
		}
	}

	pub fn config_path(&self) -> PathBuf {
		self.config_dir().join("config.toml")
	}

	pub fn socket_path(&self) -> PathBuf {
		self.socket_override
			.clone()
			.unwrap_or_else(|| self.state_dir().join("daemon.sock"))
	}

	pub fn pid_path(&self) -> PathBuf {
		self.state_dir().join("daemon.pid")
	}
}

fn home_dir() -> Option<PathBuf> {
	std::env::var("HOME").ok().map(PathBuf::from)
}
