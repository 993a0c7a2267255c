use serde::Deserialize;
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

pub const MAX_LOG_LINES: usize = 10_000;
pub const DEFAULT_TAIL_LINES: usize = 50;

/// Limits and timings shared by every managed process in a registry.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct SupervisorConfig {
	#[serde(default = "default_max_log_lines")]
	pub max_log_lines: usize,
	/// Upper bound on the wait for a restarted process to exit.
	#[serde(default = "default_restart_timeout_ms")]
	pub restart_timeout_ms: u64,
	/// Pause between confirmed termination and respawn.
	#[serde(default = "default_restart_grace_ms")]
	pub restart_grace_ms: u64,
	/// How long to keep reading pipes after the child has been reaped.
	#[serde(default = "default_drain_timeout_ms")]
	pub drain_timeout_ms: u64,
	#[serde(default = "default_tail_lines")]
	pub default_tail_lines: usize,
}

impl Default for SupervisorConfig {
	fn default() -> Self {
		Self {
			max_log_lines: default_max_log_lines(),
			restart_timeout_ms: default_restart_timeout_ms(),
			restart_grace_ms: default_restart_grace_ms(),
			drain_timeout_ms: default_drain_timeout_ms(),
			default_tail_lines: default_tail_lines(),
		}
	}
}

impl SupervisorConfig {
	pub fn restart_timeout(&self) -> Duration {
		Duration::from_millis(self.restart_timeout_ms)
	}

	pub fn restart_grace(&self) -> Duration {
		Duration::from_millis(self.restart_grace_ms)
	}

	pub fn drain_timeout(&self) -> Duration {
		Duration::from_millis(self.drain_timeout_ms)
	}
}

fn default_max_log_lines() -> usize { MAX_LOG_LINES }
fn default_restart_timeout_ms() -> u64 { 3000 }
fn default_restart_grace_ms() -> u64 { 100 }
fn default_drain_timeout_ms() -> u64 { 1000 }
fn default_tail_lines() -> usize { DEFAULT_TAIL_LINES }

/// Everything `start` accepts besides the command itself.
///
/// Defaults: no arguments, inherited working directory, empty environment
/// overlay, generated id.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct StartOptions {
	#[serde(default)]
	pub args: Vec<String>,
	pub cwd: Option<PathBuf>,
	#[serde(default)]
	pub env: HashMap<String, String>,
	pub id: Option<String>,
}

impl StartOptions {
	pub fn with_id(mut self, id: impl Into<String>) -> Self {
		self.id = Some(id.into());
		self
	}

	pub fn with_args<I, S>(mut self, args: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		self.args = args.into_iter().map(Into::into).collect();
		self
	}

	pub fn with_cwd(mut self, cwd: impl Into<PathBuf>) -> Self {
		self.cwd = Some(cwd.into());
		self
	}

	pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
		self.env.insert(key.into(), value.into());
		self
	}
}
