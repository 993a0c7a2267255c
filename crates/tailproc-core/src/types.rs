use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::logs::LogLine;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ProcessState {
	NotStarted,
	Running { pid: u32 },
	Exited,
}

impl ProcessState {
	pub fn is_running(&self) -> bool {
		matches!(self, ProcessState::Running { .. })
	}

	pub fn pid(&self) -> Option<u32> {
		match self {
			ProcessState::Running { pid } => Some(*pid),
			_ => None,
		}
	}
}

/// Point-in-time summary of a managed process. Never carries log contents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessInfo {
	pub id: String,
	pub command: String,
	pub args: Vec<String>,
	pub cwd: Option<PathBuf>,
	pub alive: bool,
	pub pid: Option<u32>,
	pub exit_code: Option<i32>,
	pub signal: Option<String>,
	pub started_at: DateTime<Utc>,
	pub stopped_at: Option<DateTime<Utc>>,
	pub log_lines: usize,
	pub restarts: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogsResult {
	pub process: ProcessInfo,
	pub lines: Vec<LogLine>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KillResult {
	pub process: ProcessInfo,
	pub killed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Removed {
	pub removed: String,
}

/// Asynchronous lifecycle notification published by the registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessEvent {
	pub id: String,
	pub kind: ProcessEventKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ProcessEventKind {
	Started { pid: u32 },
	SpawnFailed { message: String },
	Exited { code: Option<i32>, signal: Option<String> },
	Restarted { pid: Option<u32> },
}
