use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use tailproc_core::{LogLine, ProcessInfo, Signal};

/// One tool invocation, sent as a single JSON line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "tool", rename_all = "snake_case")]
pub enum Request {
	StartProcess {
		command: String,
		#[serde(default, skip_serializing_if = "Vec::is_empty")]
		args: Vec<String>,
		#[serde(default, skip_serializing_if = "Option::is_none")]
		cwd: Option<PathBuf>,
		#[serde(default, skip_serializing_if = "HashMap::is_empty")]
		env: HashMap<String, String>,
		#[serde(default, skip_serializing_if = "Option::is_none")]
		id: Option<String>,
	},
	TailLogs {
		id: String,
		#[serde(default, skip_serializing_if = "Option::is_none")]
		lines: Option<usize>,
	},
	ReadLogs { id: String },
	KillProcess {
		id: String,
		#[serde(default, skip_serializing_if = "Option::is_none")]
		signal: Option<Signal>,
	},
	RestartProcess { id: String },
	ListProcesses,
	RemoveProcess { id: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Response {
	Started { process: ProcessInfo },
	Logs { process: ProcessInfo, lines: Vec<LogLine> },
	Killed { process: ProcessInfo, killed: bool, signal: Signal },
	Restarted { process: ProcessInfo },
	Processes { processes: Vec<ProcessInfo> },
	Removed { removed: String },
	Error { message: String },
}

impl Response {
	pub fn is_error(&self) -> bool {
		matches!(self, Response::Error { .. })
	}
}
