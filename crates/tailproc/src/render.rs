use chrono::SecondsFormat;
use owo_colors::OwoColorize;
use tailproc_core::{LogLine, ProcessInfo};

use crate::protocol::Response;

pub fn format_log_lines(lines: &[LogLine]) -> String {
	if lines.is_empty() {
		return "(no output)".to_string();
	}
	lines
		.iter()
		.map(|l| {
			format!(
				"[{}] [{}] {}",
				l.timestamp.to_rfc3339_opts(SecondsFormat::Millis, true),
				l.stream.as_str(),
				l.text
			)
		})
		.collect::<Vec<_>>()
		.join("\n")
}

fn status_word(alive: bool, color: bool) -> String {
	match (alive, color) {
		(true, true) => "RUNNING".green().to_string(),
		(false, true) => "STOPPED".red().to_string(),
		(true, false) => "RUNNING".to_string(),
		(false, false) => "STOPPED".to_string(),
	}
}

fn or_dash<T: ToString>(value: Option<T>) -> String {
	value.map(|v| v.to_string()).unwrap_or_else(|| "-".to_string())
}

pub fn format_process_row(p: &ProcessInfo, color: bool) -> String {
	format!(
		"{}  {}  pid={}  exit={}  cmd=\"{}\"  logs={}",
		p.id,
		status_word(p.alive, color),
		or_dash(p.pid),
		or_dash(p.exit_code),
		p.command,
		p.log_lines
	)
}

fn pretty(process: &ProcessInfo) -> String {
	serde_json::to_string_pretty(process).unwrap_or_default()
}

/// Human-readable text for a response, as shown by the CLI client.
pub fn render(response: &Response, color: bool) -> String {
	match response {
		Response::Started { process } => pretty(process),
		Response::Logs { process, lines } => [
			format!(
				"Process: {} ({})",
				process.id,
				if process.alive { "running" } else { "stopped" }
			),
			format!("--- {} lines ---", lines.len()),
			format_log_lines(lines),
		]
		.join("\n"),
		Response::Killed { process, killed: true, signal } => format!(
			"Sent {} to process \"{}\" (pid {})",
			signal,
			process.id,
			or_dash(process.pid)
		),
		Response::Killed { process, killed: false, .. } => format!(
			"Process \"{}\" was already stopped (exit code: {})",
			process.id,
			or_dash(process.exit_code)
		),
		Response::Restarted { process } => {
			format!("Restarted process \"{}\":\n{}", process.id, pretty(process))
		}
		Response::Processes { processes } if processes.is_empty() => {
			"No managed processes.".to_string()
		}
		Response::Processes { processes } => processes
			.iter()
			.map(|p| format_process_row(p, color))
			.collect::<Vec<_>>()
			.join("\n"),
		Response::Removed { removed } => {
			format!("Removed process \"{}\" from managed list.", removed)
		}
		Response::Error { message } => format!("Error: {}", message),
	}
}
