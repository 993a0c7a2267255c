use std::fmt;
use std::str::FromStr;

use nix::errno::Errno;
use nix::sys::signal::{kill, killpg};
use nix::unistd::Pid;
use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Termination signals accepted by `kill`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Signal {
	#[default]
	#[serde(rename = "SIGTERM")]
	Term,
	#[serde(rename = "SIGKILL")]
	Kill,
	#[serde(rename = "SIGINT")]
	Int,
	#[serde(rename = "SIGHUP")]
	Hup,
}

impl Signal {
	pub fn as_str(&self) -> &'static str {
		match self {
			Signal::Term => "SIGTERM",
			Signal::Kill => "SIGKILL",
			Signal::Int => "SIGINT",
			Signal::Hup => "SIGHUP",
		}
	}

	fn to_nix(self) -> nix::sys::signal::Signal {
		use nix::sys::signal::Signal as Sys;
		match self {
			Signal::Term => Sys::SIGTERM,
			Signal::Kill => Sys::SIGKILL,
			Signal::Int => Sys::SIGINT,
			Signal::Hup => Sys::SIGHUP,
		}
	}
}

impl fmt::Display for Signal {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl FromStr for Signal {
	type Err = Error;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let upper = s.trim().to_ascii_uppercase();
		let name = upper.strip_prefix("SIG").unwrap_or(&upper);
		match name {
			"TERM" => Ok(Signal::Term),
			"KILL" => Ok(Signal::Kill),
			"INT" => Ok(Signal::Int),
			"HUP" => Ok(Signal::Hup),
			_ => Err(Error::InvalidSignal(s.to_string())),
		}
	}
}

/// Name of a raw signal number as reported by a wait status, e.g. `SIGTERM`.
pub fn signal_name(raw: i32) -> String {
	nix::sys::signal::Signal::try_from(raw)
		.map(|s| s.as_str().to_string())
		.unwrap_or_else(|_| format!("signal {}", raw))
}

/// Delivers `signal` to the process group led by `pid`.
///
/// Children are spawned as group leaders, so this reaches the shell wrapper and
/// everything it started. Falls back to the single pid when the group is gone.
/// Pid 0 would address the caller's own group and is refused.
pub(crate) fn signal_group(pid: u32, signal: Signal) -> nix::Result<()> {
	if pid == 0 {
		return Err(Errno::ESRCH);
	}
	let target = Pid::from_raw(pid as i32);
	killpg(target, signal.to_nix()).or_else(|_| kill(target, signal.to_nix()))
}
