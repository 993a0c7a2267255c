use thiserror::Error;

/// Errors returned synchronously by registry operations.
///
/// Failures of the supervised processes themselves are not errors here: they
/// are recorded in the process log and published as [`crate::ProcessEvent`]s.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
	#[error("process \"{id}\" is already running; kill it first or use a different id")]
	IdCollision { id: String },

	#[error("no process found with id \"{id}\"; use list_processes to see available processes")]
	UnknownId { id: String },

	#[error("unsupported signal \"{0}\" (expected SIGTERM, SIGKILL, SIGINT or SIGHUP)")]
	InvalidSignal(String),

	#[error("restart of \"{id}\" was interrupted before the new process started")]
	RestartInterrupted { id: String },
}

impl Error {
	/// Short stable label for logs.
	pub fn as_label(&self) -> &'static str {
		match self {
			Error::IdCollision { .. } => "id_collision",
			Error::UnknownId { .. } => "unknown_id",
			Error::InvalidSignal(_) => "invalid_signal",
			Error::RestartInterrupted { .. } => "restart_interrupted",
		}
	}
}

pub type Result<T> = std::result::Result<T, Error>;
