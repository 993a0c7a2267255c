use std::io::{self, BufRead, BufReader, Write};
use std::os::unix::net::UnixStream;
use std::path::PathBuf;
use thiserror::Error;

use crate::paths::Paths;
use crate::protocol::{Request, Response};

#[derive(Debug, Error)]
pub enum ClientError {
	#[error("server not running (no socket at {})", .0.display())]
	NotRunning(PathBuf),
	#[error("io error: {0}")]
	Io(#[from] io::Error),
	#[error("serialize error: {0}")]
	Serialize(String),
	#[error("deserialize error: {0}")]
	Deserialize(String),
	#[error("server closed the connection")]
	Closed,
}

/// Blocking client for a server started with `tailproc serve --socket-server`.
pub struct Client {
	stream: UnixStream,
}

impl Client {
	pub fn connect(paths: &Paths) -> Result<Self, ClientError> {
		let socket_path = paths.socket_path();
		let stream =
			UnixStream::connect(&socket_path).map_err(|_| ClientError::NotRunning(socket_path))?;
		Ok(Self { stream })
	}

	pub fn send(&mut self, request: &Request) -> Result<Response, ClientError> {
		let mut data =
			serde_json::to_vec(request).map_err(|e| ClientError::Serialize(e.to_string()))?;
		data.push(b'\n');
		self.stream.write_all(&data)?;

		let mut reader = BufReader::new(&self.stream);
		let mut line = String::new();
		if reader.read_line(&mut line)? == 0 {
			return Err(ClientError::Closed);
		}

		serde_json::from_str(&line).map_err(|e| ClientError::Deserialize(e.to_string()))
	}
}

pub fn is_running(paths: &Paths) -> bool {
	UnixStream::connect(paths.socket_path()).is_ok()
}

pub fn read_pid(paths: &Paths) -> Option<u32> {
	std::fs::read_to_string(paths.pid_path())
		.ok()
		.and_then(|s| s.trim().parse().ok())
}
