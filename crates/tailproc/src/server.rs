use std::io;
use std::sync::Arc;
use tailproc_core::ProcessRegistry;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::UnixListener;

use crate::dispatch::dispatch;
use crate::paths::Paths;
use crate::protocol::{Request, Response};

/// Serves one JSON request per line until the reader hits EOF.
///
/// Requests on one connection are handled in order; a slow `restart_process`
/// holds up only its own connection.
pub async fn serve_connection<R, W>(reader: R, mut writer: W, registry: Arc<ProcessRegistry>) -> io::Result<()>
where
	R: AsyncRead + Unpin,
	W: AsyncWrite + Unpin,
{
	let mut lines = BufReader::new(reader).lines();

	while let Some(line) = lines.next_line().await? {
		if line.trim().is_empty() {
			continue;
		}

		let response = match serde_json::from_str::<Request>(&line) {
			Ok(request) => {
				tracing::debug!(?request, "request");
				dispatch(&registry, request).await
			}
			Err(e) => {
				tracing::warn!("invalid request: {}", e);
				Response::Error {
					message: format!("invalid request: {}", e),
				}
			}
		};

		let mut data = serde_json::to_vec(&response)?;
		data.push(b'\n');
		writer.write_all(&data).await?;
		writer.flush().await?;
	}
	Ok(())
}

pub async fn serve_stdio(registry: Arc<ProcessRegistry>) -> io::Result<()> {
	serve_connection(tokio::io::stdin(), tokio::io::stdout(), registry).await
}

/// Creates the state dir, binds the socket and then writes the pid file,
/// replacing a stale socket file left by a dead server.
pub fn bind_socket(paths: &Paths) -> io::Result<UnixListener> {
	if crate::client::is_running(paths) {
		return Err(io::Error::new(
			io::ErrorKind::AddrInUse,
			format!("server already running on {}", paths.socket_path().display()),
		));
	}

	let socket_path = paths.socket_path();
	std::fs::create_dir_all(paths.state_dir())?;
	if let Some(parent) = socket_path.parent() {
		std::fs::create_dir_all(parent)?;
	}
	if socket_path.exists() {
		std::fs::remove_file(&socket_path)?;
	}

	let listener = UnixListener::bind(&socket_path)?;
	std::fs::write(paths.pid_path(), std::process::id().to_string())?;
	tracing::info!("listening on {}", socket_path.display());
	Ok(listener)
}

pub async fn serve_socket(listener: UnixListener, registry: Arc<ProcessRegistry>) {
	loop {
		let (stream, _) = match listener.accept().await {
			Ok(s) => s,
			Err(e) => {
				tracing::error!("accept error: {}", e);
				continue;
			}
		};

		let registry = Arc::clone(&registry);
		tokio::spawn(async move {
			let (reader, writer) = stream.into_split();
			if let Err(e) = serve_connection(reader, writer, registry).await {
				tracing::debug!("connection closed: {}", e);
			}
		});
	}
}

pub fn cleanup(paths: &Paths) {
	let _ = std::fs::remove_file(paths.socket_path());
	let _ = std::fs::remove_file(paths.pid_path());
}
