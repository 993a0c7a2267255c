use tailproc_core::{Error, ProcessRegistry, StartOptions};

use crate::protocol::{Request, Response};

/// Runs one request against the registry. Every failure becomes
/// [`Response::Error`]; nothing here can take the host down.
pub async fn dispatch(registry: &ProcessRegistry, request: Request) -> Response {
	match request {
		Request::StartProcess { command, args, cwd, env, id } => {
			if command.trim().is_empty() {
				return Response::Error {
					message: "command must not be empty".to_string(),
				};
			}
			let options = StartOptions { args, cwd, env, id };
			respond(registry.start(&command, options).await, |process| {
				Response::Started { process }
			})
		}
		Request::TailLogs { id, lines } => respond(registry.tail(&id, lines).await, |result| {
			Response::Logs {
				process: result.process,
				lines: result.lines,
			}
		}),
		Request::ReadLogs { id } => respond(registry.read(&id).await, |result| Response::Logs {
			process: result.process,
			lines: result.lines,
		}),
		Request::KillProcess { id, signal } => {
			let signal = signal.unwrap_or_default();
			respond(registry.kill(&id, signal).await, |result| Response::Killed {
				process: result.process,
				killed: result.killed,
				signal,
			})
		}
		Request::RestartProcess { id } => respond(registry.restart(&id).await, |process| {
			Response::Restarted { process }
		}),
		Request::ListProcesses => Response::Processes {
			processes: registry.list().await,
		},
		Request::RemoveProcess { id } => respond(registry.remove(&id).await, |result| {
			Response::Removed {
				removed: result.removed,
			}
		}),
	}
}

fn respond<T>(result: Result<T, Error>, ok: impl FnOnce(T) -> Response) -> Response {
	match result {
		Ok(value) => ok(value),
		Err(e) => {
			tracing::debug!(error = e.as_label(), "request failed: {}", e);
			Response::Error {
				message: e.to_string(),
			}
		}
	}
}
