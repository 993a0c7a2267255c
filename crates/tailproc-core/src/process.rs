use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::os::unix::process::ExitStatusExt;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::process::{Child, Command};
use tokio::sync::{broadcast, watch, Mutex};
use tokio::task::JoinHandle;

use crate::config::SupervisorConfig;
use crate::logs::{LogBuffer, LogLine, Stream};
use crate::output::pipe_output;
use crate::signal::{signal_group, signal_name, Signal};
use crate::types::{ProcessEvent, ProcessEventKind, ProcessInfo, ProcessState};

/// One supervised OS process together with its captured output.
///
/// All mutation (output chunks, exit records, kill, restart, read) goes
/// through the `inner` lock, so the log has a single writer at a time.
pub struct ManagedProcess {
	id: String,
	command: String,
	args: Vec<String>,
	cwd: Option<PathBuf>,
	env: HashMap<String, String>,
	config: SupervisorConfig,
	inner: Mutex<ProcessInner>,
	/// Bumped every time a run is recorded as finished.
	exits: watch::Sender<u64>,
	restart_lock: Mutex<()>,
	restarting: AtomicBool,
	events: broadcast::Sender<ProcessEvent>,
}

struct ProcessInner {
	state: ProcessState,
	/// Incremented on every spawn; output and exits of older runs are ignored.
	run: u64,
	killed: bool,
	retired: bool,
	exit_code: Option<i32>,
	signal: Option<String>,
	started_at: DateTime<Utc>,
	stopped_at: Option<DateTime<Utc>>,
	restarts: u32,
	logs: LogBuffer,
}

impl ProcessInner {
	fn alive(&self) -> bool {
		self.state.is_running() && !self.killed && self.exit_code.is_none()
	}
}

/// Clears the restarting flag even if the restart task is torn down midway.
struct RestartFlag<'a>(&'a AtomicBool);

impl<'a> RestartFlag<'a> {
	fn raise(flag: &'a AtomicBool) -> Self {
		flag.store(true, Ordering::SeqCst);
		Self(flag)
	}
}

impl Drop for RestartFlag<'_> {
	fn drop(&mut self) {
		self.0.store(false, Ordering::SeqCst);
	}
}

impl ManagedProcess {
	pub fn new(
		id: impl Into<String>,
		command: impl Into<String>,
		args: Vec<String>,
		cwd: Option<PathBuf>,
		env: HashMap<String, String>,
		config: SupervisorConfig,
		events: broadcast::Sender<ProcessEvent>,
	) -> Arc<Self> {
		let (exits, _) = watch::channel(0);
		Arc::new(Self {
			id: id.into(),
			command: command.into(),
			args,
			cwd,
			env,
			inner: Mutex::new(ProcessInner {
				state: ProcessState::NotStarted,
				run: 0,
				killed: false,
				retired: false,
				exit_code: None,
				signal: None,
				started_at: Utc::now(),
				stopped_at: None,
				restarts: 0,
				logs: LogBuffer::new(config.max_log_lines),
			}),
			config,
			exits,
			restart_lock: Mutex::new(()),
			restarting: AtomicBool::new(false),
			events,
		})
	}

	pub fn id(&self) -> &str {
		&self.id
	}

	pub fn command(&self) -> &str {
		&self.command
	}

	/// Spawns a fresh run. Spawn failures are logged in-band and published as
	/// [`ProcessEventKind::SpawnFailed`]; they never surface as an error here.
	pub async fn start(self: &Arc<Self>) {
		let mut inner = self.inner.lock().await;
		if inner.retired {
			tracing::debug!(id = %self.id, "not starting a removed process");
			return;
		}

		inner.run += 1;
		let run = inner.run;
		inner.killed = false;
		inner.exit_code = None;
		inner.signal = None;
		inner.stopped_at = None;
		inner.started_at = Utc::now();

		let (mut child, pid) = match self.spawn_child() {
			Ok(spawned) => spawned,
			Err(e) => {
				let message = format!("failed to spawn \"{}\": {}", self.command, e);
				tracing::warn!(id = %self.id, "{}", message);
				inner.logs.append(Stream::Error, &message);
				inner.stopped_at = Some(Utc::now());
				inner.state = ProcessState::Exited;
				drop(inner);

				self.exits.send_modify(|n| *n += 1);
				self.publish(ProcessEventKind::SpawnFailed { message });
				return;
			}
		};

		inner.state = ProcessState::Running { pid };
		drop(inner);
		tracing::debug!(id = %self.id, pid, run, command = %self.command, "spawned");
		self.publish(ProcessEventKind::Started { pid });

		let mut readers = Vec::with_capacity(2);
		if let Some(stdout) = child.stdout.take() {
			readers.push(tokio::spawn(pipe_output(stdout, Arc::clone(self), run, Stream::Stdout)));
		}
		if let Some(stderr) = child.stderr.take() {
			readers.push(tokio::spawn(pipe_output(stderr, Arc::clone(self), run, Stream::Stderr)));
		}
		tokio::spawn(Arc::clone(self).watch_exit(child, run, readers));
	}

	fn spawn_child(&self) -> std::io::Result<(Child, u32)> {
		let mut cmd = Command::new("sh");
		if self.args.is_empty() {
			cmd.arg("-c").arg(&self.command);
		} else {
			cmd.arg("-c")
				.arg(format!("{} \"$@\"", self.command))
				.arg("sh")
				.args(&self.args);
		}
		if let Some(cwd) = &self.cwd {
			cmd.current_dir(cwd);
		}
		cmd.envs(&self.env)
			.stdin(Stdio::null())
			.stdout(Stdio::piped())
			.stderr(Stdio::piped())
			.process_group(0);

		let mut child = cmd.spawn()?;
		match child.id() {
			Some(pid) => Ok((child, pid)),
			None => {
				let _ = child.start_kill();
				Err(std::io::Error::new(
					std::io::ErrorKind::Other,
					"spawned process reported no pid",
				))
			}
		}
	}

	/// Waits for the child, lets the pipe readers drain, then records the exit.
	async fn watch_exit(self: Arc<Self>, mut child: Child, run: u64, readers: Vec<JoinHandle<()>>) {
		let status = child.wait().await;

		let drain = self.config.drain_timeout();
		for mut reader in readers {
			if tokio::time::timeout(drain, &mut reader).await.is_err() {
				tracing::debug!(id = %self.id, run, "pipe still open after exit, abandoning reader");
				reader.abort();
			}
		}

		let mut inner = self.inner.lock().await;
		if inner.run != run {
			tracing::debug!(id = %self.id, run, "discarding exit of superseded run");
			return;
		}

		let (code, signal) = match status {
			Ok(status) => (status.code(), status.signal().map(signal_name)),
			Err(e) => {
				inner.logs.append(Stream::Error, &format!("failed to wait for process: {}", e));
				(None, None)
			}
		};
		inner.exit_code = code;
		inner.signal = signal.clone();
		inner.stopped_at = Some(Utc::now());
		inner.logs.append(Stream::System, &exit_summary(code, signal.as_deref()));
		inner.state = ProcessState::Exited;
		drop(inner);

		tracing::info!(id = %self.id, ?code, ?signal, "process exited");
		self.exits.send_modify(|n| *n += 1);
		self.publish(ProcessEventKind::Exited { code, signal });
	}

	pub(crate) async fn record_output(&self, run: u64, stream: Stream, text: &str) -> bool {
		let mut inner = self.inner.lock().await;
		if inner.run != run {
			return false;
		}
		inner.logs.append(stream, text);
		true
	}

	/// Sends `signal` if the process is alive. Returns whether it was delivered.
	///
	/// Does not wait for termination; the exit is recorded when the OS reports it.
	pub async fn kill(&self, signal: Signal) -> bool {
		let mut inner = self.inner.lock().await;
		self.deliver(&mut inner, signal)
	}

	fn deliver(&self, inner: &mut ProcessInner, signal: Signal) -> bool {
		if !inner.alive() {
			return false;
		}
		let Some(pid) = inner.state.pid() else {
			return false;
		};
		match signal_group(pid, signal) {
			Ok(()) => {
				tracing::debug!(id = %self.id, pid, %signal, "signal delivered");
				if signal == Signal::Kill {
					inner.killed = true;
				}
				true
			}
			Err(e) => {
				tracing::warn!(id = %self.id, pid, %signal, "failed to deliver signal: {}", e);
				false
			}
		}
	}

	/// Terminates the current run (if any), clears the log and starts again
	/// with the same command and options.
	///
	/// The wait for termination is bounded by `restart_timeout`; a process
	/// that outlives it is sent SIGKILL. Concurrent restarts of the same
	/// process are serialized, and each one spawns exactly once.
	pub async fn restart(self: &Arc<Self>) -> ProcessInfo {
		let _serial = self.restart_lock.lock().await;
		let _flag = RestartFlag::raise(&self.restarting);
		let mut exits = self.exits.subscribe();

		let running = {
			let mut inner = self.inner.lock().await;
			let pid = if inner.alive() { inner.state.pid() } else { None };
			if pid.is_some() {
				self.deliver(&mut inner, Signal::Term);
			}
			inner.logs.clear();
			pid
		};

		if let Some(pid) = running {
			self.await_termination(&mut exits, pid).await;
			tokio::time::sleep(self.config.restart_grace()).await;
		}

		self.start().await;

		let info = {
			let mut inner = self.inner.lock().await;
			if !inner.retired {
				inner.restarts += 1;
			}
			self.summarize(&inner)
		};
		tracing::info!(id = %self.id, pid = ?info.pid, restarts = info.restarts, "restarted");
		self.publish(ProcessEventKind::Restarted { pid: info.pid });
		info
	}

	/// Resolves on the exit notification or the timeout, whichever is first.
	/// The losing branch is dropped by `select!`, so only one of them acts.
	async fn await_termination(&self, exits: &mut watch::Receiver<u64>, pid: u32) {
		let timeout = self.config.restart_timeout();
		tokio::select! {
			biased;
			_ = exits.changed() => {
				tracing::debug!(id = %self.id, pid, "terminated for restart");
			}
			_ = tokio::time::sleep(timeout) => {
				tracing::warn!(id = %self.id, pid, ?timeout, "still running after SIGTERM, sending SIGKILL");
				if let Err(e) = signal_group(pid, Signal::Kill) {
					tracing::debug!(id = %self.id, pid, "SIGKILL failed: {}", e);
				}
			}
		}
	}

	/// Marks the process as removed and SIGKILLs it if alive. A removed process
	/// is never spawned again, even by a restart already in flight.
	pub async fn retire(&self) -> bool {
		let mut inner = self.inner.lock().await;
		inner.retired = true;
		self.deliver(&mut inner, Signal::Kill)
	}

	/// Running with no exit recorded and no SIGKILL delivered.
	///
	/// Only SIGKILL counts as a confirmed kill. A child may trap SIGTERM, SIGINT
	/// or SIGHUP, so after those it stays alive and a repeated `kill` delivers
	/// again and returns true each time.
	pub async fn alive(&self) -> bool {
		self.inner.lock().await.alive()
	}

	/// Alive, or in the middle of a restart.
	pub async fn is_busy(&self) -> bool {
		self.restarting.load(Ordering::SeqCst) || self.alive().await
	}

	pub async fn info(&self) -> ProcessInfo {
		let inner = self.inner.lock().await;
		self.summarize(&inner)
	}

	pub async fn tail(&self, n: usize) -> (ProcessInfo, Vec<LogLine>) {
		let inner = self.inner.lock().await;
		(self.summarize(&inner), inner.logs.tail(n))
	}

	pub async fn read(&self) -> (ProcessInfo, Vec<LogLine>) {
		let mut inner = self.inner.lock().await;
		let lines = inner.logs.read();
		(self.summarize(&inner), lines)
	}

	fn summarize(&self, inner: &ProcessInner) -> ProcessInfo {
		ProcessInfo {
			id: self.id.clone(),
			command: self.command.clone(),
			args: self.args.clone(),
			cwd: self.cwd.clone(),
			alive: inner.alive(),
			pid: inner.state.pid(),
			exit_code: inner.exit_code,
			signal: inner.signal.clone(),
			started_at: inner.started_at,
			stopped_at: inner.stopped_at,
			log_lines: inner.logs.len(),
			restarts: inner.restarts,
		}
	}

	fn publish(&self, kind: ProcessEventKind) {
		let _ = self.events.send(ProcessEvent {
			id: self.id.clone(),
			kind,
		});
	}
}

fn exit_summary(code: Option<i32>, signal: Option<&str>) -> String {
	match (code, signal) {
		(Some(code), _) => format!("process exited with code {}", code),
		(None, Some(signal)) => format!("process terminated by signal {}", signal),
		(None, None) => "process exited".to_string(),
	}
}
