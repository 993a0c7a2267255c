use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{broadcast, RwLock};

use crate::config::{StartOptions, SupervisorConfig};
use crate::error::{Error, Result};
use crate::process::ManagedProcess;
use crate::signal::Signal;
use crate::types::{KillResult, LogsResult, ProcessEvent, ProcessInfo, Removed};

const EVENT_CAPACITY: usize = 256;

/// Owns every managed process, keyed by id.
///
/// Entries outlive their processes and are only dropped by [`remove`](Self::remove).
/// Structural changes (insert, replace, remove, id generation) are serialized
/// by one lock; per-process state has its own lock inside [`ManagedProcess`].
pub struct ProcessRegistry {
	state: RwLock<RegistryState>,
	config: SupervisorConfig,
	events: broadcast::Sender<ProcessEvent>,
}

#[derive(Default)]
struct RegistryState {
	processes: HashMap<String, Entry>,
	next_id: u64,
	next_seq: u64,
}

struct Entry {
	/// Insertion order, for stable listing.
	seq: u64,
	process: Arc<ManagedProcess>,
}

impl ProcessRegistry {
	pub fn new(config: SupervisorConfig) -> Arc<Self> {
		let (events, _) = broadcast::channel(EVENT_CAPACITY);
		Arc::new(Self {
			state: RwLock::new(RegistryState::default()),
			config,
			events,
		})
	}

	/// Lifecycle notifications for every process in this registry.
	pub fn subscribe(&self) -> broadcast::Receiver<ProcessEvent> {
		self.events.subscribe()
	}

	/// Starts `command` under `options.id`, or under a generated `proc-N` id.
	///
	/// Fails with [`Error::IdCollision`] if the id belongs to a live entry; an
	/// exited entry under the same id is replaced.
	pub async fn start(&self, command: &str, options: StartOptions) -> Result<ProcessInfo> {
		let mut state = self.state.write().await;

		let id = match options.id.filter(|id| !id.is_empty()) {
			Some(id) => id,
			None => {
				state.next_id += 1;
				format!("proc-{}", state.next_id)
			}
		};

		if let Some(existing) = state.processes.get(&id) {
			if existing.process.is_busy().await {
				return Err(Error::IdCollision { id });
			}
			tracing::debug!(id = %id, "replacing exited process");
		}

		let cwd = options.cwd.or_else(|| std::env::current_dir().ok());
		let process = ManagedProcess::new(
			id.clone(),
			command,
			options.args,
			cwd,
			options.env,
			self.config.clone(),
			self.events.clone(),
		);
		process.start().await;

		state.next_seq += 1;
		let seq = state.next_seq;
		state.processes.insert(
			id,
			Entry {
				seq,
				process: Arc::clone(&process),
			},
		);
		drop(state);

		Ok(process.info().await)
	}

	pub async fn get(&self, id: &str) -> Result<Arc<ManagedProcess>> {
		let state = self.state.read().await;
		state
			.processes
			.get(id)
			.map(|entry| Arc::clone(&entry.process))
			.ok_or_else(|| Error::UnknownId { id: id.to_string() })
	}

	/// Last `n` lines (default from config) without consuming them.
	pub async fn tail(&self, id: &str, n: Option<usize>) -> Result<LogsResult> {
		let process = self.get(id).await?;
		let (process, lines) = process.tail(n.unwrap_or(self.config.default_tail_lines)).await;
		Ok(LogsResult { process, lines })
	}

	/// Lines appended since the previous `read` of this id.
	pub async fn read(&self, id: &str) -> Result<LogsResult> {
		let process = self.get(id).await?;
		let (process, lines) = process.read().await;
		Ok(LogsResult { process, lines })
	}

	pub async fn kill(&self, id: &str, signal: Signal) -> Result<KillResult> {
		let process = self.get(id).await?;
		let killed = process.kill(signal).await;
		Ok(KillResult {
			process: process.info().await,
			killed,
		})
	}

	/// Runs the restart protocol on its own task and waits for it.
	///
	/// Dropping the returned future does not cancel the restart.
	pub async fn restart(&self, id: &str) -> Result<ProcessInfo> {
		let process = self.get(id).await?;
		let handle = tokio::spawn(async move { process.restart().await });
		handle.await.map_err(|e| {
			tracing::error!(id = %id, "restart task failed: {}", e);
			Error::RestartInterrupted { id: id.to_string() }
		})
	}

	/// Every entry, alive or not, in insertion order.
	pub async fn list(&self) -> Vec<ProcessInfo> {
		let processes = self.snapshot().await;
		let mut result = Vec::with_capacity(processes.len());
		for process in processes {
			result.push(process.info().await);
		}
		result
	}

	/// SIGKILLs the process if it is alive, then drops the entry.
	pub async fn remove(&self, id: &str) -> Result<Removed> {
		let mut state = self.state.write().await;
		let process = state
			.processes
			.get(id)
			.map(|entry| Arc::clone(&entry.process))
			.ok_or_else(|| Error::UnknownId { id: id.to_string() })?;

		if process.retire().await {
			tracing::info!(id = %id, "killed on remove");
		}
		state.processes.remove(id);
		Ok(Removed {
			removed: id.to_string(),
		})
	}

	/// SIGKILLs every live process. Entries are kept. Returns how many were killed.
	pub async fn shutdown(&self) -> usize {
		let mut killed = 0;
		for process in self.snapshot().await {
			if process.retire().await {
				killed += 1;
			}
		}
		if killed > 0 {
			tracing::info!(killed, "terminated supervised processes");
		}
		killed
	}

	async fn snapshot(&self) -> Vec<Arc<ManagedProcess>> {
		let state = self.state.read().await;
		let mut entries: Vec<&Entry> = state.processes.values().collect();
		entries.sort_by_key(|entry| entry.seq);
		entries.into_iter().map(|entry| Arc::clone(&entry.process)).collect()
	}
}
