use std::time::{Duration, Instant};

use tailproc::{dispatch, Request, Response};
use tailproc_core::{ProcessRegistry, Signal, Stream, SupervisorConfig};

fn start(command: &str, id: Option<&str>) -> Request {
	Request::StartProcess {
		command: command.to_string(),
		args: vec![],
		cwd: None,
		env: Default::default(),
		id: id.map(String::from),
	}
}

async fn wait_stopped(registry: &ProcessRegistry, id: &str) {
	let deadline = Instant::now() + Duration::from_secs(5);
	while registry.get(id).await.unwrap().info().await.stopped_at.is_none() {
		assert!(Instant::now() < deadline, "{} never stopped", id);
		tokio::time::sleep(Duration::from_millis(25)).await;
	}
}

#[tokio::test]
async fn start_tail_read_roundtrip() {
	let reg = ProcessRegistry::new(SupervisorConfig::default());

	let resp = dispatch(&reg, start("echo from-dispatch", None)).await;
	let id = match resp {
		Response::Started { process } => process.id,
		other => panic!("expected Started, got {:?}", other),
	};
	assert_eq!(id, "proc-1");
	wait_stopped(&reg, &id).await;

	match dispatch(&reg, Request::TailLogs { id: id.clone(), lines: Some(1) }).await {
		Response::Logs { process, lines } => {
			assert!(!process.alive);
			assert_eq!(lines.len(), 1);
			assert_eq!(lines[0].stream, Stream::System);
		}
		other => panic!("expected Logs, got {:?}", other),
	}

	match dispatch(&reg, Request::ReadLogs { id: id.clone() }).await {
		Response::Logs { lines, .. } => {
			assert_eq!(lines[0].text, "from-dispatch");
			assert_eq!(lines.len(), 2);
		}
		other => panic!("expected Logs, got {:?}", other),
	}
	match dispatch(&reg, Request::ReadLogs { id }).await {
		Response::Logs { lines, .. } => assert!(lines.is_empty()),
		other => panic!("expected Logs, got {:?}", other),
	}
}

#[tokio::test]
async fn kill_defaults_to_sigterm() {
	let reg = ProcessRegistry::new(SupervisorConfig::default());
	dispatch(&reg, start("sleep 100", Some("s"))).await;

	match dispatch(&reg, Request::KillProcess { id: "s".into(), signal: None }).await {
		Response::Killed { killed, signal, .. } => {
			assert!(killed);
			assert_eq!(signal, Signal::Term);
		}
		other => panic!("expected Killed, got {:?}", other),
	}
	wait_stopped(&reg, "s").await;

	match dispatch(&reg, Request::KillProcess { id: "s".into(), signal: Some(Signal::Kill) }).await {
		Response::Killed { killed, .. } => assert!(!killed),
		other => panic!("expected Killed, got {:?}", other),
	}
}

#[tokio::test]
async fn errors_become_error_responses() {
	let reg = ProcessRegistry::new(SupervisorConfig::default());

	let resp = dispatch(&reg, Request::RestartProcess { id: "ghost".into() }).await;
	match resp {
		Response::Error { message } => assert!(message.contains("no process found with id \"ghost\"")),
		other => panic!("expected Error, got {:?}", other),
	}

	let resp = dispatch(&reg, start("   ", None)).await;
	assert_eq!(
		resp,
		Response::Error { message: "command must not be empty".into() }
	);

	dispatch(&reg, start("sleep 100", Some("taken"))).await;
	match dispatch(&reg, start("sleep 100", Some("taken"))).await {
		Response::Error { message } => assert!(message.contains("already running")),
		other => panic!("expected Error, got {:?}", other),
	}

	reg.shutdown().await;
}

#[tokio::test]
async fn list_restart_and_remove() {
	let reg = ProcessRegistry::new(SupervisorConfig::default());
	dispatch(&reg, start("sleep 100", Some("a"))).await;
	dispatch(&reg, start("true", Some("b"))).await;

	match dispatch(&reg, Request::ListProcesses).await {
		Response::Processes { processes } => {
			let ids: Vec<_> = processes.iter().map(|p| p.id.as_str()).collect();
			assert_eq!(ids, vec!["a", "b"]);
		}
		other => panic!("expected Processes, got {:?}", other),
	}

	match dispatch(&reg, Request::RestartProcess { id: "a".into() }).await {
		Response::Restarted { process } => {
			assert!(process.alive);
			assert_eq!(process.restarts, 1);
		}
		other => panic!("expected Restarted, got {:?}", other),
	}

	assert_eq!(
		dispatch(&reg, Request::RemoveProcess { id: "a".into() }).await,
		Response::Removed { removed: "a".into() }
	);
	match dispatch(&reg, Request::ListProcesses).await {
		Response::Processes { processes } => assert_eq!(processes.len(), 1),
		other => panic!("expected Processes, got {:?}", other),
	}
}
