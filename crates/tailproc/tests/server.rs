use std::sync::Arc;

use tailproc::server::{bind_socket, cleanup, serve_connection, serve_socket};
use tailproc::{Client, Paths, Request, Response};
use tailproc_core::{ProcessRegistry, SupervisorConfig};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

#[tokio::test]
async fn line_protocol_over_duplex() {
	let reg = ProcessRegistry::new(SupervisorConfig::default());
	let (client, server) = tokio::io::duplex(64 * 1024);
	let (server_r, server_w) = tokio::io::split(server);
	let handle = tokio::spawn(serve_connection(server_r, server_w, Arc::clone(&reg)));

	let (client_r, mut client_w) = tokio::io::split(client);
	let mut responses = BufReader::new(client_r).lines();

	client_w.write_all(b"{\"tool\":\"list_processes\"}\n").await.unwrap();
	let line = responses.next_line().await.unwrap().unwrap();
	let resp: Response = serde_json::from_str(&line).unwrap();
	assert_eq!(resp, Response::Processes { processes: vec![] });

	// Blank lines are skipped, garbage gets an error but keeps the connection.
	client_w.write_all(b"\nnot json\n").await.unwrap();
	let line = responses.next_line().await.unwrap().unwrap();
	match serde_json::from_str::<Response>(&line).unwrap() {
		Response::Error { message } => assert!(message.starts_with("invalid request"), "got: {}", message),
		other => panic!("expected Error, got {:?}", other),
	}

	client_w
		.write_all(b"{\"tool\":\"start_process\",\"command\":\"sleep 100\",\"id\":\"web\"}\n")
		.await
		.unwrap();
	let line = responses.next_line().await.unwrap().unwrap();
	match serde_json::from_str::<Response>(&line).unwrap() {
		Response::Started { process } => {
			assert_eq!(process.id, "web");
			assert!(process.alive);
		}
		other => panic!("expected Started, got {:?}", other),
	}

	client_w.shutdown().await.unwrap();
	handle.await.unwrap().unwrap();
	reg.shutdown().await;
}

#[tokio::test]
async fn socket_server_client_roundtrip() {
	let dir = tempfile::tempdir().unwrap();
	let paths = Paths::new("tailproc-test").with_state_dir(dir.path());
	let reg = ProcessRegistry::new(SupervisorConfig::default());

	let listener = bind_socket(&paths).unwrap();
	assert!(paths.pid_path().exists());
	let server_handle = tokio::spawn(serve_socket(listener, Arc::clone(&reg)));

	let client_paths = paths.clone();
	let result = tokio::task::spawn_blocking(move || {
		let mut client = Client::connect(&client_paths).unwrap();

		let resp = client
			.send(&Request::StartProcess {
				command: "echo over-socket".into(),
				args: vec![],
				cwd: None,
				env: Default::default(),
				id: Some("sock".into()),
			})
			.unwrap();
		assert!(matches!(resp, Response::Started { .. }));

		let resp = client.send(&Request::ListProcesses).unwrap();
		match resp {
			Response::Processes { processes } => assert_eq!(processes[0].id, "sock"),
			other => panic!("expected Processes, got {:?}", other),
		}

		let resp = client.send(&Request::RemoveProcess { id: "missing".into() }).unwrap();
		assert!(resp.is_error());
	})
	.await;
	result.unwrap();

	// A second server must not steal a live socket.
	let err = bind_socket(&paths).unwrap_err();
	assert_eq!(err.kind(), std::io::ErrorKind::AddrInUse);

	server_handle.abort();
	cleanup(&paths);
	assert!(!paths.socket_path().exists());
	assert!(!paths.pid_path().exists());
}

#[test]
fn failed_bind_leaves_no_pid_file() {
	let dir = tempfile::tempdir().unwrap();
	// Longer than a Unix socket address can hold.
	let socket = dir.path().join(format!("{}.sock", "s".repeat(120)));
	let paths = Paths::new("tailproc-test")
		.with_state_dir(dir.path())
		.with_socket(Some(socket));

	let runtime = tokio::runtime::Runtime::new().unwrap();
	let _guard = runtime.enter();
	assert!(bind_socket(&paths).is_err());
	assert!(!paths.pid_path().exists());
}

#[test]
fn client_reports_missing_server() {
	let dir = tempfile::tempdir().unwrap();
	let paths = Paths::new("tailproc-test").with_state_dir(dir.path());
	match Client::connect(&paths) {
		Err(tailproc::ClientError::NotRunning(path)) => assert_eq!(path, paths.socket_path()),
		Err(other) => panic!("expected NotRunning, got {:?}", other),
		Ok(_) => panic!("expected error, got Ok"),
	}
	assert!(!tailproc::client::is_running(&paths));
	assert_eq!(tailproc::client::read_pid(&paths), None);
}
