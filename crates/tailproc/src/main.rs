use clap::{Parser, Subcommand};
use std::io::{self, IsTerminal};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tailproc::config::{self, Config};
use tailproc::paths::{Paths, APP_NAME};
use tailproc::{client, render, server, Client, Request};
use tailproc_core::{ProcessEventKind, ProcessRegistry, Signal};
use tokio::sync::broadcast::error::RecvError;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "tailproc", version, about = "Run commands in the background and tail their output")]
struct Cli {
	/// Socket path (overrides the config file and the state dir default)
	#[arg(long, global = true)]
	socket: Option<PathBuf>,
	/// Print raw JSON responses
	#[arg(long, global = true)]
	json: bool,
	#[command(subcommand)]
	command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
	/// Serve the tool protocol on stdio, or on a Unix socket with --socket-server
	Serve {
		#[arg(long = "socket-server")]
		socket_server: bool,
	},
	/// Show whether a socket server is running
	Status,
	/// Start a command in the background
	Start {
		command: String,
		#[arg(long)]
		id: Option<String>,
		/// Working directory (defaults to the current directory)
		#[arg(long)]
		cwd: Option<PathBuf>,
		/// Extra environment variable, KEY=VALUE (repeatable)
		#[arg(long = "env", value_parser = parse_env)]
		env: Vec<(String, String)>,
		/// Arguments passed to the command unsplit
		#[arg(last = true)]
		args: Vec<String>,
	},
	/// Show the last lines of a process log
	Tail {
		id: String,
		#[arg(short = 'n', long)]
		lines: Option<usize>,
	},
	/// Show log lines not yet read
	Read { id: String },
	/// Send a signal (default SIGTERM)
	Kill {
		id: String,
		#[arg(short, long)]
		signal: Option<Signal>,
	},
	/// Restart with the original command; clears the log
	Restart { id: String },
	/// List managed processes
	List,
	/// Forget a process, killing it first if it is still running
	Remove { id: String },
}

fn parse_env(s: &str) -> Result<(String, String), String> {
	match s.split_once('=') {
		Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
		_ => Err(format!("expected KEY=VALUE, got \"{}\"", s)),
	}
}

fn main() {
	let cli = Cli::parse();
	let base = Paths::new(APP_NAME);
	let config = config::load_config(&base.config_path());
	let paths = base.with_socket(cli.socket.clone().or_else(|| config.server.socket.clone()));

	match cli.command {
		Command::Serve { socket_server } => {
			init_tracing(&config.logging.filter);
			let runtime = match tokio::runtime::Runtime::new() {
				Ok(rt) => rt,
				Err(e) => {
					eprintln!("error: failed to start runtime: {}", e);
					std::process::exit(1);
				}
			};
			let result = runtime.block_on(serve(config, paths, socket_server));
			// A pending stdin read sits on a blocking thread that cannot be cancelled.
			runtime.shutdown_timeout(Duration::from_millis(500));
			if let Err(e) = result {
				eprintln!("error: {}", e);
				std::process::exit(1);
			}
		}
		Command::Status => {
			if client::is_running(&paths) {
				match client::read_pid(&paths) {
					Some(pid) => eprintln!("server running (pid {})", pid),
					None => eprintln!("server running"),
				}
			} else {
				eprintln!("server not running");
			}
		}
		command => {
			let request = match to_request(command) {
				Ok(request) => request,
				Err(e) => {
					eprintln!("error: {}", e);
					std::process::exit(1);
				}
			};
			send_and_print(&paths, &request, cli.json);
		}
	}
}

fn to_request(command: Command) -> io::Result<Request> {
	let request = match command {
		Command::Start { command, id, cwd, env, args } => {
			// The server runs elsewhere; resolve relative to where the user is.
			let here = std::env::current_dir()?;
			let cwd = Some(cwd.map(|dir| here.join(dir)).unwrap_or(here));
			Request::StartProcess {
				command,
				args,
				cwd,
				env: env.into_iter().collect(),
				id,
			}
		}
		Command::Tail { id, lines } => Request::TailLogs { id, lines },
		Command::Read { id } => Request::ReadLogs { id },
		Command::Kill { id, signal } => Request::KillProcess { id, signal },
		Command::Restart { id } => Request::RestartProcess { id },
		Command::List => Request::ListProcesses,
		Command::Remove { id } => Request::RemoveProcess { id },
		Command::Serve { .. } | Command::Status => {
			return Err(io::Error::new(io::ErrorKind::InvalidInput, "not a client command"));
		}
	};
	Ok(request)
}

fn send_and_print(paths: &Paths, request: &Request, json: bool) {
	let response = Client::connect(paths).and_then(|mut c| c.send(request));
	let response = match response {
		Ok(r) => r,
		Err(e) => {
			eprintln!("error: {}", e);
			eprintln!("hint: start a server with `tailproc serve --socket-server`");
			std::process::exit(1);
		}
	};

	if json {
		println!("{}", serde_json::to_string_pretty(&response).unwrap_or_default());
	} else {
		println!("{}", render::render(&response, io::stdout().is_terminal()));
	}
	if response.is_error() {
		std::process::exit(1);
	}
}

fn init_tracing(filter: &str) {
	let filter = EnvFilter::try_from_env("TAILPROC_LOG").unwrap_or_else(|_| EnvFilter::new(filter));
	tracing_subscriber::fmt()
		.with_env_filter(filter)
		.with_writer(io::stderr)
		.init();
}

async fn serve(config: Config, paths: Paths, socket_server: bool) -> io::Result<()> {
	let registry = ProcessRegistry::new(config.supervisor.clone());
	log_events(&registry);

	let result = if socket_server {
		let listener = server::bind_socket(&paths)?;
		tracing::info!("server started (pid {})", std::process::id());
		tokio::select! {
			_ = server::serve_socket(listener, Arc::clone(&registry)) => {},
			_ = tokio::signal::ctrl_c() => {
				tracing::info!("shutting down");
			}
		}
		server::cleanup(&paths);
		Ok(())
	} else {
		tokio::select! {
			r = server::serve_stdio(Arc::clone(&registry)) => r,
			_ = tokio::signal::ctrl_c() => {
				tracing::info!("shutting down");
				Ok(())
			}
		}
	};

	registry.shutdown().await;
	result
}

fn log_events(registry: &ProcessRegistry) {
	let mut events = registry.subscribe();
	tokio::spawn(async move {
		loop {
			match events.recv().await {
				Ok(event) => match event.kind {
					ProcessEventKind::Started { pid } => {
						tracing::info!(id = %event.id, pid, "started")
					}
					ProcessEventKind::SpawnFailed { message } => {
						tracing::warn!(id = %event.id, "{}", message)
					}
					ProcessEventKind::Exited { code, signal } => {
						tracing::info!(id = %event.id, ?code, ?signal, "exited")
					}
					ProcessEventKind::Restarted { pid } => {
						tracing::info!(id = %event.id, ?pid, "restarted")
					}
				},
				Err(RecvError::Lagged(n)) => tracing::warn!("event log lagged, {} events skipped", n),
				Err(RecvError::Closed) => break,
			}
		}
	});
}

