//! # tailproc-core
//!
//! Supervises child processes for a calling layer: spawns them through `sh`,
//! captures stdout and stderr into a bounded line log with a read cursor,
//! tracks their lifecycle and restarts them on request.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use tailproc_core::{ProcessRegistry, Signal, StartOptions, SupervisorConfig};
//!
//! # #[tokio::main]
//! # async fn main() -> tailproc_core::Result<()> {
//! let registry = ProcessRegistry::new(SupervisorConfig::default());
//!
//! let info = registry
//! 	.start("npm run dev", StartOptions::default().with_id("web"))
//! 	.await?;
//! println!("started {} (pid {:?})", info.id, info.pid);
//!
//! let fresh = registry.read("web").await?;
//! for line in fresh.lines {
//! 	println!("[{}] {}", line.stream.as_str(), line.text);
//! }
//!
//! registry.kill("web", Signal::default()).await?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod logs;
mod output;
pub mod process;
pub mod registry;
pub mod signal;
pub mod types;

pub use config::{StartOptions, SupervisorConfig, DEFAULT_TAIL_LINES, MAX_LOG_LINES};
pub use error::{Error, Result};
pub use logs::{LogBuffer, LogLine, Stream};
pub use process::ManagedProcess;
pub use registry::ProcessRegistry;
pub use signal::Signal;
pub use types::*;
