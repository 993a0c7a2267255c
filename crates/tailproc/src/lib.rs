//! # tailproc
//!
//! Tool-dispatch layer over [`tailproc_core`]: a line-delimited JSON protocol
//! served on stdio or a Unix socket, a blocking socket client, and the text
//! rendering used by the `tailproc` command line.

pub mod client;
pub mod config;
pub mod dispatch;
pub mod paths;
pub mod protocol;
pub mod render;
pub mod server;

pub use client::{Client, ClientError};
pub use dispatch::dispatch;
pub use paths::Paths;
pub use protocol::{Request, Response};
