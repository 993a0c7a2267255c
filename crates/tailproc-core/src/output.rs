use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncReadExt};

use crate::logs::Stream;
use crate::process::ManagedProcess;

const CHUNK_SIZE: usize = 4096;

/// Copies one child pipe into the owning process log until EOF.
///
/// Each read becomes one `append` call. Stops early once the run it belongs to
/// has been superseded by a restart.
pub(crate) async fn pipe_output<R>(mut reader: R, process: Arc<ManagedProcess>, run: u64, stream: Stream)
where
	R: AsyncRead + Unpin,
{
	let mut buf = [0u8; CHUNK_SIZE];
	loop {
		match reader.read(&mut buf).await {
			Ok(0) => break,
			Ok(n) => {
				let text = String::from_utf8_lossy(&buf[..n]);
				if !process.record_output(run, stream, &text).await {
					tracing::debug!(id = %process.id(), run, "dropping output of superseded run");
					break;
				}
			}
			Err(e) => {
				tracing::debug!(id = %process.id(), stream = stream.as_str(), "pipe read failed: {}", e);
				break;
			}
		}
	}
}
