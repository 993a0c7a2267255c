use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

use crate::config::MAX_LOG_LINES;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stream {
	Stdout,
	Stderr,
	/// Lifecycle notes written by the supervisor itself.
	System,
	/// Spawn and wait failures.
	Error,
}

impl Stream {
	pub fn as_str(&self) -> &'static str {
		match self {
			Stream::Stdout => "stdout",
			Stream::Stderr => "stderr",
			Stream::System => "system",
			Stream::Error => "error",
		}
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogLine {
	pub timestamp: DateTime<Utc>,
	pub stream: Stream,
	pub text: String,
}

/// Bounded, append-only line log with a single consumption cursor.
///
/// Invariant: `cursor <= len() <= capacity` after every call. Eviction
/// from the front pulls the cursor back by the number of dropped lines, so
/// lines already consumed stay consumed.
#[derive(Debug, Clone)]
pub struct LogBuffer {
	lines: VecDeque<LogLine>,
	cursor: usize,
	capacity: usize,
}

impl Default for LogBuffer {
	fn default() -> Self {
		Self::new(MAX_LOG_LINES)
	}
}

impl LogBuffer {
	pub fn new(capacity: usize) -> Self {
		Self {
			lines: VecDeque::new(),
			cursor: 0,
			capacity,
		}
	}

	/// Splits `text` into lines, drops empty ones, and appends the rest with
	/// one shared timestamp. Returns how many lines were appended.
	///
	/// No partial-line buffering: a line split across two chunks is stored
	/// as two lines.
	pub fn append(&mut self, stream: Stream, text: &str) -> usize {
		let timestamp = Utc::now();
		let mut appended = 0;
		for line in text.lines().filter(|l| !l.is_empty()) {
			self.lines.push_back(LogLine {
				timestamp,
				stream,
				text: line.to_string(),
			});
			appended += 1;
		}

		if self.lines.len() > self.capacity {
			let excess = self.lines.len() - self.capacity;
			self.lines.drain(..excess);
			self.cursor = self.cursor.saturating_sub(excess);
		}
		appended
	}

	/// Snapshot of the last `n` lines. Leaves the cursor alone.
	pub fn tail(&self, n: usize) -> Vec<LogLine> {
		let skip = self.lines.len().saturating_sub(n);
		self.lines.iter().skip(skip).cloned().collect()
	}

	/// Everything past the cursor; moves the cursor to the end.
	pub fn read(&mut self) -> Vec<LogLine> {
		let unread = self.lines.iter().skip(self.cursor).cloned().collect();
		self.cursor = self.lines.len();
		unread
	}

	pub fn clear(&mut self) {
		self.lines.clear();
		self.cursor = 0;
	}

	pub fn len(&self) -> usize {
		self.lines.len()
	}

	pub fn is_empty(&self) -> bool {
		self.lines.is_empty()
	}

	pub fn cursor(&self) -> usize {
		self.cursor
	}

	pub fn capacity(&self) -> usize {
		self.capacity
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use proptest::prelude::*;

	fn texts(lines: &[LogLine]) -> Vec<&str> {
		lines.iter().map(|l| l.text.as_str()).collect()
	}

	#[test]
	fn append_splits_and_drops_empty_fragments() {
		let mut buf = LogBuffer::default();
		let n = buf.append(Stream::Stdout, "one\n\ntwo\r\nthree\n");
		assert_eq!(n, 3);
		assert_eq!(texts(&buf.tail(10)), vec!["one", "two", "three"]);
		assert!(buf.tail(10).iter().all(|l| l.stream == Stream::Stdout));
	}

	#[test]
	fn append_of_only_newlines_adds_nothing() {
		let mut buf = LogBuffer::default();
		assert_eq!(buf.append(Stream::Stderr, "\n\n\n"), 0);
		assert!(buf.is_empty());
	}

	#[test]
	fn batch_shares_one_timestamp() {
		let mut buf = LogBuffer::default();
		buf.append(Stream::Stdout, "a\nb\nc");
		let lines = buf.tail(3);
		assert!(lines.iter().all(|l| l.timestamp == lines[0].timestamp));
	}

	#[test]
	fn read_consumes_exactly_once() {
		let mut buf = LogBuffer::default();
		buf.append(Stream::Stdout, "a\nb\nc\n");
		assert_eq!(texts(&buf.read()), vec!["a", "b", "c"]);
		assert!(buf.read().is_empty());
		assert_eq!(texts(&buf.tail(2)), vec!["b", "c"]);

		buf.append(Stream::Stderr, "d");
		assert_eq!(texts(&buf.read()), vec!["d"]);
	}

	#[test]
	fn tail_larger_than_len_returns_everything() {
		let mut buf = LogBuffer::default();
		buf.append(Stream::Stdout, "x\ny");
		assert_eq!(buf.tail(500).len(), 2);
		assert_eq!(buf.tail(0).len(), 0);
		assert_eq!(buf.cursor(), 0);
	}

	#[test]
	fn eviction_keeps_newest_and_pulls_cursor_back() {
		let mut buf = LogBuffer::new(5);
		buf.append(Stream::Stdout, "1\n2\n3\n4");
		buf.read();
		assert_eq!(buf.cursor(), 4);

		buf.append(Stream::Stdout, "5\n6\n7");
		assert_eq!(buf.len(), 5);
		assert_eq!(buf.cursor(), 2);
		assert_eq!(texts(&buf.read()), vec!["5", "6", "7"]);
	}

	#[test]
	fn eviction_clamps_cursor_at_zero() {
		let mut buf = LogBuffer::new(3);
		buf.append(Stream::Stdout, "a\nb");
		buf.read();
		buf.append(Stream::Stdout, "c\nd\ne\nf\ng");
		assert_eq!(buf.cursor(), 0);
		assert_eq!(texts(&buf.read()), vec!["e", "f", "g"]);
	}

	#[test]
	fn ten_thousand_fifty_lines_keep_the_newest_ten_thousand() {
		let mut buf = LogBuffer::default();
		for i in 0..10_050 {
			buf.append(Stream::Stdout, &format!("line {}\n", i));
		}
		assert_eq!(buf.capacity(), MAX_LOG_LINES);
		assert_eq!(buf.len(), MAX_LOG_LINES);
		let first = buf.tail(MAX_LOG_LINES);
		assert_eq!(first[0].text, "line 50");
		assert_eq!(first[MAX_LOG_LINES - 1].text, "line 10049");
	}

	#[test]
	fn clear_resets_cursor() {
		let mut buf = LogBuffer::default();
		buf.append(Stream::System, "hello");
		buf.read();
		buf.clear();
		assert_eq!(buf.len(), 0);
		assert_eq!(buf.cursor(), 0);
	}

	proptest! {
		#[test]
		fn cursor_and_length_stay_in_bounds(
			ops in proptest::collection::vec((0usize..40, any::<bool>(), any::<bool>()), 1..80)
		) {
			let mut buf = LogBuffer::new(25);
			for (count, read, tail) in ops {
				let chunk: String = (0..count).map(|i| format!("l{}\n", i)).collect();
				buf.append(Stream::Stdout, &chunk);
				prop_assert!(buf.cursor() <= buf.len());
				prop_assert!(buf.len() <= buf.capacity());

				if tail {
					let before = buf.cursor();
					let _ = buf.tail(count * 2);
					prop_assert_eq!(buf.cursor(), before);
				}
				if read {
					buf.read();
					prop_assert_eq!(buf.cursor(), buf.len());
					prop_assert!(buf.read().is_empty());
				}
			}
		}

		#[test]
		fn any_grouping_of_overflow_keeps_the_newest_lines(
			groups in proptest::collection::vec(1usize..500, 1..60)
		) {
			let mut buf = LogBuffer::new(1000);
			let mut total = 0usize;
			for size in groups {
				let before_len = buf.len();
				let before_cursor = buf.cursor();
				let chunk: String = (total..total + size).map(|i| format!("{}\n", i)).collect();
				total += size;
				buf.append(Stream::Stdout, &chunk);

				let evicted = (before_len + size).saturating_sub(1000);
				prop_assert_eq!(buf.cursor(), before_cursor.saturating_sub(evicted));
				buf.read();
			}
			let kept = total.min(1000);
			prop_assert_eq!(buf.len(), kept);
			let newest = buf.tail(1);
			prop_assert_eq!(newest[0].text.clone(), (total - 1).to_string());
		}
	}
}
