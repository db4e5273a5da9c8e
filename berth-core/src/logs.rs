//! Point-in-time log snapshots.

/// Maximum number of log lines returned for a container.
pub const LOG_TAIL_LINES: usize = 100;

/// The last [`LOG_TAIL_LINES`] lines of a container's output, most recent
/// first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogSnapshot {
    lines: Vec<String>,
}

impl LogSnapshot {
    /// Build a snapshot from raw combined output, oldest line first.
    ///
    /// A trailing line terminator does not produce an empty entry, and
    /// `\r\n` terminators are treated like `\n`.
    #[must_use]
    pub fn from_output(output: &str) -> Self {
        let all: Vec<&str> = output.lines().collect();
        let keep = all.len().saturating_sub(LOG_TAIL_LINES);
        Self {
            lines: all[keep..].iter().rev().map(|l| (*l).to_owned()).collect(),
        }
    }

    /// Like [`LogSnapshot::from_output`], decoding invalid UTF-8 lossily.
    #[must_use]
    pub fn from_bytes(output: &[u8]) -> Self {
        Self::from_output(&String::from_utf8_lossy(output))
    }

    /// Lines, most recent first.
    #[must_use]
    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    #[must_use]
    pub fn into_lines(self) -> Vec<String> {
        self.lines
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}
