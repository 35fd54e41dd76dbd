/// Error type for buffer access
#[derive(Debug, thiserror::Error)]
pub enum BufferError {
    #[error("line {line} is out of range (buffer has {len} lines)")]
    OutOfRange { line: usize, len: usize },
}

/// The text buffer the wiki lives in. Indices are 0-based and only stable
/// for the duration of one synchronous operation.
pub trait LineBuffer {
    fn line_count(&self) -> usize;
    fn read_line(&self, index: usize) -> Result<String, BufferError>;
    fn write_line(&mut self, index: usize, text: &str) -> Result<(), BufferError>;
}

/// An in-memory buffer of lines, as loaded from a wiki file
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VecBuffer {
    lines: Vec<String>,
    /// Whether the source text ended with a newline
    pub trailing_newline: bool,
}

impl VecBuffer {
    pub fn new(lines: Vec<String>) -> Self {
        VecBuffer {
            lines,
            trailing_newline: true,
        }
    }

    /// Split text into lines, remembering whether it ended with a newline
    pub fn from_text(text: &str) -> Self {
        VecBuffer {
            lines: text.lines().map(|l| l.to_string()).collect(),
            trailing_newline: text.ends_with('\n'),
        }
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn to_text(&self) -> String {
        let mut text = self.lines.join("\n");
        if self.trailing_newline && !self.lines.is_empty() {
            text.push('\n');
        }
        text
    }
}

impl LineBuffer for VecBuffer {
    fn line_count(&self) -> usize {
        self.lines.len()
    }

    fn read_line(&self, index: usize) -> Result<String, BufferError> {
        self.lines
            .get(index)
            .cloned()
            .ok_or(BufferError::OutOfRange {
                line: index,
                len: self.lines.len(),
            })
    }

    fn write_line(&mut self, index: usize, text: &str) -> Result<(), BufferError> {
        let len = self.lines.len();
        let slot = self
            .lines
            .get_mut(index)
            .ok_or(BufferError::OutOfRange { line: index, len })?;
        *slot = text.to_string();
        Ok(())
    }
}
