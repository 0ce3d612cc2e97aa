//! Fallback text source used when no camera flow is possible.

use std::sync::RwLock;

/// A system text buffer (clipboard equivalent)
pub trait TextBuffer {
    /// Current contents, returned verbatim
    fn read_text(&self) -> String;
}

/// In-memory text buffer
#[derive(Debug, Default)]
pub struct MemoryTextBuffer {
    contents: RwLock<String>,
}

impl MemoryTextBuffer {
    pub fn new(contents: impl Into<String>) -> Self {
        Self {
            contents: RwLock::new(contents.into()),
        }
    }

    pub fn set_text(&self, contents: impl Into<String>) {
        let mut guard = self.contents.write().unwrap_or_else(|e| e.into_inner());
        *guard = contents.into();
    }
}

impl TextBuffer for MemoryTextBuffer {
    fn read_text(&self) -> String {
        self.contents
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_buffer_verbatim() {
        let buffer = MemoryTextBuffer::new("  spaced\ttext \n");
        assert_eq!(buffer.read_text(), "  spaced\ttext \n");

        buffer.set_text("");
        assert_eq!(buffer.read_text(), "");
    }
}
