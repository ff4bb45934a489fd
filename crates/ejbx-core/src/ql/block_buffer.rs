//! String builder that grows at both ends
//!
//! Renderers often know the prefix of a fragment only after rendering its
//! body (`NOT EXISTS (` vs `EXISTS (`). Parts are kept as a deque and only
//! joined when the buffer is displayed.

use std::collections::VecDeque;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Part {
    Text(String),
    Block(BlockStringBuffer),
}

impl Part {
    fn len(&self) -> usize {
        match self {
            Self::Text(text) => text.len(),
            Self::Block(block) => block.len(),
        }
    }
}

/// Deque of text fragments and nested buffers
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BlockStringBuffer {
    parts: VecDeque<Part>,
}

impl BlockStringBuffer {
    /// Empty buffer
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add text at the end
    pub fn append(&mut self, text: impl Into<String>) -> &mut Self {
        let text = text.into();
        if !text.is_empty() {
            self.parts.push_back(Part::Text(text));
        }
        self
    }

    /// Add text at the front
    pub fn prepend(&mut self, text: impl Into<String>) -> &mut Self {
        let text = text.into();
        if !text.is_empty() {
            self.parts.push_front(Part::Text(text));
        }
        self
    }

    /// Add a nested buffer at the end
    pub fn append_block(&mut self, block: BlockStringBuffer) -> &mut Self {
        if !block.is_empty() {
            self.parts.push_back(Part::Block(block));
        }
        self
    }

    /// Add a nested buffer at the front
    pub fn prepend_block(&mut self, block: BlockStringBuffer) -> &mut Self {
        if !block.is_empty() {
            self.parts.push_front(Part::Block(block));
        }
        self
    }

    /// Length in bytes of the rendered text
    #[must_use]
    pub fn len(&self) -> usize {
        self.parts.iter().map(Part::len).sum()
    }

    /// True when nothing has been added
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    /// First character of the rendered text
    #[must_use]
    pub fn first_char(&self) -> Option<char> {
        match self.parts.front()? {
            Part::Text(text) => text.chars().next(),
            Part::Block(block) => block.first_char(),
        }
    }
}

/// Prefix for a unary minus in front of `operand`.
///
/// Two adjacent minus signs open a line comment in SQL, so a space keeps
/// them apart.
pub(crate) fn negation_prefix(operand: &BlockStringBuffer) -> &'static str {
    if operand.first_char() == Some('-') { "- " } else { "-" }
}

impl fmt::Display for BlockStringBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for part in &self.parts {
            match part {
                Part::Text(text) => f.write_str(text)?,
                Part::Block(block) => block.fmt(f)?,
            }
        }
        Ok(())
    }
}

impl From<&str> for BlockStringBuffer {
    fn from(text: &str) -> Self {
        let mut buffer = Self::new();
        buffer.append(text);
        buffer
    }
}
