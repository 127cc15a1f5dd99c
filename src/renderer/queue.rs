use crate::errors::{Result, UmbraError};
use crate::renderer::command::DrawCommand;

/// Fixed-capacity list of draw commands for one frame.
///
/// Storage is allocated once; pushing past capacity is rejected rather than
/// growing the buffer.
#[derive(Debug)]
pub struct RenderQueue {
    commands: Vec<DrawCommand>,
    capacity: usize,
}

impl RenderQueue {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            commands: Vec::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, command: DrawCommand) -> Result<()> {
        if self.commands.len() >= self.capacity {
            return Err(UmbraError::QueueFull { capacity: self.capacity });
        }
        self.commands.push(command);
        Ok(())
    }

    /// Stable sort by `(pass, geometry)`; equal keys keep submission order.
    pub fn sort(&mut self) {
        self.commands.sort_by_key(DrawCommand::sort_key);
    }

    pub fn clear(&mut self) {
        self.commands.clear();
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    #[inline]
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    #[inline]
    #[must_use]
    pub fn commands(&self) -> &[DrawCommand] {
        &self.commands
    }
}
