//! Engine capacities and limits.

/// Fixed capacities of an [`Engine`](crate::Engine).
///
/// Every region is allocated once when the engine is built and never grows;
/// running out of room is reported as an error (queue, hooks, lengths) or an
/// overflow diagnostic (line buffer).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
    /// Maximum number of queued commands, including the active one.
    pub queue_capacity: usize,
    /// Size of the input line buffer in bytes.
    pub buffer_capacity: usize,
    /// Maximum number of registered hooks.
    pub hook_capacity: usize,
    /// Maximum length of a command's text in bytes.
    pub max_command_len: usize,
    /// Maximum length of an expectation pattern in bytes.
    pub max_pattern_len: usize,
    /// Byte that ends a line.
    pub terminator: u8,
}

impl Config {
    pub const DEFAULT_QUEUE_CAPACITY: usize = 5;
    pub const DEFAULT_BUFFER_CAPACITY: usize = 256;
    pub const DEFAULT_HOOK_CAPACITY: usize = 10;
    pub const DEFAULT_MAX_COMMAND_LEN: usize = 64;
    pub const DEFAULT_MAX_PATTERN_LEN: usize = 128;

    pub fn new() -> Self {
        Self {
            queue_capacity: Self::DEFAULT_QUEUE_CAPACITY,
            buffer_capacity: Self::DEFAULT_BUFFER_CAPACITY,
            hook_capacity: Self::DEFAULT_HOOK_CAPACITY,
            max_command_len: Self::DEFAULT_MAX_COMMAND_LEN,
            max_pattern_len: Self::DEFAULT_MAX_PATTERN_LEN,
            terminator: b'\n',
        }
    }

    /// Set the queue capacity.
    #[must_use]
    pub fn queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity;
        self
    }

    /// Set the line buffer size. Values below 2 are raised to 2.
    #[must_use]
    pub fn buffer_capacity(mut self, capacity: usize) -> Self {
        self.buffer_capacity = capacity.max(2);
        self
    }

    /// Set the hook table capacity.
    #[must_use]
    pub fn hook_capacity(mut self, capacity: usize) -> Self {
        self.hook_capacity = capacity;
        self
    }

    /// Set the maximum command length.
    #[must_use]
    pub fn max_command_len(mut self, len: usize) -> Self {
        self.max_command_len = len;
        self
    }

    /// Set the maximum pattern length.
    #[must_use]
    pub fn max_pattern_len(mut self, len: usize) -> Self {
        self.max_pattern_len = len;
        self
    }

    /// Set the line terminator.
    #[must_use]
    pub fn terminator(mut self, terminator: u8) -> Self {
        self.terminator = terminator;
        self
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.queue_capacity, 5);
        assert_eq!(config.buffer_capacity, 256);
        assert_eq!(config.hook_capacity, 10);
        assert_eq!(config.max_command_len, 64);
        assert_eq!(config.max_pattern_len, 128);
        assert_eq!(config.terminator, b'\n');
    }

    #[test]
    fn test_builder() {
        let config = Config::new()
            .queue_capacity(2)
            .buffer_capacity(0)
            .terminator(b'\r');
        assert_eq!(config.queue_capacity, 2);
        assert_eq!(config.buffer_capacity, 2);
        assert_eq!(config.terminator, b'\r');
    }
}
