//! Error taxonomy for the engine.
//!
//! Command timeouts and buffer overflows are deliberately absent: a timeout is
//! delivered through the command's failure callback and an overflow is a
//! diagnostic, neither of them interrupts the dispatch loop.

use thiserror::Error;

/// Errors returned synchronously by engine operations.
#[derive(Debug, Error)]
pub enum Error {
    /// The command queue has no free slot. The queue was left untouched.
    #[error("command queue is full ({capacity} commands)")]
    QueueFull { capacity: usize },

    /// The hook table has no free slot.
    #[error("hook table is full ({capacity} hooks)")]
    HookTableFull { capacity: usize },

    /// The engine has no transport yet; call `begin` first.
    #[error("no transport bound, call begin() first")]
    NotBound,

    /// The command text exceeds the configured limit.
    #[error("command is {len} bytes, the limit is {max}")]
    CommandTooLong { len: usize, max: usize },

    /// The expectation pattern exceeds the configured limit.
    #[error("pattern is {len} bytes, the limit is {max}")]
    PatternTooLong { len: usize, max: usize },

    /// `execute_chain` was given no commands.
    #[error("chain has no commands")]
    EmptyChain,

    /// The expectation could not be compiled.
    #[error("invalid pattern: {0}")]
    InvalidPattern(#[from] regex::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
