//! Error Types
//!
//! The crate distinguishes two failure classes:
//!
//! - **API misuse**: driving a disposed pass, or submitting a stage list
//!   that violates the aliasing discipline. These surface as [`GodrayError`].
//! - **Per-frame degradation**: a missing buffer, a zero-sized viewport, a
//!   non-invertible camera matrix. These are *not* errors: the frame's
//!   effect is skipped and reported through
//!   [`RunOutcome`](crate::pass::RunOutcome), and the same checks simply
//!   re-run next frame with fresh state.

use thiserror::Error;

/// Errors raised by incorrect use of the pass API.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum GodrayError {
    /// The pass was driven after `dispose()`. A disposed pass is terminal;
    /// create a new one instead.
    #[error("pass has been disposed and cannot be set up again")]
    PassDisposed,

    /// A stage uses the same buffer as input and output with a kernel that
    /// is not documented as in-place safe.
    #[error("stage {index} reads and writes the same buffer with a kernel that is not in-place safe")]
    SelfAliasingStage {
        /// Index of the offending stage in the submitted sequence.
        index: usize,
    },

    /// A stage reads a scratch buffer that no earlier stage has written.
    #[error("stage {index} reads a scratch buffer that no earlier stage wrote")]
    UnwrittenScratchRead {
        /// Index of the offending stage in the submitted sequence.
        index: usize,
    },
}

/// Alias for `Result<T, GodrayError>`.
pub type Result<T> = std::result::Result<T, GodrayError>;
