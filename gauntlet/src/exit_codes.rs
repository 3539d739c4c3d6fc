//! Stable exit codes for the CLI.

/// Command succeeded.
pub const OK: i32 = 0;
/// Invalid configuration, script, or arguments.
pub const INVALID: i32 = 1;
/// A simulated run started but failed.
pub const RUN_FAILED: i32 = 2;
