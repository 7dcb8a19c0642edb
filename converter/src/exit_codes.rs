//! Stable exit codes for converter CLI commands.

/// Every requested conversion succeeded and was accepted.
pub const OK: i32 = 0;
/// Invalid input, config, or another error before conversion.
pub const INVALID: i32 = 1;
/// Output was written but refinement ended without acceptance.
pub const INCOMPLETE: i32 = 2;
/// At least one conversion failed.
pub const FAILED: i32 = 3;
