//! Trace utilities

/// Trace category for batch file parsing.
pub const BATCH: &str = "batch";
/// Trace category for execution of external tools.
pub const EXEC: &str = "exec";
/// Trace category for range expansion and syscall resolution.
pub const EXPAND: &str = "expand";
/// Trace category for test selection.
pub const SELECT: &str = "select";
