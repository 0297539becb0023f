//! Standard exit codes for CLI operations
//!
//! These exit codes follow Unix conventions and sysexits.h where applicable.

/// General error - unspecified failure
pub const ERROR: i32 = 1;

/// Configuration error - bad environment or flag values
pub const CONFIG_ERROR: i32 = 2;

/// API error - the Smallstep API refused or failed a request
pub const API_ERROR: i32 = 3;

/// IO error - file not found, permission denied, etc.
pub const IO_ERROR: i32 = 5;

/// Usage error - unknown type or component name (following sysexits.h convention)
pub const USAGE_ERROR: i32 = 64;
