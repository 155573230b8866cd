//! Standard exit codes for CLI operations
//!
//! These exit codes follow Unix conventions and sysexits.h where applicable.

/// Success - operation completed without errors
pub const SUCCESS: u8 = 0;

/// General error - unspecified failure
pub const ERROR: u8 = 1;

/// Validation error - settings, changes file or batch rejected before any
/// change on the service
pub const VALIDATION_ERROR: u8 = 2;

/// API error - the aptly service refused a request or could not be reached
pub const API_ERROR: u8 = 3;

/// Lock error - another publish held the lock for too long
pub const LOCK_ERROR: u8 = 4;

/// IO error - file not found, permission denied, etc.
pub const IO_ERROR: u8 = 5;

/// Usage error - invalid arguments or options (following sysexits.h convention)
pub const USAGE_ERROR: u8 = 64;
