//! Standard exit codes for CLI operations
//!
//! These exit codes follow Unix conventions and sysexits.h where applicable.

#![allow(dead_code)]

/// Success - operation completed without errors
pub const SUCCESS: i32 = 0;

/// General error - unspecified failure
pub const ERROR: i32 = 1;

/// Input error - malformed version, bad flag value or configuration
pub const INPUT_ERROR: i32 = 2;

/// Manifest error - invalid manifest, unknown predecessor, duplicate release
pub const MANIFEST_ERROR: i32 = 4;

/// IO error - file not found, permission denied, etc.
pub const IO_ERROR: i32 = 5;

/// Network error - chart list could not be fetched
pub const NETWORK_ERROR: i32 = 6;
