//! Exit codes for CLI operations
//!
//! These follow Unix conventions and sysexits.h where applicable.

/// Success - CSV and package manifest written
pub const SUCCESS: i32 = 0;

/// Config or input error - unreadable csv-config.yaml, missing configured path
pub const INPUT_ERROR: i32 = 2;

/// Generation error - bad manifest, bad annotation, unknown install strategy
pub const GENERATION_ERROR: i32 = 3;

/// IO error - file not found, permission denied, etc.
pub const IO_ERROR: i32 = 5;

/// Usage error - invalid flag values or combinations (sysexits.h convention)
pub const USAGE_ERROR: i32 = 64;
