//! Process exit codes.
//! Engine failures reuse `CacheError::exit_code`, so a code means the same
//! thing whichever command produced it.

pub const SUCCESS: i32 = 0;
pub const USAGE_ERROR: i32 = 1; // Bad key or configuration
pub const INTERNAL_ERROR: i32 = 2; // Anything not classified below
pub const UNRESOLVED: i32 = 3; // Nothing valid to serve / sweep had failures
