//! Process exit codes.

pub const SUCCESS: i32 = 0;
pub const RUN_FAILED: i32 = 1; // Analysis finished as `failed`, or a report was not found
pub const CONFIG_ERROR: i32 = 2; // Bad configuration or an unexpected error
