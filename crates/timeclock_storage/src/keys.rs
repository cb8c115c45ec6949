//! Names of the keys the client persists.

/// Opaque bearer token issued at login.
pub const AUTH_TOKEN: &str = "authToken";

/// JSON document describing the signed-in user.
pub const USER_INFO: &str = "userInfo";

/// Cached clock record sequence, newest first.
pub const CLOCK_RECORDS: &str = "clockRecords";

/// Last persisted clock status (`"in"` or `"out"`).
pub const CURRENT_STATUS: &str = "currentStatus";

/// Every key owned by the client.
pub const ALL: [&str; 4] = [AUTH_TOKEN, USER_INFO, CLOCK_RECORDS, CURRENT_STATUS];
