pub const MAX_NAME_LENGTH: usize = 255;
pub const MAX_LINK_LENGTH: usize = 255;
pub const MIN_PASSWORD_LENGTH: usize = 5;

/// 999.99, five digits with two decimal places
pub const PRICE_MAX_CENTS: i64 = 99_999;

pub const MAX_BODY_BYTES: u64 = 64 * 1024;

pub const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0:8000";
pub const DEFAULT_MAX_CONNECTIONS: u32 = 5;
pub const DEFAULT_CONNECT_RETRIES: u32 = 30;
pub const DEFAULT_SESSION_LIFETIME_HOURS: i64 = 24;

pub const SESSION_COOKIE: &str = "session";
