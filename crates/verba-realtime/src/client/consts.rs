pub const VERBA_WS_URL: &str = "VERBA_WS_URL";

pub const DEFAULT_WS_URL: &str = "ws://127.0.0.1:8000/ws";
pub const DEFAULT_CAPACITY: usize = 256;
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

pub const USER_AGENT_HEADER: &str = "User-Agent";
pub const USER_AGENT: &str = concat!("verba/", env!("CARGO_PKG_VERSION"));
