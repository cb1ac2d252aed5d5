mod client;

pub use client::config::{Config, ConfigBuilder};
pub use client::stats::Stats;
pub use client::{Client, ServerRx, TransportState, connect_with_config};
pub use verba_types as types;
