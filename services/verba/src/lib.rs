pub mod commands;
pub mod config;
pub mod native_adapter;
pub mod realtime_adapter;
