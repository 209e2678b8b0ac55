pub mod app;
pub mod channel;
pub mod cli;
pub mod config;
pub mod panel;
pub mod params;
pub mod protocol;
pub mod session;
pub mod telemetry;
