pub mod cli;
pub mod config;
pub mod message_file;
pub mod outbound;
pub mod telemetry;
