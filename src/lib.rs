// lib.rs - Perforator: storage bucket discovery and object enumeration
// Purpose: Engine shared by the CLI binary and the integration tests

pub mod classifier;
pub mod config;
pub mod engine;
pub mod enumerator;
pub mod http_client;
pub mod listing;
pub mod prober;
pub mod progress;
pub mod report;
pub mod sensitivity;

pub use config::EnumConfig;
pub use engine::Perforator;
pub use report::Report;
