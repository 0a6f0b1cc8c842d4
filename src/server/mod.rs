//! Server module for wahook
//!
//! # Module Structure
//!
//! - `config`: Configuration structures
//! - `loader`: Configuration loading from files and environment
//! - `init_stores`: Counter store, deletion queue and tracker construction
//! - `validation`: Production configuration validation
//! - `init`: Main server initialization and run loop

pub mod config;
mod init;
mod init_stores;
mod loader;
mod validation;

// Re-export public API
pub use init::run;
pub use init_stores::init_stores;
pub use loader::load_config;
