// Export modules for testing
pub mod accounts;
pub mod api;
pub mod config;
pub mod error;
pub mod init;
pub mod keys;
pub mod models;
pub mod rpc;
pub mod services;
pub mod tx;
