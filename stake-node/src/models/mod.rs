//! Data models used throughout the application
//!
//! This module contains the JSON-RPC envelope, the consensus node's result
//! types, and the staking arguments and stored records.

// JSON-RPC protocol data structures
pub mod jsonrpc;

// Consensus node RPC results
pub mod consensus;

// Staking arguments and query payloads
pub mod stake;
