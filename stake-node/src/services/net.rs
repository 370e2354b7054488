use crate::models::jsonrpc::format_hex_u64;

/// `net_*` namespace
///
/// The node does not manage execution-layer peers itself, so the answers
/// are fixed apart from the configured network version.
#[derive(Debug, Clone)]
pub struct NetService {
    network_version: u64,
}

impl NetService {
    pub fn new(network_version: u64) -> Self {
        Self { network_version }
    }

    /// Whether the node is listening for network connections. Always true.
    pub fn listening(&self) -> bool {
        true
    }

    /// Number of connected execution-layer peers, as a hex quantity
    pub fn peer_count(&self) -> String {
        format_hex_u64(0)
    }

    /// Network version as a decimal string
    pub fn version(&self) -> String {
        self.network_version.to_string()
    }
}
