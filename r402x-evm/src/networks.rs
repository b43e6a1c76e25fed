//! Known EVM networks and their block explorers.

use alloy_primitives::TxHash;

/// Base Mainnet chain ID.
pub const BASE_MAINNET: u64 = 8453;

/// Base Sepolia (testnet) chain ID.
pub const BASE_SEPOLIA: u64 = 84532;

/// X Layer Mainnet chain ID.
pub const XLAYER_MAINNET: u64 = 196;

/// X Layer Testnet chain ID.
pub const XLAYER_TESTNET: u64 = 1952;

/// A network settlement services are deployed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KnownNetwork {
    /// Registry network name.
    pub name: &'static str,
    /// EIP-155 chain id.
    pub chain_id: u64,
    /// Block explorer base URL, without trailing slash.
    pub explorer: &'static str,
}

/// Networks with known block explorers.
pub const KNOWN_NETWORKS: &[KnownNetwork] = &[
    KnownNetwork {
        name: "base",
        chain_id: BASE_MAINNET,
        explorer: "https://basescan.org",
    },
    KnownNetwork {
        name: "base-sepolia",
        chain_id: BASE_SEPOLIA,
        explorer: "https://sepolia.basescan.org",
    },
    KnownNetwork {
        name: "x-layer",
        chain_id: XLAYER_MAINNET,
        explorer: "https://www.oklink.com/xlayer",
    },
    KnownNetwork {
        name: "x-layer-testnet",
        chain_id: XLAYER_TESTNET,
        explorer: "https://www.oklink.com/xlayer-test",
    },
];

/// Looks up a network by chain id.
#[must_use]
pub fn network_by_chain_id(chain_id: u64) -> Option<&'static KnownNetwork> {
    KNOWN_NETWORKS.iter().find(|network| network.chain_id == chain_id)
}

/// Looks up a network by registry name.
#[must_use]
pub fn network_by_name(name: &str) -> Option<&'static KnownNetwork> {
    KNOWN_NETWORKS.iter().find(|network| network.name == name)
}

/// Returns the explorer URL of `tx_hash`, if the chain is known.
#[must_use]
pub fn explorer_tx_url(chain_id: u64, tx_hash: TxHash) -> Option<String> {
    network_by_chain_id(chain_id).map(|network| format!("{}/tx/{tx_hash}", network.explorer))
}
