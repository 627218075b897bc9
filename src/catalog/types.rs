//! Type definitions for the remote chain and asset catalogs.
//!
//! The remote catalog service publishes two JSON arrays: one describing chains (networks, their
//! nodes and the assets they carry) and one describing assets. The structs in this module mirror
//! that wire format and the joined form that is persisted locally.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Identifier of a chain (genesis hash for substrate networks).
pub type ChainId = String;

/// Identifier of an asset in the asset catalog.
pub type AssetId = String;

/// API key descriptor attached to a node that requires authentication.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeApiKey {
    pub query_name: String,
    pub key_name: String,
}

/// A node endpoint of a chain.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ChainNode {
    pub url: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub apikey: Option<NodeApiKey>,
}

/// Runtime types location for a chain.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypesSettings {
    pub url: String,
    pub overrides_common: bool,
}

/// Feature flags a chain may carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ChainOption {
    EthereumBased,
    Testnet,
    Crowdloans,
}

/// An external indexing service (staking, history or crowdloans).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ExternalApi {
    #[serde(rename = "type")]
    pub api_type: String,
    pub url: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ExternalApiSet {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub staking: Option<ExternalApi>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub history: Option<ExternalApi>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub crowdloans: Option<ExternalApi>,
}

/// Staking flavour of an asset on a given chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StakingType {
    Relaychain,
    Parachain,
}

/// Fiat on-ramp provider available for an asset on a given chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PurchaseProvider {
    Moonpay,
    Ramp,
}

/// An entry of the remote asset catalog.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetCatalogEntry {
    pub id: AssetId,
    pub chain_id: ChainId,
    pub precision: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price_id: Option<String>,
}

/// An asset reference inside a remote chain entry, before it is resolved against the asset
/// catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteChainAsset {
    pub asset_id: AssetId,
    #[serde(default)]
    pub staking: Option<StakingType>,
    #[serde(default)]
    pub purchase_providers: Option<Vec<PurchaseProvider>>,
}

/// A chain entry as published by the remote chain catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteChainEntry {
    pub chain_id: ChainId,
    #[serde(default)]
    pub parent_id: Option<ChainId>,
    pub name: String,
    #[serde(default)]
    pub assets: Vec<RemoteChainAsset>,
    #[serde(default)]
    pub nodes: Vec<ChainNode>,
    pub address_prefix: u16,
    #[serde(default)]
    pub types: Option<TypesSettings>,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default)]
    pub options: Option<Vec<ChainOption>>,
    #[serde(default)]
    pub external_api: Option<ExternalApiSet>,
}

/// Join of a chain's asset reference with the resolved asset catalog entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainAssetLink {
    pub asset_id: AssetId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub staking: Option<StakingType>,
    #[serde(default)]
    pub purchase_providers: BTreeSet<PurchaseProvider>,
    pub asset: AssetCatalogEntry,
}

/// A chain with all of its assets resolved. This is the shape that is diffed and persisted.
///
/// Equality is structural over every field. Nodes, options and assets are sets, so the order in
/// which the remote catalog lists them does not make two entries differ.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainCatalogEntry {
    pub chain_id: ChainId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<ChainId>,
    pub name: String,
    #[serde(default)]
    pub nodes: BTreeSet<ChainNode>,
    pub address_prefix: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub types: Option<TypesSettings>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(default)]
    pub options: BTreeSet<ChainOption>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_api: Option<ExternalApiSet>,
    #[serde(default)]
    pub assets: BTreeSet<ChainAssetLink>,
}

impl ChainCatalogEntry {
    /// Build a persisted entry from a remote chain, keeping only the asset references that
    /// resolve against `assets`.
    ///
    /// A reference resolves to the first asset whose `id` equals its `asset_id`.
    pub fn resolve(remote: RemoteChainEntry, assets: &[AssetCatalogEntry]) -> Self {
        let links = remote
            .assets
            .into_iter()
            .filter_map(|reference| {
                let asset = assets.iter().find(|a| a.id == reference.asset_id)?;
                Some(ChainAssetLink {
                    asset_id: reference.asset_id,
                    staking: reference.staking,
                    purchase_providers: reference
                        .purchase_providers
                        .unwrap_or_default()
                        .into_iter()
                        .collect(),
                    asset: asset.clone(),
                })
            })
            .collect();

        Self {
            chain_id: remote.chain_id,
            parent_id: remote.parent_id,
            name: remote.name,
            nodes: remote.nodes.into_iter().collect(),
            address_prefix: remote.address_prefix,
            types: remote.types,
            icon: remote.icon,
            options: remote.options.unwrap_or_default().into_iter().collect(),
            external_api: remote.external_api,
            assets: links,
        }
    }

    pub fn identifier(&self) -> &ChainId {
        &self.chain_id
    }

    pub fn is_ethereum_based(&self) -> bool {
        self.options.contains(&ChainOption::EthereumBased)
    }

    pub fn is_testnet(&self) -> bool {
        self.options.contains(&ChainOption::Testnet)
    }

    pub fn has_crowdloans(&self) -> bool {
        self.options.contains(&ChainOption::Crowdloans)
    }
}

/// Error types for remote catalog fetches
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Unexpected status {status} from {url}")]
    StatusError {
        status: reqwest::StatusCode,
        url: String,
    },

    #[error("Invalid catalog URL: {0}")]
    InvalidUrl(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn asset(id: &str) -> AssetCatalogEntry {
        AssetCatalogEntry {
            id: id.to_string(),
            chain_id: "chain".to_string(),
            precision: 10,
            icon: None,
            price_id: None,
        }
    }

    #[test]
    fn test_remote_chain_wire_format() {
        let json = r#"{
            "chainId": "91b171bb158e2d3848fa23a9f1c25182",
            "name": "Polkadot",
            "addressPrefix": 0,
            "assets": [{ "assetId": "dot", "staking": "relaychain", "purchaseProviders": ["ramp"] }],
            "nodes": [{ "url": "wss://rpc.polkadot.io", "name": "Parity node" }],
            "options": ["crowdloans"],
            "externalApi": { "history": { "type": "subquery", "url": "https://example.org" } }
        }"#;

        let chain: RemoteChainEntry = serde_json::from_str(json).unwrap();
        assert_eq!(chain.name, "Polkadot");
        assert_eq!(chain.assets[0].staking, Some(StakingType::Relaychain));
        assert_eq!(
            chain.assets[0].purchase_providers,
            Some(vec![PurchaseProvider::Ramp])
        );
        assert_eq!(
            chain.external_api.unwrap().history.unwrap().api_type,
            "subquery"
        );
    }

    #[test]
    fn test_resolve_drops_unknown_assets() {
        let remote = RemoteChainEntry {
            chain_id: "polkadot".to_string(),
            parent_id: None,
            name: "Polkadot".to_string(),
            assets: vec![
                RemoteChainAsset {
                    asset_id: "dot".to_string(),
                    staking: None,
                    purchase_providers: None,
                },
                RemoteChainAsset {
                    asset_id: "missing".to_string(),
                    staking: None,
                    purchase_providers: None,
                },
            ],
            nodes: vec![],
            address_prefix: 0,
            types: None,
            icon: None,
            options: Some(vec![ChainOption::Testnet]),
            external_api: None,
        };

        let entry = ChainCatalogEntry::resolve(remote, &[asset("dot"), asset("ksm")]);
        assert_eq!(entry.assets.len(), 1);
        assert_eq!(entry.assets.iter().next().unwrap().asset.id, "dot");
        assert!(entry.is_testnet());
        assert!(!entry.has_crowdloans());
        assert!(!entry.is_ethereum_based());
        assert_eq!(entry.identifier(), "polkadot");
    }

    #[test]
    fn test_equality_ignores_node_order() {
        let node = |url: &str| ChainNode {
            url: url.to_string(),
            name: url.to_string(),
            apikey: None,
        };
        let make = |nodes: Vec<ChainNode>| RemoteChainEntry {
            chain_id: "kusama".to_string(),
            parent_id: None,
            name: "Kusama".to_string(),
            assets: vec![],
            nodes,
            address_prefix: 2,
            types: None,
            icon: None,
            options: None,
            external_api: None,
        };

        let a = ChainCatalogEntry::resolve(make(vec![node("wss://a"), node("wss://b")]), &[]);
        let b = ChainCatalogEntry::resolve(make(vec![node("wss://b"), node("wss://a")]), &[]);
        assert_eq!(a, b);
    }
}
