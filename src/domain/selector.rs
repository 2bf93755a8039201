//! Asset selection rules.
//!
//! Selection runs on every active period and feeds that period's weighting
//! call. A fixed list degrades to its intersection with the universe; the
//! missing names are reported back to the caller and logged, never raised.

use tracing::warn;

use crate::domain::prices::AssetId;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selector {
    /// The whole universe.
    All,
    /// Nothing: the strategy sits in cash.
    None,
    /// A fixed list, intersected with the universe.
    These(Vec<AssetId>),
}

/// Result of one selection: the eligible assets plus the requested names the
/// universe does not carry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    pub assets: Vec<AssetId>,
    pub missing: Vec<AssetId>,
}

impl Selector {
    pub fn select(&self, universe: &[AssetId]) -> Selection {
        match self {
            Selector::All => Selection {
                assets: universe.to_vec(),
                missing: Vec::new(),
            },
            Selector::None => Selection {
                assets: Vec::new(),
                missing: Vec::new(),
            },
            Selector::These(requested) => {
                let mut assets = Vec::new();
                let mut missing = Vec::new();
                for asset in requested {
                    if assets.contains(asset) || missing.contains(asset) {
                        continue;
                    }
                    if universe.contains(asset) {
                        assets.push(asset.clone());
                    } else {
                        warn!(asset = %asset, "selected asset not in the price table, skipping");
                        missing.push(asset.clone());
                    }
                }
                Selection { assets, missing }
            }
        }
    }
}
