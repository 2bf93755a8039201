//! Market data port traits.
//!
//! Providers hand the engine ordered (date, close) observations; the engine
//! owns alignment. `Send + Sync` because the orchestrator fans strategies
//! out across threads.

use crate::domain::error::FoliosimError;
use crate::domain::prices::{AssetId, PricePoint};

/// Source of historical close prices.
pub trait PriceSeriesPort: Send + Sync {
    /// Fetch up to `periods` observations for one asset at the given
    /// interval (for example `1d`), ordered oldest first.
    fn fetch_closes(
        &self,
        asset: &AssetId,
        interval: &str,
        periods: usize,
    ) -> Result<Vec<PricePoint>, FoliosimError>;

    /// Assets this source can serve for the given interval.
    fn list_assets(&self, interval: &str) -> Result<Vec<AssetId>, FoliosimError>;
}

/// Source of historical market capitalizations, shaped exactly like the
/// price port so cap series join into a table the same way.
pub trait MarketCapPort: Send + Sync {
    fn fetch_caps(
        &self,
        asset: &AssetId,
        interval: &str,
        periods: usize,
    ) -> Result<Vec<PricePoint>, FoliosimError>;
}
