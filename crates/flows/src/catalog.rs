//! District catalog loading shared by both flows.

use ivd_core::district::DistrictCatalog;
use ivd_core::store::DatasetStore;

/// Fetch the district list once.
///
/// A load failure is not fatal: it is logged and an empty catalog is
/// returned, leaving nothing selectable. There is no retry.
pub async fn load_catalog(store: &dyn DatasetStore) -> DistrictCatalog {
    match store.list_districts().await {
        Ok(districts) => {
            let catalog = DistrictCatalog::new(districts);
            tracing::debug!(
                districts = catalog.all_districts().len(),
                states = catalog.states_in_order().len(),
                "District catalog loaded"
            );
            catalog
        }
        Err(e) => {
            tracing::warn!(error = %e, "District catalog unavailable, continuing with none");
            DistrictCatalog::empty()
        }
    }
}
