use crate::error::LoadError;
use core_types::{FundId, NewFund};
use database::FundStore;
use tracing::info;

/// Inserts the parent fund and waits for its commit.
///
/// Nothing that references the fund may start before this returns `Ok`.
/// Begin, insert and commit failures all come back as [`LoadError::Insert`];
/// the store has rolled back by then, except after a failed commit whose
/// outcome is unknown.
pub async fn insert_parent(store: &dyn FundStore, fund: &NewFund) -> Result<FundId, LoadError> {
    let fund_id = store.insert_fund(fund).await.map_err(LoadError::Insert)?;
    info!(fund_id, scheme_code = fund.scheme_code, "Fund inserted");
    Ok(fund_id)
}
