//! Administrative operations: clearing the tables and exporting a fund.

use crate::error::LoadError;
use core_types::{format_date, format_nav, Fund, FundDocument, FundId, NavRecord, RawNav};
use database::FundStore;
use tracing::info;

/// `period` written into exported documents.
pub const EXPORT_PERIOD: &str = "monthly";

/// Removes every fund and NAV record.
pub async fn reset(store: &dyn FundStore) -> Result<(), LoadError> {
    store.truncate().await.map_err(LoadError::Store)?;
    info!("Tables reset");
    Ok(())
}

/// Re-encodes a stored fund in the document shape the API serves.
pub fn to_document(fund: &Fund, records: &[NavRecord]) -> FundDocument {
    FundDocument {
        meta: fund.to_meta(),
        period: EXPORT_PERIOD.to_string(),
        data: records
            .iter()
            .map(|r| RawNav::new(format_date(r.date), format_nav(r.nav)))
            .collect(),
    }
}

pub async fn export_document(store: &dyn FundStore, fund_id: FundId) -> Result<FundDocument, LoadError> {
    let (fund, records) = store
        .fetch_fund_with_records(fund_id)
        .await
        .map_err(LoadError::Store)?;
    info!(fund_id, records = records.len(), "Exporting fund");
    Ok(to_document(&fund, &records))
}

/// Exports a fund as pretty-printed JSON.
pub async fn export_json(store: &dyn FundStore, fund_id: FundId) -> Result<String, LoadError> {
    let document = export_document(store, fund_id).await?;
    Ok(serde_json::to_string_pretty(&document)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    #[test]
    fn document_uses_external_formats() {
        let fund = Fund {
            id: 3,
            fund_house: "House".to_string(),
            scheme_type: "Type".to_string(),
            scheme_category: "Category".to_string(),
            scheme_code: 42,
            scheme_name: "Scheme".to_string(),
        };
        let records = vec![NavRecord {
            id: 1,
            fund_id: 3,
            date: NaiveDate::from_ymd_opt(2023, 1, 1).unwrap(),
            nav: dec!(10.5000),
        }];

        let document = to_document(&fund, &records);
        assert_eq!(document.meta.scheme_code, 42);
        assert_eq!(document.period, "monthly");
        assert_eq!(document.data, vec![RawNav::new("01-01-2023", "10.50")]);
    }
}
