use crate::repository::{check_batch_size, FundStore};
use crate::DbError;
use async_trait::async_trait;
use core_types::{Fund, FundId, NavRecord, NewFund, NewNavRecord};
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

#[derive(Debug, Default)]
struct Tables {
    funds: BTreeMap<FundId, Fund>,
    nav_records: Vec<NavRecord>,
    next_fund_id: FundId,
    next_nav_id: i64,
}

/// A process-local [`FundStore`] used for dry runs and tests.
///
/// It applies the same rules as the PostgreSQL schema that matter to the
/// loader: NAV rows must reference an existing fund, a batch is written
/// all-or-nothing, and a batch above the bind-parameter limit is refused.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    tables: Mutex<Tables>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn tables(&self) -> MutexGuard<'_, Tables> {
        self.tables.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn fund_count(&self) -> usize {
        self.tables().funds.len()
    }

    pub fn nav_count(&self) -> usize {
        self.tables().nav_records.len()
    }

    /// Returns whether a fund with this id has been committed.
    pub fn has_fund(&self, fund_id: FundId) -> bool {
        self.tables().funds.contains_key(&fund_id)
    }
}

#[async_trait]
impl FundStore for InMemoryStore {
    async fn insert_fund(&self, fund: &NewFund) -> Result<FundId, DbError> {
        let mut tables = self.tables();
        tables.next_fund_id += 1;
        let id = tables.next_fund_id;
        tables.funds.insert(id, Fund::from_new(id, fund.clone()));
        Ok(id)
    }

    async fn insert_nav_batch(&self, records: &[NewNavRecord]) -> Result<u64, DbError> {
        check_batch_size(records.len())?;

        let mut tables = self.tables();
        if let Some(orphan) = records.iter().find(|r| !tables.funds.contains_key(&r.fund_id)) {
            return Err(DbError::MissingFund(orphan.fund_id));
        }

        for record in records {
            tables.next_nav_id += 1;
            let id = tables.next_nav_id;
            tables.nav_records.push(NavRecord {
                id,
                fund_id: record.fund_id,
                date: record.date,
                nav: record.nav,
            });
        }
        Ok(records.len() as u64)
    }

    async fn truncate(&self) -> Result<(), DbError> {
        // Identities restart, as with TRUNCATE ... RESTART IDENTITY.
        *self.tables() = Tables::default();
        Ok(())
    }

    async fn fetch_fund_with_records(&self, fund_id: FundId) -> Result<(Fund, Vec<NavRecord>), DbError> {
        let tables = self.tables();
        let fund = tables.funds.get(&fund_id).cloned().ok_or(DbError::NotFound)?;

        let mut records: Vec<NavRecord> = tables
            .nav_records
            .iter()
            .filter(|r| r.fund_id == fund_id)
            .copied()
            .collect();
        records.sort_by_key(|r| (r.date, r.id));

        Ok((fund, records))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    fn new_fund() -> NewFund {
        NewFund {
            fund_house: "Axis Mutual Fund".to_string(),
            scheme_type: "Open Ended Schemes".to_string(),
            scheme_category: "Equity Scheme - Large Cap Fund".to_string(),
            scheme_code: 120465,
            scheme_name: "Axis Bluechip Fund".to_string(),
        }
    }

    fn record(fund_id: FundId, day: u32) -> NewNavRecord {
        NewNavRecord {
            fund_id,
            date: NaiveDate::from_ymd_opt(2023, 1, day).unwrap(),
            nav: dec!(10.5),
        }
    }

    #[tokio::test]
    async fn rejects_records_of_unknown_fund() {
        let store = InMemoryStore::new();
        let err = store.insert_nav_batch(&[record(42, 1)]).await.unwrap_err();
        assert!(matches!(err, DbError::MissingFund(42)));
        assert_eq!(store.nav_count(), 0);
    }

    #[tokio::test]
    async fn batch_is_all_or_nothing() {
        let store = InMemoryStore::new();
        let id = store.insert_fund(&new_fund()).await.unwrap();

        let err = store
            .insert_nav_batch(&[record(id, 1), record(id + 1, 2)])
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::MissingFund(_)));
        assert_eq!(store.nav_count(), 0);
    }

    #[tokio::test]
    async fn reads_back_records_in_date_order() {
        let store = InMemoryStore::new();
        let id = store.insert_fund(&new_fund()).await.unwrap();
        store.insert_nav_batch(&[record(id, 3)]).await.unwrap();
        store.insert_nav_batch(&[record(id, 1), record(id, 2)]).await.unwrap();

        let (fund, records) = store.fetch_fund_with_records(id).await.unwrap();
        assert_eq!(fund.scheme_code, 120465);
        let days: Vec<u32> = records.iter().map(|r| chrono::Datelike::day(&r.date)).collect();
        assert_eq!(days, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn truncate_restarts_identities() {
        let store = InMemoryStore::new();
        let first = store.insert_fund(&new_fund()).await.unwrap();
        store.insert_nav_batch(&[record(first, 1)]).await.unwrap();

        store.truncate().await.unwrap();
        assert_eq!(store.fund_count(), 0);
        assert_eq!(store.nav_count(), 0);
        assert!(matches!(store.fetch_fund_with_records(first).await, Err(DbError::NotFound)));

        let second = store.insert_fund(&new_fund()).await.unwrap();
        assert_eq!(second, first);
    }
}
