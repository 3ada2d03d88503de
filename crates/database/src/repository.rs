use crate::DbError;
use async_trait::async_trait;
use core_types::{Fund, FundId, NavRecord, NewFund, NewNavRecord};
use sqlx::postgres::{PgPool, Postgres};
use sqlx::{QueryBuilder, Transaction};

/// PostgreSQL refuses statements with more bind parameters than this.
pub const PG_BIND_LIMIT: usize = u16::MAX as usize;

/// Bind parameters used by one row of the NAV insert (fund_id, date, nav).
pub const NAV_BIND_PARAMS: usize = 3;

/// Issued first in the export transaction so its reads share one snapshot.
const SNAPSHOT_READ: &str = "SET TRANSACTION ISOLATION LEVEL REPEATABLE READ, READ ONLY";

/// The store capabilities the loading pipeline needs.
///
/// Each write owns its transaction for the duration of the call: it begins,
/// writes, and commits, and an uncommitted transaction is rolled back when it
/// goes out of scope. Implementations must be safe to call from many tasks at
/// once.
#[async_trait]
pub trait FundStore: Send + Sync {
    /// Inserts the parent fund and returns its store-assigned id once committed.
    async fn insert_fund(&self, fund: &NewFund) -> Result<FundId, DbError>;

    /// Inserts all records with a single multi-row statement in one transaction.
    /// Returns the number of rows written.
    async fn insert_nav_batch(&self, records: &[NewNavRecord]) -> Result<u64, DbError>;

    /// Removes every fund and NAV record.
    async fn truncate(&self) -> Result<(), DbError>;

    /// Reads a fund and all its NAV records, ordered by date.
    async fn fetch_fund_with_records(&self, fund_id: FundId) -> Result<(Fund, Vec<NavRecord>), DbError>;
}

/// Checks a batch against the bind-parameter ceiling of the server.
pub fn check_batch_size(rows: usize) -> Result<(), DbError> {
    let params = rows * NAV_BIND_PARAMS;
    if params > PG_BIND_LIMIT {
        return Err(DbError::BatchTooLarge {
            rows,
            params,
            limit: PG_BIND_LIMIT,
        });
    }
    Ok(())
}

/// The `DbRepository` is the PostgreSQL implementation of [`FundStore`].
/// It encapsulates all SQL queries and data access logic.
#[derive(Debug, Clone)]
pub struct DbRepository {
    pool: PgPool,
}

impl DbRepository {
    /// Creates a new `DbRepository` with a shared database connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn begin(&self) -> Result<Transaction<'static, Postgres>, DbError> {
        self.pool.begin().await.map_err(DbError::BeginTransaction)
    }
}

/// Builds `INSERT INTO nav_records ... VALUES (..), (..)` for the whole batch.
pub(crate) fn nav_insert_query(records: &[NewNavRecord]) -> QueryBuilder<'_, Postgres> {
    let mut builder = QueryBuilder::new("INSERT INTO nav_records (fund_id, date, nav) ");
    builder.push_values(records, |mut row, record| {
        row.push_bind(record.fund_id)
            .push_bind(record.date)
            .push_bind(record.nav);
    });
    builder
}

async fn rollback(tx: Transaction<'static, Postgres>) {
    if let Err(e) = tx.rollback().await {
        tracing::warn!(error = %e, "Rollback failed");
    }
}

#[async_trait]
impl FundStore for DbRepository {
    async fn insert_fund(&self, fund: &NewFund) -> Result<FundId, DbError> {
        let mut tx = self.begin().await?;

        let inserted = sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO funds (fund_house, scheme_type, scheme_category, scheme_code, scheme_name)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id
            "#,
        )
        .bind(&fund.fund_house)
        .bind(&fund.scheme_type)
        .bind(&fund.scheme_category)
        .bind(fund.scheme_code)
        .bind(&fund.scheme_name)
        .fetch_one(&mut *tx) // Note: must use the transaction object `tx` here
        .await;

        let fund_id = match inserted {
            Ok(id) => id,
            Err(source) => {
                rollback(tx).await;
                return Err(DbError::Insert { table: "funds", source });
            }
        };

        // A failed commit leaves the outcome unknown, so it is reported as is.
        tx.commit().await.map_err(DbError::Commit)?;
        Ok(fund_id)
    }

    async fn insert_nav_batch(&self, records: &[NewNavRecord]) -> Result<u64, DbError> {
        if records.is_empty() {
            return Ok(0);
        }
        check_batch_size(records.len())?;

        let mut tx = self.begin().await?;

        let mut query = nav_insert_query(records);
        let result = match query.build().execute(&mut *tx).await {
            Ok(result) => result,
            Err(source) => {
                rollback(tx).await;
                return Err(DbError::Insert {
                    table: "nav_records",
                    source,
                });
            }
        };

        tx.commit().await.map_err(DbError::Commit)?;
        Ok(result.rows_affected())
    }

    async fn truncate(&self) -> Result<(), DbError> {
        let mut tx = self.begin().await?;

        // The foreign key is deferrable; checks are switched back on before commit.
        let statements = [
            "SET CONSTRAINTS ALL DEFERRED",
            "TRUNCATE TABLE nav_records, funds RESTART IDENTITY",
            "SET CONSTRAINTS ALL IMMEDIATE",
        ];
        for statement in statements {
            if let Err(e) = sqlx::query(statement).execute(&mut *tx).await {
                rollback(tx).await;
                return Err(DbError::Truncate(e));
            }
        }

        tx.commit().await.map_err(DbError::Commit)?;
        tracing::info!("Truncated funds and nav_records");
        Ok(())
    }

    async fn fetch_fund_with_records(&self, fund_id: FundId) -> Result<(Fund, Vec<NavRecord>), DbError> {
        let mut tx = self.begin().await?;
        // Both reads see one snapshot, even while a reset or load is running.
        sqlx::query(SNAPSHOT_READ).execute(&mut *tx).await?;

        let fund = sqlx::query_as::<_, Fund>(
            "SELECT id, fund_house, scheme_type, scheme_category, scheme_code, scheme_name FROM funds WHERE id = $1",
        )
        .bind(fund_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(DbError::NotFound)?;

        let records = sqlx::query_as::<_, NavRecord>(
            "SELECT id, fund_id, date, nav FROM nav_records WHERE fund_id = $1 ORDER BY date ASC, id ASC",
        )
        .bind(fund_id)
        .fetch_all(&mut *tx)
        .await?;

        tx.commit().await.map_err(DbError::Commit)?;
        Ok((fund, records))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    fn record(day: u32) -> NewNavRecord {
        NewNavRecord {
            fund_id: 7,
            date: NaiveDate::from_ymd_opt(2023, 1, day).unwrap(),
            nav: dec!(10.5),
        }
    }

    #[test]
    fn nav_insert_is_a_single_multi_row_statement() {
        let records = vec![record(1), record(2)];
        let query = nav_insert_query(&records);
        assert_eq!(
            query.sql(),
            "INSERT INTO nav_records (fund_id, date, nav) VALUES ($1, $2, $3), ($4, $5, $6)"
        );
    }

    #[test]
    fn export_reads_are_a_single_read_only_snapshot() {
        assert!(SNAPSHOT_READ.starts_with("SET TRANSACTION"));
        assert!(SNAPSHOT_READ.contains("REPEATABLE READ"));
        assert!(SNAPSHOT_READ.contains("READ ONLY"));
    }

    #[test]
    fn batch_size_is_bounded_by_bind_parameters() {
        assert!(check_batch_size(PG_BIND_LIMIT / NAV_BIND_PARAMS).is_ok());

        let rows = PG_BIND_LIMIT / NAV_BIND_PARAMS + 1;
        match check_batch_size(rows) {
            Err(DbError::BatchTooLarge { rows: r, params, limit }) => {
                assert_eq!(r, rows);
                assert_eq!(params, rows * 3);
                assert_eq!(limit, 65_535);
            }
            other => panic!("expected BatchTooLarge, got {:?}", other),
        }
    }
}
