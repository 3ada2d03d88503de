use crate::fund::FundId;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A validated price observation that is not bound to a fund yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NavPoint {
    pub date: NaiveDate,
    pub nav: Decimal,
}

impl NavPoint {
    /// Binds the point to a committed parent fund.
    pub fn bind(self, fund_id: FundId) -> NewNavRecord {
        NewNavRecord {
            fund_id,
            date: self.date,
            nav: self.nav,
        }
    }
}

/// A NAV row ready to be inserted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewNavRecord {
    pub fund_id: FundId,
    pub date: NaiveDate,
    pub nav: Decimal,
}

/// A row of the `nav_records` table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct NavRecord {
    pub id: i64,
    pub fund_id: FundId,
    pub date: NaiveDate,
    pub nav: Decimal,
}
