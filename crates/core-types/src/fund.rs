use crate::document::SchemeMeta;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Store-assigned identifier of a row in `funds`.
pub type FundId = i64;

/// A fund that has not been persisted yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewFund {
    pub fund_house: String,
    pub scheme_type: String,
    pub scheme_category: String,
    pub scheme_code: i64,
    pub scheme_name: String,
}

/// A row of the `funds` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Fund {
    pub id: FundId,
    pub fund_house: String,
    pub scheme_type: String,
    pub scheme_category: String,
    pub scheme_code: i64,
    pub scheme_name: String,
}

impl Fund {
    pub fn from_new(id: FundId, fund: NewFund) -> Self {
        Self {
            id,
            fund_house: fund.fund_house,
            scheme_type: fund.scheme_type,
            scheme_category: fund.scheme_category,
            scheme_code: fund.scheme_code,
            scheme_name: fund.scheme_name,
        }
    }

    /// The `meta` block of the external document describing this fund.
    pub fn to_meta(&self) -> SchemeMeta {
        SchemeMeta {
            fund_house: self.fund_house.clone(),
            scheme_type: self.scheme_type.clone(),
            scheme_category: self.scheme_category.clone(),
            scheme_code: self.scheme_code,
            scheme_name: self.scheme_name.clone(),
        }
    }
}

impl From<SchemeMeta> for NewFund {
    fn from(meta: SchemeMeta) -> Self {
        Self {
            fund_house: meta.fund_house,
            scheme_type: meta.scheme_type,
            scheme_category: meta.scheme_category,
            scheme_code: meta.scheme_code,
            scheme_name: meta.scheme_name,
        }
    }
}
