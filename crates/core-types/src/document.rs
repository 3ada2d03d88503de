//! The external JSON document exchanged with the NAV API.
//!
//! The same shape is used in both directions: it is what the fetcher decodes
//! and what the exporter writes back out.

use crate::error::ParseError;
use chrono::NaiveDate;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Date format used by the API, e.g. `31-01-2023`.
pub const DATE_FORMAT: &str = "%d-%m-%Y";

/// Number of decimal places navs are rendered with on export.
pub const NAV_EXPORT_SCALE: u32 = 2;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FundDocument {
    pub meta: SchemeMeta,
    #[serde(default)]
    pub period: String,
    #[serde(default)]
    pub data: Vec<RawNav>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemeMeta {
    pub fund_house: String,
    pub scheme_type: String,
    pub scheme_category: String,
    pub scheme_code: i64,
    pub scheme_name: String,
}

/// One `data` entry, both fields still in their text form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawNav {
    pub date: String,
    pub nav: String,
}

impl RawNav {
    pub fn new(date: impl Into<String>, nav: impl Into<String>) -> Self {
        Self {
            date: date.into(),
            nav: nav.into(),
        }
    }
}

pub fn parse_date(value: &str) -> Result<NaiveDate, ParseError> {
    NaiveDate::parse_from_str(value.trim(), DATE_FORMAT).map_err(|e| ParseError::Date {
        value: value.to_string(),
        reason: e.to_string(),
    })
}

pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

pub fn parse_nav(value: &str) -> Result<Decimal, ParseError> {
    Decimal::from_str(value.trim()).map_err(|e| ParseError::Nav {
        value: value.to_string(),
        reason: e.to_string(),
    })
}

/// Renders a nav with exactly two decimal places, rounding half away from zero.
pub fn format_nav(nav: Decimal) -> String {
    let mut rounded = nav.round_dp_with_strategy(NAV_EXPORT_SCALE, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(NAV_EXPORT_SCALE);
    rounded.to_string()
}
