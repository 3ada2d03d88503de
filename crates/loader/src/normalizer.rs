use core_types::{
    parse_date, parse_nav, DatePolicy, FundId, NavPolicy, NavPoint, NewNavRecord, ParseError, RawNav,
};
use rust_decimal::Decimal;
use tracing::warn;

/// Turns the text records of a fetched document into typed NAV points.
#[derive(Debug, Clone, Copy, Default)]
pub struct Normalizer {
    date_policy: DatePolicy,
    nav_policy: NavPolicy,
}

/// The result of normalizing a whole document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Normalized {
    pub points: Vec<NavPoint>,
    /// Records dropped under [`DatePolicy::Skip`].
    pub skipped: usize,
}

impl Normalized {
    /// Attaches the committed parent id to every point, keeping source order.
    pub fn bind(self, fund_id: FundId) -> Vec<NewNavRecord> {
        self.points.into_iter().map(|p| p.bind(fund_id)).collect()
    }
}

impl Normalizer {
    pub fn new(date_policy: DatePolicy, nav_policy: NavPolicy) -> Self {
        Self {
            date_policy,
            nav_policy,
        }
    }

    pub fn normalize_record(&self, raw: &RawNav) -> Result<NavPoint, ParseError> {
        let date = parse_date(&raw.date)?;
        let nav = match (parse_nav(&raw.nav), self.nav_policy) {
            (Ok(nav), _) => nav,
            (Err(e), NavPolicy::Strict) => return Err(e),
            (Err(e), NavPolicy::ZeroOnError) => {
                warn!(date = %raw.date, error = %e, "Unparsable nav stored as zero");
                Decimal::ZERO
            }
        };
        Ok(NavPoint { date, nav })
    }

    /// Normalizes every record, in order.
    ///
    /// A bad date aborts the whole step unless the date policy is `Skip`. Nav
    /// failures follow the nav policy and are never skipped.
    pub fn normalize(&self, records: &[RawNav]) -> Result<Normalized, ParseError> {
        let mut normalized = Normalized {
            points: Vec::with_capacity(records.len()),
            skipped: 0,
        };

        for raw in records {
            match self.normalize_record(raw) {
                Ok(point) => normalized.points.push(point),
                Err(e @ ParseError::Date { .. }) if self.date_policy.skips_bad_records() => {
                    warn!(error = %e, "Skipping record with malformed date");
                    normalized.skipped += 1;
                }
                Err(e) => return Err(e),
            }
        }

        Ok(normalized)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    fn raw(date: &str, nav: &str) -> RawNav {
        RawNav::new(date, nav)
    }

    #[test]
    fn converts_text_fields() {
        let point = Normalizer::default().normalize_record(&raw("01-01-2023", "10.5000")).unwrap();
        assert_eq!(point.date, NaiveDate::from_ymd_opt(2023, 1, 1).unwrap());
        assert_eq!(point.nav, dec!(10.5));
    }

    #[test]
    fn bad_date_aborts_by_default() {
        let records = vec![raw("01-01-2023", "10"), raw("2023/01/01", "11")];
        let err = Normalizer::default().normalize(&records).unwrap_err();
        assert_eq!(err.field(), "date");
        assert_eq!(err.value(), "2023/01/01");
    }

    #[test]
    fn bad_date_is_dropped_when_skipping() {
        let records = vec![raw("01-01-2023", "10"), raw("bogus", "11"), raw("03-01-2023", "12")];
        let normalized = Normalizer::new(DatePolicy::Skip, NavPolicy::Strict)
            .normalize(&records)
            .unwrap();
        assert_eq!(normalized.skipped, 1);
        let navs: Vec<Decimal> = normalized.points.iter().map(|p| p.nav).collect();
        assert_eq!(navs, vec![dec!(10), dec!(12)]);
    }

    #[test]
    fn bad_nav_is_an_error_in_strict_mode() {
        let err = Normalizer::default().normalize(&[raw("01-01-2023", "N.A.")]).unwrap_err();
        assert_eq!(err.field(), "nav");
        assert_eq!(err.value(), "N.A.");
    }

    #[test]
    fn bad_nav_becomes_zero_in_compat_mode() {
        let normalized = Normalizer::new(DatePolicy::Abort, NavPolicy::ZeroOnError)
            .normalize(&[raw("01-01-2023", "N.A.")])
            .unwrap();
        assert_eq!(normalized.points[0].nav, Decimal::ZERO);
    }

    #[test]
    fn bad_nav_is_not_skipped_by_date_policy() {
        let result = Normalizer::new(DatePolicy::Skip, NavPolicy::Strict).normalize(&[raw("01-01-2023", "x")]);
        assert!(matches!(result, Err(ParseError::Nav { .. })));
    }

    #[test]
    fn bind_keeps_order_and_sets_parent() {
        let normalized = Normalizer::default()
            .normalize(&[raw("02-01-2023", "2"), raw("01-01-2023", "1")])
            .unwrap();
        let records = normalized.bind(9);
        assert!(records.iter().all(|r| r.fund_id == 9));
        assert_eq!(records[0].nav, dec!(2));
        assert_eq!(records[1].nav, dec!(1));
    }
}
