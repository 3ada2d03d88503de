pub mod document;
pub mod enums;
pub mod error;
pub mod fund;
pub mod nav;

// Re-export the core types to provide a clean public API.
pub use document::{format_date, format_nav, parse_date, parse_nav, FundDocument, RawNav, SchemeMeta};
pub use enums::{DatePolicy, NavPolicy};
pub use error::ParseError;
pub use fund::{Fund, FundId, NewFund};
pub use nav::{NavPoint, NavRecord, NewNavRecord};
