//! List query pipeline
//!
//! Turns a list request's query string into a filter, projection, sort order
//! and page window, runs it against the store and shapes the response.

mod advanced;
mod filter;
mod pager;
mod populate;
mod request;

pub use advanced::{advanced_results, AdvancedResults};
pub use filter::{parse_filter, Filter, GeoWithin, Operator, Predicate};
pub use pager::{PageRef, Pagination};
pub use populate::{populate, PopulateSpec, BOOTCAMP_SUMMARY, COURSE_BOOTCAMP};
pub use request::{QueryRequest, SortDirection, SortKey};
