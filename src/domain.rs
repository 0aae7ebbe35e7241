//! Domain module - core entities and contracts
//!
//! Modern Rust module organization (Rust 2018+ style):
//! - Each module is its own file in the domain/ directory
//! - Public exports are defined here for convenience

pub mod errors;
pub mod price_result;
pub mod query;
pub mod services;
pub mod site_adapter;

pub use errors::{ScrapeError, ScrapeResult};
pub use price_result::{PriceResult, PriceSource, ResultSet};
pub use query::{Query, variants};
pub use services::{FetchedPage, PageFetcher, PARSEABLE_STATUSES};
pub use site_adapter::{LinkHint, SiteAdapter};
