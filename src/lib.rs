//! Price Scout - multi-retailer product price extraction
//!
//! Given a free-text product query, finds the matching product page on each
//! registered Vietnamese retailer, fetches it and extracts a normalized price,
//! title and promotion text. Every site yields exactly one `PriceResult`.
//!
//! ```no_run
//! # async fn demo() -> anyhow::Result<()> {
//! use price_scout::{AppConfig, PriceScraper};
//!
//! let scraper = PriceScraper::from_config(&AppConfig::default())?;
//! let results = scraper.scrape_all("Tivi LG 65UQ7550").await?;
//! for result in &results {
//!     println!("{}: {:?}", result.site, result.price);
//! }
//! # Ok(())
//! # }
//! ```

// Module declarations
pub mod application;
pub mod domain;
pub mod infrastructure;
pub mod utils;

pub use application::PriceScraper;
pub use domain::{PriceResult, PriceSource, Query, ResultSet, ScrapeError, ScrapeResult, SiteAdapter};
pub use infrastructure::{AppConfig, ConfigManager, SiteRegistry};
