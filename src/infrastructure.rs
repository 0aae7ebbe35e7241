//! Infrastructure layer: HTTP, HTML parsing, retailer registry, configuration
//! and logging.

pub mod config; // Configuration file and defaults
pub mod http_client;
pub mod logging; // Logging infrastructure
pub mod parsing;
pub mod sites; // Built-in retailers and the site registry

// Re-export commonly used items
pub use config::{AppConfig, ConfigManager, FetcherConfig, LoggingConfig, ScraperConfig};
pub use http_client::HttpClient;
pub use logging::{bootstrap_logging, get_log_directory, init_logging_with_config};
pub use parsing::{ExtractedProduct, ParsingConfig, ProductPageExtractor};
pub use sites::{CompiledSite, SiteRegistry};
