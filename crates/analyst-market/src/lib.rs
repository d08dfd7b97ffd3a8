//! Market data and the analyst tool set
//!
//! Provides the seven tools the specialists call: quotes, history and company
//! information from a [`MarketData`] provider, SVG price and comparison
//! charts, headlines, and markdown report files.
//!
//! # Example
//!
//! ```no_run
//! use analyst_market::register_all;
//! use analyst_utils::AnalystConfig;
//!
//! # async fn example() -> analyst_core::Result<()> {
//! let registry = register_all(&AnalystConfig::default());
//! let price = registry
//!     .get("get_stock_price")
//!     .expect("registered")
//!     .execute(serde_json::json!({"ticker": "AAPL"}))
//!     .await?;
//! println!("{}", price["current_price"]);
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod cache;
pub mod chart;
pub mod error;
pub mod tools;
pub mod types;

pub use api::{LiveMarketData, MarketData, SampleMarketData, build_provider};
pub use cache::{CacheKey, StockCache};
pub use error::{MarketError, Result};
pub use tools::{market_tools, register_all};
pub use types::{CompanyProfile, NewsArticle, Period, PriceBar, Quote, normalize_ticker};
