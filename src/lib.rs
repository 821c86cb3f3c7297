pub mod config;
pub mod differ;
pub mod extractor;
pub mod models;
pub mod notifier;
pub mod plugins;
pub mod price;
pub mod scraper;
pub mod store;
pub mod utils;
pub mod watcher;

// Re-export commonly used types
pub use config::AppConfig;
pub use differ::diff;
pub use extractor::{ExtractionReport, ProductExtractor};
pub use models::{ChangeSet, PriceChange, ProductRecord, Snapshot};
pub use notifier::{DeliveryReport, Notifier};
pub use plugins::{MessageChannel, MessageFormat};
// `scraper` alone is ambiguous with the scraper crate
pub use self::scraper::PageFetcher;
pub use store::{JsonFileStore, MemoryStore, SnapshotStore};
pub use utils::error::AppError;
pub use watcher::{RunOptions, RunReport, RunState, Watcher};

pub type Result<T> = std::result::Result<T, AppError>;
