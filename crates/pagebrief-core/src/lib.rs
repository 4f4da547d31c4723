pub mod config;
pub mod error;
pub mod history;
pub mod page;
pub mod summarize;

pub use config::AppConfig;
pub use error::{BackendError, Error, Result};
pub use history::{HistoryRecord, HistoryStats, HistoryStore, NewHistoryRecord};
pub use page::PageFetcher;
pub use summarize::Summarizer;
