mod extract;
mod fetcher;

pub use extract::{extract_text, truncate_text};
pub use fetcher::PageFetcher;
