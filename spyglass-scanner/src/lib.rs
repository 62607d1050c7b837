pub mod crawler;
pub mod error;
pub mod extractor;
pub mod fetcher;
pub mod surface;

pub use crawler::Crawler;
pub use error::{FetchFailure, ScanError};
pub use extractor::{Extraction, Extractor, HtmlExtractor};
pub use fetcher::{FetchRequest, FetchResponse, Fetcher, HttpFetcher};
pub use surface::{DiscoveredSurface, Form, FrontierEntry};
