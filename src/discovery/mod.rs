//! Target discovery.
//!
//! Turns scan targets into [`HttpItem`](crate::types::HttpItem)s:
//! - remote URLs via the HTTP fetcher
//! - local files via [`HttpItem::from_file`](crate::types::HttpItem::from_file)

pub mod http_fetcher;

pub use http_fetcher::{infer_mime_type, HttpFetcher};
