//! Page text cleanup and chunking.

mod chunker;
mod normalize;

pub use chunker::{TextChunk, chunk_document, chunk_text};
pub use normalize::{normalize_document, normalize_page_text};
