//! Stock Search - natural-language search over stock descriptions
//!
//! Embeds a free-text query with a sentence-transformer model and retrieves the
//! nearest stock descriptions from a hosted Pinecone index. The library holds the
//! query pipeline and its adapters; the `server` module hosts it over HTTP.

pub mod config;
pub mod embeddings;
pub mod error;
pub mod index;
pub mod logs;
pub mod observer;
pub mod pipeline;
pub mod presentation;
pub mod record;
pub mod server;

pub use error::SearchError;
