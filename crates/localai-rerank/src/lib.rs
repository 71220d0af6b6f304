pub mod client;
pub mod config;
pub mod types;

pub use client::{RerankClient, build_compressed_documents};
pub use config::*;
pub use localai_core::{Document, DocumentCompressor, HttpClients, ProviderError};
pub use types::*;
