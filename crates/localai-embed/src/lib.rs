pub mod client;
pub mod config;

pub use client::EmbeddingClient;
pub use config::*;
pub use localai_core::{Embeddings, HttpClients, ProviderError};
