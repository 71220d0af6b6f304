pub mod document;
pub mod error;
pub mod settings;
pub mod traits;
pub mod transport;

pub use document::*;
pub use error::ProviderError;
pub use settings::*;
pub use traits::*;
pub use transport::*;

pub use reqwest;
