pub mod api;
pub mod config;
pub mod error;
pub mod sync;
pub mod view;

pub use api::ApiClient;
pub use config::ClientConfig;
pub use error::ClientError;
