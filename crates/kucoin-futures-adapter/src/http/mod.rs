/*
[INPUT]:  HTTP client configuration and API endpoints
[OUTPUT]: HTTP responses and typed API results
[POS]:    HTTP layer - REST API communication
[UPDATE]: When adding new endpoints or changing client behavior
*/

pub mod client;
pub mod error;
pub mod public;
pub mod signature;
pub mod user;

pub use error::{KucoinError, Result};
pub use signature::{RequestSigner, SignedHeaders};

pub use client::{ClientConfig, Credentials, KucoinFuturesClient, FUTURES_BASE_URL};
