/*
[INPUT]:  Crate modules and public type definitions
[OUTPUT]: Public KuCoin Futures adapter crate surface
[POS]:    Crate root - module wiring
[UPDATE]: When public modules or exports change
*/

pub mod http;
pub mod types;
pub mod ws;

// Re-export commonly used types from http
pub use http::{
    ClientConfig,
    Credentials,
    FUTURES_BASE_URL,
    KucoinError,
    KucoinFuturesClient,
    RequestSigner,
    Result,
};

// Re-export all types
pub use types::*;

// Re-export commonly used types from ws
pub use ws::{
    Depth5Data,
    KucoinWebSocket,
    WebSocketMessage,
};
