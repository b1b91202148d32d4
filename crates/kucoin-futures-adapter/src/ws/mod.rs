/*
[INPUT]:  Bullet tokens and order book subscriptions
[OUTPUT]: Real-time top-of-book updates
[POS]:    WebSocket layer - real-time data streams
[UPDATE]: When adding new channels or changing connection logic
*/

pub mod client;
pub mod message;

pub use client::{KucoinWebSocket, WebSocketMessage};
pub use message::{Depth5Data, ServerFrame, depth5_topic, topic_symbol};
