/*
[INPUT]:  Raw WebSocket text frames
[OUTPUT]: Parsed protocol frames and typed market data payloads
[POS]:    WebSocket layer - message parsing and validation
[UPDATE]: When adding new message types or changing format
*/

use serde::{Deserialize, Serialize};

use crate::types::DepthLevel;

/// Topic prefix for the top-5 order book channel
pub const DEPTH5_TOPIC_PREFIX: &str = "/contractMarket/level2Depth5:";

/// Protocol-level frame as sent by the server
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ServerFrame {
    Welcome {
        #[serde(default)]
        id: Option<String>,
    },
    Ack {
        #[serde(default)]
        id: Option<String>,
    },
    Pong {
        #[serde(default)]
        id: Option<String>,
    },
    Message {
        topic: String,
        #[serde(default)]
        subject: Option<String>,
        data: serde_json::Value,
    },
    Error {
        #[serde(default)]
        id: Option<String>,
        #[serde(default)]
        code: Option<i64>,
        #[serde(default)]
        data: Option<serde_json::Value>,
    },
    #[serde(other)]
    Unknown,
}

/// Top-5 order book payload of `/contractMarket/level2Depth5:{symbol}`
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Depth5Data {
    pub bids: Vec<DepthLevel>,
    pub asks: Vec<DepthLevel>,
    #[serde(default)]
    pub sequence: Option<u64>,
    /// Milliseconds
    #[serde(default)]
    pub timestamp: Option<i64>,
    #[serde(default)]
    pub ts: Option<i64>,
}

pub fn depth5_topic(symbol: &str) -> String {
    format!("{DEPTH5_TOPIC_PREFIX}{symbol}")
}

/// Symbol part of a `/channel:SYMBOL` topic
pub fn topic_symbol(topic: &str) -> Option<&str> {
    topic.rsplit_once(':').map(|(_, symbol)| symbol)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_depth5_message() {
        let raw = r#"{
            "type": "message",
            "topic": "/contractMarket/level2Depth5:XBTUSDTM",
            "subject": "level2",
            "data": {
                "bids": [["64000.1", 12], ["64000.0", 3]],
                "asks": [["64000.5", 7]],
                "sequence": 1697895963339,
                "timestamp": 1700000000000,
                "ts": 1700000000000
            }
        }"#;

        let frame: ServerFrame = serde_json::from_str(raw).unwrap();
        let ServerFrame::Message { topic, data, .. } = frame else {
            panic!("expected message frame");
        };
        assert_eq!(topic_symbol(&topic), Some("XBTUSDTM"));

        let depth: Depth5Data = serde_json::from_value(data).unwrap();
        assert_eq!(depth.bids.len(), 2);
        assert_eq!(depth.asks.len(), 1);
        assert_eq!(depth.sequence, Some(1_697_895_963_339));
    }

    #[test]
    fn test_parse_control_frames() {
        let welcome: ServerFrame = serde_json::from_str(r#"{"id":"abc","type":"welcome"}"#).unwrap();
        assert!(matches!(welcome, ServerFrame::Welcome { .. }));

        let error: ServerFrame =
            serde_json::from_str(r#"{"id":"1","type":"error","code":404,"data":"topic not found"}"#)
                .unwrap();
        assert!(matches!(error, ServerFrame::Error { code: Some(404), .. }));

        let other: ServerFrame = serde_json::from_str(r#"{"type":"notice"}"#).unwrap();
        assert!(matches!(other, ServerFrame::Unknown));
    }

    #[test]
    fn test_depth5_topic() {
        assert_eq!(depth5_topic("XBTUSDTM"), "/contractMarket/level2Depth5:XBTUSDTM");
    }
}
