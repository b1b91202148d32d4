/*
[INPUT]:  Public API exports for kucoin-futures-demo crate
[OUTPUT]: Module declarations and public re-exports
[POS]:    Crate root - library entry point
[UPDATE]: When adding new modules or public exports
*/

pub mod config;
pub mod display;
pub mod gateway;
pub mod market_data;
pub mod session;

// Re-export main types for convenience
pub use config::{ConfigError, DemoConfig};
pub use display::{ConsoleReporter, DisplayRecord, Reporter};
pub use gateway::{ClientFactory, KucoinClientFactory, MarketGateway, OrderBookFeed};
pub use market_data::KucoinFeed;
pub use session::{Session, SessionError, SessionReport, Step, StepPolicy, WatchOutcome};
