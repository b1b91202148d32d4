/*
[INPUT]:  Symbol identifier (e.g., "XBTUSDTM")
[OUTPUT]: Market data (contract stats, depth, catalog)
[POS]:    Examples - public market data queries
[UPDATE]: When adding new market data endpoints
*/

use kucoin_futures_adapter::*;

/// Example: query public market data (no credentials required)
#[tokio::main]
async fn main() {
    println!("=== KuCoin Futures Market Data Example ===\n");

    let mut client = match KucoinFuturesClient::new() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to create client: {}", e);
            return;
        }
    };

    let symbol = std::env::args().nth(1).unwrap_or_else(|| "XBTUSDTM".to_string());

    println!("Querying contract {}...", symbol);
    match client.get_contract(&symbol).await {
        Ok(contract) => println!(
            "✓ last={:?} high={:?} low={:?} change={:?}",
            contract.last_trade_price, contract.high_price, contract.low_price, contract.price_chg_pct
        ),
        Err(e) => println!("✗ Error: {}", e),
    }

    println!("\nQuerying depth book for {}...", symbol);
    match client.get_depth_book(&symbol, 5).await {
        Ok(book) => {
            for level in &book.bids {
                println!("  bid {} x {}", level.price(), level.size());
            }
            for level in &book.asks {
                println!("  ask {} x {}", level.price(), level.size());
            }
        }
        Err(e) => println!("✗ Error: {}", e),
    }

    println!("\nQuerying active contracts...");
    match client.get_active_contracts().await {
        Ok(contracts) => println!("✓ {} active contracts", contracts.len()),
        Err(e) => println!("✗ Error: {}", e),
    }

    client.close();
}
