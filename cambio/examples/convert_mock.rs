//! End-to-end demo against the deterministic mock source: direct,
//! reciprocal, and pivot-bridged conversions, plus a historical export.
//!
//! Run with: `cargo run -p cambio --example convert_mock`

use std::sync::Arc;

use cambio::{Exchange, HistoricalWriter, SourceBuilder, TtlConfig};
use cambio_mock::MockSource;

#[path = "support/memory_store.rs"]
mod memory_store;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "cambio=debug".into()),
        )
        .init();

    let source = SourceBuilder::new(Arc::new(MockSource::new()))
        .with_timed_cache(&TtlConfig::default())
        .build();
    let exchange = Arc::new(Exchange::builder().with_source(source).build()?);

    let usd = exchange.registry().parse("USD")?;
    let cad = exchange.registry().parse("CAD")?;
    let eur = exchange.registry().parse("EUR")?;

    println!("100 USD -> CAD: {:.2}", exchange.convert(100.0, &usd, &cad, None).await?);
    println!("100 CAD -> USD: {:.2}", exchange.convert(100.0, &cad, &usd, None).await?);

    let bridged = exchange.get_rate(&cad, &eur, None).await?;
    println!(
        "CAD -> EUR via {}: {:.6}",
        bridged.derived().unwrap_or("direct quote"),
        bridged.rate()
    );

    let store = Arc::new(memory_store::MemoryStore::default());
    let writer = HistoricalWriter::new(exchange, store.clone()).reciprocal_rates(true);
    let rows = writer.write_rates(None).await?;
    println!("exported {} historical rows", rows.len());

    Ok(())
}
