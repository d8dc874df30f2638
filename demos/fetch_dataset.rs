//! Fetch a filtered IMF dataset and print it as records
//!
//! Run with:
//! ```bash
//! IMF_APP_NAME=my-research-app cargo run --example fetch_dataset
//! ```
//!
//! Set `LOG_FORMAT=json` for JSON logs and `IMF_CACHE_DIR` to cache responses.

use anyhow::Context;
use imf_data_client::{ClientConfig, DatasetQuery, ImfClient};
use tracing_subscriber::EnvFilter;

fn init_tracing() {
    let json_format = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("imf_data_client=info"));

    if json_format {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = ClientConfig::from_env().context("invalid IMF_* environment settings")?;
    let client = ImfClient::with_config(config);

    let schema = client.parameters("PCPS").await?;
    println!("PCPS dimensions:");
    for dimension in schema.dimensions() {
        println!(
            "  {:<14} {:>4} codes  {}",
            dimension.name,
            dimension.codes.len(),
            dimension.description.as_deref().unwrap_or("")
        );
    }

    let query = DatasetQuery::new("PCPS")
        .filter("freq", ["A"])
        .filter("ref_area", ["W00"])
        .filter("indicator", ["PGOLD", "POILAPSP"])
        .start_year("2015")
        .end_year("2020")
        .with_metadata(true);

    let response = client.dataset(&query).await?;
    println!("\nRequested {}", response.url);
    for warning in &response.warnings {
        println!("warning: {warning}");
    }

    if let Some(table) = response.data.table() {
        println!("\n{}", table.columns.join("\t"));
        for record in table {
            let row: Vec<String> = table
                .columns
                .iter()
                .map(|c| record.text(c).unwrap_or_default())
                .collect();
            println!("{}", row.join("\t"));
        }
    }

    if let Some(metadata) = response.metadata {
        println!("\nPrepared {} by {} ({})", metadata.timestamp, metadata.custodian, metadata.custodian_url);
    }

    Ok(())
}
