use std::env::var;

use miette::Result;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    if var("RUST_LOG").is_ok() {
        tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env())
            .init();
    }
    Ok(issue2csv::run()?)
}
