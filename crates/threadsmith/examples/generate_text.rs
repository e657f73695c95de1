//! Turn a block of text into a thread, logging every pipeline event
//!
//! Run with `RUST_LOG=threadsmith=debug cargo run --example generate_text`.
//! Set `REDIS_URL` to use a shared store; without it the local store is used.

use std::sync::Arc;
use threadsmith::prelude::*;
use tracing_subscriber::EnvFilter;

const TEXT: &str = "Fixed-window rate limiting counts every request in a time bucket against \
one counter. When the bucket expires the counter resets in a single step. It is cheap to \
run on a shared store because an increment and a conditional expiry fit in one round trip. \
The price is a burst at window boundaries: a client can spend its full allowance at the end \
of one window and again at the start of the next.";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("threadsmith=debug")),
        )
        .with_target(false)
        .init();

    let settings = Settings::from_env()?;
    let metrics: Arc<dyn ServiceMetrics> =
        Arc::new(TracingMetrics::new().with_service_name("generate-text"));
    let store = threadsmith::connect_with_metrics(&settings.store_config(), metrics.clone()).await;

    let pipeline = GenerationPipeline::builder(settings, store)
        .metrics(metrics)
        .build();
    let ctx = RequestContext::new("203.0.113.7");

    match pipeline.generate(&GenerateRequest::text(TEXT), &ctx).await {
        Ok(response) => {
            for tweet in &response.tweets {
                println!("{}\n", tweet.content);
            }
            println!("{}", serde_json::to_string_pretty(&pipeline.usage(&ctx).await?)?);
        }
        Err(err) => println!("{}", serde_json::to_string_pretty(&err.to_failure())?),
    }

    // Second call is served from the cache
    let again = pipeline.generate(&GenerateRequest::text(TEXT), &ctx).await?;
    println!("cached: {}", again.cached);

    Ok(())
}
