use anyhow::{bail, Context};
use clap::Parser;
use paged_aggregator::{
    ClientContext, CollectionEndpointSpec, FetchConfig, FilterState, MappedSource, MultiSourceMerger,
    PagedCollectionAggregator, ResponseCache, RestCollectionSource,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Load one or two paginated collections and print them as a single feed.
#[derive(Parser, Debug)]
#[command(name = "paged-aggregator", version)]
struct Args {
    /// Base URL of the REST backend
    #[arg(long, env = "PAGED_BASE_URL")]
    base_url: String,

    /// Collection endpoint, relative to the base URL
    #[arg(long)]
    endpoint: String,

    /// Second collection merged after the first
    #[arg(long)]
    secondary: Option<String>,

    /// Filter as name=value; repeatable
    #[arg(long = "filter", value_parser = parse_filter)]
    filters: Vec<(String, String)>,

    /// Number of pages to load per source
    #[arg(long, default_value_t = 1)]
    pages: usize,

    /// Request timeout in seconds
    #[arg(long, default_value_t = 30)]
    timeout: u64,

    /// Retries for transport failures and 5xx responses
    #[arg(long, default_value_t = 3)]
    retries: u32,
}

fn parse_filter(raw: &str) -> Result<(String, String), String> {
    raw.split_once('=')
        .map(|(name, value)| (name.trim().to_string(), value.to_string()))
        .ok_or_else(|| format!("expected name=value, got {raw:?}"))
}

fn add_rest_source(
    merger: &mut MultiSourceMerger<Value>,
    context: &ClientContext,
    cache: &Arc<ResponseCache<Value>>,
    endpoint: &str,
) {
    let source = RestCollectionSource::<Value>::new(context.clone(), CollectionEndpointSpec::new(endpoint))
        .with_name(endpoint);
    let aggregator = PagedCollectionAggregator::new(Arc::new(source)).with_cache(cache.clone());
    merger.add_source(Box::new(MappedSource::new(endpoint, Arc::new(aggregator), Value::clone)));
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    info!("Starting paged aggregator against {}", args.base_url);

    let config = FetchConfig {
        timeout_seconds: args.timeout,
        max_retries: args.retries,
        ..FetchConfig::default()
    };
    let context = ClientContext::new(&args.base_url, config).context("invalid client configuration")?;
    let filters = FilterState::from_pairs(args.filters.clone())?;
    let cache = Arc::new(ResponseCache::new());

    let mut merger = MultiSourceMerger::new();
    add_rest_source(&mut merger, &context, &cache, &args.endpoint);
    if let Some(secondary) = &args.secondary {
        add_rest_source(&mut merger, &context, &cache, secondary);
    }

    info!("Applying filters {:?}", filters.derive_key());
    for (source_id, result) in merger.apply_filters(&filters).await {
        if let Err(e) = result {
            error!("First page of {} failed: {}", source_id, e);
            bail!("could not load {}: {}", source_id, e);
        }
    }

    for _ in 1..args.pages {
        if !merger.merged().await.has_more {
            break;
        }
        for (source_id, result) in merger.load_more().await {
            match result {
                Ok(outcome) => info!("{}: {:?}", source_id, outcome),
                Err(e) => error!("Next page of {} failed: {}", source_id, e),
            }
        }
    }

    let view = merger.merged().await;
    info!("Loaded {} items, has_more={}", view.len(), view.has_more);

    let items: Vec<Value> = view
        .items
        .iter()
        .map(|item| json!({ "source": item.source_id, "payload": item.payload }))
        .collect();
    let output = json!({
        "count": view.len(),
        "has_more": view.has_more,
        "items": items,
    });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
