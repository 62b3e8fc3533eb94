use anyhow::{bail, Context};
use feed_service::config::Config;
use feed_service::models::FeedRequest;
use feed_service::FeedHandler;
use ranking_service::services::{
    FeatureRegistry, RecommendationAlgorithm, RecommendationRequest, RecommendationService,
};
use ranking_service::storage::MemoryStore;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const USAGE: &str = "usage: feed-service <feed|recommend|recommend-posts> <request.json> [count]";

/// Replays a feed or recommendation request against a JSON dataset and
/// prints the response.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::from_default_env())
        .init();

    let config = Config::from_env().map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))?;
    let ranking_config =
        ranking_service::Config::from_env().context("Failed to load ranking config")?;

    let args: Vec<String> = std::env::args().skip(1).collect();
    let (command, request_path) = match args.as_slice() {
        [command, path, ..] => (command.as_str(), path.as_str()),
        _ => bail!(USAGE),
    };

    info!(
        env = %config.app.env,
        dataset = %config.dataset.path,
        command,
        "Starting feed-service replay"
    );

    let raw_dataset = std::fs::read_to_string(&config.dataset.path)
        .with_context(|| format!("Failed to read dataset {}", config.dataset.path))?;
    let store = Arc::new(MemoryStore::from_json(&raw_dataset)?);
    let registry = FeatureRegistry::new(store.clone(), store.clone(), store.clone());
    let recommendations = Arc::new(RecommendationService::new(
        store.clone(),
        store.clone(),
        registry,
        ranking_config.recommendation,
    ));

    let raw_request = std::fs::read_to_string(request_path)
        .with_context(|| format!("Failed to read request {}", request_path))?;
    let viewer = config.app.viewer_id.as_deref();

    let output = match command {
        "feed" => {
            let request: FeedRequest =
                serde_json::from_str(&raw_request).context("Invalid feed request")?;
            let handler = FeedHandler::new(
                store.clone(),
                store,
                recommendations,
                config.feed.clone(),
            );
            serde_json::to_string_pretty(&handler.get_home_feed(viewer, &request).await?)?
        }
        "recommend" => {
            let request: RecommendationRequest =
                serde_json::from_str(&raw_request).context("Invalid recommendation request")?;
            serde_json::to_string_pretty(&recommendations.recommend(&request, viewer).await?)?
        }
        "recommend-posts" => {
            let algorithm: RecommendationAlgorithm =
                serde_json::from_str(&raw_request).context("Invalid recommendation algorithm")?;
            let count = match args.get(2) {
                Some(raw) => raw.parse().context("count must be a non-negative integer")?,
                None => config.feed.default_limit,
            };
            serde_json::to_string_pretty(
                &recommendations.recommend_posts(&algorithm, count, viewer).await?,
            )?
        }
        other => bail!("unknown command {}; {}", other, USAGE),
    };

    println!("{}", output);
    Ok(())
}
