//! REST server startup and composition of the search pipeline

use anyhow::Result;
use axum::serve;
use std::{net::SocketAddr, sync::Arc};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::config::{load_config, Config};
use crate::embeddings::Embedder;
use crate::error::SearchError;
use crate::index::{PineconeIndex, PineconeOptions, VectorIndex};
use crate::logs::SearchLogs;
use crate::pipeline::{SearchAvailability, SearchPipeline, SearchSettings};
use crate::server::routing::create_router;

const COMPONENT: &str = "stocksearch-server";

/// Shared state handed to every handler
#[derive(Clone)]
pub struct AppState {
  pub search: Arc<SearchAvailability>,
  pub logs: SearchLogs,
}

impl AppState {
  pub fn new(search: SearchAvailability, logs: SearchLogs) -> Self {
    Self { search: Arc::new(search), logs }
  }
}

/// Build the pipeline once from the loaded config.
///
/// Never fails: a missing credential or an adapter that cannot be built
/// disables search instead. A missing credential is reported before any
/// adapter is constructed.
pub async fn initialize_search(
  config: Result<Config, SearchError>,
  logs: &SearchLogs,
) -> SearchAvailability {
  let config = match config {
    Ok(config) => config,
    Err(e) => return disable(e, logs),
  };

  let embedder = match load_embedder().await {
    Ok(embedder) => embedder,
    Err(e) => return disable(SearchError::ClientInit(format!("embedding model: {e:#}")), logs),
  };

  let index = match PineconeIndex::connect(PineconeOptions::from(&config)).await {
    Ok(index) => index,
    Err(e) => return disable(SearchError::ClientInit(format!("Pinecone index: {e:#}")), logs),
  };

  if let Err(e) = check_dimensions(embedder.dimension(), index.dimension()) {
    return disable(e, logs);
  }

  logs.success(
    &format!(
      "Search ready: index {:?} at {} (namespace {:?}, top {})",
      config.index_name,
      index.host(),
      config.namespace,
      config.top_k
    ),
    COMPONENT,
  );

  assemble(&config, embedder, Arc::new(index), logs)
}

/// Wire already-built adapters into a ready pipeline observed by `logs`
pub fn assemble(
  config: &Config,
  embedder: Arc<dyn Embedder>,
  index: Arc<dyn VectorIndex>,
  logs: &SearchLogs,
) -> SearchAvailability {
  SearchAvailability::Ready(SearchPipeline::new(
    embedder,
    index,
    Arc::new(logs.clone()),
    SearchSettings::from(config),
  ))
}

/// An index built for a different model would return meaningless neighbours
pub fn check_dimensions(model: usize, index: Option<usize>) -> Result<(), SearchError> {
  match index {
    Some(index) if index != model => Err(SearchError::ClientInit(format!(
      "index dimension {index} does not match embedding dimension {model}"
    ))),
    _ => Ok(()),
  }
}

fn disable(reason: SearchError, logs: &SearchLogs) -> SearchAvailability {
  logs.error(&format!("Search disabled [{}]: {reason}", reason.kind()), COMPONENT);
  SearchAvailability::Disabled(reason)
}

#[cfg(feature = "ml-features")]
async fn load_embedder() -> Result<Arc<dyn Embedder>> {
  let embedder = crate::embeddings::OnnxEmbedder::load().await?;
  Ok(Arc::new(embedder))
}

#[cfg(not(feature = "ml-features"))]
async fn load_embedder() -> Result<Arc<dyn Embedder>> {
  Err(anyhow::anyhow!("built without the ml-features feature"))
}

/// Start the REST server
#[cfg(not(tarpaulin_include))] // Skip coverage - server lifecycle
pub async fn start_server(addr: SocketAddr) -> Result<()> {
  let logs = SearchLogs::default();
  logs.info(&format!("Starting stock search server on {addr}"), COMPONENT);

  let search = initialize_search(load_config(), &logs).await;
  let state = AppState::new(search, logs.clone());

  let app = create_router(state).layer(
    ServiceBuilder::new().layer(TraceLayer::new_for_http()).layer(CorsLayer::permissive()),
  );

  let listener = TcpListener::bind(addr).await?;
  logs.info(&format!("Server listening on {addr}"), COMPONENT);

  match serve(listener, app).with_graceful_shutdown(shutdown_signal()).await {
    Ok(_) => {
      logs.info("Server shutdown gracefully", COMPONENT);
      Ok(())
    }
    Err(e) => {
      logs.error(&format!("Server error: {e}"), COMPONENT);
      Err(anyhow::anyhow!("Server error: {}", e))
    }
  }
}

#[cfg(not(tarpaulin_include))]
async fn shutdown_signal() {
  if let Err(e) = tokio::signal::ctrl_c().await {
    tracing::warn!("failed to listen for shutdown signal: {e}");
    std::future::pending::<()>().await;
  }
}
