//! Wiring: builds every component from a [`Config`].

use std::sync::Arc;
use tracing::info_span;

use crate::config::Config;
use crate::controller::{QueryController, Timeouts};
use crate::embedding::create_provider;
use crate::retriever::Retriever;
use crate::storage::SqliteIndexStorage;
use crate::synthesis::create_synthesizer;
use crate::web::HttpWebSearchClient;

/// The assembled service. The retriever is kept alongside the controller so
/// callers can add documents and refresh the index.
pub struct App {
    pub retriever: Arc<Retriever>,
    pub controller: Arc<QueryController>,
}

impl App {
    pub async fn from_config(config: &Config) -> anyhow::Result<Self> {
        let embedder = create_provider(&config.embedding)?;
        let retriever = Arc::new(
            Retriever::open(
                embedder,
                Arc::new(SqliteIndexStorage::new()),
                config.retrieval.vector_db_path.clone(),
                config.chunking.clone(),
                info_span!("retriever"),
            )
            .await?,
        );

        let web = Arc::new(HttpWebSearchClient::new(
            &config.web,
            info_span!("web_search"),
        )?);
        let synthesizer = create_synthesizer(&config.synthesis)?;

        let controller = Arc::new(QueryController::new(
            retriever.clone(),
            web,
            synthesizer,
            config.retrieval.confidence_threshold,
            Timeouts::from_config(config),
            info_span!("controller"),
        ));

        Ok(Self {
            retriever,
            controller,
        })
    }
}
