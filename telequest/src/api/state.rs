use std::sync::Arc;

use crate::config::Config;
use crate::db::MessageStore;
use crate::llm::LlmProvider;
use crate::services::{AnsweringService, IngestionService};
use crate::vector::VectorIndexClient;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub store: Arc<dyn MessageStore>,
    pub index: VectorIndexClient,
    pub llm: LlmProvider,
    pub ingestion: IngestionService,
    pub answering: AnsweringService,
}

impl AppState {
    pub fn new(
        config: Config,
        store: Arc<dyn MessageStore>,
        index: VectorIndexClient,
        llm: LlmProvider,
        ingestion: IngestionService,
        answering: AnsweringService,
    ) -> Self {
        Self {
            config: Arc::new(config),
            store,
            index,
            llm,
            ingestion,
            answering,
        }
    }
}
