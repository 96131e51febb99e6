use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use telequest::api::{create_router, AppState};
use telequest::config::{parse_provider_model, Config};
use telequest::context::TiktokenCounter;
use telequest::db::{Database, LibSqlBackend, MessageStore};
use telequest::embeddings::{ApiConfig, EmbeddingApiClient, EmbeddingGateway, GatewayConfig};
use telequest::llm::{AnswerGenerator, LlmProvider};
use telequest::models::ChatExport;
use telequest::services::{AnsweringService, IngestionService};
use telequest::vector::{
    HttpIndexConfig, HttpVectorIndex, LibSqlVectorIndex, VectorIndex, VectorIndexClient,
};

#[derive(Parser)]
#[command(name = "telequest")]
#[command(about = "Answers questions from a Telegram group's own history")]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP API (default)
    Serve,
    /// Import a chat export (`result.json`)
    Ingest {
        #[arg(long)]
        chat_id: i64,
        file: PathBuf,
    },
    /// Ask a question against an ingested chat
    Ask {
        #[arg(long)]
        chat_id: i64,
        question: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "telequest=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env();
    let state = build_state(config).await?;

    match args.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(state).await,
        Command::Ingest { chat_id, file } => {
            let bytes = tokio::fs::read(&file).await?;
            let export = ChatExport::from_slice(&bytes, state.config.ingestion.history_max_bytes)?;
            let report = state.ingestion.ingest_export(chat_id, export).await?;
            println!("{}", serde_json::to_string_pretty(&report)?);
            Ok(())
        }
        Command::Ask { chat_id, question } => {
            let answer = state.answering.answer(chat_id, &question).await?;
            println!("{}", answer.answer);
            Ok(())
        }
    }
}

async fn build_state(config: Config) -> anyhow::Result<AppState> {
    tracing::info!("Initializing database...");
    let db = Database::new(&config.database).await?;
    let store: Arc<dyn MessageStore> = Arc::new(LibSqlBackend::new(db.clone()));

    let index = match open_vector_index(&config, db).await {
        Ok(index) => VectorIndexClient::new(index),
        Err(e) => {
            tracing::warn!(
                "Vector index unavailable: {} - questions will be answered without retrieval",
                e
            );
            VectorIndexClient::unavailable()
        }
    };

    tracing::info!("Using embedding model: {}", config.embeddings.model);
    let embedding_client =
        EmbeddingApiClient::new(ApiConfig::from_embeddings_config(&config.embeddings))?;
    let gateway = EmbeddingGateway::new(
        Arc::new(embedding_client),
        GatewayConfig::from_embeddings_config(&config.embeddings),
    );

    tracing::info!("Initializing LLM provider: {}...", config.llm.model);
    let llm = LlmProvider::new(&config.llm);
    if !llm.is_available() {
        tracing::warn!("LLM unavailable - questions will get the no-answer reply");
    }

    let counter = TiktokenCounter::for_model(parse_provider_model(&config.llm.model).1)?;
    let generator = AnswerGenerator::new(
        Arc::new(llm.clone()),
        Arc::new(counter),
        config.answering.token_budget,
    );

    let ingestion = IngestionService::new(
        store.clone(),
        gateway.clone(),
        index.clone(),
        config.ingestion.max_window,
        config.vector_index.upsert_batch_size,
    );
    let answering = AnsweringService::new(
        store.clone(),
        gateway,
        index.clone(),
        generator,
        config.answering.top_k,
        Duration::from_secs(config.answering.timeout_secs),
    );

    Ok(AppState::new(config, store, index, llm, ingestion, answering))
}

async fn open_vector_index(config: &Config, db: Database) -> anyhow::Result<Arc<dyn VectorIndex>> {
    match HttpIndexConfig::from_vector_index_config(&config.vector_index) {
        Some(http_config) => {
            tracing::info!("Using vector index at {}", http_config.base_url);
            Ok(Arc::new(HttpVectorIndex::new(http_config)?))
        }
        None => {
            tracing::info!("VECTOR_INDEX_URL is not set - storing vectors in the database");
            Ok(Arc::new(
                LibSqlVectorIndex::new(db, config.embeddings.dimensions).await?,
            ))
        }
    }
}

async fn serve(state: AppState) -> anyhow::Result<()> {
    let addr = format!("{}:{}", state.config.server.host, state.config.server.port);
    let app = create_router(state);

    tracing::info!("TeleQuest starting on http://{}", addr);
    tracing::info!("  Health check: http://{}/api/v1/health", addr);
    tracing::info!("  API docs:     http://{}/api/v1/docs", addr);
    tracing::info!("  OpenAPI spec: http://{}/api/v1/openapi.json", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, draining connections...");
}
