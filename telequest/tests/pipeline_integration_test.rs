//! End-to-end runs over a real database file with the model APIs mocked.

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::{json, Value};
use tower::ServiceExt;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, Respond, ResponseTemplate};

use telequest::api::{create_router, AppState};
use telequest::config::{
    AnsweringConfig, Config, DatabaseConfig, EmbeddingsConfig, IngestionConfig, LlmConfig,
    ServerConfig, VectorIndexConfig,
};
use telequest::context::TiktokenCounter;
use telequest::db::{Database, LibSqlBackend, MessageStore};
use telequest::embeddings::{ApiConfig, EmbeddingApiClient, EmbeddingGateway, GatewayConfig};
use telequest::llm::{AnswerGenerator, LlmProvider};
use telequest::models::{ChatExport, WriteResult};
use telequest::services::{AnsweringService, IngestionService};
use telequest::vector::{LibSqlVectorIndex, VectorIndexClient};

/// Embeds by topic so retrieval is predictable: deadlines, food, anything else.
struct TopicEmbeddings;

fn topic_vector(text: &str) -> Vec<f32> {
    let text = text.to_lowercase();
    vec![
        if text.contains("deadline") { 1.0 } else { 0.0 },
        if text.contains("pizza") { 1.0 } else { 0.0 },
        0.1,
    ]
}

impl Respond for TopicEmbeddings {
    fn respond(&self, request: &wiremock::Request) -> ResponseTemplate {
        let body: Value = serde_json::from_slice(&request.body).unwrap();
        let data: Vec<Value> = body["input"]
            .as_array()
            .unwrap()
            .iter()
            .enumerate()
            .map(|(index, text)| {
                json!({
                    "object": "embedding",
                    "index": index,
                    "embedding": topic_vector(text.as_str().unwrap())
                })
            })
            .collect();

        ResponseTemplate::new(200).set_body_json(json!({
            "object": "list",
            "data": data,
            "model": "text-embedding-ada-002"
        }))
    }
}

fn completion(content: &str) -> Value {
    json!({
        "id": "chatcmpl-1",
        "object": "chat.completion",
        "created": 1700000000,
        "model": "gpt-3.5-turbo",
        "choices": [{
            "index": 0,
            "message": { "role": "assistant", "content": content },
            "finish_reason": "stop"
        }]
    })
}

fn config(dir: &tempfile::TempDir, api_base: &str) -> Config {
    Config {
        server: ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
        },
        database: DatabaseConfig {
            url: format!("file:{}", dir.path().join("telequest.db").display()),
            auth_token: None,
            local_path: None,
        },
        embeddings: EmbeddingsConfig {
            model: "openai/text-embedding-ada-002".to_string(),
            api_key: Some("test-key".to_string()),
            base_url: Some(api_base.to_string()),
            dimensions: 3,
            max_inputs: 2000,
            batch_size: 2,
            timeout_secs: 10,
            backoff_base_ms: 10,
            backoff_multiplier: 1.2,
            backoff_max_secs: 1,
        },
        vector_index: VectorIndexConfig {
            url: None,
            api_key: None,
            namespace: None,
            upsert_batch_size: 2,
            timeout_secs: 10,
        },
        llm: LlmConfig {
            model: "openai/gpt-3.5-turbo".to_string(),
            api_key: Some("test-key".to_string()),
            base_url: Some(api_base.to_string()),
            timeout_secs: 10,
        },
        answering: AnsweringConfig {
            timeout_secs: 10,
            token_budget: 3596,
            top_k: 1,
        },
        ingestion: IngestionConfig {
            max_window: 7000,
            history_max_bytes: 1024 * 1024,
        },
    }
}

async fn build_state(config: Config) -> AppState {
    let db = Database::new(&config.database).await.unwrap();
    let store: Arc<dyn MessageStore> = Arc::new(LibSqlBackend::new(db.clone()));
    let index = VectorIndexClient::new(Arc::new(
        LibSqlVectorIndex::new(db, config.embeddings.dimensions)
            .await
            .unwrap(),
    ));

    let gateway = EmbeddingGateway::new(
        Arc::new(
            EmbeddingApiClient::new(ApiConfig::from_embeddings_config(&config.embeddings)).unwrap(),
        ),
        GatewayConfig::from_embeddings_config(&config.embeddings),
    );
    let llm = LlmProvider::new(&config.llm);
    assert!(llm.is_available());

    let generator = AnswerGenerator::new(
        Arc::new(llm.clone()),
        Arc::new(TiktokenCounter::for_model("gpt-3.5-turbo").unwrap()),
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

    AppState::new(config, store, index, llm, ingestion, answering)
}

async fn mock_models(answer: &str) -> MockServer {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/embeddings"))
        .respond_with(TopicEmbeddings)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion(answer)))
        .mount(&server)
        .await;

    server
}

const EXPORT: &str = r#"{
    "name": "Algorithms 101",
    "type": "private_supergroup",
    "id": 77,
    "messages": [
        {"id": 1, "type": "message", "date": "2023-04-01T10:00:00", "from": "Ada", "from_id": "user1", "text": "Pizza after the lecture?"},
        {"id": 2, "type": "message", "date": "2023-04-01T10:01:00", "from": "Bob", "from_id": "user2", "text": "The deadline is Friday at noon"},
        {"id": 3, "type": "service", "date": "2023-04-01T10:02:00", "actor": "Eve", "actor_id": "user3", "action": "invite_members", "text": ""},
        {"id": 4, "type": "message", "date": "2023-04-01T10:03:00", "from": "Eve", "from_id": "user3", "text": "Thanks!"},
        {"id": 5, "type": "message", "date": "2023-04-01T10:04:00", "from": "Ada", "from_id": "user1", "photo": "photos/1.jpg"}
    ]
}"#;

#[tokio::test]
async fn ingest_then_answer_from_relevant_history() {
    let server = mock_models("Friday at noon.").await;
    let dir = tempfile::tempdir().unwrap();
    let state = build_state(config(&dir, &server.uri())).await;

    let export = ChatExport::from_slice(EXPORT.as_bytes(), 1024 * 1024).unwrap();
    let report = state.ingestion.ingest_export(77, export).await.unwrap();

    assert_eq!(report.stored_count, 4);
    assert_eq!(report.discarded_count, 1);
    assert_eq!(report.store_result, WriteResult::Success);
    // three texts in upsert batches of two
    assert_eq!(report.vector_batches_attempted, 2);
    assert!(report.vector_batches_failed.is_empty());

    let chat = state.store.get_chat(77).await.unwrap().unwrap();
    assert_eq!(chat.group_name.as_deref(), Some("Algorithms 101"));
    assert_eq!(chat.message_count, 4);

    let answer = state
        .answering
        .answer(77, "When is the deadline?")
        .await
        .unwrap();
    assert_eq!(answer.answer, "Friday at noon.");
    assert_eq!(answer.sources.len(), 1);
    assert_eq!(answer.sources[0].id, 2);

    let requests = server.received_requests().await.unwrap();
    let prompt = requests
        .iter()
        .find(|r| r.url.path() == "/chat/completions")
        .map(|r| String::from_utf8_lossy(&r.body).to_string())
        .unwrap();
    assert!(prompt.contains("The deadline is Friday at noon"));
    assert!(!prompt.contains("Pizza"));
}

#[tokio::test]
async fn reingesting_the_same_export_keeps_one_copy() {
    let server = mock_models("unused").await;
    let dir = tempfile::tempdir().unwrap();
    let state = build_state(config(&dir, &server.uri())).await;

    let export = ChatExport::from_slice(EXPORT.as_bytes(), 1024 * 1024).unwrap();
    state.ingestion.ingest_export(77, export.clone()).await.unwrap();
    let report = state.ingestion.ingest_export(77, export).await.unwrap();

    // bulk writes cannot tell new messages from known ones
    assert_eq!(report.store_result, WriteResult::Success);
    assert_eq!(report.stored_count, 4);
    assert_eq!(state.store.count_messages(77).await.unwrap(), 4);
}

#[tokio::test]
async fn http_api_records_and_answers() {
    let server = mock_models("Bring your own pizza.").await;
    let dir = tempfile::tempdir().unwrap();
    let app = create_router(build_state(config(&dir, &server.uri())).await);

    let record = |id: i64, text: &str| {
        Request::builder()
            .method("POST")
            .uri("/api/v1/chats/9/messages")
            .header("content-type", "application/json")
            .body(Body::from(
                json!({
                    "messageId": id,
                    "from": { "id": 1, "name": "Ada" },
                    "date": "2023-04-01T10:00:00Z",
                    "text": text
                })
                .to_string(),
            ))
            .unwrap()
    };

    let response = app
        .clone()
        .oneshot(record(1, "Pizza party on Saturday"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = app
        .clone()
        .oneshot(record(2, "The deadline moved to Monday"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/v1/chats/9/ask")
                .header("content-type", "application/json")
                .body(Body::from(json!({ "question": "Is there pizza?" }).to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(json["data"]["answer"], "Bring your own pizza.");
    assert_eq!(json["data"]["sources"][0]["messageId"], 1);
}
