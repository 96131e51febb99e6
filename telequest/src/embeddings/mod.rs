mod api;
mod gateway;
mod service;


pub use api::{ApiConfig, EmbeddingApiClient};
pub use gateway::{EmbeddedBatch, EmbeddingGateway, GatewayConfig};
pub use service::{EmbeddingResponse, EmbeddingService, EmbeddingUsage, IndexedEmbedding};
