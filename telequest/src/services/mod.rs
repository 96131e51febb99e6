mod answering;
mod ingestion;

pub use answering::{Answer, AnsweringService};
pub use ingestion::{IngestReport, IngestionService};
