pub mod api;
pub mod batch;
pub mod config;
pub mod context;
pub mod db;
pub mod embeddings;
pub mod error;
pub mod llm;
pub mod models;
pub mod services;
pub mod vector;

#[cfg(test)]
mod test_support;
