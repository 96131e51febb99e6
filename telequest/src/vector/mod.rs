//! Similarity index access: backends behind [`VectorIndex`] and the
//! [`VectorIndexClient`] that the pipeline talks to.

mod client;
mod http;
mod local;
mod traits;

pub use client::{UpsertReport, VectorIndexClient};
pub use http::{HttpIndexConfig, HttpVectorIndex};
pub use local::LibSqlVectorIndex;
pub use traits::VectorIndex;
