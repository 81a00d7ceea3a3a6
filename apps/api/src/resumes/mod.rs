pub mod chunking;
pub mod handlers;
pub mod ingest;
