pub mod client;
pub mod embeddings;
