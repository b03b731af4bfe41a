pub mod cli;
pub mod config;
pub mod llm;
pub mod memory;
pub mod pipeline;
pub mod types;
pub mod utils;
pub mod vector_store;

// Re-export commonly used types
pub use config::Config;
pub use pipeline::launch;
pub use types::research::{ResearchRequest, ResearchResponse, ResearchStatus};
