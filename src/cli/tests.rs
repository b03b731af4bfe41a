#[cfg(test)]
mod tests {
    use crate::cli::Args;
    use crate::config::{LLMProvider, VectorBackend};
    use clap::Parser;
    use std::path::PathBuf;

    #[test]
    fn test_args_default_values() {
        let args = Args::try_parse_from(&["deepbrief-rs"]).unwrap();

        assert_eq!(args.query, None);
        assert_eq!(args.user_id, "default");
        assert!(!args.no_memory);
        assert!(!args.forget);
        assert!(!args.stats);
        assert!(!args.verbose);
    }

    #[test]
    fn test_args_short_options() {
        let args = Args::try_parse_from(&[
            "deepbrief-rs",
            "-q", "rust async runtimes",
            "-u", "alice",
            "-d", "/tmp/brief",
            "-v",
        ])
        .unwrap();

        assert_eq!(args.query, Some("rust async runtimes".to_string()));
        assert_eq!(args.user_id, "alice");
        assert_eq!(args.data_path, Some(PathBuf::from("/tmp/brief")));
        assert!(args.verbose);
    }

    #[test]
    fn test_args_long_options() {
        let args = Args::try_parse_from(&[
            "deepbrief-rs",
            "--query", "quantum computing",
            "--user-id", "bob",
            "--providers", "deepseek,gemini",
            "--vector-backend", "qdrant",
            "--top-k", "8",
            "--no-memory",
        ])
        .unwrap();

        assert_eq!(args.query, Some("quantum computing".to_string()));
        assert_eq!(args.providers, Some("deepseek,gemini".to_string()));
        assert_eq!(args.vector_backend, Some("qdrant".to_string()));
        assert_eq!(args.top_k, Some(8));
        assert!(args.no_memory);
    }

    #[test]
    fn test_into_config_with_overrides() {
        let args = Args::try_parse_from(&[
            "deepbrief-rs",
            "-q", "test",
            "--providers", "deepseek,gemini",
            "--vector-backend", "qdrant",
            "--top-k", "8",
            "--no-memory",
            "-v",
        ])
        .unwrap();

        let config = args.into_config();

        assert_eq!(config.llm.providers[0].provider, LLMProvider::DeepSeek);
        assert_eq!(config.llm.providers[1].provider, LLMProvider::Gemini);
        assert_eq!(config.vector_store.backend, VectorBackend::Qdrant);
        assert_eq!(config.search.top_k, 8);
        assert!(!config.memory.enabled);
        assert!(config.verbose);
    }

    #[test]
    fn test_into_config_invalid_backend_kept_default() {
        let args = Args::try_parse_from(&[
            "deepbrief-rs",
            "--vector-backend", "chroma",
        ])
        .unwrap();

        let config = args.into_config();
        assert_eq!(config.vector_store.backend, VectorBackend::Local);
    }

    #[test]
    fn test_forget_and_stats_flags() {
        let args = Args::try_parse_from(&["deepbrief-rs", "-u", "alice", "--forget"]).unwrap();
        assert!(args.forget);

        let args = Args::try_parse_from(&["deepbrief-rs", "-u", "alice", "--stats"]).unwrap();
        assert!(args.stats);
    }
}
