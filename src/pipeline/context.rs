use std::sync::Arc;

use anyhow::{Context, Result};

use crate::config::Config;
use crate::llm::client::LLMClient;
use crate::llm::embeddings::{Embedder, RigEmbedder};
use crate::memory::MemoryAgent;
use crate::pipeline::enrich::topic_graph::TopicGraphAgent;
use crate::pipeline::reader::{ReaderAgent, ReaderEndpointFetcher};
use crate::pipeline::search::{SearchAgent, TavilyProvider};
use crate::pipeline::summarizer::SummarizerAgent;
use crate::vector_store::{create_store, VectorStore};

/// 流水线上下文 - 持有全部阶段Agent与共享客户端
pub struct PipelineContext {
    pub search: SearchAgent,
    pub reader: ReaderAgent,
    pub memory: MemoryAgent,
    pub summarizer: SummarizerAgent,
    pub topic_graph: TopicGraphAgent,
    pub llm: Arc<LLMClient>,
    pub config: Config,
}

impl PipelineContext {
    /// 从配置构建真实后端的上下文，进程启动时调用一次
    pub async fn new(config: Config) -> Result<Self> {
        let llm = Arc::new(LLMClient::new(&config.llm).context("Failed to build LLM client")?);
        if config.verbose {
            println!("🤖 LLM失效转移顺序: {}", llm.provider_names().join(" -> "));
        }

        let embedder: Arc<dyn Embedder> = Arc::new(
            RigEmbedder::new(&config.embedding).context("Failed to build embedding client")?,
        );

        let store: Arc<dyn VectorStore> = Arc::from(create_store(&config)?);
        store
            .ensure_collections(embedder.dimensions())
            .await
            .context("Failed to prepare vector store collections")?;

        let search = SearchAgent::new(
            Box::new(TavilyProvider::new(&config.search)?),
            config.search.top_k,
        );
        let reader = ReaderAgent::new(
            Box::new(ReaderEndpointFetcher::new(&config.reader)?),
            config.reader.clone(),
        );
        let memory = MemoryAgent::new(embedder, store.clone(), config.memory.clone());
        let summarizer = SummarizerAgent::new(llm.clone(), config.llm.clone());
        let topic_graph = TopicGraphAgent::new(store, config.memory.clone());

        Ok(Self {
            search,
            reader,
            memory,
            summarizer,
            topic_graph,
            llm,
            config,
        })
    }
}
