use super::context::PipelineContext;
use super::orchestrator;
use super::reader::{ContentFetcher, ReaderAgent};
use super::search::{SearchAgent, SearchError, SearchProvider};
use super::summarizer::{parse_sections, SummarizerAgent, EXTRACTIVE_PROVIDER};
use crate::config::{Config, MemoryConfig, ReaderConfig};
use crate::llm::client::{GenerativeBackend, LLMClient};
use crate::llm::embeddings::Embedder;
use crate::memory::MemoryAgent;
use crate::pipeline::enrich::topic_graph::TopicGraphAgent;
use crate::types::research::{FetchStatus, ResearchRequest, ResearchStatus, SearchResult};
use crate::vector_store::{LocalStore, PointRecord, ScoredPoint, VectorStore};
use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

fn result(title: &str, url: &str, snippet: &str) -> SearchResult {
    SearchResult {
        title: title.to_string(),
        url: url.to_string(),
        snippet: snippet.to_string(),
    }
}

// ---- 搜索 ----

struct FakeSearchProvider {
    results: Result<Vec<SearchResult>, String>,
}

#[async_trait]
impl SearchProvider for FakeSearchProvider {
    async fn search(&self, _query: &str, _max_results: usize) -> Result<Vec<SearchResult>> {
        match &self.results {
            Ok(results) => Ok(results.clone()),
            Err(message) => Err(anyhow::anyhow!("{}", message)),
        }
    }
}

#[tokio::test]
async fn test_search_deduplicates_urls_first_wins() {
    let provider = FakeSearchProvider {
        results: Ok(vec![
            result("First", "https://a.com", "s1"),
            result("Duplicate", "https://a.com", "s2"),
            result("Second", "https://b.com", "s3"),
        ]),
    };
    let agent = SearchAgent::new(Box::new(provider), 5);

    let results = agent.search("q").await.unwrap();
    assert_eq!(results.len(), 2);
    assert_eq!(results[0].title, "First");
    assert_eq!(results[1].title, "Second");
}

#[tokio::test]
async fn test_search_drops_contentless_results_and_caps_top_k() {
    let provider = FakeSearchProvider {
        results: Ok(vec![
            result("", "https://empty.com", "  "),
            result("A", "https://a.com", "s"),
            result("B", "https://b.com", "s"),
            result("C", "https://c.com", "s"),
        ]),
    };
    let agent = SearchAgent::new(Box::new(provider), 2);

    let results = agent.search("q").await.unwrap();
    assert_eq!(results.len(), 2);
    assert_eq!(results[0].title, "A");
}

#[tokio::test]
async fn test_search_provider_failure_is_unavailable() {
    let provider = FakeSearchProvider {
        results: Err("connection refused".to_string()),
    };
    let agent = SearchAgent::new(Box::new(provider), 5);

    match agent.search("q").await {
        Err(SearchError::Unavailable(msg)) => assert!(msg.contains("connection refused")),
        other => panic!("unexpected result: {:?}", other.map(|r| r.len())),
    }
}

#[tokio::test]
async fn test_search_no_results_is_error() {
    let provider = FakeSearchProvider { results: Ok(vec![]) };
    let agent = SearchAgent::new(Box::new(provider), 5);
    assert!(matches!(agent.search("q").await, Err(SearchError::NoResults)));
}

// ---- 阅读 ----

/// 按URL编排行为的假抓取器，可给不同URL不同的延迟来打乱完成顺序
struct FakeFetcher {
    behaviors: HashMap<String, FetchBehavior>,
}

enum FetchBehavior {
    Content(String, Duration),
    Error,
}

#[async_trait]
impl ContentFetcher for FakeFetcher {
    async fn fetch(&self, url: &str) -> Result<String> {
        match self.behaviors.get(url) {
            Some(FetchBehavior::Content(text, delay)) => {
                tokio::time::sleep(*delay).await;
                Ok(text.clone())
            }
            Some(FetchBehavior::Error) => Err(anyhow::anyhow!("fetch refused")),
            None => Err(anyhow::anyhow!("unexpected url {}", url)),
        }
    }
}

fn reader_config() -> ReaderConfig {
    ReaderConfig {
        endpoint: "https://reader.test/".to_string(),
        concurrency_limit: 4,
        timeout_seconds: 2,
        document_char_budget: 100,
        min_content_chars: 10,
    }
}

#[tokio::test]
async fn test_reader_preserves_input_order_despite_delays() {
    let long_text = "x".repeat(50);
    let mut behaviors = HashMap::new();
    // 第一个结果最慢，完成顺序与输入顺序相反
    behaviors.insert(
        "https://slow.com".to_string(),
        FetchBehavior::Content(long_text.clone(), Duration::from_millis(80)),
    );
    behaviors.insert(
        "https://fast.com".to_string(),
        FetchBehavior::Content(long_text, Duration::from_millis(1)),
    );

    let agent = ReaderAgent::new(Box::new(FakeFetcher { behaviors }), reader_config());
    let results = vec![
        result("Slow", "https://slow.com", "s"),
        result("Fast", "https://fast.com", "s"),
    ];

    let documents = agent.read(&results).await;
    assert_eq!(documents.len(), 2);
    assert_eq!(documents[0].url, "https://slow.com");
    assert_eq!(documents[1].url, "https://fast.com");
    assert_eq!(documents[0].status, FetchStatus::Ok);
}

#[tokio::test]
async fn test_reader_classifies_failures_and_truncates() {
    let mut behaviors = HashMap::new();
    behaviors.insert(
        "https://long.com".to_string(),
        FetchBehavior::Content("y".repeat(500), Duration::from_millis(1)),
    );
    behaviors.insert(
        "https://tiny.com".to_string(),
        FetchBehavior::Content("hi".to_string(), Duration::from_millis(1)),
    );
    behaviors.insert("https://broken.com".to_string(), FetchBehavior::Error);

    let agent = ReaderAgent::new(Box::new(FakeFetcher { behaviors }), reader_config());
    let results = vec![
        result("Long", "https://long.com", "s"),
        result("Tiny", "https://tiny.com", "s"),
        result("Broken", "https://broken.com", "s"),
    ];

    let documents = agent.read(&results).await;
    assert_eq!(documents[0].status, FetchStatus::Ok);
    assert_eq!(documents[0].cleaned_text.chars().count(), 100);
    assert_eq!(documents[1].status, FetchStatus::EmptyContent);
    assert_eq!(documents[2].status, FetchStatus::FetchFailed);
    assert!(documents[2].cleaned_text.is_empty());
}

// ---- 摘要 ----

struct ScriptedBackend {
    name: &'static str,
    response: Result<String, ()>,
}

#[async_trait]
impl GenerativeBackend for ScriptedBackend {
    fn name(&self) -> &str {
        self.name
    }

    async fn generate(&self, _system: &str, _user: &str) -> Result<String> {
        match &self.response {
            Ok(text) => Ok(text.clone()),
            Err(()) => Err(anyhow::anyhow!("provider down")),
        }
    }
}

fn llm_with(backends: Vec<Box<dyn GenerativeBackend>>) -> Arc<LLMClient> {
    Arc::new(LLMClient::with_backends(backends, Duration::from_secs(1)))
}

const STRUCTURED_RESPONSE: &str = r#"1. **EXECUTIVE SUMMARY**
Solar power adoption accelerated sharply in 2024 driven by falling costs.

2. **KEY FINDINGS**
- Module prices fell 30% year over year.
- Grid storage remains the main bottleneck.

3. **DETAILED ANALYSIS**
The decade-long cost decline continued.

4. **TOP INSIGHTS**
- **Cost parity** reached in most sunny regions.
- Storage deployment lags panel installation.
- Policy support remains decisive in emerging markets.

5. **RECOMMENDATIONS**
- Track storage auctions.

6. **SOURCES USED**
- Solar Market Report
"#;

#[test]
fn test_parse_sections_extracts_named_sections() {
    let sections = parse_sections(STRUCTURED_RESPONSE);
    assert!(sections["executive_summary"].contains("Solar power adoption"));
    assert!(sections["key_findings"].contains("Module prices"));
    assert!(sections["top_insights"].contains("Cost parity"));
    assert!(sections["sources_used"].contains("Solar Market Report"));
}

#[tokio::test]
async fn test_summarizer_uses_first_working_provider() {
    let config = Config::default();
    let llm = llm_with(vec![
        Box::new(ScriptedBackend {
            name: "gemini",
            response: Err(()),
        }),
        Box::new(ScriptedBackend {
            name: "openai",
            response: Ok(STRUCTURED_RESPONSE.to_string()),
        }),
    ]);
    let agent = SummarizerAgent::new(llm, config.llm.clone());

    let results = vec![result("Solar Market Report", "https://a.com", "snippet")];
    let summary = agent.summarize("solar trends", &results, &[], "").await;

    assert_eq!(summary.raw_provider_used, "openai");
    assert!(summary.final_summary.contains("Solar power adoption"));
    // markdown符号已清除
    assert!(!summary.final_summary.contains("**"));
    assert!(summary.top_insights.len() >= 3);
    assert!(summary.top_insights[0].starts_with("Cost parity"));
}

#[tokio::test]
async fn test_summarizer_extractive_fallback_when_all_providers_fail() {
    let config = Config::default();
    let llm = llm_with(vec![Box::new(ScriptedBackend {
        name: "gemini",
        response: Err(()),
    })]);
    let agent = SummarizerAgent::new(llm, config.llm.clone());

    let results = vec![result(
        "Wind Energy Outlook",
        "https://a.com",
        "Wind capacity grew twelve percent in twenty twenty four. Offshore projects expanded rapidly.",
    )];
    let summary = agent.summarize("wind energy", &results, &[], "").await;

    assert_eq!(summary.raw_provider_used, EXTRACTIVE_PROVIDER);
    assert!(!summary.final_summary.is_empty());
    assert!(summary.final_summary.contains("Wind capacity"));
    assert_eq!(summary.top_insights, vec!["Wind Energy Outlook"]);
}

// ---- 编排 ----

struct HashEmbedder;

#[async_trait]
impl Embedder for HashEmbedder {
    fn dimensions(&self) -> usize {
        8
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        use std::collections::hash_map::DefaultHasher;
        use std::hash::{Hash, Hasher};
        let mut hasher = DefaultHasher::new();
        text.hash(&mut hasher);
        let seed = hasher.finish();
        Ok((0..8)
            .map(|i| (seed.rotate_left(i * 9) as f32) / u32::MAX as f32)
            .collect())
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut out = Vec::with_capacity(texts.len());
        for text in texts {
            out.push(self.embed(text).await?);
        }
        Ok(out)
    }
}

async fn build_context(
    dir: &TempDir,
    search_provider: FakeSearchProvider,
    fetcher: FakeFetcher,
    backends: Vec<Box<dyn GenerativeBackend>>,
) -> PipelineContext {
    let config = Config::default();
    let store: Arc<dyn VectorStore> = Arc::new(LocalStore::new(dir.path().to_path_buf()));
    store.ensure_collections(8).await.unwrap();
    let embedder: Arc<dyn Embedder> = Arc::new(HashEmbedder);
    let llm = llm_with(backends);

    PipelineContext {
        search: SearchAgent::new(Box::new(search_provider), config.search.top_k),
        reader: ReaderAgent::new(Box::new(fetcher), reader_config()),
        memory: MemoryAgent::new(embedder, store.clone(), MemoryConfig::default()),
        summarizer: SummarizerAgent::new(llm.clone(), config.llm.clone()),
        topic_graph: TopicGraphAgent::new(store, MemoryConfig::default()),
        llm,
        config,
    }
}

#[tokio::test]
async fn test_orchestrator_search_failure_is_fatal() {
    let dir = TempDir::new().unwrap();
    let context = build_context(
        &dir,
        FakeSearchProvider {
            results: Err("dns failure".to_string()),
        },
        FakeFetcher {
            behaviors: HashMap::new(),
        },
        vec![Box::new(ScriptedBackend {
            name: "gemini",
            response: Ok("unused".to_string()),
        })],
    )
    .await;

    let response =
        orchestrator::execute(&context, ResearchRequest::new("alice", "anything")).await;

    assert_eq!(response.status, ResearchStatus::Failure);
    assert!(response.error.unwrap().contains("dns failure"));
    assert!(response.final_summary.is_empty());
    assert!(response.citations.is_empty());
    assert!(response.stage_timings.contains_key("search"));
}

#[tokio::test]
async fn test_orchestrator_full_success() {
    let dir = TempDir::new().unwrap();
    let long_text = "Solar capacity doubled in 2024 across most regions of the world. ".repeat(3);
    let mut behaviors = HashMap::new();
    behaviors.insert(
        "https://a.com".to_string(),
        FetchBehavior::Content(long_text, Duration::from_millis(1)),
    );

    let context = build_context(
        &dir,
        FakeSearchProvider {
            results: Ok(vec![result("Solar Report", "https://a.com", "snippet")]),
        },
        FakeFetcher { behaviors },
        vec![Box::new(ScriptedBackend {
            name: "gemini",
            response: Ok(STRUCTURED_RESPONSE.to_string()),
        })],
    )
    .await;

    let response =
        orchestrator::execute(&context, ResearchRequest::new("alice", "solar trends")).await;

    assert_eq!(response.status, ResearchStatus::Success);
    assert_eq!(response.provider_used.as_deref(), Some("gemini"));
    assert_eq!(response.sources_count, 1);
    assert_eq!(response.citations.len(), 1);
    assert!(!response.final_summary.is_empty());
    // 追问从同一个脚本化响应里解析，不含问号的行被过滤
    assert!(response.stage_timings.contains_key("summarize"));
    assert!(response.execution_time_seconds >= 0.0);

    // 记忆已写入
    let stats = context.memory.stats("alice").await.unwrap();
    assert!(stats.chunk_count >= 1);
    assert_eq!(stats.topic_count, 1);
}

#[tokio::test]
async fn test_orchestrator_degrades_to_partial_failure() {
    let dir = TempDir::new().unwrap();
    let long_text = "Usable content describing wind power growth in sufficient detail. ".repeat(2);
    let mut behaviors = HashMap::new();
    behaviors.insert(
        "https://good.com".to_string(),
        FetchBehavior::Content(long_text, Duration::from_millis(1)),
    );
    behaviors.insert("https://bad.com".to_string(), FetchBehavior::Error);

    let context = build_context(
        &dir,
        FakeSearchProvider {
            results: Ok(vec![
                result("Good", "https://good.com", "s"),
                result("Bad", "https://bad.com", "s"),
            ]),
        },
        FakeFetcher { behaviors },
        vec![Box::new(ScriptedBackend {
            name: "gemini",
            response: Ok(STRUCTURED_RESPONSE.to_string()),
        })],
    )
    .await;

    let response =
        orchestrator::execute(&context, ResearchRequest::new("alice", "wind power")).await;

    // 部分来源抓取失败 -> 降级，但仍有摘要与引用
    assert_eq!(response.status, ResearchStatus::PartialFailure);
    assert_eq!(response.sources_count, 1);
    assert_eq!(response.citations.len(), 1);
    assert!(!response.final_summary.is_empty());
}

#[tokio::test]
async fn test_orchestrator_partial_failure_with_extractive_summary() {
    let dir = TempDir::new().unwrap();
    let long_text = "Battery storage deployments reached record levels this year worldwide. ".repeat(2);
    let mut behaviors = HashMap::new();
    behaviors.insert(
        "https://a.com".to_string(),
        FetchBehavior::Content(long_text, Duration::from_millis(1)),
    );

    let context = build_context(
        &dir,
        FakeSearchProvider {
            results: Ok(vec![result("Battery Report", "https://a.com", "snippet")]),
        },
        FakeFetcher { behaviors },
        vec![Box::new(ScriptedBackend {
            name: "gemini",
            response: Err(()),
        })],
    )
    .await;

    let response =
        orchestrator::execute(&context, ResearchRequest::new("alice", "battery storage")).await;

    assert_eq!(response.status, ResearchStatus::PartialFailure);
    assert_eq!(response.provider_used.as_deref(), Some(EXTRACTIVE_PROVIDER));
    assert!(!response.final_summary.is_empty());
    // 追问依赖LLM，全部失效时为空列表
    assert!(response.follow_up_questions.is_empty());
}

/// 只有查询不可用的向量库，写入委托给本地库
///
/// 用来把"检索失败"与"存储失败"分开：存储路径照常工作，
/// 降级只能来自检索。
struct QueryFailingStore {
    inner: LocalStore,
}

#[async_trait]
impl VectorStore for QueryFailingStore {
    async fn ensure_collections(&self, dimensions: usize) -> Result<()> {
        self.inner.ensure_collections(dimensions).await
    }

    async fn upsert(&self, collection: &str, points: Vec<PointRecord>) -> Result<()> {
        self.inner.upsert(collection, points).await
    }

    async fn query(
        &self,
        _collection: &str,
        _vector: &[f32],
        _user_id: &str,
        _k: usize,
    ) -> Result<Vec<ScoredPoint>> {
        anyhow::bail!("vector backend unreachable")
    }

    async fn delete_user_points(&self, collection: &str, user_id: &str) -> Result<()> {
        self.inner.delete_user_points(collection, user_id).await
    }

    async fn count_user_points(&self, collection: &str, user_id: &str) -> Result<u64> {
        self.inner.count_user_points(collection, user_id).await
    }
}

#[tokio::test]
async fn test_orchestrator_degrades_when_memory_retrieval_fails() {
    let dir = TempDir::new().unwrap();
    let long_text = "Geothermal output rose steadily across several volcanic regions. ".repeat(2);
    let mut behaviors = HashMap::new();
    behaviors.insert(
        "https://a.com".to_string(),
        FetchBehavior::Content(long_text, Duration::from_millis(1)),
    );

    let config = Config::default();
    let store: Arc<dyn VectorStore> = Arc::new(QueryFailingStore {
        inner: LocalStore::new(dir.path().to_path_buf()),
    });
    store.ensure_collections(8).await.unwrap();
    let embedder: Arc<dyn Embedder> = Arc::new(HashEmbedder);
    let llm = llm_with(vec![Box::new(ScriptedBackend {
        name: "gemini",
        response: Ok(STRUCTURED_RESPONSE.to_string()),
    })]);

    let context = PipelineContext {
        search: SearchAgent::new(
            Box::new(FakeSearchProvider {
                results: Ok(vec![result("Geothermal Report", "https://a.com", "snippet")]),
            }),
            config.search.top_k,
        ),
        reader: ReaderAgent::new(Box::new(FakeFetcher { behaviors }), reader_config()),
        memory: MemoryAgent::new(embedder, store.clone(), MemoryConfig::default()),
        summarizer: SummarizerAgent::new(llm.clone(), config.llm.clone()),
        topic_graph: TopicGraphAgent::new(store, MemoryConfig::default()),
        llm,
        config,
    };

    let response =
        orchestrator::execute(&context, ResearchRequest::new("alice", "geothermal power")).await;

    // 摘要与存储都成功，状态降级只能来自检索失败
    assert_eq!(response.status, ResearchStatus::PartialFailure);
    assert_eq!(response.provider_used.as_deref(), Some("gemini"));
    assert!(response.retrieved_chunks.is_empty());
    assert!(response.retrieved_topics.is_empty());
    let stats = context.memory.stats("alice").await.unwrap();
    assert!(stats.chunk_count >= 1);
}

#[tokio::test]
async fn test_second_research_retrieves_memory_from_first() {
    let dir = TempDir::new().unwrap();
    let long_text = "Hydrogen fuel infrastructure expanded across industrial clusters in Europe. ".repeat(2);
    let mut behaviors = HashMap::new();
    behaviors.insert(
        "https://a.com".to_string(),
        FetchBehavior::Content(long_text.clone(), Duration::from_millis(1)),
    );

    let context = build_context(
        &dir,
        FakeSearchProvider {
            results: Ok(vec![result("Hydrogen Report", "https://a.com", "snippet")]),
        },
        FakeFetcher { behaviors },
        vec![Box::new(ScriptedBackend {
            name: "gemini",
            response: Ok(STRUCTURED_RESPONSE.to_string()),
        })],
    )
    .await;

    let first =
        orchestrator::execute(&context, ResearchRequest::new("alice", "hydrogen fuel")).await;
    assert!(first.retrieved_topics.is_empty());

    let second =
        orchestrator::execute(&context, ResearchRequest::new("alice", "hydrogen fuel")).await;
    assert!(!second.retrieved_chunks.is_empty());
    assert!(!second.retrieved_topics.is_empty());
}
