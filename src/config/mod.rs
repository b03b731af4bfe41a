use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Read;
use std::path::PathBuf;

/// LLM Provider类型
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
pub enum LLMProvider {
    #[serde(rename = "openai")]
    OpenAI,
    #[serde(rename = "deepseek")]
    DeepSeek,
    #[serde(rename = "anthropic")]
    Anthropic,
    #[serde(rename = "gemini")]
    #[default]
    Gemini,
    #[serde(rename = "ollama")]
    Ollama,
}

impl std::fmt::Display for LLMProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LLMProvider::OpenAI => write!(f, "openai"),
            LLMProvider::DeepSeek => write!(f, "deepseek"),
            LLMProvider::Anthropic => write!(f, "anthropic"),
            LLMProvider::Gemini => write!(f, "gemini"),
            LLMProvider::Ollama => write!(f, "ollama"),
        }
    }
}

impl std::str::FromStr for LLMProvider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "openai" => Ok(LLMProvider::OpenAI),
            "deepseek" => Ok(LLMProvider::DeepSeek),
            "anthropic" => Ok(LLMProvider::Anthropic),
            "gemini" => Ok(LLMProvider::Gemini),
            "ollama" => Ok(LLMProvider::Ollama),
            _ => Err(format!("Unknown provider: {}", s)),
        }
    }
}

/// 向量库后端类型
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
pub enum VectorBackend {
    /// 本地磁盘JSON存储，开发与测试用
    #[serde(rename = "local")]
    #[default]
    Local,
    /// Qdrant实例（REST接口）
    #[serde(rename = "qdrant")]
    Qdrant,
}

impl std::str::FromStr for VectorBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "local" => Ok(VectorBackend::Local),
            "qdrant" => Ok(VectorBackend::Qdrant),
            _ => Err(format!("Unknown vector backend: {}", s)),
        }
    }
}

/// 应用程序配置
///
/// 启动时构建一次后不再变更，流水线执行期间不读取任何全局状态。
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Config {
    /// 内部工作目录路径 (.brief)，本地向量库等落盘数据放在这里
    pub data_path: PathBuf,

    /// 是否启用详细日志
    pub verbose: bool,

    /// 搜索阶段配置
    pub search: SearchConfig,

    /// 阅读阶段配置
    pub reader: ReaderConfig,

    /// 记忆子系统配置
    pub memory: MemoryConfig,

    /// 向量库配置
    pub vector_store: VectorStoreConfig,

    /// 嵌入模型配置
    pub embedding: EmbeddingConfig,

    /// LLM模型配置
    pub llm: LLMConfig,
}

/// 搜索Provider配置
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct SearchConfig {
    /// 搜索API KEY
    pub api_key: String,

    /// 搜索API地址
    pub api_base_url: String,

    /// 请求的结果条数，同时是阅读与引用阶段扇出的上限
    pub top_k: usize,

    /// 超时时间（秒）
    pub timeout_seconds: u64,
}

/// 阅读阶段配置
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ReaderConfig {
    /// 内容抓取与清洗服务地址，目标URL直接拼接在后面
    pub endpoint: String,

    /// 最大并发抓取数
    pub concurrency_limit: usize,

    /// 单个URL的抓取超时（秒）
    pub timeout_seconds: u64,

    /// 单文档正文字符预算
    pub document_char_budget: usize,

    /// 正文低于该字符数视为空内容
    pub min_content_chars: usize,
}

/// 记忆子系统配置
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct MemoryConfig {
    /// 是否启用记忆检索与存储
    pub enabled: bool,

    /// 分片大小（字符）
    pub chunk_size: usize,

    /// 相邻分片重叠（字符）
    pub chunk_overlap: usize,

    /// 检索的分片条数
    pub k_chunks: usize,

    /// 检索的主题记忆条数
    pub k_topics: usize,

    /// 折叠进摘要prompt的记忆文本字符预算
    pub retrieval_context_char_budget: usize,

    /// 主题图"related-to"边的相似度阈值
    pub related_topic_threshold: f32,
}

/// 向量库配置
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct VectorStoreConfig {
    /// 后端类型，启动时选择一次，阶段逻辑内不再分支
    pub backend: VectorBackend,

    /// Qdrant实例地址
    pub qdrant_url: String,

    /// Qdrant API KEY
    pub qdrant_api_key: String,

    /// 单次向量库调用超时（秒）
    pub timeout_seconds: u64,
}

/// 嵌入模型配置
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct EmbeddingConfig {
    /// 嵌入Provider类型
    pub provider: LLMProvider,

    /// 嵌入API KEY
    pub api_key: String,

    /// 嵌入API基地址
    pub api_base_url: String,

    /// 嵌入模型名称
    pub model: String,

    /// 向量维度，必须与向量库集合一致
    pub dimensions: usize,
}

/// 单个LLM Provider配置
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ProviderConfig {
    /// Provider类型
    pub provider: LLMProvider,

    /// API KEY
    pub api_key: String,

    /// API基地址
    pub api_base_url: String,

    /// 模型名称
    pub model: String,
}

/// LLM模型配置
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LLMConfig {
    /// 按失效转移顺序排列的provider列表，每个请求内每个provider至多尝试一次
    pub providers: Vec<ProviderConfig>,

    /// 单个provider的调用超时（秒）
    pub timeout_seconds: u64,

    /// 最大tokens
    pub max_tokens: u32,

    /// 温度
    pub temperature: f64,

    /// 摘要prompt中新抓取正文的总字符预算，靠前的文档优先
    pub aggregate_content_budget: usize,
}

impl Config {
    /// 从文件加载配置
    pub fn from_file(path: &PathBuf) -> Result<Self> {
        let mut file =
            File::open(path).context(format!("Failed to open config file: {:?}", path))?;
        let mut content = String::new();
        file.read_to_string(&mut content)
            .context("Failed to read config file")?;

        let config: Config = toml::from_str(&content).context("Failed to parse config file")?;
        Ok(config)
    }

    /// 按provider名称重排失效转移顺序，未提到的provider被移出链条
    pub fn reorder_providers(&mut self, order: &[LLMProvider]) {
        let mut reordered = Vec::with_capacity(order.len());
        for wanted in order {
            if let Some(cfg) = self.llm.providers.iter().find(|p| p.provider == *wanted) {
                reordered.push(cfg.clone());
            } else {
                eprintln!("⚠️ 警告: 配置中不存在provider {}，已跳过", wanted);
            }
        }
        if !reordered.is_empty() {
            self.llm.providers = reordered;
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_path: PathBuf::from("./.brief"),
            verbose: false,
            search: SearchConfig::default(),
            reader: ReaderConfig::default(),
            memory: MemoryConfig::default(),
            vector_store: VectorStoreConfig::default(),
            embedding: EmbeddingConfig::default(),
            llm: LLMConfig::default(),
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            api_key: std::env::var("BRIEF_SEARCH_API_KEY").unwrap_or_default(),
            api_base_url: String::from("https://api.tavily.com/search"),
            top_k: 5,
            timeout_seconds: 30,
        }
    }
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            endpoint: String::from("https://r.jina.ai/"),
            concurrency_limit: 6,
            timeout_seconds: 12,
            document_char_budget: 5000,
            min_content_chars: 50,
        }
    }
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            chunk_size: 1000,
            chunk_overlap: 100,
            k_chunks: 5,
            k_topics: 3,
            retrieval_context_char_budget: 4000,
            related_topic_threshold: 0.75,
        }
    }
}

impl Default for VectorStoreConfig {
    fn default() -> Self {
        Self {
            backend: VectorBackend::default(),
            qdrant_url: String::from("http://localhost:6333"),
            qdrant_api_key: std::env::var("BRIEF_QDRANT_API_KEY").unwrap_or_default(),
            timeout_seconds: 30,
        }
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: LLMProvider::OpenAI,
            api_key: std::env::var("BRIEF_EMBEDDING_API_KEY")
                .or_else(|_| std::env::var("BRIEF_LLM_API_KEY"))
                .unwrap_or_default(),
            api_base_url: String::from("https://api.openai.com/v1"),
            model: String::from("text-embedding-3-small"),
            dimensions: 1536,
        }
    }
}

impl Default for LLMConfig {
    fn default() -> Self {
        let api_key = std::env::var("BRIEF_LLM_API_KEY").unwrap_or_default();
        Self {
            providers: vec![
                ProviderConfig {
                    provider: LLMProvider::Gemini,
                    api_key: api_key.clone(),
                    api_base_url: String::new(),
                    model: String::from("gemini-2.5-flash"),
                },
                ProviderConfig {
                    provider: LLMProvider::OpenAI,
                    api_key: api_key.clone(),
                    api_base_url: String::from("https://api.openai.com/v1"),
                    model: String::from("gpt-4o-mini"),
                },
                ProviderConfig {
                    provider: LLMProvider::DeepSeek,
                    api_key,
                    api_base_url: String::from("https://api.deepseek.com"),
                    model: String::from("deepseek-chat"),
                },
            ],
            timeout_seconds: 8,
            max_tokens: 4096,
            temperature: 0.3,
            aggregate_content_budget: 15000,
        }
    }
}
