//! 嵌入模型客户端
//!
//! 分片与查询共用同一个嵌入模型，维度在启动时确定，与向量库集合一致。

use anyhow::{Context, Result};
use async_trait::async_trait;
use rig::client::EmbeddingsClient;
use rig::embeddings::embedding::EmbeddingModel as RigEmbeddingModel;

use crate::config::{EmbeddingConfig, LLMProvider};

/// 嵌入服务抽象，测试时可用假实现替换
#[async_trait]
pub trait Embedder: Send + Sync {
    /// 向量维度
    fn dimensions(&self) -> usize;

    /// 嵌入单条文本
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// 批量嵌入，返回顺序与输入一致
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;
}

/// rig后端的嵌入模型枚举
pub enum RigEmbedder {
    OpenAI {
        model: rig::providers::openai::EmbeddingModel,
        dimensions: usize,
    },
    Gemini {
        model: rig::providers::gemini::embedding::EmbeddingModel,
        dimensions: usize,
    },
    Ollama {
        model: rig::providers::ollama::EmbeddingModel<reqwest::Client>,
        dimensions: usize,
    },
}

impl RigEmbedder {
    /// 根据配置创建嵌入客户端
    pub fn new(config: &EmbeddingConfig) -> Result<Self> {
        match config.provider {
            LLMProvider::OpenAI => {
                let client = rig::providers::openai::Client::builder(&config.api_key)
                    .base_url(&config.api_base_url)
                    .build();
                let model = client.embedding_model_with_ndims(&config.model, config.dimensions);
                Ok(RigEmbedder::OpenAI {
                    model,
                    dimensions: config.dimensions,
                })
            }
            LLMProvider::Gemini => {
                let client = rig::providers::gemini::Client::builder(&config.api_key).build()?;
                let model = client.embedding_model_with_ndims(&config.model, config.dimensions);
                Ok(RigEmbedder::Gemini {
                    model,
                    dimensions: config.dimensions,
                })
            }
            LLMProvider::Ollama => {
                let client = rig::providers::ollama::Client::builder().build();
                let model = client.embedding_model_with_ndims(&config.model, config.dimensions);
                Ok(RigEmbedder::Ollama {
                    model,
                    dimensions: config.dimensions,
                })
            }
            other => anyhow::bail!("provider {} 不支持嵌入", other),
        }
    }

    async fn embed_all(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>> {
        let embeddings = match self {
            RigEmbedder::OpenAI { model, .. } => model
                .embed_texts(texts)
                .await
                .context("OpenAI embedding request failed")?,
            RigEmbedder::Gemini { model, .. } => model
                .embed_texts(texts)
                .await
                .context("Gemini embedding request failed")?,
            RigEmbedder::Ollama { model, .. } => model
                .embed_texts(texts)
                .await
                .context("Ollama embedding request failed")?,
        };

        Ok(embeddings
            .into_iter()
            .map(|e| e.vec.into_iter().map(|v| v as f32).collect())
            .collect())
    }
}

#[async_trait]
impl Embedder for RigEmbedder {
    fn dimensions(&self) -> usize {
        match self {
            RigEmbedder::OpenAI { dimensions, .. } => *dimensions,
            RigEmbedder::Gemini { dimensions, .. } => *dimensions,
            RigEmbedder::Ollama { dimensions, .. } => *dimensions,
        }
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut vectors = self.embed_all(vec![text.to_string()]).await?;
        vectors
            .pop()
            .ok_or_else(|| anyhow::anyhow!("embedding service returned no vector"))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let vectors = self.embed_all(texts.to_vec()).await?;
        if vectors.len() != texts.len() {
            anyhow::bail!(
                "embedding service returned {} vectors for {} texts",
                vectors.len(),
                texts.len()
            );
        }
        Ok(vectors)
    }
}
