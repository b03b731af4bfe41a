//! 记忆子系统
//!
//! 负责研究记忆的检索与存储。记忆操作永远不会让一次研究失败：
//! 检索失败降级为空上下文，存储失败只丢失本次记忆。

use anyhow::Result;
use std::sync::Arc;

use crate::config::MemoryConfig;
use crate::llm::embeddings::Embedder;
use crate::types::memory::{
    MemoryChunk, MemoryStats, RetrievedChunk, RetrievedTopic, TopicMemory,
};
use crate::types::research::{ExtractedDocument, ResearchRequest};
use crate::utils::text::truncate_chars;
use crate::vector_store::{
    PointRecord, VectorStore, CHUNKS_COLLECTION, EDGES_COLLECTION, TOPICS_COLLECTION,
};

pub mod chunker;

/// 一次检索操作的结果
///
/// degraded为true表示嵌入或某个集合的查询失败过，
/// 上层需要把响应状态降级而不是当作"没有命中记忆"。
#[derive(Default)]
pub struct RetrievedContext {
    pub chunks: Vec<RetrievedChunk>,
    pub topics: Vec<RetrievedTopic>,
    pub degraded: bool,
}

/// 一次存储操作的结果
pub struct StoredMemory {
    /// 写入的分片数
    pub chunks_stored: usize,
    /// 本次研究的主题记忆及其向量，供主题图使用
    pub topic: Option<(TopicMemory, Vec<f32>)>,
}

/// 记忆Agent - 检索与存储的唯一入口
pub struct MemoryAgent {
    embedder: Arc<dyn Embedder>,
    store: Arc<dyn VectorStore>,
    config: MemoryConfig,
}

impl MemoryAgent {
    pub fn new(
        embedder: Arc<dyn Embedder>,
        store: Arc<dyn VectorStore>,
        config: MemoryConfig,
    ) -> Self {
        Self {
            embedder,
            store,
            config,
        }
    }

    /// 把后端原生余弦相似度（[-1,1]）归一化到[0,1]
    ///
    /// 所有对后端分值刻度的解释都收口在这里。
    pub(crate) fn normalize_score(score: f32) -> f32 {
        ((score + 1.0) / 2.0).clamp(0.0, 1.0)
    }

    /// 检索与查询相关的历史分片与主题记忆
    ///
    /// 任何失败都降级为空结果，只打印警告并置degraded标记。
    pub async fn retrieve_context(&self, user_id: &str, query: &str) -> RetrievedContext {
        if !self.config.enabled {
            return RetrievedContext::default();
        }

        let query_vector = match self.embedder.embed(query).await {
            Ok(v) => v,
            Err(e) => {
                eprintln!("⚠️ 查询嵌入失败，跳过记忆检索: {}", e);
                return RetrievedContext {
                    degraded: true,
                    ..Default::default()
                };
            }
        };

        let (chunk_result, topic_result) = tokio::join!(
            self.store
                .query(CHUNKS_COLLECTION, &query_vector, user_id, self.config.k_chunks),
            self.store
                .query(TOPICS_COLLECTION, &query_vector, user_id, self.config.k_topics),
        );

        let mut degraded = false;

        let chunks = match chunk_result {
            Ok(points) => points
                .into_iter()
                .filter_map(|p| {
                    let chunk: MemoryChunk = serde_json::from_value(p.payload).ok()?;
                    Some(RetrievedChunk {
                        chunk,
                        similarity: Self::normalize_score(p.score),
                    })
                })
                .collect(),
            Err(e) => {
                eprintln!("⚠️ 分片检索失败，降级为空结果: {}", e);
                degraded = true;
                Vec::new()
            }
        };

        let topics = match topic_result {
            Ok(points) => points
                .into_iter()
                .filter_map(|p| {
                    let topic: TopicMemory = serde_json::from_value(p.payload).ok()?;
                    Some(RetrievedTopic {
                        topic,
                        similarity: Self::normalize_score(p.score),
                    })
                })
                .collect(),
            Err(e) => {
                eprintln!("⚠️ 主题记忆检索失败，降级为空结果: {}", e);
                degraded = true;
                Vec::new()
            }
        };

        RetrievedContext {
            chunks,
            topics,
            degraded,
        }
    }

    /// 存储本次研究：可用文档分片入库，摘要作为主题记忆入库
    ///
    /// 失败时返回空的StoredMemory，不向上传播错误。
    pub async fn store(
        &self,
        request: &ResearchRequest,
        documents: &[ExtractedDocument],
        summary_text: &str,
    ) -> StoredMemory {
        if !self.config.enabled {
            return StoredMemory {
                chunks_stored: 0,
                topic: None,
            };
        }

        let chunks_stored = match self.store_chunks(request, documents).await {
            Ok(count) => count,
            Err(e) => {
                eprintln!("⚠️ 分片存储失败，本次研究内容不会进入记忆: {}", e);
                0
            }
        };

        let topic = if summary_text.trim().is_empty() {
            None
        } else {
            match self.store_topic(request, summary_text).await {
                Ok(pair) => Some(pair),
                Err(e) => {
                    eprintln!("⚠️ 主题记忆存储失败: {}", e);
                    None
                }
            }
        };

        StoredMemory {
            chunks_stored,
            topic,
        }
    }

    async fn store_chunks(
        &self,
        request: &ResearchRequest,
        documents: &[ExtractedDocument],
    ) -> Result<usize> {
        let mut chunks: Vec<MemoryChunk> = Vec::new();
        for doc in documents.iter().filter(|d| d.is_usable()) {
            for (index, text) in
                chunker::chunk_text(&doc.cleaned_text, self.config.chunk_size, self.config.chunk_overlap)
                    .into_iter()
                    .enumerate()
            {
                chunks.push(MemoryChunk {
                    id: MemoryChunk::derive_id(&request.user_id, &doc.url, index, &text),
                    user_id: request.user_id.clone(),
                    text,
                    source_url: doc.url.clone(),
                    source_title: doc.title.clone(),
                    chunk_index: index,
                    query: request.query.clone(),
                    created_at: request.requested_at,
                });
            }
        }

        if chunks.is_empty() {
            return Ok(0);
        }

        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let vectors = self.embedder.embed_batch(&texts).await?;

        let points: Vec<PointRecord> = chunks
            .iter()
            .zip(vectors)
            .map(|(chunk, vector)| {
                Ok(PointRecord {
                    id: chunk.id,
                    vector,
                    payload: serde_json::to_value(chunk)?,
                })
            })
            .collect::<Result<_>>()?;

        let count = points.len();
        self.store.upsert(CHUNKS_COLLECTION, points).await?;
        Ok(count)
    }

    async fn store_topic(
        &self,
        request: &ResearchRequest,
        summary_text: &str,
    ) -> Result<(TopicMemory, Vec<f32>)> {
        let topic = TopicMemory::new(&request.user_id, &request.query, summary_text);

        // 用"查询 + 摘要"做嵌入，后续同主题查询更容易命中
        let embed_input = format!("{}\n{}", topic.query, topic.summary_text);
        let vector = self.embedder.embed(&embed_input).await?;

        self.store
            .upsert(
                TOPICS_COLLECTION,
                vec![PointRecord {
                    id: topic.id,
                    vector: vector.clone(),
                    payload: serde_json::to_value(&topic)?,
                }],
            )
            .await?;

        Ok((topic, vector))
    }

    /// 把检索结果折叠成摘要prompt用的记忆片段，受字符预算约束
    pub fn format_memory_context(
        &self,
        chunks: &[RetrievedChunk],
        topics: &[RetrievedTopic],
    ) -> String {
        if chunks.is_empty() && topics.is_empty() {
            return String::new();
        }

        let mut sections = Vec::new();

        if !topics.is_empty() {
            let mut block = String::from("Past research topics:\n");
            for retrieved in topics {
                block.push_str(&format!(
                    "- [{}] {}\n",
                    retrieved.topic.query,
                    truncate_chars(&retrieved.topic.summary_text, 300)
                ));
            }
            sections.push(block);
        }

        if !chunks.is_empty() {
            let mut block = String::from("Previously read material:\n");
            for retrieved in chunks {
                block.push_str(&format!(
                    "- ({}) {}\n",
                    retrieved.chunk.source_title, retrieved.chunk.text
                ));
            }
            sections.push(block);
        }

        truncate_chars(
            &sections.join("\n"),
            self.config.retrieval_context_char_budget,
        )
    }

    /// 用户记忆统计
    pub async fn stats(&self, user_id: &str) -> Result<MemoryStats> {
        let chunk_count = self.store.count_user_points(CHUNKS_COLLECTION, user_id).await?;
        let topic_count = self.store.count_user_points(TOPICS_COLLECTION, user_id).await?;
        Ok(MemoryStats {
            chunk_count,
            topic_count,
        })
    }

    /// 删除该用户的全部记忆（分片、主题与主题边）
    pub async fn forget_user(&self, user_id: &str) -> Result<()> {
        self.store.delete_user_points(CHUNKS_COLLECTION, user_id).await?;
        self.store.delete_user_points(TOPICS_COLLECTION, user_id).await?;
        self.store.delete_user_points(EDGES_COLLECTION, user_id).await?;
        Ok(())
    }
}
