//! 主题图维护
//!
//! 新主题入库后，查找该用户相似度达到阈值的历史主题并写入"related-to"边。
//! 整个过程失败只意味着图中少一条边，不影响响应。

use chrono::Utc;
use md5::{Digest, Md5};
use std::sync::Arc;
use uuid::Uuid;

use crate::config::MemoryConfig;
use crate::memory::MemoryAgent;
use crate::types::memory::{TopicEdge, TopicMemory};
use crate::vector_store::{PointRecord, VectorStore, EDGES_COLLECTION, TOPICS_COLLECTION};

/// 主题图Agent
pub struct TopicGraphAgent {
    store: Arc<dyn VectorStore>,
    config: MemoryConfig,
}

impl TopicGraphAgent {
    pub fn new(store: Arc<dyn VectorStore>, config: MemoryConfig) -> Self {
        Self { store, config }
    }

    /// 为新主题建立与历史主题的关联边，返回写入的边数
    pub async fn link_topic(&self, topic: &TopicMemory, topic_vector: &[f32]) -> usize {
        if !self.config.enabled {
            return 0;
        }

        // 多取一条，结果中可能包含新主题自身
        let hits = match self
            .store
            .query(
                TOPICS_COLLECTION,
                topic_vector,
                &topic.user_id,
                self.config.k_topics + 1,
            )
            .await
        {
            Ok(hits) => hits,
            Err(e) => {
                eprintln!("⚠️ 主题图查询失败，跳过关联: {}", e);
                return 0;
            }
        };

        let mut edges = Vec::new();
        for hit in hits {
            if hit.id == topic.id {
                continue;
            }
            let similarity = MemoryAgent::normalize_score(hit.score);
            if similarity < self.config.related_topic_threshold {
                continue;
            }

            let edge = TopicEdge {
                user_id: topic.user_id.clone(),
                from_topic: topic.id,
                to_topic: hit.id,
                similarity,
                created_at: Utc::now(),
            };

            let payload = match serde_json::to_value(&edge) {
                Ok(v) => v,
                Err(_) => continue,
            };

            edges.push(PointRecord {
                id: derive_edge_id(topic.id, hit.id),
                // 边没有自己的语义向量，复用新主题的向量满足集合维度要求
                vector: topic_vector.to_vec(),
                payload,
            });
        }

        if edges.is_empty() {
            return 0;
        }

        let count = edges.len();
        if let Err(e) = self.store.upsert(EDGES_COLLECTION, edges).await {
            eprintln!("⚠️ 主题边写入失败: {}", e);
            return 0;
        }
        count
    }
}

/// 边ID由两端主题ID哈希派生，同一对主题重复关联不产生重复边
fn derive_edge_id(from: Uuid, to: Uuid) -> Uuid {
    let mut hasher = Md5::new();
    hasher.update(from.as_bytes());
    hasher.update(b"|");
    hasher.update(to.as_bytes());
    let digest: [u8; 16] = hasher.finalize().into();
    Uuid::from_bytes(digest)
}
