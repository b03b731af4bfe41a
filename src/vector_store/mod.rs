//! 向量库抽象与后端实现
//!
//! 分片、主题记忆与主题边分属三个集合，所有读写都带user_id过滤。
//! 后端在启动时选择一次，记忆层之上不出现任何后端分支。

use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;
use uuid::Uuid;

use crate::config::{Config, VectorBackend};

pub mod local;
pub mod qdrant;

pub use local::LocalStore;
pub use qdrant::QdrantStore;

/// 原始内容分片集合
pub const CHUNKS_COLLECTION: &str = "research_chunks";
/// 研究主题记忆集合
pub const TOPICS_COLLECTION: &str = "topic_memory";
/// 主题图"related-to"边集合
pub const EDGES_COLLECTION: &str = "topic_edges";

/// 写入向量库的一条记录
#[derive(Debug, Clone)]
pub struct PointRecord {
    pub id: Uuid,
    pub vector: Vec<f32>,
    pub payload: Value,
}

/// 相似度查询命中的一条记录
///
/// score是后端原生的余弦相似度（[-1, 1]），归一化由记忆层负责。
#[derive(Debug, Clone)]
pub struct ScoredPoint {
    pub id: Uuid,
    pub score: f32,
    pub payload: Value,
}

/// 向量库后端抽象
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// 确保三个集合存在，维度不匹配时返回错误
    async fn ensure_collections(&self, dimensions: usize) -> Result<()>;

    /// 批量upsert，相同id覆盖旧记录
    async fn upsert(&self, collection: &str, points: Vec<PointRecord>) -> Result<()>;

    /// 在collection内做user_id过滤的相似度查询，按相似度降序返回至多k条
    async fn query(
        &self,
        collection: &str,
        vector: &[f32],
        user_id: &str,
        k: usize,
    ) -> Result<Vec<ScoredPoint>>;

    /// 删除该用户在collection中的全部记录
    async fn delete_user_points(&self, collection: &str, user_id: &str) -> Result<()>;

    /// 统计该用户在collection中的记录数
    async fn count_user_points(&self, collection: &str, user_id: &str) -> Result<u64>;
}

/// 根据配置创建向量库后端，整个进程生命周期内只调用一次
pub fn create_store(config: &Config) -> Result<Box<dyn VectorStore>> {
    match config.vector_store.backend {
        VectorBackend::Local => {
            let store = LocalStore::new(config.data_path.join("vectors"));
            Ok(Box::new(store))
        }
        VectorBackend::Qdrant => {
            let store = QdrantStore::new(&config.vector_store)?;
            Ok(Box::new(store))
        }
    }
}

/// 余弦相似度，零向量时返回0
pub(crate) fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;
    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}
