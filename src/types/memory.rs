//! 记忆子系统数据模型
//!
//! 原始内容分片（MemoryChunk）与研究主题记忆（TopicMemory）分属两个逻辑集合，
//! 所有读写都以user_id为作用域。

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 一段定长、带重叠的正文分片，嵌入后持久化，存储后不可变
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryChunk {
    /// 内容哈希派生的ID：md5(user_id, url, chunk_index, text)。
    /// 相同内容重复存储得到相同ID，upsert因此幂等
    pub id: Uuid,

    pub user_id: String,

    pub text: String,

    pub source_url: String,
    pub source_title: String,

    /// 在所属文档内的分片序号
    pub chunk_index: usize,

    /// 产生该分片的原始查询
    pub query: String,

    pub created_at: DateTime<Utc>,
}

impl MemoryChunk {
    /// 由内容哈希派生分片ID
    pub fn derive_id(user_id: &str, url: &str, chunk_index: usize, text: &str) -> Uuid {
        use md5::{Digest, Md5};

        let mut hasher = Md5::new();
        hasher.update(user_id.as_bytes());
        hasher.update(b"|");
        hasher.update(url.as_bytes());
        hasher.update(b"|");
        hasher.update(chunk_index.to_le_bytes());
        hasher.update(b"|");
        hasher.update(text.as_bytes());

        let digest: [u8; 16] = hasher.finalize().into();
        Uuid::from_bytes(digest)
    }
}

/// 一次完整研究的主题记忆，记录"学到了什么"，区别于原始分片
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopicMemory {
    pub id: Uuid,
    pub user_id: String,
    pub query: String,
    pub summary_text: String,
    pub created_at: DateTime<Utc>,
}

impl TopicMemory {
    pub fn new(
        user_id: impl Into<String>,
        query: impl Into<String>,
        summary_text: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id: user_id.into(),
            query: query.into(),
            summary_text: summary_text.into(),
            created_at: Utc::now(),
        }
    }
}

/// 查询返回的分片 + 归一化到[0,1]的相似度，瞬态数据
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievedChunk {
    pub chunk: MemoryChunk,
    pub similarity: f32,
}

/// 查询返回的主题记忆 + 归一化到[0,1]的相似度
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievedTopic {
    pub topic: TopicMemory,
    pub similarity: f32,
}

/// 主题图中的一条"related-to"边，供后续图谱可视化使用
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopicEdge {
    pub user_id: String,
    pub from_topic: Uuid,
    pub to_topic: Uuid,
    pub similarity: f32,
    pub created_at: DateTime<Utc>,
}

/// 用户记忆统计
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MemoryStats {
    pub chunk_count: u64,
    pub topic_count: u64,
}
