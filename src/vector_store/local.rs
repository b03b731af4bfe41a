//! 本地磁盘向量库，每个集合一个JSON文件
//!
//! 面向开发与测试，数据量以单用户研究历史为尺度，全量载入内存后线性扫描。

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use tokio::fs;
use tokio::sync::Mutex;
use uuid::Uuid;

use super::{cosine_similarity, PointRecord, ScoredPoint, VectorStore};

#[derive(Debug, Serialize, Deserialize, Default)]
struct CollectionFile {
    dimensions: usize,
    points: Vec<StoredPoint>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredPoint {
    id: Uuid,
    vector: Vec<f32>,
    payload: serde_json::Value,
}

/// 本地JSON文件后端
pub struct LocalStore {
    base_path: PathBuf,
    // 文件级读写不是原子的，用单把锁串行化所有集合操作
    io_lock: Mutex<()>,
}

impl LocalStore {
    pub fn new(base_path: PathBuf) -> Self {
        Self {
            base_path,
            io_lock: Mutex::new(()),
        }
    }

    fn collection_path(&self, collection: &str) -> PathBuf {
        self.base_path.join(format!("{}.json", collection))
    }

    async fn load_collection(&self, collection: &str) -> Result<CollectionFile> {
        let path = self.collection_path(collection);
        if !path.exists() {
            return Ok(CollectionFile::default());
        }

        let content = fs::read_to_string(&path)
            .await
            .context(format!("Failed to read collection file {:?}", path))?;
        let file: CollectionFile = serde_json::from_str(&content)
            .context(format!("Failed to parse collection file {:?}", path))?;
        Ok(file)
    }

    async fn save_collection(&self, collection: &str, file: &CollectionFile) -> Result<()> {
        fs::create_dir_all(&self.base_path)
            .await
            .context("Failed to create vector store directory")?;

        let path = self.collection_path(collection);
        let content = serde_json::to_string(file)?;
        fs::write(&path, content)
            .await
            .context(format!("Failed to write collection file {:?}", path))?;
        Ok(())
    }

    fn payload_user_id(payload: &serde_json::Value) -> Option<&str> {
        payload.get("user_id").and_then(|v| v.as_str())
    }
}

#[async_trait]
impl VectorStore for LocalStore {
    async fn ensure_collections(&self, dimensions: usize) -> Result<()> {
        let _guard = self.io_lock.lock().await;

        for collection in [
            super::CHUNKS_COLLECTION,
            super::TOPICS_COLLECTION,
            super::EDGES_COLLECTION,
        ] {
            let mut file = self.load_collection(collection).await?;
            if file.dimensions == 0 {
                file.dimensions = dimensions;
                self.save_collection(collection, &file).await?;
            } else if file.dimensions != dimensions {
                anyhow::bail!(
                    "集合 {} 的维度为 {}，与嵌入模型维度 {} 不匹配",
                    collection,
                    file.dimensions,
                    dimensions
                );
            }
        }

        Ok(())
    }

    async fn upsert(&self, collection: &str, points: Vec<PointRecord>) -> Result<()> {
        if points.is_empty() {
            return Ok(());
        }

        let _guard = self.io_lock.lock().await;
        let mut file = self.load_collection(collection).await?;

        let mut by_id: HashMap<Uuid, usize> = file
            .points
            .iter()
            .enumerate()
            .map(|(i, p)| (p.id, i))
            .collect();

        for point in points {
            let stored = StoredPoint {
                id: point.id,
                vector: point.vector,
                payload: point.payload,
            };
            match by_id.get(&stored.id) {
                Some(&index) => file.points[index] = stored,
                None => {
                    by_id.insert(stored.id, file.points.len());
                    file.points.push(stored);
                }
            }
        }

        self.save_collection(collection, &file).await
    }

    async fn query(
        &self,
        collection: &str,
        vector: &[f32],
        user_id: &str,
        k: usize,
    ) -> Result<Vec<ScoredPoint>> {
        let _guard = self.io_lock.lock().await;
        let file = self.load_collection(collection).await?;

        let mut scored: Vec<ScoredPoint> = file
            .points
            .into_iter()
            .filter(|p| Self::payload_user_id(&p.payload) == Some(user_id))
            .map(|p| ScoredPoint {
                id: p.id,
                score: cosine_similarity(vector, &p.vector),
                payload: p.payload,
            })
            .collect();

        scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(k);
        Ok(scored)
    }

    async fn delete_user_points(&self, collection: &str, user_id: &str) -> Result<()> {
        let _guard = self.io_lock.lock().await;
        let mut file = self.load_collection(collection).await?;
        file.points
            .retain(|p| Self::payload_user_id(&p.payload) != Some(user_id));
        self.save_collection(collection, &file).await
    }

    async fn count_user_points(&self, collection: &str, user_id: &str) -> Result<u64> {
        let _guard = self.io_lock.lock().await;
        let file = self.load_collection(collection).await?;
        Ok(file
            .points
            .iter()
            .filter(|p| Self::payload_user_id(&p.payload) == Some(user_id))
            .count() as u64)
    }
}
