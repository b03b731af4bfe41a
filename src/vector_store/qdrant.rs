//! Qdrant后端，通过REST接口访问
//!
//! 三个集合均使用余弦距离，user_id作为payload过滤条件下推到服务端。

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use uuid::Uuid;

use crate::config::VectorStoreConfig;

use super::{PointRecord, ScoredPoint, VectorStore};

/// Qdrant REST后端
pub struct QdrantStore {
    client: reqwest::Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    result: Vec<SearchHit>,
}

#[derive(Debug, Deserialize)]
struct SearchHit {
    id: Uuid,
    score: f32,
    #[serde(default)]
    payload: Value,
}

#[derive(Debug, Deserialize)]
struct CountResponse {
    result: CountResult,
}

#[derive(Debug, Deserialize)]
struct CountResult {
    count: u64,
}

impl QdrantStore {
    pub fn new(config: &VectorStoreConfig) -> Result<Self> {
        let mut headers = reqwest::header::HeaderMap::new();
        if !config.qdrant_api_key.is_empty() {
            let mut value = reqwest::header::HeaderValue::from_str(&config.qdrant_api_key)
                .context("Invalid Qdrant API key")?;
            value.set_sensitive(true);
            headers.insert("api-key", value);
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .default_headers(headers)
            .build()
            .context("Failed to build Qdrant HTTP client")?;

        Ok(Self {
            client,
            base_url: config.qdrant_url.trim_end_matches('/').to_string(),
        })
    }

    fn collection_url(&self, collection: &str) -> String {
        format!("{}/collections/{}", self.base_url, collection)
    }

    fn user_filter(user_id: &str) -> Value {
        json!({
            "must": [
                { "key": "user_id", "match": { "value": user_id } }
            ]
        })
    }

    async fn collection_exists(&self, collection: &str) -> Result<bool> {
        let response = self
            .client
            .get(self.collection_url(collection))
            .send()
            .await
            .context("Qdrant collection lookup failed")?;
        Ok(response.status().is_success())
    }

    async fn create_collection(&self, collection: &str, dimensions: usize) -> Result<()> {
        let body = json!({
            "vectors": { "size": dimensions, "distance": "Cosine" }
        });

        let response = self
            .client
            .put(self.collection_url(collection))
            .json(&body)
            .send()
            .await
            .context("Qdrant collection creation failed")?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            anyhow::bail!("Qdrant创建集合 {} 失败: {} {}", collection, status, text);
        }
        Ok(())
    }
}

#[async_trait]
impl VectorStore for QdrantStore {
    async fn ensure_collections(&self, dimensions: usize) -> Result<()> {
        for collection in [
            super::CHUNKS_COLLECTION,
            super::TOPICS_COLLECTION,
            super::EDGES_COLLECTION,
        ] {
            if !self.collection_exists(collection).await? {
                self.create_collection(collection, dimensions).await?;
            }
        }
        Ok(())
    }

    async fn upsert(&self, collection: &str, points: Vec<PointRecord>) -> Result<()> {
        if points.is_empty() {
            return Ok(());
        }

        let body = json!({
            "points": points
                .iter()
                .map(|p| json!({
                    "id": p.id,
                    "vector": p.vector,
                    "payload": p.payload,
                }))
                .collect::<Vec<_>>()
        });

        let response = self
            .client
            .put(format!("{}/points?wait=true", self.collection_url(collection)))
            .json(&body)
            .send()
            .await
            .context("Qdrant upsert request failed")?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            anyhow::bail!("Qdrant upsert到 {} 失败: {} {}", collection, status, text);
        }
        Ok(())
    }

    async fn query(
        &self,
        collection: &str,
        vector: &[f32],
        user_id: &str,
        k: usize,
    ) -> Result<Vec<ScoredPoint>> {
        let body = json!({
            "vector": vector,
            "limit": k,
            "filter": Self::user_filter(user_id),
            "with_payload": true,
        });

        let response = self
            .client
            .post(format!("{}/points/search", self.collection_url(collection)))
            .json(&body)
            .send()
            .await
            .context("Qdrant search request failed")?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            anyhow::bail!("Qdrant查询 {} 失败: {} {}", collection, status, text);
        }

        let parsed: SearchResponse = response
            .json()
            .await
            .context("Failed to parse Qdrant search response")?;

        Ok(parsed
            .result
            .into_iter()
            .map(|hit| ScoredPoint {
                id: hit.id,
                score: hit.score,
                payload: hit.payload,
            })
            .collect())
    }

    async fn delete_user_points(&self, collection: &str, user_id: &str) -> Result<()> {
        let body = json!({ "filter": Self::user_filter(user_id) });

        let response = self
            .client
            .post(format!(
                "{}/points/delete?wait=true",
                self.collection_url(collection)
            ))
            .json(&body)
            .send()
            .await
            .context("Qdrant delete request failed")?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            anyhow::bail!("Qdrant删除 {} 中的用户数据失败: {} {}", collection, status, text);
        }
        Ok(())
    }

    async fn count_user_points(&self, collection: &str, user_id: &str) -> Result<u64> {
        let body = json!({
            "filter": Self::user_filter(user_id),
            "exact": true,
        });

        let response = self
            .client
            .post(format!("{}/points/count", self.collection_url(collection)))
            .json(&body)
            .send()
            .await
            .context("Qdrant count request failed")?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            anyhow::bail!("Qdrant统计 {} 失败: {} {}", collection, status, text);
        }

        let parsed: CountResponse = response
            .json()
            .await
            .context("Failed to parse Qdrant count response")?;
        Ok(parsed.result.count)
    }
}
