//! 搜索阶段
//!
//! 流水线中唯一的致命阶段：没有搜索结果就没有可研究的来源。

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use thiserror::Error;

use crate::config::SearchConfig;
use crate::types::research::SearchResult;

/// 搜索阶段错误
#[derive(Debug, Error)]
pub enum SearchError {
    /// 搜索服务不可用（网络错误、超时或上游错误响应）
    #[error("search provider unavailable: {0}")]
    Unavailable(String),
    /// 搜索成功但没有任何可用结果
    #[error("search returned no usable results for query")]
    NoResults,
}

/// 搜索Provider抽象
#[async_trait]
pub trait SearchProvider: Send + Sync {
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<SearchResult>>;
}

/// Tavily搜索Provider
pub struct TavilyProvider {
    client: reqwest::Client,
    api_key: String,
    api_base_url: String,
}

#[derive(Debug, Deserialize)]
struct TavilyResponse {
    #[serde(default)]
    results: Vec<TavilyResult>,
}

#[derive(Debug, Deserialize)]
struct TavilyResult {
    #[serde(default)]
    title: String,
    url: String,
    /// Tavily把摘要片段放在content字段
    #[serde(default)]
    content: String,
}

impl TavilyProvider {
    pub fn new(config: &SearchConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .context("Failed to build search HTTP client")?;

        Ok(Self {
            client,
            api_key: config.api_key.clone(),
            api_base_url: config.api_base_url.clone(),
        })
    }
}

#[async_trait]
impl SearchProvider for TavilyProvider {
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<SearchResult>> {
        let body = json!({
            "api_key": self.api_key,
            "query": query,
            "max_results": max_results,
        });

        let response = self
            .client
            .post(&self.api_base_url)
            .json(&body)
            .send()
            .await
            .context("Search request failed")?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            anyhow::bail!("搜索服务返回错误: {} {}", status, text);
        }

        let parsed: TavilyResponse = response
            .json()
            .await
            .context("Failed to parse search response")?;

        Ok(parsed
            .results
            .into_iter()
            .map(|r| SearchResult {
                title: r.title,
                url: r.url,
                snippet: r.content,
            })
            .collect())
    }
}

/// 搜索Agent - 在Provider之上做清洗与去重
pub struct SearchAgent {
    provider: Box<dyn SearchProvider>,
    top_k: usize,
}

impl SearchAgent {
    pub fn new(provider: Box<dyn SearchProvider>, top_k: usize) -> Self {
        Self { provider, top_k }
    }

    /// 执行搜索，返回按原始排名排序的去重结果
    pub async fn search(&self, query: &str) -> Result<Vec<SearchResult>, SearchError> {
        let raw = self
            .provider
            .search(query, self.top_k)
            .await
            .map_err(|e| SearchError::Unavailable(e.to_string()))?;

        let mut seen_urls = std::collections::HashSet::new();
        let mut results = Vec::new();
        for result in raw {
            if result.url.is_empty() {
                continue;
            }
            // 标题与摘要均为空的结果对后续阶段没有价值
            if result.title.trim().is_empty() && result.snippet.trim().is_empty() {
                continue;
            }
            // URL去重，保留排名靠前的一条
            if !seen_urls.insert(result.url.clone()) {
                continue;
            }
            results.push(result);
            if results.len() >= self.top_k {
                break;
            }
        }

        if results.is_empty() {
            return Err(SearchError::NoResults);
        }
        Ok(results)
    }
}
