//! 阅读阶段
//!
//! 并发抓取搜索命中的页面正文，输出顺序与输入的搜索排名一致。
//! 单个URL失败只降级该文档，不影响其它抓取。

use anyhow::{Context, Result};
use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use std::time::Duration;

use crate::config::ReaderConfig;
use crate::types::research::{ExtractedDocument, FetchStatus, SearchResult};
use crate::utils::text::{clean_whitespace, truncate_chars};

/// 内容抓取抽象，真实实现走外部正文抽取服务
#[async_trait]
pub trait ContentFetcher: Send + Sync {
    /// 抓取并返回目标URL的正文文本
    async fn fetch(&self, url: &str) -> Result<String>;
}

/// 正文抽取服务抓取器，目标URL直接拼接在服务地址后面
pub struct ReaderEndpointFetcher {
    client: reqwest::Client,
    endpoint: String,
}

impl ReaderEndpointFetcher {
    pub fn new(config: &ReaderConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .context("Failed to build reader HTTP client")?;

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
        })
    }
}

#[async_trait]
impl ContentFetcher for ReaderEndpointFetcher {
    async fn fetch(&self, url: &str) -> Result<String> {
        let target = format!("{}{}", self.endpoint, url);
        let response = self
            .client
            .get(&target)
            .send()
            .await
            .context("Reader request failed")?;

        if !response.status().is_success() {
            anyhow::bail!("正文抽取服务返回错误: {}", response.status());
        }

        response.text().await.context("Failed to read reader response body")
    }
}

/// 阅读Agent - 有界并发抓取与清洗
pub struct ReaderAgent {
    fetcher: Box<dyn ContentFetcher>,
    config: ReaderConfig,
}

impl ReaderAgent {
    pub fn new(fetcher: Box<dyn ContentFetcher>, config: ReaderConfig) -> Self {
        Self { fetcher, config }
    }

    /// 抓取全部搜索结果的正文，返回与输入一一对应、同序的文档集合
    pub async fn read(&self, results: &[SearchResult]) -> Vec<ExtractedDocument> {
        let timeout = Duration::from_secs(self.config.timeout_seconds);
        let concurrency = self.config.concurrency_limit.max(1);

        stream::iter(results.iter().map(|result| async move {
            let fetched = tokio::time::timeout(timeout, self.fetcher.fetch(&result.url)).await;
            self.classify(result, fetched)
        }))
        // buffered保证完成顺序与输入顺序一致
        .buffered(concurrency)
        .collect()
        .await
    }

    fn classify(
        &self,
        result: &SearchResult,
        fetched: Result<Result<String>, tokio::time::error::Elapsed>,
    ) -> ExtractedDocument {
        match fetched {
            Ok(Ok(raw)) => {
                let cleaned = clean_whitespace(&raw);
                if cleaned.chars().count() < self.config.min_content_chars {
                    ExtractedDocument {
                        url: result.url.clone(),
                        title: result.title.clone(),
                        cleaned_text: String::new(),
                        status: FetchStatus::EmptyContent,
                    }
                } else {
                    ExtractedDocument {
                        url: result.url.clone(),
                        title: result.title.clone(),
                        cleaned_text: truncate_chars(&cleaned, self.config.document_char_budget),
                        status: FetchStatus::Ok,
                    }
                }
            }
            Ok(Err(e)) => {
                eprintln!("⚠️ 抓取失败 {}: {}", result.url, e);
                ExtractedDocument {
                    url: result.url.clone(),
                    title: result.title.clone(),
                    cleaned_text: String::new(),
                    status: FetchStatus::FetchFailed,
                }
            }
            Err(_) => {
                eprintln!(
                    "⚠️ 抓取超时 {}（{}秒）",
                    result.url,
                    self.config.timeout_seconds
                );
                ExtractedDocument {
                    url: result.url.clone(),
                    title: result.title.clone(),
                    cleaned_text: String::new(),
                    status: FetchStatus::FetchFailed,
                }
            }
        }
    }
}
