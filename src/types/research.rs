//! 研究流水线核心数据模型
//!
//! 各阶段之间传递的都是这里定义的不可变数据，后续阶段不会回写前序阶段的内部状态。

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::types::memory::{RetrievedChunk, RetrievedTopic};

/// 一次研究请求，随请求创建，不做持久化
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResearchRequest {
    /// 用户标识，由上游身份系统提供，核心不做校验
    pub user_id: String,

    /// 用户的自然语言查询
    pub query: String,

    /// 请求发起时间
    pub requested_at: DateTime<Utc>,
}

impl ResearchRequest {
    pub fn new(user_id: impl Into<String>, query: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            query: query.into(),
            requested_at: Utc::now(),
        }
    }
}

/// 搜索阶段产出的单条结果
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchResult {
    pub title: String,

    /// 同一请求内去重后唯一
    pub url: String,

    pub snippet: String,
}

/// 抓取状态
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FetchStatus {
    /// 抓取并清洗成功
    Ok,
    /// 抓取失败（网络错误或超时）
    FetchFailed,
    /// 抓取成功但正文过短
    EmptyContent,
}

/// 阅读阶段产出的文档，与SearchResult一一对应
///
/// 抓取失败不会从集合中剔除，由下游阶段决定文档是否可用。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractedDocument {
    pub url: String,

    /// 冗余保存标题，供引用与prompt组装使用
    pub title: String,

    /// 清洗并截断后的正文；失败时为空字符串
    pub cleaned_text: String,

    pub status: FetchStatus,
}

impl ExtractedDocument {
    /// 文档是否可被下游（存储、摘要、引用）使用
    pub fn is_usable(&self) -> bool {
        self.status == FetchStatus::Ok && !self.cleaned_text.is_empty()
    }
}

/// 引用条目，按原始搜索排名排序
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Citation {
    pub title: String,
    pub url: String,
    pub domain: String,
    pub accessed_at: DateTime<Utc>,
}

/// 摘要阶段的结构化产出
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummaryResult {
    /// 最终摘要，永不为空（所有provider失效时来自抽取式兜底）
    pub final_summary: String,

    pub top_insights: Vec<String>,

    /// 实际产出摘要的provider名称；抽取式兜底为 "extractive"
    pub raw_provider_used: String,

    /// provider原始响应全文，便于调试与展示
    pub full_text: String,
}

/// 整体请求状态
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ResearchStatus {
    /// 所有阶段均成功
    Success,
    /// 部分阶段降级，但仍产出了可用摘要
    PartialFailure,
    /// 搜索阶段失败，无可用来源
    Failure,
}

/// 编排器组装的最终响应，每个请求构建一次
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResearchResponse {
    pub query: String,
    pub user_id: String,
    pub status: ResearchStatus,

    /// status为Success时保证非空；PartialFailure时可能为抽取式摘要
    pub final_summary: String,

    pub top_insights: Vec<String>,
    pub citations: Vec<Citation>,
    pub follow_up_questions: Vec<String>,
    pub search_results: Vec<SearchResult>,
    pub retrieved_chunks: Vec<RetrievedChunk>,
    pub retrieved_topics: Vec<RetrievedTopic>,

    /// 实际用于摘要的可用来源数
    pub sources_count: usize,

    /// 产出摘要的provider，Failure时为None
    pub provider_used: Option<String>,

    /// Failure时携带人类可读的失败原因
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    pub timestamp: DateTime<Utc>,
    pub execution_time_seconds: f64,

    /// 各阶段耗时（秒）
    pub stage_timings: HashMap<String, f64>,
}

impl ResearchResponse {
    /// 构建终态Failed响应：除查询信息外所有列表字段为空
    pub fn failure(request: &ResearchRequest, error: impl Into<String>) -> Self {
        Self {
            query: request.query.clone(),
            user_id: request.user_id.clone(),
            status: ResearchStatus::Failure,
            final_summary: String::new(),
            top_insights: Vec::new(),
            citations: Vec::new(),
            follow_up_questions: Vec::new(),
            search_results: Vec::new(),
            retrieved_chunks: Vec::new(),
            retrieved_topics: Vec::new(),
            sources_count: 0,
            provider_used: None,
            error: Some(error.into()),
            timestamp: Utc::now(),
            execution_time_seconds: 0.0,
            stage_timings: HashMap::new(),
        }
    }
}
