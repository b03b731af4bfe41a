//! 研究流水线
//!
//! launch是库的主入口：构建上下文并执行一次完整研究。

use anyhow::Result;

use crate::config::Config;
use crate::types::memory::MemoryStats;
use crate::types::research::{ResearchRequest, ResearchResponse};

pub mod context;
pub mod enrich;
pub mod orchestrator;
pub mod reader;
pub mod search;
pub mod summarizer;

use context::PipelineContext;

/// 执行一次研究请求
pub async fn launch(config: Config, user_id: &str, query: &str) -> Result<ResearchResponse> {
    let context = PipelineContext::new(config).await?;
    let request = ResearchRequest::new(user_id, query);
    Ok(orchestrator::execute(&context, request).await)
}

/// 删除该用户的全部记忆
pub async fn forget(config: Config, user_id: &str) -> Result<()> {
    let context = PipelineContext::new(config).await?;
    context.memory.forget_user(user_id).await?;
    println!("🗑️ 已删除用户 {} 的全部记忆", user_id);
    Ok(())
}

/// 查询该用户的记忆统计
pub async fn stats(config: Config, user_id: &str) -> Result<MemoryStats> {
    let context = PipelineContext::new(config).await?;
    context.memory.stats(user_id).await
}

// Include tests
#[cfg(test)]
mod tests;
