//! 增强阶段
//!
//! 引用、追问与主题图三个任务相互独立，并发执行。
//! 任何一项失败都只降级该项产出。

use std::sync::Arc;

use crate::llm::client::LLMClient;
use crate::types::memory::TopicMemory;
use crate::types::research::{Citation, ExtractedDocument, SummaryResult};

pub mod citations;
pub mod followup;
pub mod topic_graph;

use followup::FollowupAgent;
use topic_graph::TopicGraphAgent;

/// 增强阶段的产出
pub struct EnrichmentResult {
    pub citations: Vec<Citation>,
    pub follow_up_questions: Vec<String>,
    pub topic_edges_created: usize,
}

/// 并发执行三个增强任务
pub async fn enrich(
    llm: Arc<LLMClient>,
    topic_graph: &TopicGraphAgent,
    query: &str,
    documents: &[ExtractedDocument],
    summary: &SummaryResult,
    stored_topic: Option<&(TopicMemory, Vec<f32>)>,
) -> EnrichmentResult {
    let citations = citations::build_citations(documents);

    let followup_agent = FollowupAgent::new(llm);
    let followup_future = followup_agent.generate(query, summary, &citations);

    let graph_future = async {
        match stored_topic {
            Some((topic, vector)) => topic_graph.link_topic(topic, vector).await,
            None => 0,
        }
    };

    let (follow_up_questions, topic_edges_created) = tokio::join!(followup_future, graph_future);

    EnrichmentResult {
        citations,
        follow_up_questions,
        topic_edges_created,
    }
}
