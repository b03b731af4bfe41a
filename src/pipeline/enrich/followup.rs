//! 追问生成
//!
//! 基于摘要生成5-7个深入研究的问题。失败时返回空列表，不影响主流程。

use std::sync::Arc;

use crate::llm::client::LLMClient;
use crate::types::research::{Citation, SummaryResult};
use crate::utils::text::{strip_list_prefix, truncate_chars};

const SYSTEM_PROMPT: &str =
    "You are a research assistant that proposes thoughtful follow-up questions.";

/// 追问Agent
pub struct FollowupAgent {
    llm: Arc<LLMClient>,
}

impl FollowupAgent {
    pub fn new(llm: Arc<LLMClient>) -> Self {
        Self { llm }
    }

    /// 生成追问列表，任何失败都降级为空列表
    pub async fn generate(
        &self,
        query: &str,
        summary: &SummaryResult,
        citations: &[Citation],
    ) -> Vec<String> {
        let prompt = build_prompt(query, summary, citations);

        match self.llm.generate_with_fallover(SYSTEM_PROMPT, &prompt).await {
            Ok((response, _)) => parse_questions(&response),
            Err(e) => {
                eprintln!("⚠️ 追问生成失败，返回空列表: {}", e);
                Vec::new()
            }
        }
    }
}

fn build_prompt(query: &str, summary: &SummaryResult, citations: &[Citation]) -> String {
    let insights_text = summary
        .top_insights
        .iter()
        .map(|i| format!("- {}", i))
        .collect::<Vec<_>>()
        .join("\n");

    let sources_text = if citations.is_empty() {
        "N/A".to_string()
    } else {
        citations
            .iter()
            .map(|c| format!("- {}", c.title))
            .collect::<Vec<_>>()
            .join("\n")
    };

    format!(
        r#"Based on this research summary, generate 5-7 high-quality follow-up questions that would help explore the topic deeper.

ORIGINAL QUERY: {}

SUMMARY:
{}

KEY INSIGHTS:
{}

SOURCES:
{}

Generate follow-up questions that:
1. Build on the insights discovered
2. Explore unexplored angles or subtopics
3. Are specific and actionable
4. Would lead to deeper understanding

Output ONLY the questions, one per line, starting with a number (e.g., "1. Question here?"). No explanations."#,
        query,
        truncate_chars(&summary.final_summary, 1000),
        insights_text,
        sources_text
    )
}

/// 从响应中抽取问句：只保留含问号的行并去掉编号
pub(crate) fn parse_questions(response: &str) -> Vec<String> {
    response
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && line.contains('?'))
        .map(strip_list_prefix)
        .filter(|q| !q.is_empty())
        .take(7)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_questions_strips_numbering() {
        let response = "1. What drives solar adoption?\n2) How do costs compare?\n- Open question?";
        let questions = parse_questions(response);
        assert_eq!(
            questions,
            vec![
                "What drives solar adoption?",
                "How do costs compare?",
                "Open question?"
            ]
        );
    }

    #[test]
    fn test_parse_questions_drops_non_questions() {
        let response = "Here are some questions:\n1. Is this useful?\nThanks for reading.";
        let questions = parse_questions(response);
        assert_eq!(questions, vec!["Is this useful?"]);
    }

    #[test]
    fn test_parse_questions_caps_at_seven() {
        let response = (1..=10)
            .map(|i| format!("{}. Question number {}?", i, i))
            .collect::<Vec<_>>()
            .join("\n");
        assert_eq!(parse_questions(&response).len(), 7);
    }
}
