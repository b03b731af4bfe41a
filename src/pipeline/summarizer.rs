//! 摘要阶段
//!
//! 在LLM失效转移链之上做结构化摘要。该阶段永不失败：
//! 所有provider都不可用时退化为基于标题与摘要片段的抽取式摘要。

use std::collections::HashMap;
use std::sync::Arc;

use crate::config::LLMConfig;
use crate::llm::client::LLMClient;
use crate::types::research::{ExtractedDocument, SearchResult, SummaryResult};
use crate::utils::text::{leading_sentences, strip_list_prefix, strip_markdown_symbols, truncate_chars};

const SYSTEM_PROMPT: &str = "You are an expert AI research assistant. Your task is to analyze the provided research materials and create a comprehensive summary.";

/// 抽取式兜底的provider标记
pub const EXTRACTIVE_PROVIDER: &str = "extractive";

/// 摘要Agent
pub struct SummarizerAgent {
    llm: Arc<LLMClient>,
    config: LLMConfig,
}

impl SummarizerAgent {
    pub fn new(llm: Arc<LLMClient>, config: LLMConfig) -> Self {
        Self { llm, config }
    }

    /// 生成结构化摘要，永远返回非空的final_summary
    pub async fn summarize(
        &self,
        query: &str,
        search_results: &[SearchResult],
        documents: &[ExtractedDocument],
        memory_context: &str,
    ) -> SummaryResult {
        let prompt = self.build_prompt(query, search_results, documents, memory_context);

        match self.llm.generate_with_fallover(SYSTEM_PROMPT, &prompt).await {
            Ok((response, provider)) => {
                let sections = parse_sections(&response);
                let top_insights = extract_top_insights(&sections);

                let executive = sections
                    .get("executive_summary")
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .unwrap_or_else(|| {
                        sections
                            .get("full_response")
                            .cloned()
                            .unwrap_or_else(|| truncate_chars(&response, 500))
                    });

                SummaryResult {
                    final_summary: strip_markdown_symbols(&executive),
                    top_insights,
                    raw_provider_used: provider,
                    full_text: response,
                }
            }
            Err(e) => {
                eprintln!("⚠️ 所有LLM provider均不可用，使用抽取式摘要: {}", e);
                self.extractive_fallback(query, search_results, documents)
            }
        }
    }

    /// 组装摘要prompt：记忆片段在前，新正文按搜索排名折叠进字符预算
    fn build_prompt(
        &self,
        query: &str,
        search_results: &[SearchResult],
        documents: &[ExtractedDocument],
        memory_context: &str,
    ) -> String {
        let mut content_parts = Vec::new();
        let mut remaining_budget = self.config.aggregate_content_budget;

        for (i, doc) in documents.iter().filter(|d| d.is_usable()).enumerate() {
            if remaining_budget == 0 {
                break;
            }
            let snippet = search_results
                .iter()
                .find(|r| r.url == doc.url)
                .map(|r| r.snippet.as_str())
                .unwrap_or("");

            let body = truncate_chars(&doc.cleaned_text, remaining_budget);
            remaining_budget -= body.chars().count().min(remaining_budget);

            content_parts.push(format!(
                "Source {}: {}\nURL: {}\nSnippet: {}\nContent: {}\n\n{}\n",
                i + 1,
                doc.title,
                doc.url,
                snippet,
                body,
                "=".repeat(80)
            ));
        }

        let memory_section = if memory_context.trim().is_empty() {
            String::new()
        } else {
            format!(
                "RETRIEVED MEMORY CONTEXT (From previous research):\n{}\n\n---\n\n",
                memory_context
            )
        };

        format!(
            r#"{}RESEARCH QUERY: {}

NEW RESEARCH MATERIALS:
{}

Please provide:

1. **EXECUTIVE SUMMARY** (2-3 sentences): A concise overview answering the research query. If memory context is available, note any new information or confirmations.
2. **KEY FINDINGS** (3-5 bullet points): Main insights and discoveries from the research, including new developments not mentioned in past research
3. **DETAILED ANALYSIS** (1-2 paragraphs): In-depth explanation of findings, with comparison to historical context if available
4. **TOP INSIGHTS** (3-5 items): Most important takeaways and novel discoveries
5. **RECOMMENDATIONS** (2-3 items): Suggested next steps or actions based on findings
6. **SOURCES USED**: Which sources were most relevant (list by title)

Format your response as clear sections with headers. Be specific, factual, and cite information from the sources when possible.
"#,
            memory_section,
            query,
            content_parts.join("\n")
        )
    }

    /// 抽取式兜底：从标题与摘要片段中拼出简短摘要
    fn extractive_fallback(
        &self,
        query: &str,
        search_results: &[SearchResult],
        documents: &[ExtractedDocument],
    ) -> SummaryResult {
        let mut material = String::new();
        for result in search_results {
            material.push_str(&result.snippet);
            material.push(' ');
        }
        for doc in documents.iter().filter(|d| d.is_usable()) {
            material.push_str(&truncate_chars(&doc.cleaned_text, 500));
            material.push(' ');
        }

        let sentences = leading_sentences(&material, 3);
        let final_summary = if sentences.is_empty() {
            format!(
                "No summary could be generated for \"{}\". {} sources were found but their content could not be summarized.",
                query,
                search_results.len()
            )
        } else {
            sentences.join(" ")
        };

        let top_insights: Vec<String> = search_results
            .iter()
            .filter(|r| !r.title.trim().is_empty())
            .take(5)
            .map(|r| r.title.trim().to_string())
            .collect();

        SummaryResult {
            final_summary: final_summary.clone(),
            top_insights,
            raw_provider_used: EXTRACTIVE_PROVIDER.to_string(),
            full_text: final_summary,
        }
    }
}

/// 按标题关键词把LLM响应切分成命名章节
///
/// 未被任何标题命中的前置内容落在 "full_response" 段。
pub(crate) fn parse_sections(response: &str) -> HashMap<&'static str, String> {
    const HEADER_KEYWORDS: [(&str, &str); 6] = [
        ("EXECUTIVE", "executive_summary"),
        ("KEY FINDINGS", "key_findings"),
        ("DETAILED", "detailed_analysis"),
        ("TOP INSIGHTS", "top_insights"),
        ("RECOMMENDATIONS", "recommendations"),
        ("SOURCES", "sources_used"),
    ];

    let mut sections: HashMap<&'static str, String> = HashMap::new();
    let mut current_section = "full_response";
    let mut current_content: Vec<&str> = Vec::new();

    for line in response.lines() {
        let upper = line.to_uppercase();
        let header = HEADER_KEYWORDS
            .iter()
            .copied()
            .find(|(keyword, _)| upper.contains(keyword));

        match header {
            Some((_, section_name)) => {
                if !current_content.is_empty() {
                    sections.insert(current_section, current_content.join("\n").trim().to_string());
                }
                current_section = section_name;
                current_content = Vec::new();
            }
            None => current_content.push(line),
        }
    }

    if !current_content.is_empty() {
        sections.insert(current_section, current_content.join("\n").trim().to_string());
    }

    sections
}

/// 提取top insights，按 TOP INSIGHTS -> KEY FINDINGS -> EXECUTIVE SUMMARY 顺序兜底
pub(crate) fn extract_top_insights(sections: &HashMap<&'static str, String>) -> Vec<String> {
    let mut insights = Vec::new();

    if let Some(text) = sections.get("top_insights") {
        collect_list_items(text, &mut insights, 5);
    }

    if insights.len() < 3 {
        if let Some(text) = sections.get("key_findings") {
            collect_list_items(text, &mut insights, 5);
        }
    }

    if insights.len() < 2 {
        if let Some(text) = sections.get("executive_summary") {
            for sentence in leading_sentences(text, 3) {
                if insights.len() >= 5 {
                    break;
                }
                let cleaned = strip_markdown_symbols(&sentence);
                if !cleaned.is_empty() {
                    insights.push(cleaned);
                }
            }
        }
    }

    insights.truncate(5);
    insights
}

fn collect_list_items(text: &str, insights: &mut Vec<String>, max: usize) {
    for line in text.lines() {
        if insights.len() >= max {
            break;
        }
        let line = line.trim();
        if line.chars().count() <= 5 {
            continue;
        }
        let cleaned = strip_list_prefix(&strip_markdown_symbols(line));
        if cleaned.chars().count() > 5 {
            insights.push(truncate_chars(&cleaned, 300));
        }
    }
}
