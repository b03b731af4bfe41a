//! 引用构建
//!
//! 纯同步计算：从可用文档生成引用条目，按原始搜索排名排序。

use chrono::Utc;

use crate::types::research::{Citation, ExtractedDocument};
use crate::utils::text::extract_domain;

/// 从阅读阶段的文档构建引用列表
///
/// 只有成功抓取的文档产生引用；URL重复时保留排名靠前的一条。
pub fn build_citations(documents: &[ExtractedDocument]) -> Vec<Citation> {
    let mut seen_urls = std::collections::HashSet::new();
    let accessed_at = Utc::now();

    documents
        .iter()
        .filter(|d| d.is_usable())
        .filter(|d| seen_urls.insert(d.url.clone()))
        .map(|d| Citation {
            title: if d.title.trim().is_empty() {
                extract_domain(&d.url)
            } else {
                d.title.clone()
            },
            url: d.url.clone(),
            domain: extract_domain(&d.url),
            accessed_at,
        })
        .collect()
}
