//! 研究编排器
//!
//! 串联搜索、阅读、记忆、摘要与增强五个阶段。
//! 只有搜索失败是致命的，其余阶段失败都降级为部分结果。

use std::collections::HashMap;
use std::time::Instant;

use crate::pipeline::context::PipelineContext;
use crate::pipeline::enrich;
use crate::pipeline::summarizer::EXTRACTIVE_PROVIDER;
use crate::types::research::{ResearchRequest, ResearchResponse, ResearchStatus};

/// 执行一次完整的研究请求
pub async fn execute(context: &PipelineContext, request: ResearchRequest) -> ResearchResponse {
    let total_start = Instant::now();
    let mut stage_timings: HashMap<String, f64> = HashMap::new();
    let mut degraded = false;

    println!("🚀 开始研究: {} (user: {})", request.query, request.user_id);

    // Step 1/6: 搜索
    println!("🔍 Step 1/6: 搜索来源...");
    let stage_start = Instant::now();
    let search_results = match context.search.search(&request.query).await {
        Ok(results) => results,
        Err(e) => {
            eprintln!("❌ 搜索失败，研究终止: {}", e);
            let mut response = ResearchResponse::failure(&request, e.to_string());
            stage_timings.insert("search".to_string(), stage_start.elapsed().as_secs_f64());
            response.stage_timings = stage_timings;
            response.execution_time_seconds = total_start.elapsed().as_secs_f64();
            return response;
        }
    };
    stage_timings.insert("search".to_string(), stage_start.elapsed().as_secs_f64());
    println!("✅ 搜索完成，共 {} 条结果", search_results.len());

    // Step 2/6: 阅读 与 Step 3/6: 记忆检索（相互独立，并发执行）
    println!("📖 Step 2/6: 抓取正文...");
    println!("🧠 Step 3/6: 检索历史记忆...");
    let reader_start = Instant::now();
    let (documents, retrieved) = tokio::join!(
        context.reader.read(&search_results),
        context
            .memory
            .retrieve_context(&request.user_id, &request.query),
    );
    stage_timings.insert(
        "reader_and_retrieve".to_string(),
        reader_start.elapsed().as_secs_f64(),
    );
    let (retrieved_chunks, retrieved_topics) = (retrieved.chunks, retrieved.topics);

    if retrieved.degraded {
        degraded = true;
        eprintln!("⚠️ 记忆检索降级，本次摘要不含历史上下文");
    }

    let usable_count = documents.iter().filter(|d| d.is_usable()).count();
    if usable_count < documents.len() {
        degraded = true;
        eprintln!(
            "⚠️ {} / {} 个来源抓取降级",
            documents.len() - usable_count,
            documents.len()
        );
    }
    println!(
        "✅ 阅读完成，可用来源 {} / {}；命中记忆 {} 分片 / {} 主题",
        usable_count,
        documents.len(),
        retrieved_chunks.len(),
        retrieved_topics.len()
    );

    // Step 4/6: 摘要
    println!("📝 Step 4/6: 生成摘要...");
    let stage_start = Instant::now();
    let memory_context = context
        .memory
        .format_memory_context(&retrieved_chunks, &retrieved_topics);
    let summary = context
        .summarizer
        .summarize(&request.query, &search_results, &documents, &memory_context)
        .await;
    stage_timings.insert("summarize".to_string(), stage_start.elapsed().as_secs_f64());

    if summary.raw_provider_used == EXTRACTIVE_PROVIDER {
        degraded = true;
    }
    println!("✅ 摘要完成 (provider: {})", summary.raw_provider_used);

    // Step 5/6: 记忆存储
    println!("💾 Step 5/6: 写入记忆...");
    let stage_start = Instant::now();
    let stored = context
        .memory
        .store(&request, &documents, &summary.final_summary)
        .await;
    stage_timings.insert(
        "memory_store".to_string(),
        stage_start.elapsed().as_secs_f64(),
    );

    if context.config.memory.enabled && usable_count > 0 && stored.chunks_stored == 0 {
        degraded = true;
    }
    println!("✅ 记忆写入完成，新增 {} 个分片", stored.chunks_stored);

    // Step 6/6: 增强
    println!("✨ Step 6/6: 生成引用与追问...");
    let stage_start = Instant::now();
    let enrichment = enrich::enrich(
        context.llm.clone(),
        &context.topic_graph,
        &request.query,
        &documents,
        &summary,
        stored.topic.as_ref(),
    )
    .await;
    stage_timings.insert("enrich".to_string(), stage_start.elapsed().as_secs_f64());
    println!(
        "✅ 增强完成：{} 条引用，{} 个追问，{} 条主题边",
        enrichment.citations.len(),
        enrichment.follow_up_questions.len(),
        enrichment.topic_edges_created
    );

    let status = if degraded {
        ResearchStatus::PartialFailure
    } else {
        ResearchStatus::Success
    };

    let execution_time_seconds = total_start.elapsed().as_secs_f64();
    println!("🎉 研究完成，耗时 {:.2} 秒", execution_time_seconds);

    ResearchResponse {
        query: request.query,
        user_id: request.user_id,
        status,
        final_summary: summary.final_summary,
        top_insights: summary.top_insights,
        citations: enrichment.citations,
        follow_up_questions: enrichment.follow_up_questions,
        search_results,
        retrieved_chunks,
        retrieved_topics,
        sources_count: usable_count,
        provider_used: Some(summary.raw_provider_used),
        error: None,
        timestamp: request.requested_at,
        execution_time_seconds,
        stage_timings,
    }
}
