use crate::config::{Config, LLMProvider, VectorBackend};
use clap::Parser;
use std::path::PathBuf;

/// DeepBrief-RS - 由Rust与AI驱动的个人研究助理
#[derive(Parser, Debug)]
#[command(name = "Brief (deepbrief-rs)")]
#[command(
    about = "AI-based research orchestration pipeline. It searches the web, reads sources, recalls what you learned before, and produces a grounded research brief with citations and follow-up questions."
)]
#[command(version)]
pub struct Args {
    /// 研究查询
    #[arg(short, long)]
    pub query: Option<String>,

    /// 用户标识，记忆读写的作用域
    #[arg(short, long, default_value = "default")]
    pub user_id: String,

    /// 配置文件路径
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// 数据目录路径
    #[arg(short, long)]
    pub data_path: Option<PathBuf>,

    /// LLM失效转移顺序，逗号分隔 (gemini, openai, deepseek, anthropic, ollama)
    #[arg(long)]
    pub providers: Option<String>,

    /// 向量库后端 (local, qdrant)
    #[arg(long)]
    pub vector_backend: Option<String>,

    /// 搜索结果条数
    #[arg(long)]
    pub top_k: Option<usize>,

    /// 禁用记忆检索与存储
    #[arg(long)]
    pub no_memory: bool,

    /// 删除该用户的全部记忆后退出
    #[arg(long)]
    pub forget: bool,

    /// 打印该用户的记忆统计后退出
    #[arg(long)]
    pub stats: bool,

    /// 是否启用详细日志
    #[arg(short, long)]
    pub verbose: bool,
}

impl Args {
    /// 将CLI参数转换为配置
    pub fn into_config(self) -> Config {
        let mut config = if let Some(config_path) = &self.config {
            // 如果显式指定了配置文件路径，从该路径加载
            Config::from_file(config_path).unwrap_or_else(|_| {
                panic!("⚠️ 警告: 无法读取配置文件 {:?}", config_path)
            })
        } else {
            // 如果没有显式指定配置文件，尝试从默认位置加载
            let default_config_path = std::env::current_dir()
                .unwrap_or_else(|_| std::path::PathBuf::from("."))
                .join("brief.toml");

            if default_config_path.exists() {
                Config::from_file(&default_config_path).unwrap_or_else(|_| {
                    panic!("⚠️ 警告: 无法读取默认配置文件 {:?}", default_config_path)
                })
            } else {
                // 默认配置文件不存在，使用默认值
                Config::default()
            }
        };

        // 覆盖配置文件中的设置
        if let Some(data_path) = &self.data_path {
            config.data_path = data_path.clone();
        }

        if let Some(providers_str) = &self.providers {
            let mut order = Vec::new();
            for part in providers_str.split(',') {
                match part.trim().parse::<LLMProvider>() {
                    Ok(provider) => order.push(provider),
                    Err(_) => {
                        eprintln!("⚠️ 警告: 未知的provider: {}，已跳过", part.trim());
                    }
                }
            }
            if !order.is_empty() {
                config.reorder_providers(&order);
            }
        }

        if let Some(backend_str) = &self.vector_backend {
            if let Ok(backend) = backend_str.parse::<VectorBackend>() {
                config.vector_store.backend = backend;
            } else {
                eprintln!("⚠️ 警告: 未知的向量库后端: {}，使用默认后端", backend_str);
            }
        }

        if let Some(top_k) = self.top_k {
            config.search.top_k = top_k;
        }

        if self.no_memory {
            config.memory.enabled = false;
        }

        config.verbose = self.verbose;

        config
    }
}

// Include tests
#[cfg(test)]
mod tests;
