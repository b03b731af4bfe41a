//! LLM客户端 - 提供带失效转移的统一LLM服务接口

use anyhow::Result;
use async_trait::async_trait;
use std::time::Duration;

use crate::config::{LLMConfig, ProviderConfig};

mod providers;

use providers::ProviderClient;

/// 单个生成后端的抽象，测试时可用假实现替换真实provider
#[async_trait]
pub trait GenerativeBackend: Send + Sync {
    /// 后端名称，用于日志与响应元数据
    fn name(&self) -> &str;

    /// 单轮生成
    async fn generate(&self, system_prompt: &str, user_prompt: &str) -> Result<String>;
}

/// rig后端实现，每次调用构建一个临时Agent
struct RigBackend {
    name: String,
    client: ProviderClient,
    model: String,
    llm_config: LLMConfig,
}

#[async_trait]
impl GenerativeBackend for RigBackend {
    fn name(&self) -> &str {
        &self.name
    }

    async fn generate(&self, system_prompt: &str, user_prompt: &str) -> Result<String> {
        let agent = self
            .client
            .create_agent(&self.model, system_prompt, &self.llm_config);
        agent.prompt(user_prompt).await
    }
}

/// LLM客户端 - 按配置顺序在多个provider间做线性失效转移
pub struct LLMClient {
    backends: Vec<Box<dyn GenerativeBackend>>,
    timeout: Duration,
}

impl LLMClient {
    /// 根据配置创建客户端，配置中的每个provider对应一个后端
    pub fn new(config: &LLMConfig) -> Result<Self> {
        let mut backends: Vec<Box<dyn GenerativeBackend>> = Vec::new();
        for provider_config in &config.providers {
            backends.push(Self::build_backend(provider_config, config)?);
        }

        if backends.is_empty() {
            anyhow::bail!("LLM配置中没有任何provider");
        }

        Ok(Self {
            backends,
            timeout: Duration::from_secs(config.timeout_seconds),
        })
    }

    fn build_backend(
        provider_config: &ProviderConfig,
        llm_config: &LLMConfig,
    ) -> Result<Box<dyn GenerativeBackend>> {
        let client = ProviderClient::new(provider_config)?;
        Ok(Box::new(RigBackend {
            name: provider_config.provider.to_string(),
            client,
            model: provider_config.model.clone(),
            llm_config: llm_config.clone(),
        }))
    }

    /// 测试入口：用外部后端组装客户端
    #[cfg(test)]
    pub fn with_backends(backends: Vec<Box<dyn GenerativeBackend>>, timeout: Duration) -> Self {
        Self { backends, timeout }
    }

    /// 链条中的provider名称，按尝试顺序排列
    pub fn provider_names(&self) -> Vec<String> {
        self.backends.iter().map(|b| b.name().to_string()).collect()
    }

    /// 按顺序尝试每个provider，每个provider至多尝试一次
    ///
    /// 返回首个成功的输出与对应provider名称；全部失效时返回错误，
    /// 由调用方决定兜底策略。
    pub async fn generate_with_fallover(
        &self,
        system_prompt: &str,
        user_prompt: &str,
    ) -> Result<(String, String)> {
        let mut last_error: Option<anyhow::Error> = None;

        for backend in &self.backends {
            match tokio::time::timeout(self.timeout, backend.generate(system_prompt, user_prompt))
                .await
            {
                Ok(Ok(text)) => {
                    if text.trim().is_empty() {
                        eprintln!("⚠️ Provider {} 返回了空响应，切换下一个", backend.name());
                        last_error = Some(anyhow::anyhow!("empty response"));
                        continue;
                    }
                    return Ok((text, backend.name().to_string()));
                }
                Ok(Err(e)) => {
                    eprintln!("❌ Provider {} 调用失败，切换下一个: {}", backend.name(), e);
                    last_error = Some(e);
                }
                Err(_) => {
                    eprintln!(
                        "❌ Provider {} 超时（{}秒），切换下一个",
                        backend.name(),
                        self.timeout.as_secs()
                    );
                    last_error = Some(anyhow::anyhow!(
                        "provider {} timed out after {:?}",
                        backend.name(),
                        self.timeout
                    ));
                }
            }
        }

        Err(last_error.unwrap_or_else(|| anyhow::anyhow!("no providers configured")))
    }
}
