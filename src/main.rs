use anyhow::Result;
use clap::Parser;

mod cli;
mod config;
mod llm;
mod memory;
mod pipeline;
mod types;
mod utils;
mod vector_store;

#[tokio::main]
async fn main() -> Result<()> {
    let args = cli::Args::parse();
    let user_id = args.user_id.clone();
    let query = args.query.clone();
    let forget = args.forget;
    let stats = args.stats;
    let config = args.into_config();

    if forget {
        return pipeline::forget(config, &user_id).await;
    }

    if stats {
        let stats = pipeline::stats(config, &user_id).await?;
        println!("{}", serde_json::to_string_pretty(&stats)?);
        return Ok(());
    }

    let query = match query {
        Some(query) => query,
        None => anyhow::bail!("需要提供研究查询，使用 --query 指定"),
    };

    let response = pipeline::launch(config, &user_id, &query).await?;
    println!("{}", serde_json::to_string_pretty(&response)?);
    Ok(())
}
