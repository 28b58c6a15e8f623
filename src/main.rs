//! Concierge - 客服对话路由
//!
//! 用法：
//! - `concierge ingest <file>`：把文本文档加入知识库索引
//! - `concierge chat <message>`：执行一轮对话，逐步打印每个节点后的状态
//! - `concierge`：从标准输入读取多轮对话（`/clear` 清空历史，`/quit` 退出）

use std::path::PathBuf;

use anyhow::{bail, Context};
use concierge::config::{load_config, AppConfig};
use concierge::core::{ingest_document, ConversationState, SupportRuntime};
use concierge::observability;
use concierge::workflow::StepSnapshot;
use tokio::io::{AsyncBufReadExt, BufReader};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    observability::init();

    let cfg = load_config(std::env::var_os("CONCIERGE_CONFIG").map(PathBuf::from)).unwrap_or_else(|e| {
        tracing::warn!("Config load failed ({}), using defaults", e);
        AppConfig::default()
    });

    let args: Vec<String> = std::env::args().skip(1).collect();
    match parse_command(&args)? {
        Command::Ingest(file) => {
            let added = ingest_document(&cfg, &file)
                .await
                .with_context(|| format!("Failed to ingest {}", file.display()))?;
            println!(
                "Indexed {added} chunks from {} into {}",
                file.display(),
                cfg.knowledge.index_path.display()
            );
        }
        Command::Chat(message) => {
            let mut runtime = SupportRuntime::from_config(&cfg)
                .await
                .context("Failed to build support runtime")?;
            runtime
                .run_turn(&message, print_step)
                .await
                .context("Turn failed")?;
        }
        Command::Repl => {
            let runtime = SupportRuntime::from_config(&cfg)
                .await
                .context("Failed to build support runtime")?;
            repl(runtime).await?;
        }
    }

    Ok(())
}

const USAGE: &str = "usage: concierge [ingest <file> | chat <message...>]";

#[derive(Debug, PartialEq)]
enum Command {
    Ingest(PathBuf),
    Chat(String),
    Repl,
}

fn parse_command(args: &[String]) -> anyhow::Result<Command> {
    match args {
        [] => Ok(Command::Repl),
        [cmd, file] if cmd == "ingest" => Ok(Command::Ingest(PathBuf::from(file))),
        [cmd, message @ ..] if cmd == "chat" && !message.is_empty() => Ok(Command::Chat(message.join(" "))),
        _ => bail!(USAGE),
    }
}

async fn repl(mut runtime: SupportRuntime) -> anyhow::Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    eprintln!("Type a message (/clear to reset, /quit to exit)");

    while let Some(line) = lines.next_line().await.context("Failed to read stdin")? {
        let input = line.trim();
        match input {
            "" => continue,
            "/quit" | "/exit" => break,
            "/clear" => {
                runtime.clear();
                eprintln!("History cleared");
                continue;
            }
            _ => {}
        }
        // 一轮失败不退出，历史保持不变
        if let Err(e) = runtime.run_turn(input, print_step).await {
            eprintln!("Error: {e}");
        }
    }
    Ok(())
}

fn print_step(snapshot: &StepSnapshot<ConversationState>) {
    println!("------ STEP {} ({}) -------", snapshot.step, snapshot.node);
    match serde_json::to_string_pretty(&snapshot.state) {
        Ok(json) => println!("{json}"),
        Err(_) => println!("{:?}", snapshot.state),
    }
    println!("------ STEP {} ({}) -------", snapshot.step, snapshot.node);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_parse_command() {
        assert_eq!(parse_command(&[]).unwrap(), Command::Repl);
        assert_eq!(
            parse_command(&args(&["ingest", "courses.txt"])).unwrap(),
            Command::Ingest(PathBuf::from("courses.txt"))
        );
        assert_eq!(
            parse_command(&args(&["chat", "ingest", "my", "order", "please"])).unwrap(),
            Command::Chat("ingest my order please".to_string())
        );
    }

    #[test]
    fn test_bare_message_is_not_a_command() {
        assert!(parse_command(&args(&["ingest", "my", "order", "please"])).is_err());
        assert!(parse_command(&args(&["hello", "there"])).is_err());
        assert!(parse_command(&args(&["chat"])).is_err());
    }
}
