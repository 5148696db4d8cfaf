//! genpipe: 离线队列检查与重放的命令行工具
//!
//! Usage:
//!   genpipe list                        Show queued tasks
//!   genpipe enqueue <topic> [--research] Defer a generation request
//!   genpipe remove <id>                 Remove a queued task
//!   genpipe drain                       Replay queued tasks against the backend
//!   genpipe history                     Show completed generations

use ai_gen_pipeline::config::PipelineConfig;
use ai_gen_pipeline::guardrails::prepare_topic;
use ai_gen_pipeline::logging;
use ai_gen_pipeline::network::{NetworkMonitor, NetworkState, StaticConnectivity, TransportType};
use ai_gen_pipeline::pipeline::ContentPipeline;
use ai_gen_pipeline::queue::NewTask;
use ai_gen_pipeline::transport::HttpGenerationBackend;
use anyhow::{bail, Context};
use std::sync::Arc;

#[tokio::main]
async fn main() {
    let args: Vec<String> = std::env::args().collect();
    if args.len() < 2 {
        print_usage();
        std::process::exit(1);
    }

    let result = match args[1].as_str() {
        "list" => cmd_list().await,
        "enqueue" => cmd_enqueue(&args[2..]).await,
        "remove" => cmd_remove(&args[2..]).await,
        "drain" => cmd_drain().await,
        "history" => cmd_history().await,
        "version" | "--version" | "-V" => {
            cmd_version();
            Ok(())
        }
        "help" | "--help" | "-h" => {
            print_usage();
            Ok(())
        }
        other => {
            eprintln!("Unknown command: {other}");
            eprintln!();
            print_usage();
            std::process::exit(1);
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

fn print_usage() {
    println!(
        r#"genpipe: offline generation queue tool

USAGE:
    genpipe <COMMAND> [OPTIONS]

COMMANDS:
    list                        Show queued tasks in drain order
    enqueue <topic> [--research]
                                Defer a generation request
    remove <id>                 Remove a queued task before it is drained
    drain                       Replay queued tasks against the backend
    history                     Show completed generations
    version                     Show version information
    help                        Show this help message

ENVIRONMENT:
    GEN_CONFIG_PATH             Optional YAML configuration file
    GEN_BACKEND_URL             Generation proxy base URL
    GEN_QUEUE_PATH              Queue file (default .genpipe/queue.json)
    GEN_HISTORY_PATH            History file (default .genpipe/history.jsonl)
    GEN_LOG_LEVEL               trace | debug | info | warn | error"#
    );
}

fn cmd_version() {
    println!("genpipe {} (ai-gen-pipeline)", env!("CARGO_PKG_VERSION"));
}

async fn build() -> anyhow::Result<(PipelineConfig, ContentPipeline)> {
    let config = PipelineConfig::load().context("loading configuration")?;
    logging::init(&config);
    let backend = HttpGenerationBackend::from_config(&config).context("building HTTP backend")?;
    // The CLI has no platform connectivity feed; assume online and let the
    // retry engine surface transport failures.
    let source = Arc::new(StaticConnectivity::new(NetworkState::online(TransportType::Other)));
    let monitor = NetworkMonitor::init(source).await?;
    let pipeline = ContentPipeline::from_config(&config, Arc::new(backend), monitor);
    Ok((config, pipeline))
}

async fn cmd_list() -> anyhow::Result<()> {
    let (config, pipeline) = build().await?;
    let tasks = pipeline.queue().list().await?;
    if tasks.is_empty() {
        println!("Queue is empty ({})", config.queue_path.display());
        return Ok(());
    }
    println!("{:<38} {:>8} {:>9}  TOPIC", "ID", "ATTEMPTS", "RESEARCH");
    for task in tasks {
        println!(
            "{:<38} {:>8} {:>9}  {}",
            task.id,
            task.attempts,
            if task.with_research { "yes" } else { "no" },
            task.topic
        );
    }
    Ok(())
}

async fn cmd_enqueue(args: &[String]) -> anyhow::Result<()> {
    let with_research = args.iter().any(|a| a == "--research");
    let topic = args
        .iter()
        .filter(|a| !a.starts_with("--"))
        .cloned()
        .collect::<Vec<_>>()
        .join(" ");
    if topic.trim().is_empty() {
        bail!("enqueue requires a topic");
    }

    let (config, pipeline) = build().await?;
    let topic = prepare_topic(&topic, config.max_prompt_length)?;
    let task = pipeline
        .queue()
        .enqueue(NewTask::new(topic).with_research(with_research))
        .await?;
    println!("Queued {} ({})", task.id, task.topic);
    Ok(())
}

async fn cmd_remove(args: &[String]) -> anyhow::Result<()> {
    let Some(id) = args.first() else {
        bail!("remove requires a task id");
    };
    let (_, pipeline) = build().await?;
    if pipeline.queue().remove(id).await? {
        println!("Removed {id}");
        Ok(())
    } else {
        bail!("no queued task with id {id}")
    }
}

async fn cmd_drain() -> anyhow::Result<()> {
    let (_, pipeline) = build().await?;
    let report = pipeline.drain().await?;
    println!(
        "completed: {}  dropped: {}  remaining: {}",
        report.completed.len(),
        report.dropped.len(),
        report.remaining
    );
    if let Some(id) = report.halted_on {
        println!("halted on {id}; it will be retried on the next drain");
    }
    Ok(())
}

async fn cmd_history() -> anyhow::Result<()> {
    let (_, pipeline) = build().await?;
    let artifacts = pipeline.history().await?;
    if artifacts.is_empty() {
        println!("No completed generations");
        return Ok(());
    }
    for artifact in artifacts {
        println!(
            "{}  {}  {} words{}",
            artifact.id,
            artifact.article.title,
            artifact.article.word_count,
            if artifact.article.degraded { "  (fallback)" } else { "" }
        );
    }
    Ok(())
}
