use anyhow::Result;
use clap::Parser;
use colored::*;
use cosmos_common::{EngineConfig, ServiceConfig, SourceType, constants};
use cosmos_engine::{HttpAnswerService, QueryDispatcher, QueryRequest, Role};
use std::io::{self, Write};
use std::sync::Arc;
use tracing::error;
use tracing_subscriber::EnvFilter;

/// Command-line arguments for the COSMOS chat client
#[derive(Parser)]
#[command(
    name = "cosmos",
    about = "COSMOS - Citation-aware multi-model chat over your own sources"
)]
pub struct Args {
    /// Base URL of the Answer Service API
    #[clap(long, default_value = constants::DEFAULT_API_BASE_URL)]
    api_url: String,

    /// Models to query; one model streams, several answer side by side
    #[clap(long, value_delimiter = ',', default_value = constants::DEFAULT_MODEL_NAME)]
    models: Vec<String>,

    /// Sampling temperature
    #[clap(long, default_value_t = constants::DEFAULT_TEMPERATURE)]
    temperature: f32,

    /// Source types retrieval may use (pdf, image, url, youtube)
    #[clap(long, value_delimiter = ',')]
    sources: Option<Vec<String>>,

    /// Show timing footnotes and streaming diagnostics
    #[clap(long)]
    diagnostics: bool,

    /// Enable debug logging
    #[clap(short, long)]
    debug: bool,
}

fn parse_source_filters(names: &[String]) -> Result<Vec<SourceType>> {
    let mut filters = Vec::new();
    for name in names {
        let source_type = match name.to_lowercase().as_str() {
            "pdf" => SourceType::Pdf,
            "image" => SourceType::Image,
            "url" => SourceType::Url,
            "youtube" => SourceType::Youtube,
            other => anyhow::bail!("unknown source type: {}", other),
        };
        if !filters.contains(&source_type) {
            filters.push(source_type);
        }
    }
    Ok(filters)
}

fn print_message(role: Role, content: &str) {
    let label = match role {
        Role::System => "cosmos".bright_cyan().bold(),
        Role::User => "you".bright_yellow().bold(),
        Role::Assistant => "cosmos".bright_green().bold(),
    };
    println!("{}: {}", label, content);
    println!();
}

async fn conversation_loop(dispatcher: QueryDispatcher, args: &Args) -> Result<()> {
    let filters = match &args.sources {
        Some(names) => parse_source_filters(names)?,
        None => SourceType::ALL.to_vec(),
    };

    for message in dispatcher.snapshot().await {
        print_message(message.role, &message.content);
    }
    println!(
        "{}",
        "Type a question, '/reset' to start over, or 'quit' to leave.".bright_black()
    );

    loop {
        print!("{} ", ">".bright_yellow());
        io::stdout().flush()?;

        let mut line = String::new();
        if io::stdin().read_line(&mut line)? == 0 {
            break;
        }
        let line = line.trim();

        match line {
            "" => continue,
            "quit" | "exit" => break,
            "/reset" => {
                dispatcher.reset().await;
                println!("{}", "Conversation cleared.".bright_black());
                continue;
            }
            _ => {}
        }

        let request = QueryRequest::new(line, args.models.clone())
            .with_temperature(args.temperature)
            .with_source_filters(filters.clone());

        if args.models.len() > 1 {
            println!(
                "{}",
                format!("Asking {} models...", args.models.len()).bright_black()
            );
        }

        match dispatcher.submit(request).await {
            Ok(id) => {
                let snapshot = dispatcher.snapshot().await;
                if let Some(message) = snapshot.iter().find(|m| m.id == id) {
                    print_message(message.role, &message.content);
                    if !message.citations.is_empty() {
                        println!(
                            "{}",
                            format!("{} source(s) cited", message.citations.len())
                                .bright_black()
                        );
                        println!();
                    }
                }
            }
            Err(e) => {
                error!(error = %e, "submission failed");
                println!("{} {}", "error:".bright_red().bold(), e);
            }
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let filter = if args.debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let service = HttpAnswerService::new(&ServiceConfig {
        base_url: args.api_url.clone(),
        timeout_seconds: None,
    })?;

    let config = EngineConfig {
        show_diagnostics: args.diagnostics,
        ..EngineConfig::default()
    };

    let dispatcher = QueryDispatcher::new(Arc::new(service), config);
    conversation_loop(dispatcher, &args).await
}
