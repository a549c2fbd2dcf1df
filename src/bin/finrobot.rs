//! Run one analyst workflow from the terminal

use clap::{Parser, ValueEnum};
use finrobot_dashboard::{
    config::{ApiKeys, Backend, LlmConfig, Settings},
    ui::{CAPTION, TITLE},
    workflows::Workflow,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(ValueEnum, Clone, Copy, Debug)]
enum Task {
    /// Market forecaster: news, profile, basics and prices
    Forecast,
    /// Annual report analyzer: filings and financial statements
    Report,
}

impl From<Task> for Workflow {
    fn from(task: Task) -> Self {
        match task {
            Task::Forecast => Workflow::Forecast,
            Task::Report => Workflow::Report,
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "finrobot")]
#[command(about = "Run a FinRobot analyst workflow against an NSE/BSE ticker", long_about = None)]
struct Args {
    /// Workflow to run
    #[arg(value_enum)]
    task: Task,

    /// Ticker symbol, defaults to the workflow's sample ticker
    ticker: Option<String>,

    /// LLM backend (gemini or groq), overrides LLM_BACKEND
    #[arg(short, long)]
    backend: Option<String>,

    /// Model name, overrides LLM_MODEL
    #[arg(short, long)]
    model: Option<String>,

    /// Print the run as JSON instead of text
    #[arg(long)]
    json: bool,

    /// Skip the conversation log
    #[arg(long)]
    summary_only: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();

    // Logs go to stderr so stdout stays clean for --json
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let mut settings = Settings::from_env()?;

    if let Some(backend) = args.backend.as_deref() {
        let backend: Backend = backend.parse()?;
        if backend != settings.llm.backend {
            let timeout = settings.llm.timeout;
            let temperature = settings.llm.temperature;
            settings.llm = LlmConfig::new(backend);
            settings.llm.timeout = timeout;
            settings.llm.temperature = temperature;
            settings.keys = ApiKeys::from_env(backend);
        }
    }
    if let Some(model) = args.model {
        settings.llm.model = model;
    }

    let workflow = Workflow::from(args.task);
    let ticker = args
        .ticker
        .unwrap_or_else(|| workflow.default_ticker().to_string());

    info!(workflow = %workflow, ticker = %ticker, model = %settings.llm.model, "Running workflow");
    eprintln!("{}", workflow.progress_label());

    let report = workflow.run(&ticker, &settings.keys, &settings.llm).await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("{}", TITLE);
    println!("{}", CAPTION);
    println!();
    println!("{}", workflow.banner());
    println!("### {}", report.heading());
    println!();
    println!("{}", report.chat.summary);

    if !args.summary_only {
        println!();
        println!("--- {} ---", workflow.log_label());
        for entry in report.chat.chat_history.iter().filter(|e| e.is_visible()) {
            let who = match &entry.tool_name {
                Some(tool) => format!("{} [{}]", entry.name, tool),
                None => entry.name.clone(),
            };
            println!(
                "{} ({}): {}",
                entry.role.to_string().to_uppercase(),
                who,
                entry.content.as_deref().unwrap_or_default()
            );
            println!("---");
        }
    }

    println!();
    println!(
        "{} turns, {} ms, model {}",
        report.chat.turns, report.chat.elapsed_ms, report.model
    );

    Ok(())
}
