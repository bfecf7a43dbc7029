use std::sync::Arc;

use anyhow::{Context, anyhow};
use serde_json::Value;
use tokio::io::AsyncReadExt;

use email_triage::channels::{SmtpConfig, SmtpTransport, Transport};
use email_triage::config::PipelineConfig;
use email_triage::llm::{LlmConfig, create_provider};
use email_triage::pipeline::{EmailPipeline, PipelineDeps};
use email_triage::store::{JsonFileLog, OutcomeLog};
use email_triage::tickets::{TicketClient, ZendeskClient, ZendeskConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Install rustls crypto provider before any TLS usage
    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|_| anyhow!("Failed to install rustls crypto provider"))?;

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let llm_config = LlmConfig::from_env().unwrap_or_else(|e| {
        eprintln!("Error: {e}");
        eprintln!("  export OPENAI_API_KEY=sk-...");
        std::process::exit(1);
    });
    let config = PipelineConfig::from_env();
    let smtp_config = SmtpConfig::from_env(config.send_timeout);
    let zendesk_config = ZendeskConfig::from_env();

    // Input: a JSON array of email records, or a single record
    let source = std::env::args().nth(1).unwrap_or_else(|| "-".to_string());
    let raw = if source == "-" {
        let mut buf = String::new();
        tokio::io::stdin()
            .read_to_string(&mut buf)
            .await
            .context("Failed to read emails from stdin")?;
        buf
    } else {
        tokio::fs::read_to_string(&source)
            .await
            .with_context(|| format!("Failed to read emails from {source}"))?
    };
    let inputs = match serde_json::from_str::<Value>(&raw).context("Input is not valid JSON")? {
        Value::Array(items) => items,
        single => vec![single],
    };

    eprintln!("📬 Email Triage v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Model: {}", llm_config.model);
    eprintln!("   SMTP: {}:{}", smtp_config.host, smtp_config.port);
    eprintln!(
        "   Tickets: {}",
        zendesk_config
            .as_ref()
            .map_or("disabled".to_string(), |z| z.base_url.clone())
    );
    eprintln!("   Log: {}", config.log_path.display());
    eprintln!("   Emails: {} (max {} workers)\n", inputs.len(), config.max_workers);

    // ── Wiring ──────────────────────────────────────────────────────────
    let llm = create_provider(&llm_config, config.llm_timeout);
    let transport: Arc<dyn Transport> = Arc::new(SmtpTransport::new(smtp_config));
    let tickets: Option<Arc<dyn TicketClient>> = zendesk_config
        .map(|z| Arc::new(ZendeskClient::new(z)) as Arc<dyn TicketClient>);
    let log: Arc<dyn OutcomeLog> = Arc::new(JsonFileLog::new(config.log_path.clone()));

    let deps = PipelineDeps::with_llm(llm, transport, tickets, log, &config);
    let pipeline = Arc::new(EmailPipeline::new(deps, &config));

    // Ctrl-C stops new emails from starting
    {
        let pipeline = Arc::clone(&pipeline);
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                eprintln!("\nShutting down after in-flight emails...");
                pipeline.shutdown();
            }
        });
    }

    let results = pipeline.process_batch(inputs).await;

    let succeeded = results.iter().filter(|r| r.status.is_success()).count();
    eprintln!(
        "\n✅ {} succeeded, ❌ {} failed",
        succeeded,
        results.len() - succeeded
    );

    println!("{}", serde_json::to_string_pretty(&results)?);
    Ok(())
}
