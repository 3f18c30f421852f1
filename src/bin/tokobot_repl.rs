use std::io::{self, BufRead, Write};
use std::sync::Arc;
use std::time::Duration;

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use tokobot::dialogue::Orchestrator;
use tokobot::dialogue::QueryReformulator;
use tokobot::dialogue::{Classifier, Reformulator};
use tokobot::llm::{LlmClassifier, LlmProviderFactory, LlmReformulator};
use tokobot::{InMemorySearchService, InMemoryStateStore, TemplateResponseGenerator, TokobotConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(
            EnvFilter::from_default_env().add_directive("tokobot=info".parse()?),
        )
        .init();

    let config = TokobotConfig::from_env();

    // Without an API key the engine runs purely on the rule path; that is
    // a supported mode, not an error.
    let (classifier, remote_reformulator): (
        Option<Arc<dyn Classifier>>,
        Option<Arc<dyn Reformulator>>,
    ) = if config.llm_api_key.is_some() {
        let provider = LlmProviderFactory::from_config(&config);
        (
            Some(Arc::new(LlmClassifier::new(
                Arc::clone(&provider),
                config.classification_cache_size,
                config.classification_cache_ttl_secs,
            ))),
            Some(Arc::new(LlmReformulator::new(provider))),
        )
    } else {
        eprintln!("No TOKOBOT_LLM_API_KEY set; running deterministic-only.");
        (None, None)
    };

    let reformulator = QueryReformulator::new(
        remote_reformulator,
        Duration::from_secs(config.reformulator_timeout_secs),
        config.canonical_attribute_language,
    );

    let orchestrator = Orchestrator::new(
        Arc::new(InMemoryStateStore::new()),
        classifier,
        reformulator,
        Arc::new(InMemorySearchService::with_demo_catalog()),
        Arc::new(TemplateResponseGenerator::new()),
        config,
    );

    println!("Tokobot demo. Type a message, or \"quit\" to exit.");
    let stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        print!("> ");
        stdout.flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        let message = line.trim();
        if message.is_empty() {
            continue;
        }
        if message.eq_ignore_ascii_case("quit") || message.eq_ignore_ascii_case("exit") {
            break;
        }

        match orchestrator.process_message("repl", message).await {
            Ok(reply) => {
                println!("{}", reply.intro);
                for product in &reply.products {
                    let price = product
                        .price
                        .map(|p| format!(" - Rp{p}"))
                        .unwrap_or_default();
                    println!("  * {}{}", product.name, price);
                }
                println!("{}", reply.follow_up);
            }
            Err(e) => eprintln!("error: {e}"),
        }
    }

    Ok(())
}
