//! Upgrades a prompt from the command line and prints the result.
//!
//! ```text
//! cargo run -p prompt-upgrade -- --intent editor --client vscode --explain \
//!     "/steps Write a function to add two numbers."
//! ```
//!
//! `DEMON_SETTINGS` may point at a JSON settings file; `DEMON_*` variables
//! override individual settings.

use std::str::FromStr;

use anyhow::{Context, Result};
use clap::Parser;
use demon_engine::config::EngineSettings;
use demon_engine::primitives::Tier;
use demon_engine::telemetry::init_tracing;
use demon_engine::{DemonEngine, UpgradeRequest};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    let request = Args::parse().into_request();
    let settings = match std::env::var("DEMON_SETTINGS") {
        Ok(path) => EngineSettings::from_path(&path)
            .with_context(|| format!("loading settings from {path}"))?,
        Err(_) => EngineSettings::default(),
    }
    .with_env_overrides()?;
    init_tracing(&settings.log_filter);

    let engine = DemonEngine::builder().settings(settings).build().await?;
    info!(
        techniques = engine.compendium().len(),
        routes = engine.router().registry().len(),
        "engine ready"
    );

    let response = engine.upgrade(request).await?;

    println!("=== Route ===");
    println!(
        "{} -> {} ({})",
        response.route.resolved, response.route.matched_pipeline, response.route.output_contract
    );
    println!("\n=== Techniques ===");
    for technique in response.plan.execution_order() {
        println!(
            "{:<24} {:>5} {:>6.0} tokens  {:.2}",
            technique.id.as_str(),
            technique.phase.as_str(),
            technique.estimated_tokens,
            technique.final_score
        );
    }
    println!(
        "budget {:.0}/{:.0}",
        response.plan.budget_used, response.plan.budget_limit
    );
    println!("\n=== Upgraded prompt ===\n{}", response.upgraded_prompt);
    println!("\n{}", response.message);
    println!("fidelity {:.2}", response.fidelity_score);

    if let Some(trace) = &response.explanation {
        println!("\n=== Explanation ===");
        println!("{}", serde_json::to_string_pretty(trace)?);
    }
    Ok(())
}

/// Upgrade a prompt through the Demon Engine.
#[derive(Parser, Debug)]
#[command(name = "prompt-upgrade", version, about, arg_required_else_help = true)]
struct Args {
    /// Routing intent such as chat, editor or agent
    #[arg(long, value_name = "INTENT")]
    intent: Option<String>,

    /// Calling surface such as chrome, web or vscode
    #[arg(long, value_name = "CLIENT")]
    client: Option<String>,

    /// Requested tier (free or pro)
    #[arg(long, value_name = "TIER", value_parser = Tier::from_str)]
    mode: Option<Tier>,

    /// Caller holds a pro plan
    #[arg(long)]
    pro: bool,

    /// Override the technique limit
    #[arg(long, value_name = "N")]
    max: Option<usize>,

    /// Print the explanation trace
    #[arg(long)]
    explain: bool,

    /// Prompt text, directives included
    #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
    text: Vec<String>,
}

impl Args {
    fn into_request(self) -> UpgradeRequest {
        UpgradeRequest {
            text: self.text.join(" "),
            intent: self.intent,
            mode: self.mode,
            client: self.client,
            user_is_pro: self.pro,
            explain: self.explain,
            max_techniques: self.max,
            ..UpgradeRequest::default()
        }
    }
}
