//! Binary entry point for promptforge.
//!
//! This binary provides the CLI interface: the MCP server plus local
//! commands for optimizing a prompt, listing patterns and checking the
//! environment.

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(missing_docs)]
// Allow print_stderr in main binary for CLI output
#![allow(clippy::print_stderr)]
#![allow(clippy::print_stdout)]
// Allow needless_pass_by_value for command functions
#![allow(clippy::needless_pass_by_value)]
// Allow multiple crate versions from transitive dependencies
#![allow(clippy::multiple_crate_versions)]

use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use promptforge::config::PromptForgeConfig;
use promptforge::mcp::{McpServer, Transport};
use promptforge::models::{OptimizeRequest, TimeRange};
use promptforge::observability::{self, ObservabilityConfig};
use promptforge::services::PromptOptimizer;

/// PromptForge - rule-based prompt optimization over MCP.
#[derive(Parser)]
#[command(name = "promptforge")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to configuration file.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands.
#[derive(Subcommand)]
enum Commands {
    /// Run as MCP server.
    Serve {
        /// Transport type: stdio or http.
        #[arg(short, long, default_value = "stdio")]
        transport: String,

        /// Port for HTTP transport (defaults to the configured port).
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Optimize one prompt and print the result as JSON.
    Optimize {
        /// The prompt to optimize.
        prompt: String,

        /// Use this domain instead of detecting one.
        #[arg(short, long)]
        domain: Option<String>,

        /// Output format instruction: json, xml, markdown, html, list, table, code.
        #[arg(short, long)]
        format: Option<String>,

        /// Add step-by-step reasoning scaffolding.
        #[arg(long)]
        chain_of_thought: bool,
    },

    /// Print the active pattern set.
    Patterns {
        /// Print only this domain's pattern.
        #[arg(short, long)]
        domain: Option<String>,
    },

    /// Report configuration and backend connectivity.
    Check,
}

/// Main entry point.
fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match PromptForgeConfig::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            return ExitCode::FAILURE;
        },
    };

    let mut observability_config = ObservabilityConfig::from_config(&config, cli.verbose);
    if !matches!(cli.command, Commands::Serve { .. }) {
        // Only a long-running server exposes a scrape endpoint.
        observability_config.metrics = observability::MetricsConfig::default();
    }
    let _observability = match observability::init(observability_config) {
        Ok(handle) => handle,
        Err(e) => {
            eprintln!("Failed to initialize observability: {e}");
            return ExitCode::FAILURE;
        },
    };

    match run_command(cli, &config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        },
    }
}

/// Runs the selected command.
fn run_command(cli: Cli, config: &PromptForgeConfig) -> anyhow::Result<()> {
    match cli.command {
        Commands::Serve { transport, port } => cmd_serve(config, &transport, port),
        Commands::Optimize {
            prompt,
            domain,
            format,
            chain_of_thought,
        } => cmd_optimize(config, prompt, domain, format, chain_of_thought),
        Commands::Patterns { domain } => cmd_patterns(config, domain),
        Commands::Check => cmd_check(config),
    }
}

/// Serve command.
fn cmd_serve(config: &PromptForgeConfig, transport: &str, port: Option<u16>) -> anyhow::Result<()> {
    let transport = Transport::parse(transport)?;

    let missing = config.validate_environment();
    if !missing.is_empty() {
        tracing::warn!(
            missing = %missing.join(", "),
            "External services not fully configured, using in-memory fallbacks"
        );
    }

    let optimizer = Arc::new(PromptOptimizer::from_config(config));
    let server = McpServer::new(optimizer)
        .with_transport(transport)
        .with_port(port.unwrap_or(config.port));

    server.start().context("MCP server stopped with an error")?;
    Ok(())
}

/// Optimize command.
fn cmd_optimize(
    config: &PromptForgeConfig,
    prompt: String,
    domain: Option<String>,
    format: Option<String>,
    chain_of_thought: bool,
) -> anyhow::Result<()> {
    anyhow::ensure!(!prompt.trim().is_empty(), "prompt must not be empty");

    let mut request = OptimizeRequest::new(prompt).without_analytics();
    request.domain = domain;
    request.desired_format = format;
    if chain_of_thought {
        request = request.with_chain_of_thought(true);
    }

    let optimizer = PromptOptimizer::from_config(config);
    let result = optimizer.optimize(&request);
    println!(
        "{}",
        serde_json::to_string_pretty(&result).context("serializing result")?
    );
    Ok(())
}

/// Patterns command.
fn cmd_patterns(config: &PromptForgeConfig, domain: Option<String>) -> anyhow::Result<()> {
    let optimizer = PromptOptimizer::from_config(config);
    let patterns = optimizer.patterns().load(false);

    let output = match domain {
        Some(domain) => {
            let pattern = patterns
                .get(&domain)
                .with_context(|| format!("no pattern for domain '{domain}'"))?;
            serde_json::to_string_pretty(pattern)
        },
        None => serde_json::to_string_pretty(patterns.as_ref()),
    }
    .context("serializing patterns")?;

    println!("{output}");
    Ok(())
}

/// Check command.
fn cmd_check(config: &PromptForgeConfig) -> anyhow::Result<()> {
    println!("PromptForge Check");
    println!("=================");
    println!();
    println!("Version: {}", env!("CARGO_PKG_VERSION"));
    println!();

    println!("Environment:");
    let missing = config.validate_environment();
    if missing.is_empty() {
        println!("  All external service variables set");
    } else {
        for name in &missing {
            println!("  Missing: {name}");
        }
    }
    println!();

    let optimizer = PromptOptimizer::from_config(config);

    let store = optimizer.patterns().store();
    println!("Pattern Store ({}):", store.backend_name());
    match store.get_all() {
        Ok(patterns) => println!("  Reachable, {} patterns", patterns.len()),
        Err(e) => println!("  Unavailable: {e}"),
    }

    if let Some(analytics) = optimizer.analytics() {
        println!("Analytics ({}):", analytics.backend_name());
        match analytics.summarize(TimeRange::Today, None) {
            Ok(summary) => println!("  Reachable, {} events today", summary.total_optimizations),
            Err(e) => println!("  Unavailable: {e}"),
        }
    }

    println!();
    println!("Scoring: {:?} (k = {})", config.scoring.mode, config.scoring.k);
    println!("Cache TTL: {}s", config.cache_ttl.as_secs());
    Ok(())
}
