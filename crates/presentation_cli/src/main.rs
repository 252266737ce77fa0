//! llm-memo CLI
//!
//! Ask a hosted model through the persistent response cache, inspect or
//! clear the cache, and run the sentiment and translation analysis.

#![allow(clippy::print_stdout)]

use std::{path::PathBuf, sync::Arc, time::Duration};

use ai_core::create_engine;
use application::{
    CacheStats, MemoizedResponse, PersistentMemoizingClient, TextAnalysisService,
};
use clap::{Parser, Subcommand};
use domain::GenerationOptions;
use infrastructure::{AppConfig, init_logging, open_store};
use tracing::debug;

const DEMO_PROMPT: &str = "What is the capital of India?";

/// llm-memo CLI
#[derive(Debug, Parser)]
#[command(name = "llm-memo")]
#[command(author, version, about = "Memoizing client for hosted LLM APIs", long_about = None)]
struct Cli {
    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Configuration file (default: ./llm-memo.toml if present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Keep the cache in memory only for this run
    #[arg(long, global = true)]
    no_persist: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Send a prompt, answering from the cache when possible
    Ask {
        /// Prompt text
        prompt: String,

        #[command(flatten)]
        sampling: SamplingArgs,

        /// Bypass the cache for this request
        #[arg(long)]
        no_cache: bool,
    },

    /// Show cache statistics
    Stats {
        /// Number of sample keys to print
        #[arg(short, long, default_value = "3")]
        keys: usize,
    },

    /// Remove every cached response
    Clear,

    /// Sentiment analysis and Hindi translation of a text
    Analyze {
        /// English text to analyze
        text: String,

        /// Model to use (default: configured model)
        #[arg(short, long)]
        model: Option<String>,

        /// Run the two tasks one after the other
        #[arg(long)]
        sequential: bool,
    },

    /// Run the same prompt twice and report the speedup
    Demo {
        /// Prompt to send
        #[arg(default_value = DEMO_PROMPT)]
        prompt: String,

        /// Model to use (default: configured model)
        #[arg(short, long)]
        model: Option<String>,
    },

    /// List models offered by the configured backend
    Models,
}

/// Request parameters that take part in the cache key
#[derive(Debug, Default, clap::Args)]
struct SamplingArgs {
    /// Model to use (default: configured model)
    #[arg(short, long)]
    model: Option<String>,

    /// Sampling temperature (0.0 - 2.0)
    #[arg(short, long)]
    temperature: Option<f32>,

    /// Nucleus sampling mass (0.0 - 1.0)
    #[arg(long)]
    top_p: Option<f32>,

    /// Maximum tokens to generate
    #[arg(long)]
    max_tokens: Option<u32>,

    /// Sampling seed
    #[arg(long)]
    seed: Option<u64>,

    /// System prompt
    #[arg(short, long)]
    system: Option<String>,

    /// Ask for a JSON reply
    #[arg(long)]
    json: bool,
}

impl SamplingArgs {
    /// Options for the request, `None` when every flag is unset
    fn options(&self) -> Option<GenerationOptions> {
        let mut options = GenerationOptions::new();
        if let Some(t) = self.temperature {
            options = options.with_temperature(t);
        }
        if let Some(p) = self.top_p {
            options = options.with_top_p(p);
        }
        if let Some(n) = self.max_tokens {
            options = options.with_max_tokens(n);
        }
        if let Some(seed) = self.seed {
            options = options.with_seed(seed);
        }
        if let Some(system) = &self.system {
            options = options.with_system_prompt(system.clone());
        }
        if self.json {
            options = options.json();
        }
        (options != GenerationOptions::default()).then_some(options)
    }
}

/// Determine log filter level from verbosity count
const fn log_filter_from_verbosity(verbose: u8) -> &'static str {
    match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

/// How many times faster the cached call was, when measurable
fn speedup(live: Duration, cached: Duration) -> Option<f64> {
    let cached = cached.as_secs_f64();
    (cached > 0.0).then(|| live.as_secs_f64() / cached)
}

fn cache_label(response: &MemoizedResponse) -> &'static str {
    match (response.was_cached, response.persisted) {
        (true, _) => "HIT",
        (false, true) => "MISS (stored)",
        (false, false) => "MISS (not persisted)",
    }
}

fn print_response(response: &MemoizedResponse) {
    println!("🤖 Response:\n{}", response.output.text);
    println!();
    println!("⏱️  Time: {:.3}s", response.elapsed.as_secs_f64());
    println!("💾 Cache: {}", cache_label(response));
    if let Some(usage) = response.output.usage {
        println!(
            "🔢 Tokens: {} prompt + {} completion",
            usage.prompt_tokens, usage.completion_tokens
        );
    }
}

fn print_stats(stats: &CacheStats, keys: &[domain::Fingerprint]) {
    println!("📊 Cache Statistics:");
    println!("   Entries:  {}", stats.entry_count);
    println!("   Storage:  {}", stats.storage_path);
    println!("   Size:     {} bytes", stats.approx_size_bytes);
    println!(
        "   Session:  {} hits / {} misses ({:.0}% hit rate)",
        stats.hits,
        stats.misses,
        stats.hit_rate() * 100.0
    );
    if !keys.is_empty() {
        println!("   Sample keys:");
        for key in keys {
            println!("     - {}…", key.short());
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = AppConfig::load(cli.config.as_deref())?;
    if cli.verbose > 0 {
        config.logging.filter = log_filter_from_verbosity(cli.verbose).to_string();
    }
    init_logging(&config.logging)?;

    if cli.no_persist {
        config.cache.persist = false;
    }
    if let Commands::Ask { no_cache: true, .. } = cli.command {
        config.cache.enabled = false;
    }
    debug!(?config, "Configuration loaded");

    let engine = create_engine(config.inference.clone())?;

    if let Commands::Models = cli.command {
        println!("📋 Models ({}):", engine.name());
        for model in engine.list_models().await? {
            println!("   - {model}");
        }
        return Ok(());
    }

    let store = open_store(&config.cache);
    let client = Arc::new(
        PersistentMemoizingClient::open(engine, store, config.cache.memoizing()).await,
    );
    let default_model = config.inference.default_model.clone();

    match cli.command {
        Commands::Ask {
            prompt, sampling, ..
        } => {
            let model = sampling.model.clone().unwrap_or(default_model);
            let response = client
                .get_response(&prompt, &model, sampling.options())
                .await?;
            print_response(&response);
        },

        Commands::Stats { keys } => {
            let stats = client.cache_stats().await;
            let sample = client.sample_keys(keys);
            print_stats(&stats, &sample);
        },

        Commands::Clear => {
            let before = client.cache_stats().await.entry_count;
            client.clear_cache().await?;
            println!("🗑️  Cleared {before} cached responses");
        },

        Commands::Analyze {
            text,
            model,
            sequential,
        } => {
            let parallel = config.analysis.parallel && !sequential;
            let service = TextAnalysisService::new(
                client,
                model.unwrap_or(default_model),
                config.analysis.clone(),
            );
            let report = service.analyze_with(&text, parallel).await?;

            println!("😊 Sentiment: {}", report.sentiment.sentiment);
            if let Some(reason) = &report.sentiment.confidence {
                println!("   {reason}");
            }
            if !report.sentiment.key_phrases.is_empty() {
                println!("   Key phrases: {}", report.sentiment.key_phrases.join(", "));
            }
            println!();
            println!("🇮🇳 Hindi:\n{}", report.translation.translated_text);
            println!();
            println!(
                "⏱️  Time: {:.3}s ({})",
                report.elapsed.as_secs_f64(),
                if parallel { "parallel" } else { "sequential" }
            );
            println!(
                "💾 Cache: sentiment {}, translation {}",
                if report.cached.0 { "HIT" } else { "MISS" },
                if report.cached.1 { "HIT" } else { "MISS" }
            );
        },

        Commands::Demo { prompt, model } => {
            let model = model.unwrap_or(default_model);

            println!("🔄 First call:");
            let first = client.get_response(&prompt, &model, None).await?;
            print_response(&first);

            println!();
            println!("🔄 Second call:");
            let second = client.get_response(&prompt, &model, None).await?;
            print_response(&second);

            println!();
            match speedup(first.elapsed, second.elapsed) {
                Some(factor) if !first.was_cached => println!("🚀 Speedup: {factor:.1}x"),
                _ => println!("🚀 Both calls were served from the cache"),
            }
        },

        Commands::Models => {},
    }

    Ok(())
}
