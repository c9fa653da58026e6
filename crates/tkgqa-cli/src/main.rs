//! TKGQA CLI
//!
//! - `ask`: run the retrieval pipeline for one question
//! - `rewrite`: turn implicit temporal questions into explicit ones
//! - `inspect`: fact store statistics and per-entity lookups
//!
//! Logs go to stderr and are controlled by `RUST_LOG` (default `warn`).

use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use tkgqa_extract::ExpansionMode;
use tkgqa_kg::{Fact, FactIndex};
use tkgqa_retrieval::{Pipeline, PipelineConfig, PipelineResult, ProcessOptions};
use tkgqa_rewrite::{QuestionRewriter, RewriteResult, RewriteStats};

#[derive(Parser)]
#[command(name = "tkgqa")]
#[command(author, version, about = "Question answering over temporal knowledge graphs")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Retrieve and rank facts for a question.
    Ask(AskArgs),

    /// Rewrite implicit temporal references ("after the summit") into dates.
    Rewrite {
        /// Questions to rewrite
        #[arg(required = true)]
        questions: Vec<String>,
        /// Fact store (.json array or TSV)
        #[arg(long)]
        facts: PathBuf,
        /// Print results as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show fact store statistics, optionally with facts for given entities.
    Inspect {
        /// Fact store (.json array or TSV)
        #[arg(long)]
        facts: PathBuf,
        /// Entity names to look up (repeatable)
        #[arg(long)]
        entity: Vec<String>,
        /// Maximum facts to print per lookup
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },
}

#[derive(Args, Debug, Default)]
struct AskArgs {
    /// Question text
    question: String,
    /// Pipeline config (JSON); flags below override it
    #[arg(long)]
    config: Option<PathBuf>,
    /// Fact store (.json array or TSV)
    #[arg(long)]
    facts: Option<PathBuf>,
    /// Affiliation graph (JSON)
    #[arg(long)]
    graph: Option<PathBuf>,
    /// Skip implicit entity expansion
    #[arg(long)]
    no_implicit: bool,
    /// Skip the temporal filter
    #[arg(long)]
    no_time_filter: bool,
    /// Skip semantic reranking
    #[arg(long)]
    no_reranker: bool,
    /// Expand through the affiliation graph only
    #[arg(long)]
    static_only: bool,
    /// Number of facts to return
    #[arg(long)]
    top_k: Option<usize>,
    /// Print the full result record as JSON
    #[arg(long)]
    json: bool,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Commands::Ask(args) => cmd_ask(&args),
        Commands::Rewrite {
            questions,
            facts,
            json,
        } => cmd_rewrite(&questions, &facts, json),
        Commands::Inspect {
            facts,
            entity,
            limit,
        } => cmd_inspect(&facts, &entity, limit),
    }
}

/// Config file (or defaults) with command-line overrides applied.
fn ask_config(args: &AskArgs) -> Result<PipelineConfig> {
    let mut config = match &args.config {
        Some(path) => PipelineConfig::load(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => PipelineConfig::default(),
    };

    if let Some(facts) = &args.facts {
        config.facts_path = Some(facts.clone());
    }
    if let Some(graph) = &args.graph {
        config.affiliations_path = Some(graph.clone());
    }
    if args.no_implicit {
        config.flags.use_implicit = false;
    }
    if args.no_time_filter {
        config.flags.use_time_filter = false;
    }
    if args.no_reranker {
        config.flags.use_reranker = false;
    }
    if args.static_only {
        config.expansion_mode = ExpansionMode::StaticOnly;
    }
    if let Some(k) = args.top_k {
        config.encoder_top_k = k;
    }

    if config.facts_path.is_none() {
        return Err(anyhow!("no fact store given (use --facts or set facts_path in --config)"));
    }
    config.validate()?;
    Ok(config)
}

fn cmd_ask(args: &AskArgs) -> Result<()> {
    let config = ask_config(args)?;
    debug!(?config, "resolved pipeline config");
    let pipeline = Pipeline::from_config(&config).context("failed to build pipeline")?;
    let result = pipeline
        .process(&args.question, &ProcessOptions::from(&config))
        .with_context(|| format!("failed to answer {:?}", args.question))?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        print_pipeline_result(&result);
    }
    Ok(())
}

fn print_pipeline_result(result: &PipelineResult) {
    println!("{} {}", "Question:".bold(), result.question);
    println!(
        "  {} {}",
        "entities:".dimmed(),
        list_or_dash(&result.extracted_entities)
    );
    let dates: Vec<String> = result
        .extracted_dates
        .iter()
        .map(|d| d.date.clone())
        .collect();
    println!("  {} {}", "dates:".dimmed(), list_or_dash(&dates));
    if !result.expansion_added.is_empty() {
        println!(
            "  {} {}",
            "expanded:".dimmed(),
            result.expansion_added.join(", ").cyan()
        );
    }
    println!(
        "  {} retrieved {} → time filter {} → rerank input {} → final {}",
        "counts:".dimmed(),
        result.retrieved_candidates,
        result.after_time_filter,
        result.rerank_input_capped,
        result.final_count
    );

    if result.final_triples.is_empty() {
        println!("{}", "no matching facts".yellow());
        return;
    }
    for (rank, fact) in result.final_triples.iter().enumerate() {
        println!("{:>3}. {}", rank + 1, format_fact(fact));
    }
}

fn format_fact(fact: &Fact) -> String {
    let score = fact
        .score
        .map(|s| format!(" [{s:.3}]").dimmed().to_string())
        .unwrap_or_default();
    format!(
        "{} {} {} {}{}",
        fact.head.bold(),
        fact.relation.cyan(),
        fact.tail.bold(),
        fact.date.green(),
        score
    )
}

fn list_or_dash(items: &[String]) -> String {
    if items.is_empty() {
        "-".to_string()
    } else {
        items.join(", ")
    }
}

fn load_index(path: &Path) -> Result<FactIndex> {
    FactIndex::load(path).with_context(|| format!("failed to load fact store {}", path.display()))
}

fn cmd_rewrite(questions: &[String], facts: &Path, json: bool) -> Result<()> {
    let index = load_index(facts)?;
    let rewriter = QuestionRewriter::new(&index);
    let (results, stats) = rewriter.rewrite_all(questions);

    if json {
        let out = serde_json::json!({ "results": results, "stats": stats });
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    for r in &results {
        print_rewrite(r);
    }
    if results.len() > 1 {
        print_rewrite_stats(&stats);
    }
    Ok(())
}

fn print_rewrite(r: &RewriteResult) {
    if r.was_rewritten {
        println!("{} {}", "rewritten".green().bold(), r.rewritten);
        println!("  {} {}", "was:".dimmed(), r.original);
    } else {
        println!("{} {}", "unchanged".yellow().bold(), r.original);
    }
    if let (Some(signal), Some(anchor)) = (r.signal_type, &r.anchor_phrase) {
        println!("  {} {} \"{}\"", "signal:".dimmed(), signal, anchor);
        println!(
            "  {} {}",
            "anchor entities:".dimmed(),
            list_or_dash(&r.anchor_entities)
        );
        if let Some(ts) = &r.anchor_timestamp {
            println!("  {} {}", "anchor date:".dimmed(), ts);
        }
    }
}

fn print_rewrite_stats(stats: &RewriteStats) {
    println!(
        "{} {}/{} rewritten ({:.1}%), {} with a temporal signal",
        "summary:".bold(),
        stats.rewritten,
        stats.total,
        stats.rewrite_rate() * 100.0,
        stats.detected
    );
    for (signal, count) in &stats.by_signal {
        println!("  {signal:<12} {count}");
    }
}

fn cmd_inspect(facts: &Path, entities: &[String], limit: usize) -> Result<()> {
    let index = load_index(facts)?;
    println!("{} {}", "fact store:".bold(), facts.display());
    println!("  facts:    {}", index.len());
    println!("  entities: {}", index.entity_count());

    for entity in entities {
        let known = index.contains_entity(entity);
        let hits = index.retrieve(std::slice::from_ref(entity));
        let how = if known { "indexed" } else { "substring fallback" };
        println!();
        println!(
            "{} {} ({} facts, {})",
            "entity:".bold(),
            entity,
            hits.len(),
            how.dimmed()
        );
        for fact in hits.iter().take(limit) {
            println!("  {}", format_fact(fact));
        }
        if hits.len() > limit {
            println!("  {}", format!("... {} more", hits.len() - limit).dimmed());
        }
    }
    Ok(())
}
