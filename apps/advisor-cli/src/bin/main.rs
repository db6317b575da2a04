use std::fs;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use serde_json::json;
use tracing::info;
use tracing_subscriber::EnvFilter;

use advisor_core::config::Config;
use advisor_core::document::load_documents;
use advisor_core::query::QueryInput;
use advisor_core::types::RankedContext;
use advisor_pipeline::{Advisor, AdvisorContext, DocumentOutcome};

#[derive(Parser, Debug)]
#[command(name = "advisor", version, about = "Answers MSME scheme questions from a local document corpus")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Chunk, embed and index every pdf/txt/md file under a directory.
    Ingest {
        /// Defaults to `data.docs_dir`.
        #[arg(long)]
        dir: Option<PathBuf>,
    },
    /// Answer one or more questions.
    Ask {
        queries: Vec<String>,
        /// JSON file holding a query string, a `{"query": ..}` object, or a list of either.
        #[arg(long)]
        input: Option<PathBuf>,
        /// Print the chunks the answer was grounded on.
        #[arg(long)]
        show_context: bool,
        #[arg(long)]
        json: bool,
    },
    /// Retrieve and rerank without calling the language model.
    Search {
        query: String,
        #[arg(long)]
        json: bool,
    },
    /// Embed and keyword-index stored chunks that are missing from either index.
    Backfill,
    /// Stored chunk and vector counts.
    Status,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let config = Config::load().map_err(|e| { eprintln!("Error loading config: {}", e); e })?;
    let settings = config.settings()?;
    let base = std::env::current_dir()?;
    let docs_dir = settings.data.docs_dir(&base);

    let ctx = AdvisorContext::open(settings, &base).await?;
    let advisor = Advisor::new(ctx)?;

    match cli.command {
        Commands::Ingest { dir } => ingest(&advisor, dir.unwrap_or(docs_dir)).await,
        Commands::Ask { queries, input, show_context, json } => {
            let input = query_input(queries, input)?;
            ask(&advisor, input, show_context, json).await
        }
        Commands::Search { query, json } => {
            let context = advisor.search(&query).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&context)?);
            } else {
                println!("🔍 {} result(s) for: \"{}\"", context.len(), query);
                print_context(&context, true);
            }
            Ok(())
        }
        Commands::Backfill => {
            let summary = advisor.backfill().await?;
            println!("🧩 Chunks scanned:     {}", summary.scanned);
            println!("📊 Vectors indexed:    {} ({} already present)", summary.index.indexed, summary.index.duplicates);
            match summary.lexical_indexed {
                Some(n) => println!("🔤 Keyword index:      {} added", n),
                None => println!("🔤 Keyword index:      not updated"),
            }
            for f in &summary.index.failures { println!("  - {}", f); }
            if !summary.index.failures.is_empty() { bail!("{} chunk(s) could not be indexed", summary.index.failures.len()); }
            Ok(())
        }
        Commands::Status => {
            let status = advisor.status().await?;
            println!("Namespace:        {}", status.namespace);
            println!("Stored chunks:    {}", status.chunks);
            println!("Indexed vectors:  {}", status.vectors);
            println!("Keyword search:   {}", if status.lexical_available { "available" } else { "unavailable" });
            Ok(())
        }
    }
}

async fn ingest(advisor: &Advisor, dir: PathBuf) -> Result<()> {
    if !dir.is_dir() { bail!("document directory {} does not exist", dir.display()); }
    println!("Ingesting from {}", dir.display());
    let (documents, load_failures) = load_documents(&dir);
    for f in &load_failures { eprintln!("⚠️  {}: {}", f.path.display(), f.reason); }

    let pb = ProgressBar::new(documents.len() as u64);
    pb.set_style(ProgressStyle::default_bar().template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} documents {msg}")?.progress_chars("#>-"));
    let observer = |source: &str, outcome: &DocumentOutcome| {
        let tag = match outcome {
            DocumentOutcome::Ingested(chunks) => format!("{} ({} chunks)", source, chunks.len()),
            DocumentOutcome::Skipped => format!("{} (already ingested)", source),
            DocumentOutcome::Failed { recorded, .. } => format!("{} (failed after {} chunks)", source, recorded.len()),
        };
        pb.set_message(tag);
        pb.inc(1);
    };
    let summary = advisor.ingest_observed(documents, &observer).await;
    pb.finish_with_message("done");

    println!("\n✅ Ingest complete");
    println!("📄 Documents ingested: {}", summary.ingest.ingested.len());
    println!("⏭️  Documents skipped:  {}", summary.ingest.skipped.len());
    println!("🧩 Chunks stored:      {}", summary.ingest.chunks.len());
    println!("📊 Vectors indexed:    {} ({} already present)", summary.index.indexed, summary.index.duplicates);
    match summary.lexical_indexed {
        Some(n) => println!("🔤 Keyword index:      {} added", n),
        None => println!("🔤 Keyword index:      not updated"),
    }
    let failures: Vec<String> = summary.ingest.failures.iter().chain(summary.index.failures.iter()).map(|e| e.to_string()).collect();
    if !failures.is_empty() {
        println!("\n❌ {} failure(s):", failures.len());
        for f in &failures { println!("  - {}", f); }
    }
    info!("Ingest of {} finished with {} failure(s)", dir.display(), failures.len() + load_failures.len());
    Ok(())
}

fn query_input(queries: Vec<String>, input: Option<PathBuf>) -> Result<QueryInput> {
    if let Some(path) = input {
        let raw = fs::read_to_string(&path).with_context(|| format!("reading {}", path.display()))?;
        let value: serde_json::Value = serde_json::from_str(&raw).with_context(|| format!("parsing {}", path.display()))?;
        return Ok(QueryInput::from_json(&value)?);
    }
    match queries.len() {
        0 => bail!("no question given; pass it as an argument or with --input"),
        1 => Ok(QueryInput::Single(queries.into_iter().next().unwrap_or_default())),
        _ => Ok(QueryInput::Batch(queries)),
    }
}

async fn ask(advisor: &Advisor, input: QueryInput, show_context: bool, as_json: bool) -> Result<()> {
    let results = advisor.ask_all(input).await?;
    let failed = results.iter().filter(|(_, r)| r.is_err()).count();

    if as_json {
        let out: Vec<serde_json::Value> = results
            .iter()
            .map(|(query, result)| match result {
                Ok(answer) => json!({ "query": query, "answer": answer.text, "context": answer.used_context }),
                Err(e) => json!({ "query": query, "error": e.to_string(), "backend_failure": e.is_backend_failure() }),
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else {
        for (query, result) in &results {
            println!("\n❓ {}", query);
            match result {
                Ok(answer) => {
                    println!("{}", answer.text);
                    if show_context {
                        println!("\n📚 Context ({} chunks):", answer.used_context.len());
                        print_context(&answer.used_context, false);
                    }
                }
                Err(e) if e.is_backend_failure() => println!("❌ Service unavailable: {}", e),
                Err(e) => println!("⚠️  {}", e),
            }
        }
    }

    if failed > 0 { bail!("{} of {} question(s) could not be answered", failed, results.len()); }
    Ok(())
}

fn print_context(context: &RankedContext, with_text: bool) {
    for (i, item) in context.items.iter().enumerate() {
        let c = &item.candidate;
        let fmt_score = |s: Option<f32>| s.map(|v| format!("{:.4}", v)).unwrap_or_else(|| "-".to_string());
        println!(
            "  {}. {}  relevance={:.4}  fused={:.5}  vector={}  keyword={}",
            i + 1, c.chunk_ref, item.relevance_score, c.fused_score, fmt_score(c.vector_score), fmt_score(c.lexical_score)
        );
        if with_text { println!("     📝 {}", c.text); }
    }
}
