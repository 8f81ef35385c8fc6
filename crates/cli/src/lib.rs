use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use postsearch_corpus::{load_corpus, load_markdown_dir, save_corpus, MemoryStore};
use postsearch_search::{HybridSearch, SearchConfig, SearchPipeline, SearchResponse};
use postsearch_vector_store::{EmbeddingConfig, EmbeddingModel, Indexer, ModelSpec};
use serde::Serialize;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};

mod flags;
mod report;

use flags::{EmbedMode, FusionFlag, GranularityFlag, ModeFlag};

fn print_stdout(text: &str) -> Result<()> {
    use std::io::Write;

    let mut stdout = io::stdout().lock();
    if let Err(err) = stdout
        .write_all(text.as_bytes())
        .and_then(|_| stdout.write_all(b"\n"))
        .and_then(|_| stdout.flush())
    {
        if err.kind() == io::ErrorKind::BrokenPipe {
            return Ok(());
        }
        return Err(err.into());
    }
    Ok(())
}

#[derive(Parser)]
#[command(name = "postsearch")]
#[command(about = "Hybrid keyword, fuzzy and semantic search over blog posts", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Quiet mode: log only warnings/errors
    #[arg(long, global = true)]
    quiet: bool,

    /// Override embedding backend (POSTSEARCH_EMBEDDING_MODE)
    #[arg(long, global = true, value_enum)]
    embed_mode: Option<EmbedMode>,

    /// Override embedding model id (POSTSEARCH_EMBEDDING_MODEL)
    #[arg(long, global = true)]
    embed_model: Option<String>,

    /// Model directory (overrides POSTSEARCH_MODEL_DIR)
    #[arg(long, global = true)]
    model_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Embed a directory of Markdown posts into a corpus file
    Index(IndexArgs),

    /// Search a corpus file
    Search(SearchArgs),

    /// Read queries from stdin, debounced; answers only the latest
    Interactive(InteractiveArgs),
}

#[derive(Args)]
struct IndexArgs {
    /// Directory of Markdown posts with YAML front matter
    posts: PathBuf,

    /// Corpus file to write
    #[arg(long, short = 'o', default_value = "corpus.json")]
    out: PathBuf,

    /// One vector per post, or one per body chunk
    #[arg(long, value_enum, default_value_t = GranularityFlag::Document)]
    granularity: GranularityFlag,

    /// Output JSON format
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct EngineArgs {
    /// Corpus file produced by `index`
    #[arg(long, default_value = "corpus.json")]
    corpus: PathBuf,

    /// Search config (TOML)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Signals to run (default from config: hybrid)
    #[arg(long, value_enum)]
    mode: Option<ModeFlag>,

    /// Fusion policy for hybrid mode (default from config: rrf)
    #[arg(long, value_enum)]
    fusion: Option<FusionFlag>,

    /// Maximum number of results
    #[arg(long, short = 'n')]
    limit: Option<usize>,
}

#[derive(Args)]
struct SearchArgs {
    /// Search query
    query: String,

    #[command(flatten)]
    engine: EngineArgs,

    /// Output JSON format
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct InteractiveArgs {
    #[command(flatten)]
    engine: EngineArgs,

    /// Quiet period before searching, in milliseconds (default from config)
    #[arg(long)]
    debounce_ms: Option<u64>,

    /// Output JSON lines
    #[arg(long)]
    json: bool,
}

#[derive(Serialize)]
struct SearchOutput<'a> {
    query: &'a str,
    #[serde(flatten)]
    response: &'a SearchResponse,
}

#[derive(Serialize)]
struct IndexOutput<'a> {
    corpus: &'a Path,
    #[serde(flatten)]
    report: &'a postsearch_vector_store::IndexReport,
}

pub async fn main_entry() -> Result<()> {
    let mut cli = Cli::parse();

    // stdout is reserved for JSON
    let json_output = match &cli.command {
        Commands::Index(args) => args.json,
        Commands::Search(args) => args.json,
        Commands::Interactive(args) => args.json,
    };
    if json_output {
        cli.quiet = true;
    }

    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if cli.quiet {
        builder.filter_level(log::LevelFilter::Warn);
    } else if cli.verbose {
        builder.filter_level(log::LevelFilter::Debug);
    }
    // ORT is extremely noisy
    if !cli.verbose {
        builder.filter_module("ort", log::LevelFilter::Off);
    }
    builder.target(env_logger::Target::Stderr).init();

    let model = Arc::new(build_embedder(&cli)?);
    match cli.command {
        Commands::Index(args) => run_index(args, model).await,
        Commands::Search(args) => run_search(args, model).await,
        Commands::Interactive(args) => run_interactive(args, model).await,
    }
}

fn build_embedder(cli: &Cli) -> Result<EmbeddingModel> {
    let mut config = EmbeddingConfig::from_env().context("Invalid embedding environment")?;
    if let Some(mode) = cli.embed_mode {
        config = config.mode(mode.as_domain());
    }
    if let Some(model) = &cli.embed_model {
        config.model = ModelSpec::lookup(model)?;
    }
    if let Some(dir) = &cli.model_dir {
        config = config.model_dir(dir);
    }
    let model = EmbeddingModel::new(&config);
    log::debug!("Embedding backend: {}", model.label());
    Ok(model)
}

async fn run_index(args: IndexArgs, model: Arc<EmbeddingModel>) -> Result<()> {
    let documents = load_markdown_dir(&args.posts)
        .with_context(|| format!("Failed to load posts from {}", args.posts.display()))?;

    let (documents, report) = Indexer::new(model)
        .granularity(args.granularity.as_domain())
        .index(documents)
        .await
        .context("Embedding model unavailable (install the model or pass --embed-mode stub)")?;

    save_corpus(&args.out, &documents)
        .await
        .with_context(|| format!("Failed to write corpus {}", args.out.display()))?;

    if args.json {
        let output = IndexOutput {
            corpus: &args.out,
            report: &report,
        };
        print_stdout(&serde_json::to_string_pretty(&output)?)?;
    } else {
        print_stdout(&report::render_index_summary(&args.out, &report))?;
    }
    Ok(())
}

async fn build_engine(args: &EngineArgs, model: Arc<EmbeddingModel>) -> Result<HybridSearch> {
    let mut config = match &args.config {
        Some(path) => SearchConfig::load(path)?,
        None => SearchConfig::default(),
    };
    if let Some(mode) = args.mode {
        config.mode = mode.as_domain();
    }
    if let Some(fusion) = args.fusion {
        config.fusion = fusion.as_domain();
    }
    if let Some(limit) = args.limit {
        config.limit = limit;
    }

    let documents = load_corpus(&args.corpus)
        .await
        .with_context(|| format!("Failed to load corpus {}", args.corpus.display()))?;
    let store = Arc::new(MemoryStore::from_documents(documents)?);
    Ok(HybridSearch::new(store, model, config)?)
}

async fn run_search(args: SearchArgs, model: Arc<EmbeddingModel>) -> Result<()> {
    let engine = build_engine(&args.engine, model).await?;
    let response = engine.search(&args.query).await;

    if args.json {
        let output = SearchOutput {
            query: args.query.trim(),
            response: &response,
        };
        print_stdout(&serde_json::to_string_pretty(&output)?)?;
    } else {
        print_stdout(&report::render_results(&args.query, &response))?;
    }
    Ok(())
}

async fn run_interactive(args: InteractiveArgs, model: Arc<EmbeddingModel>) -> Result<()> {
    let engine = Arc::new(build_engine(&args.engine, model).await?);
    let debounce = args
        .debounce_ms
        .map_or_else(|| engine.config().debounce(), std::time::Duration::from_millis);
    let (pipeline, mut results) = SearchPipeline::spawn(engine, debounce);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    // latest submitted query still waiting for its answer
    let mut unanswered: Option<String> = None;
    let mut input_open = true;

    while input_open || unanswered.is_some() {
        tokio::select! {
            line = lines.next_line(), if input_open => {
                match line.context("Failed to read stdin")? {
                    Some(line) if line.trim().is_empty() => {}
                    Some(line) => {
                        let query = line.trim().to_string();
                        pipeline.submit(query.clone());
                        unanswered = Some(query);
                    }
                    None => input_open = false,
                }
            }
            delivered = results.recv() => {
                let Some(result) = delivered else { break };
                if unanswered.as_deref() == Some(result.query.as_str()) {
                    unanswered = None;
                }
                if args.json {
                    let output = SearchOutput {
                        query: &result.query,
                        response: &result.response,
                    };
                    print_stdout(&serde_json::to_string(&output)?)?;
                } else {
                    print_stdout(&format!("> {}", result.query))?;
                    print_stdout(&report::render_results(&result.query, &result.response))?;
                }
            }
        }
    }
    Ok(())
}
