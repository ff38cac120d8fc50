use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use indicatif::ProgressBar;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::process::ExitCode;
use std::time::Instant;
use tracing::{error, info, Level};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::{EnvFilter, FmtSubscriber};
use wikistream::config::{PROGRESS_INTERVAL, WRITE_BUFFER_SIZE};
use wikistream::graph::LinkGraph;
use wikistream::{source, Extraction, ParseMode, StatsSnapshot};

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[derive(Parser)]
#[command(name = "wikistream")]
#[command(about = "Stream pages, links and categories out of Wikipedia dumps")]
struct Cli {
    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Stream extracted pages as JSON lines
    Pages(PagesArgs),
    /// Build the link graph and write it as CSV
    Graph(GraphArgs),
}

#[derive(Args)]
struct InputArgs {
    /// Path to the Wikipedia dump (.xml or .xml.bz2)
    #[arg(short, long)]
    input: String,

    /// Also extract category memberships
    #[arg(long)]
    categories: bool,

    /// Stop after this many pages
    #[arg(long)]
    limit: Option<u64>,
}

impl InputArgs {
    fn mode(&self) -> ParseMode {
        if self.categories {
            ParseMode::Categorized
        } else {
            ParseMode::Plain
        }
    }

    fn start(&self) -> Result<Extraction> {
        let dump = source::open_dump(&self.input)?;
        info!(input = %self.input, mode = ?self.mode(), "Starting extraction");
        Ok(wikistream::pipeline::spawn_pipeline(dump, self.mode()))
    }
}

#[derive(Args)]
struct PagesArgs {
    #[command(flatten)]
    input: InputArgs,

    /// Output file (stdout if omitted)
    #[arg(short, long)]
    output: Option<String>,
}

#[derive(Args)]
struct GraphArgs {
    #[command(flatten)]
    input: InputArgs,

    /// Output directory for nodes.csv, edges.csv and article_categories.csv
    #[arg(short, long)]
    output: String,
}

async fn run_pages(args: PagesArgs) -> Result<StatsSnapshot> {
    let out: Box<dyn Write> = match &args.output {
        Some(path) => Box::new(
            File::create(path).with_context(|| format!("Failed to create output: {}", path))?,
        ),
        None => Box::new(io::stdout().lock()),
    };
    let mut out = BufWriter::with_capacity(WRITE_BUFFER_SIZE, out);

    let mut extraction = args.input.start()?;
    let pb = ProgressBar::new_spinner();
    let mut written = 0u64;

    while let Some(page) = extraction.recv().await {
        serde_json::to_writer(&mut out, &page).context("Failed to serialize page")?;
        out.write_all(b"\n")?;
        written += 1;

        if written % PROGRESS_INTERVAL == 0 {
            pb.set_message(format!("{} pages", written));
            pb.tick();
        }
        if args.input.limit.is_some_and(|limit| written >= limit) {
            info!(limit = written, "Page limit reached, stopping pipeline");
            extraction.cancel();
            break;
        }
    }

    out.flush()?;
    pb.finish_and_clear();
    extraction.finish().await
}

async fn run_graph(args: GraphArgs) -> Result<StatsSnapshot> {
    fs::create_dir_all(&args.output)
        .with_context(|| format!("Failed to create output directory: {}", args.output))?;

    let mut extraction = args.input.start()?;
    let pb = ProgressBar::new_spinner();
    let mut graph = LinkGraph::new();
    let mut seen = 0u64;

    while let Some(page) = extraction.recv().await {
        graph.add_page(page);
        seen += 1;

        if seen % PROGRESS_INTERVAL == 0 {
            pb.set_message(format!("{} pages", seen));
            pb.tick();
        }
        if args.input.limit.is_some_and(|limit| seen >= limit) {
            info!(limit = seen, "Page limit reached, stopping pipeline");
            extraction.cancel();
            break;
        }
    }

    pb.finish_and_clear();
    let stats = extraction.finish().await?;
    graph.write_csv(Path::new(&args.output))?;

    eprintln!("Graph nodes:        {}", graph.node_count());
    eprintln!("Graph edges:        {}", graph.edge_count());
    Ok(stats)
}

fn print_summary(stats: &StatsSnapshot, elapsed_secs: f64) {
    eprintln!();
    eprintln!("=== Summary ===");
    eprintln!("Total time:         {:.2}s", elapsed_secs);
    eprintln!("Lines read:         {}", stats.lines_read);
    eprintln!("Read faults:        {}", stats.read_faults);
    eprintln!("Page blocks:        {}", stats.blocks_assembled);
    eprintln!("Redirects skipped:  {}", stats.redirects_filtered);
    eprintln!("Malformed blocks:   {}", stats.malformed_blocks);
    eprintln!("Truncated blocks:   {}", stats.truncated_blocks);
    eprintln!("Blocks dropped:     {}", stats.blocks_dropped);
    eprintln!("Pages emitted:      {}", stats.pages_emitted);
    eprintln!("Links extracted:    {}", stats.links_extracted);
    eprintln!("Categories found:   {}", stats.categories_extracted);
}

/// `RUST_LOG` directives win when present; otherwise everything at `level` and above.
fn log_filter(level: Level, directives: Option<&str>) -> EnvFilter {
    EnvFilter::builder()
        .with_default_directive(LevelFilter::from_level(level).into())
        .parse_lossy(directives.unwrap_or_default())
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    let rust_log = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(log_filter(level, rust_log.as_deref()))
        .with_target(false)
        .with_writer(io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("Failed to set tracing subscriber");

    let rt = match tokio::runtime::Builder::new_multi_thread()
        .thread_name("wikistream-stage")
        .enable_time()
        .build()
    {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Error: failed to start runtime: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let start = Instant::now();
    let result = rt.block_on(async {
        match cli.command {
            Commands::Pages(args) => run_pages(args).await,
            Commands::Graph(args) => run_graph(args).await,
        }
    });

    match result {
        Ok(stats) => {
            print_summary(&stats, start.elapsed().as_secs_f64());
            info!("Completed successfully");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("Error: {:#}", e);
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
