use clap::{Parser, Subcommand};
use docdex_embed::{HttpEmbedConfig, LocalEmbedConfig, ProviderConfig, get_provider};
use docdex_index::{
    IndexPipeline, IndexService, MetadataStore, PipelineConfig, WatchedIndexer,
};
use docdex_text::PlainTextExtractor;
use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use std::time::Duration;

/// Index a folder of documents and search them semantically.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Directory holding the index snapshot and metadata database
    #[arg(short, long, default_value = ".docdex")]
    data_dir: PathBuf,

    /// Remote OpenAI-compatible embeddings endpoint (default: local model)
    #[arg(long)]
    endpoint: Option<String>,

    /// API key for the remote endpoint
    #[arg(long, env = "DOCDEX_API_KEY")]
    api_key: Option<String>,

    /// Embedding model name
    #[arg(long, default_value = "all-MiniLM-L6-v2")]
    model: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Build the index from a folder of documents
    Index {
        /// Folder to index recursively
        folder: PathBuf,
    },
    /// Search the index for chunks similar to a query
    Search {
        /// Free-text query
        query: String,
        /// Maximum number of results
        #[arg(short, default_value_t = 5)]
        k: usize,
        /// Print results as JSON instead of a summary
        #[arg(long)]
        json: bool,
    },
    /// Ask a question and get an extractive answer from indexed documents
    Ask {
        question: String,
        /// How many chunks to ground the answer in
        #[arg(short, default_value_t = 3)]
        k: usize,
    },
    /// List indexed files
    Files,
    /// Show recent searches
    History {
        /// Maximum entries to show
        #[arg(short = 'n', long, default_value_t = 20)]
        limit: i64,
        /// Clear the history instead of listing it
        #[arg(long)]
        clear: bool,
    },
    /// Watch a folder and rebuild the index on changes (until ctrl-c)
    Watch {
        folder: PathBuf,
        /// Seconds of quiet before a change triggers a rebuild
        #[arg(long, default_value_t = 5)]
        quiet_secs: u64,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run().await {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let args = Args::parse();

    let provider_config = match &args.endpoint {
        Some(endpoint) => {
            let mut config = HttpEmbedConfig::new(endpoint, &args.model);
            if let Some(key) = &args.api_key {
                config = config.with_api_key(key);
            }
            ProviderConfig::Http(config)
        }
        None => ProviderConfig::Local(LocalEmbedConfig::new(&args.model)),
    };

    std::fs::create_dir_all(&args.data_dir)?;
    let store = MetadataStore::open(&args.data_dir).await?;
    let provider = get_provider(&provider_config).await?;
    let pipeline = IndexPipeline::new(
        Arc::new(PlainTextExtractor),
        provider,
        store,
        PipelineConfig::default(),
    );
    let service = Arc::new(IndexService::new(
        pipeline,
        Some(args.data_dir.join("index")),
    ));

    match args.command {
        Commands::Index { folder } => {
            let output = service.rebuild(&folder).await?;
            println!(
                "Indexed {} files ({} chunks, {} skipped) from {}",
                output.files_indexed,
                output.snapshot.len(),
                output.files_skipped,
                folder.display()
            );
            Ok(())
        }
        Commands::Search { query, k, json } => {
            if !service.load().await? {
                return Err(anyhow::anyhow!(
                    "no index found in {}; run `docdex index <folder>` first",
                    args.data_dir.display()
                ));
            }
            let results = service.search(&query, k).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&results)?);
            } else {
                println!("Found {} results:", results.len());
                for result in results {
                    println!(
                        "  Distance: {:.3} | File: {} | Tags: {}",
                        result.distance,
                        result.file_name.as_deref().unwrap_or("<unknown>"),
                        result.tags.join(", ")
                    );
                    println!(
                        "    {}",
                        result.chunk_text.chars().take(120).collect::<String>()
                    );
                }
            }
            Ok(())
        }
        Commands::Ask { question, k } => {
            if !service.load().await? {
                return Err(anyhow::anyhow!(
                    "no index found in {}; run `docdex index <folder>` first",
                    args.data_dir.display()
                ));
            }
            match service.answer(&question, k).await? {
                Some(answer) => println!("{answer}"),
                None => println!("No relevant documents found."),
            }
            Ok(())
        }
        Commands::Files => {
            let files = service.store().all_files().await?;
            println!("{} indexed files:", files.len());
            for file in files {
                println!(
                    "  {} | {} chunks | {} bytes",
                    file.path, file.chunk_count, file.size_bytes
                );
            }
            Ok(())
        }
        Commands::History { limit, clear } => {
            if clear {
                let removed = service.store().clear_history().await?;
                println!("Cleared {removed} history entries");
            } else {
                let entries = service.store().history(limit).await?;
                for entry in entries {
                    println!(
                        "  [{}] \"{}\" | {} results in {} ms",
                        entry.timestamp, entry.query, entry.result_count, entry.execution_time_ms
                    );
                }
            }
            Ok(())
        }
        Commands::Watch { folder, quiet_secs } => {
            // initial build so the index exists before the first change
            match service.rebuild(&folder).await {
                Ok(output) => println!(
                    "Initial index: {} files, {} chunks",
                    output.files_indexed,
                    output.snapshot.len()
                ),
                Err(docdex_index::BuildError::NoDocuments) => {
                    println!("Folder is empty; waiting for documents...")
                }
                Err(e) => return Err(e.into()),
            }

            let watcher = WatchedIndexer::spawn(
                service.clone(),
                folder.clone(),
                Duration::from_secs(quiet_secs),
            )?;
            println!("Watching {} (ctrl-c to stop)", folder.display());
            tokio::signal::ctrl_c().await?;
            watcher.join().await;
            Ok(())
        }
    }
}
