use std::env;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use tracing::info;
use tracing_subscriber::EnvFilter;

use clinrag_answer::{AnswerOrchestrator, AnswerSettings, QueryRequest};
use clinrag_core::config::{resolve_with_base, Config, Settings};
use clinrag_core::corpus::load_chunks;
use clinrag_embed::get_default_embedder;
use clinrag_hybrid::{FuseParams, HybridFuser};
use clinrag_llm::OllamaGenerator;
use clinrag_text::{TantivyChunkIndexer, TantivySparseIndex};
use clinrag_vector::{LanceChunkWriter, LanceDenseIndex};

const EMBED_BATCH: usize = 32;

fn usage(prog: &str) -> ! {
    eprintln!("Usage:");
    eprintln!("  {} ingest [chunks.jsonl]", prog);
    eprintln!("  {} search \"<question>\"", prog);
    eprintln!("  {} ask \"<question>\" [--age N] [--symptom S]... [--medication M]...", prog);
    std::process::exit(2)
}

fn parse_args() -> (String, String, Vec<String>) {
    let mut args: Vec<String> = env::args().collect();
    let prog = args.remove(0);
    if args.is_empty() { usage(&prog); }
    let cmd = args.remove(0);
    (prog, cmd, args)
}

fn parse_ask(args: &[String]) -> Result<QueryRequest> {
    let mut request = QueryRequest::default();
    let mut it = args.iter();
    while let Some(arg) = it.next() {
        let mut value = |flag: &str| it.next().cloned().with_context(|| format!("{flag} needs a value"));
        match arg.as_str() {
            "--age" => request.patient_age = Some(value("--age")?.parse::<u32>().context("--age must be a whole number")?),
            "--symptom" => request.symptoms.push(value("--symptom")?),
            "--medication" => request.current_medication.push(value("--medication")?),
            flag if flag.starts_with("--") => bail!("unknown flag {flag}"),
            _ if request.question.is_empty() => request.question = arg.clone(),
            _ => bail!("unexpected argument {arg:?}"),
        }
    }
    if request.question.trim().is_empty() { bail!("a question is required"); }
    Ok(request)
}

struct Paths {
    chunks: PathBuf,
    tantivy: PathBuf,
    lancedb: PathBuf,
}

fn paths(settings: &Settings) -> Result<Paths> {
    let base = env::current_dir()?;
    Ok(Paths {
        chunks: resolve_with_base(&base, &settings.data.chunks_path),
        tantivy: resolve_with_base(&base, &settings.data.tantivy_index_dir),
        lancedb: resolve_with_base(&base, &settings.data.lancedb_dir),
    })
}

async fn ingest(settings: &Settings, chunks_path: Option<PathBuf>) -> Result<()> {
    let paths = paths(settings)?;
    let chunks_path = chunks_path.unwrap_or(paths.chunks);
    info!(path = %chunks_path.display(), "loading chunks");
    let chunks = load_chunks(&chunks_path)?;
    if chunks.is_empty() { bail!("no chunks in {}", chunks_path.display()); }

    let indexed = TantivyChunkIndexer::create(paths.tantivy.clone())?.index(&chunks)?;
    info!(indexed, dir = %paths.tantivy.display(), "BM25 index built");

    let embedder = get_default_embedder(&settings.embedding)?;
    let mut embeddings = Vec::with_capacity(chunks.len());
    for batch in chunks.chunks(EMBED_BATCH) {
        let texts: Vec<String> = batch.iter().map(|c| c.text.clone()).collect();
        embeddings.extend(embedder.embed_batch(&texts)?);
    }
    let writer = LanceChunkWriter::create(&paths.lancedb, &settings.data.table_name, embedder.dim()).await?;
    let written = writer.write(&chunks, &embeddings).await?;
    info!(written, table = %settings.data.table_name, "dense table built");

    println!("✅ Ingest complete ({} chunks)", chunks.len());
    Ok(())
}

async fn open_fuser(settings: &Settings) -> Result<HybridFuser<LanceDenseIndex, TantivySparseIndex>> {
    let paths = paths(settings)?;
    let sparse = TantivySparseIndex::open(&paths.tantivy).with_context(|| format!("opening BM25 index at {}", paths.tantivy.display()))?;
    let dense = LanceDenseIndex::open(&paths.lancedb, &settings.data.table_name).await?;
    let embedder = get_default_embedder(&settings.embedding)?;
    Ok(HybridFuser::new(dense, sparse, embedder))
}

async fn search(settings: &Settings, question: &str) -> Result<()> {
    let fuser = open_fuser(settings).await?;
    let hits = fuser.fuse(question, &FuseParams::from(&settings.retrieval)).await?;
    if hits.is_empty() { println!("No results"); return Ok(()); }
    for (i, h) in hits.iter().enumerate() {
        println!(
            "{:>2}. score={:.4} vec_n={:.4} bm25_n={:.4}  {} page {} (chunk={})",
            i + 1, h.score, h.vec_n, h.bm25_n, h.doc_id, h.page, h.chunk_id
        );
    }
    Ok(())
}

async fn ask(settings: &Settings, request: QueryRequest) -> Result<()> {
    let fuser = open_fuser(settings).await?;
    let generator = OllamaGenerator::new(&settings.generator)?;
    info!(endpoint = generator.endpoint(), model = %settings.generator.model, "generator configured");
    let orchestrator = AnswerOrchestrator::new(fuser, generator, AnswerSettings::from_settings(settings));
    let response = orchestrator.answer(&request).await?;
    println!("{}", serde_json::to_string_pretty(&response)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let (prog, cmd, args) = parse_args();
    let config = Config::load().map_err(|e| { eprintln!("Error loading config: {}", e); e })?;
    let settings = config.settings()?;

    match cmd.as_str() {
        "ingest" => ingest(&settings, args.first().map(PathBuf::from)).await,
        "search" => {
            let question = args.first().cloned().unwrap_or_else(|| usage(&prog));
            search(&settings, &question).await
        }
        "ask" => ask(&settings, parse_ask(&args)?).await,
        _ => { eprintln!("Unknown command: {}", cmd); usage(&prog) }
    }
}
