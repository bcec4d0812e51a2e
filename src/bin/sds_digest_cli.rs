//! Offline command-line access to the digest pipeline.
//!
//! `process` prints one JSON record per input file; directories are walked recursively for
//! supported extensions. `ask` answers a single question about one file. `benchmark` answers a
//! file of benchmark questions about one sheet and grades every answer. Nothing is stored.
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use sds_digest::{
    config,
    extraction::{Extractor, FileExtractor, is_supported},
    llm::{self, LanguageModel},
    logging,
    pipeline::{BenchmarkQuestions, BenchmarkRunner, QuestionAnswerer, SdsProcessor},
};
use serde_json::json;
use walkdir::WalkDir;

#[derive(Parser)]
#[command(
    name = "sds-digest-cli",
    about = "Digest Safety Data Sheets from the command line"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Process files or directories and print the resulting records.
    Process {
        /// Files or directories (.pdf, .md, .markdown, .txt).
        #[arg(required = true)]
        paths: Vec<PathBuf>,
        /// Issue model calls one at a time instead of fanning out.
        #[arg(long)]
        sequential: bool,
    },
    /// Answer a question about one file.
    Ask {
        /// File to read.
        path: PathBuf,
        /// Question to answer.
        #[arg(long, short)]
        question: String,
    },
    /// Answer benchmark questions about one file and grade the answers.
    Benchmark {
        /// File to read.
        path: PathBuf,
        /// JSON file of benchmark questions.
        #[arg(long)]
        questions: PathBuf,
    },
}

fn main() -> Result<()> {
    config::init_config();
    logging::init_tracing_with(logging::ConsoleTarget::Stderr);

    let cli = Cli::parse();
    let config = config::get_config();
    let model = llm::build_language_model(&config.llm_settings())
        .context("failed to initialize language model")?;

    match cli.command {
        Command::Process { paths, sequential } => {
            let processor = SdsProcessor::new(model, config.structuring_concurrency);
            process_paths(&processor, &paths, sequential)
        }
        Command::Ask { path, question } => ask(model, &path, &question),
        Command::Benchmark { path, questions } => benchmark(model, &path, &questions),
    }
}

fn process_paths(processor: &SdsProcessor, paths: &[PathBuf], sequential: bool) -> Result<()> {
    let files = collect_files(paths)?;
    if files.is_empty() {
        bail!("no supported files found");
    }

    let runtime = if sequential {
        None
    } else {
        Some(
            tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .build()
                .context("failed to start async runtime")?,
        )
    };

    let extractor = FileExtractor::new();
    for file in files {
        let document = extractor
            .extract(&file)
            .with_context(|| format!("failed to extract {}", file.display()))?;
        let record = match &runtime {
            Some(runtime) => runtime.block_on(processor.process(document)),
            None => processor.process_blocking(document),
        }
        .with_context(|| format!("failed to process {}", file.display()))?;

        let output = json!({ "source": file.display().to_string(), "record": record });
        println!(
            "{}",
            serde_json::to_string_pretty(&output).context("failed to serialize record")?
        );
    }
    Ok(())
}

fn collect_files(paths: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for path in paths {
        if path.is_dir() {
            for entry in WalkDir::new(path).sort_by_file_name() {
                let entry =
                    entry.with_context(|| format!("failed to walk {}", path.display()))?;
                if entry.file_type().is_file() && is_supported(entry.path()) {
                    files.push(entry.into_path());
                }
            }
        } else if path.is_file() {
            files.push(path.clone());
        } else {
            bail!("{} does not exist", path.display());
        }
    }
    Ok(files)
}

fn ask(model: Arc<dyn LanguageModel>, path: &Path, question: &str) -> Result<()> {
    if question.trim().is_empty() {
        bail!("question must not be empty");
    }
    let document = FileExtractor::new()
        .extract(path)
        .with_context(|| format!("failed to extract {}", path.display()))?;
    let answer = QuestionAnswerer::new(model)
        .answer_blocking(question.trim(), &document.content)
        .context("failed to answer question")?;
    println!("{answer}");
    Ok(())
}

fn benchmark(model: Arc<dyn LanguageModel>, path: &Path, questions: &Path) -> Result<()> {
    let questions = BenchmarkQuestions::from_json_file(questions)?;
    if questions.is_empty() {
        bail!("benchmark file has no questions");
    }
    let document = FileExtractor::new()
        .extract(path)
        .with_context(|| format!("failed to extract {}", path.display()))?;

    let report = BenchmarkRunner::new(model)
        .run_blocking(&questions, &document.content)
        .context("benchmark run failed")?;

    let output = json!({
        "source": path.display().to_string(),
        "correct": report.correct_count(),
        "total": report.results.len(),
        "accuracy": report.accuracy(),
        "results": report.results,
    });
    println!(
        "{}",
        serde_json::to_string_pretty(&output).context("failed to serialize report")?
    );
    Ok(())
}
