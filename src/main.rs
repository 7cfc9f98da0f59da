//! Command-line front end: read a corpus, run the exchange optimiser,
//! write the class assignment and the optional human-readable listing.

use clap::Parser;
use classex::{
    write_class_listing_to_path, write_word_classes_to_path, CorpusStats, Exchange,
    OptimizerConfig, Vocabulary,
};
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

/// Induce word classes from a tokenised corpus by greedy exchange over a
/// class-bigram model.
#[derive(Parser)]
#[command(name = "classex")]
#[command(version)]
#[command(about = "Class-bigram word clustering via greedy exchange")]
struct Cli {
    /// Corpus file: one sentence per line, tokens separated by whitespace
    corpus: PathBuf,

    /// Number of word classes (two reserved classes are added on top)
    #[arg(short = 'c', long)]
    classes: usize,

    /// Maximum number of full passes; 0 or less means unbounded
    #[arg(short = 'i', long, default_value_t = 0)]
    max_iterations: i64,

    /// Wall-clock budget in seconds; 0 or less means unbounded
    #[arg(short = 't', long, default_value_t = 0.0)]
    max_seconds: f64,

    /// Words between log-likelihood reports; 0 or less disables them
    #[arg(long, default_value_t = 0)]
    ll_interval: i64,

    /// Output file for the word -> class assignment
    #[arg(short = 'o', long, default_value = "word_classes.txt")]
    output: PathBuf,

    /// Optional output file listing each class's members
    #[arg(long)]
    listing: Option<PathBuf>,

    /// Verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

impl Cli {
    fn optimizer_config(&self) -> OptimizerConfig {
        OptimizerConfig {
            max_iterations: (self.max_iterations > 0).then_some(self.max_iterations as usize),
            max_seconds: (self.max_seconds > 0.0).then_some(self.max_seconds),
            ll_print_interval: (self.ll_interval > 0).then_some(self.ll_interval as usize),
        }
    }
}

fn run(cli: &Cli) -> classex::Result<()> {
    let lines = BufReader::new(File::open(&cli.corpus)?)
        .lines()
        .collect::<io::Result<Vec<String>>>()?;

    let vocabulary = Vocabulary::from_lines(&lines)?;
    let stats = CorpusStats::from_lines(&vocabulary, &lines)?;
    let mut exchange = Exchange::new(vocabulary, stats, cli.classes)?;

    let summary = exchange.run(&cli.optimizer_config())?;
    info!(
        passes = summary.passes,
        moves = summary.moves,
        log_likelihood = summary.log_likelihood,
        status = ?summary.status,
        "optimisation finished"
    );

    write_word_classes_to_path(&cli.output, exchange.vocabulary(), exchange.assignment())?;
    if let Some(listing) = &cli.listing {
        write_class_listing_to_path(listing, exchange.vocabulary(), exchange.assignment())?;
    }
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };
    fmt().with_env_filter(filter).with_writer(io::stderr).init();

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{err}");
            if err.is_invariant_violation() {
                ExitCode::from(2)
            } else {
                ExitCode::FAILURE
            }
        }
    }
}
