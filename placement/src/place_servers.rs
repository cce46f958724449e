//! Places servers in a data center and groups them into pools.
//! Run `place-servers --help` for more information.

#![warn(
    missing_docs,
    rust_2018_idioms,
    trivial_casts,
    trivial_numeric_casts,
    unused_import_braces,
    unused_qualifications
)]
#![warn(clippy::all, clippy::pedantic)]
#![allow(
    clippy::module_name_repetitions,
    clippy::default_trait_access,
    clippy::cast_precision_loss
)]

use placement::io::{read_assignment, read_facility, write_assignment};
use placement::{Capacity, Facility, Objective, Optimizer, SearchConfig};

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

use eyre::WrapErr;
use indicatif::{ProgressBar, ProgressStyle};
use itertools::Itertools;
use rand::SeedableRng;
use rand_chacha::ChaChaRng;
use serde::Serialize;
use structopt::StructOpt;

/// Places servers in rows and groups them into pools, maximizing the capacity that every pool
/// retains when any single row fails.
#[derive(Debug, StructOpt)]
struct Opt {
    /// Data center description.
    input: PathBuf,

    /// Where to write the assignment. Defaults to the input path with a `.res` suffix.
    #[structopt(short, long)]
    output: Option<PathBuf>,

    /// JSON file with search configuration.
    #[structopt(long)]
    config: Option<PathBuf>,

    /// Seed for the random number generator.
    #[structopt(long)]
    seed: Option<u64>,

    /// Number of swap trials.
    #[structopt(long)]
    swap_iterations: Option<usize>,

    /// Number of move trials.
    #[structopt(long)]
    move_iterations: Option<usize>,

    /// Instead of optimizing, load this assignment and report its score.
    #[structopt(long)]
    score: Option<PathBuf>,

    /// Show local search progress.
    #[structopt(long)]
    progress: bool,

    /// Verbosity.
    #[structopt(short, long, parse(from_occurrences))]
    verbose: u8,

    /// Store the logs this file.
    #[structopt(long)]
    log_output: Option<PathBuf>,

    /// Do not log to the stderr.
    #[structopt(long)]
    no_stderr: bool,
}

impl Opt {
    fn output_path(&self) -> PathBuf {
        self.output.clone().unwrap_or_else(|| {
            let mut path = self.input.clone().into_os_string();
            path.push(".res");
            PathBuf::from(path)
        })
    }

    fn search_config(&self) -> eyre::Result<SearchConfig> {
        let mut config = match &self.config {
            Some(path) => SearchConfig::from_path(path)
                .wrap_err_with(|| format!("unable to load config: {}", path.display()))?,
            None => SearchConfig::default(),
        };
        if let Some(seed) = self.seed {
            config.seed = Some(seed);
        }
        if let Some(iterations) = self.swap_iterations {
            config.swap_iterations = iterations;
        }
        if let Some(iterations) = self.move_iterations {
            config.move_iterations = iterations;
        }
        config.validate()?;
        Ok(config)
    }
}

#[derive(Debug, Serialize)]
struct Summary {
    score: Capacity,
    pool_capacities: Vec<Capacity>,
    placed: usize,
    unassigned: usize,
    row_loads: Vec<Capacity>,
}

impl Summary {
    fn new(facility: &Facility) -> Self {
        let mut objective = Objective::new(facility.pools().len());
        let placed = facility.num_placed();
        Self {
            score: objective.global_score(facility),
            pool_capacities: objective.pool_capacities(facility),
            placed,
            unassigned: facility.servers().len() - placed,
            row_loads: facility
                .rows()
                .iter()
                .map(|row| facility.row_load(row.id()))
                .collect_vec(),
        }
    }
}

fn load_facility(path: &Path) -> eyre::Result<Facility> {
    let file = File::open(path)
        .wrap_err_with(|| format!("unable to open input file: {}", path.display()))?;
    read_facility(BufReader::new(file))
        .wrap_err_with(|| format!("unable to parse input file: {}", path.display()))
}

fn progress_bar() -> ProgressBar {
    let pb = ProgressBar::new(0);
    pb.set_style(ProgressStyle::default_bar().template("{msg:>5} {wide_bar} {pos}/{len} {eta}"));
    pb
}

fn run(opt: &Opt) -> eyre::Result<Summary> {
    let mut facility = load_facility(&opt.input)?;
    if let Some(path) = &opt.score {
        let file = File::open(path)
            .wrap_err_with(|| format!("unable to open assignment: {}", path.display()))?;
        read_assignment(BufReader::new(file), &mut facility)
            .wrap_err_with(|| format!("invalid assignment: {}", path.display()))?;
        return Ok(Summary::new(&facility));
    }

    let config = opt.search_config()?;
    let mut rng = if let Some(seed) = config.seed {
        ChaChaRng::seed_from_u64(seed)
    } else {
        ChaChaRng::from_entropy()
    };
    let mut optimizer = Optimizer::new(config);
    if opt.progress {
        optimizer.progress_bar(progress_bar());
    }
    let score = optimizer.optimize(&mut facility, &mut rng);
    log::info!("Final score: {}", score);
    debug_assert!(facility.check_consistency().is_empty());

    let output = opt.output_path();
    let file = File::create(&output)
        .wrap_err_with(|| format!("unable to create output file: {}", output.display()))?;
    write_assignment(BufWriter::new(file), &facility)?;
    Ok(Summary::new(&facility))
}

/// Set up a logger based on the given user options.
fn set_up_logger(opt: &Opt) -> Result<(), fern::InitError> {
    let log_level = match opt.verbose {
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        3 => log::LevelFilter::Trace,
        _ => log::LevelFilter::Warn,
    };
    let dispatch = fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!("[{}] {}", record.level(), message))
        })
        .level(log_level);
    let dispatch = if let Some(path) = &opt.log_output {
        let _ = std::fs::remove_file(path);
        dispatch.chain(
            std::fs::OpenOptions::new()
                .write(true)
                .create(true)
                .append(false)
                .open(path)?,
        )
    } else {
        dispatch
    };
    let dispatch = if opt.no_stderr {
        dispatch
    } else {
        dispatch.chain(std::io::stderr())
    };
    dispatch.apply()?;
    Ok(())
}

fn main() -> eyre::Result<()> {
    color_eyre::install()?;
    let opt = Opt::from_args();
    set_up_logger(&opt)?;
    let summary = run(&opt)?;
    println!("{}", serde_json::to_string(&summary)?);
    Ok(())
}
