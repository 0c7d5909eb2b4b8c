//! Datacull: dataset curation for image/label training corpora.
//!
//! Datacull operates on a workspace of dataset folders, each holding sibling
//! `images/` and `labels/` trees. It finds duplicate samples across datasets
//! by filename prefix, records them in a reviewable match manifest, deletes
//! them on confirmation, and partitions disjoint folder pools into a 7:2:1
//! train/val/test output tree.
//!
//! # Modules
//!
//! - [`catalog`]: workspace discovery and image counting
//! - [`dedup`]: prefix index, duplicate resolver, match manifest, deletion
//! - [`split`]: ratio planner and partition executor
//! - [`classfix`]: label class normalization utility
//! - [`error`]: error types for datacull operations

pub mod catalog;
pub mod classfix;
pub mod dedup;
pub mod error;
pub mod split;

mod progress;

use std::io::{self, Write};
use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub use error::DatacullError;

/// The datacull CLI application.
#[derive(Parser)]
#[command(name = "datacull")]
#[command(version, author, about)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand)]
enum Commands {
    /// List dataset folders and their image counts.
    List(ListArgs),
    /// Scan for cross-dataset duplicates and write the match manifest.
    Scan(ScanArgs),
    /// Delete matched files recorded in a match manifest.
    Delete(DeleteArgs),
    /// Partition train/test folder pools into a 7:2:1 output tree.
    Split(SplitArgs),
    /// Scan label files and log the class ids they use.
    ClassScan(ClassScanArgs),
    /// Rewrite every logged label line to a fixed class id.
    ClassFix(ClassFixArgs),
}

#[derive(clap::Args)]
struct ListArgs {
    /// Workspace root containing the dataset folders.
    #[arg(long, default_value = ".")]
    root: PathBuf,
}

#[derive(clap::Args)]
struct ScanArgs {
    /// Base dataset the scan is anchored on.
    base: String,

    /// Workspace root containing the dataset folders.
    #[arg(long, default_value = ".")]
    root: PathBuf,

    /// Number of leading filename characters to compare.
    #[arg(long, default_value_t = dedup::DEFAULT_PREFIX_LEN)]
    prefix_len: usize,
}

#[derive(clap::Args)]
struct DeleteArgs {
    /// Base dataset whose manifest drives the deletion.
    base: String,

    /// Workspace root containing the dataset folders.
    #[arg(long, default_value = ".")]
    root: PathBuf,

    /// Delete from every dataset in the manifest except the base.
    #[arg(long, conflicts_with_all = ["base_only", "datasets"])]
    all: bool,

    /// Delete only the base dataset's own matched files.
    #[arg(long, conflicts_with = "datasets")]
    base_only: bool,

    /// Delete from an explicit comma-separated list of datasets.
    #[arg(long, value_delimiter = ',')]
    datasets: Vec<String>,

    /// Compute and list the delete set without touching the filesystem.
    #[arg(long)]
    dry_run: bool,

    /// Skip the interactive confirmation prompt.
    #[arg(long)]
    yes: bool,
}

#[derive(clap::Args)]
struct SplitArgs {
    /// Workspace root containing the dataset folders.
    #[arg(long, default_value = ".")]
    root: PathBuf,

    /// Comma-separated folders feeding the train/val partitions.
    #[arg(long, value_delimiter = ',', required = true)]
    train: Vec<String>,

    /// Comma-separated folders feeding the held-out test partition.
    #[arg(long, value_delimiter = ',', required = true)]
    test: Vec<String>,

    /// Seed the shuffles for reproducible partition membership.
    #[arg(long)]
    seed: Option<u64>,
}

#[derive(clap::Args)]
struct ClassScanArgs {
    /// Root to scan for labels/*.txt files.
    #[arg(long, default_value = ".")]
    root: PathBuf,
}

#[derive(clap::Args)]
struct ClassFixArgs {
    /// Root holding the class scan log and the label files.
    #[arg(long, default_value = ".")]
    root: PathBuf,

    /// Class id to write as the leading token of every label line.
    #[arg(long, default_value = "0")]
    class: String,

    /// Skip the interactive confirmation prompt.
    #[arg(long)]
    yes: bool,
}

/// Run the datacull CLI.
///
/// This is the main entry point for the CLI, called from `main.rs`.
pub fn run() -> Result<(), DatacullError> {
    let cli = Cli::parse();

    match cli.command {
        Some(Commands::List(args)) => run_list(args),
        Some(Commands::Scan(args)) => run_scan(args),
        Some(Commands::Delete(args)) => run_delete(args),
        Some(Commands::Split(args)) => run_split(args),
        Some(Commands::ClassScan(args)) => run_class_scan(args),
        Some(Commands::ClassFix(args)) => run_class_fix(args),
        None => {
            println!("datacull {}", env!("CARGO_PKG_VERSION"));
            println!();
            println!("Dataset curation for image/label training corpora.");
            println!();
            println!("Run 'datacull --help' for usage information.");
            Ok(())
        }
    }
}

fn run_list(args: ListArgs) -> Result<(), DatacullError> {
    let datasets = catalog::find_datasets(&args.root)?;
    if datasets.is_empty() {
        return Err(DatacullError::NoDatasets { root: args.root });
    }

    println!("Dataset image counts:");
    println!("---------------------");
    let mut total = 0;
    for name in &datasets {
        let count = catalog::count_images(&args.root.join(name).join("images"))?;
        println!("{name}: {count} image(s)");
        total += count;
    }
    println!("---------------------");
    println!("Total images across all datasets: {total}");

    Ok(())
}

fn run_scan(args: ScanArgs) -> Result<(), DatacullError> {
    let datasets = catalog::find_datasets(&args.root)?;
    if datasets.is_empty() {
        return Err(DatacullError::NoDatasets { root: args.root });
    }

    println!(
        "Matching based on the first {} characters of image filenames.",
        args.prefix_len
    );
    let (manifest, report) =
        dedup::resolve_duplicates(&args.root, &datasets, &args.base, args.prefix_len)?;
    print!("{report}");

    let path = manifest.save(&args.root, &args.base)?;
    println!(
        "Match log saved as: {}. Review it before running 'delete'.",
        path.display()
    );

    Ok(())
}

fn run_delete(args: DeleteArgs) -> Result<(), DatacullError> {
    let scope = if args.all {
        dedup::DeleteScope::AllExceptBase
    } else if args.base_only {
        dedup::DeleteScope::BaseOnly
    } else if !args.datasets.is_empty() {
        dedup::DeleteScope::Datasets(args.datasets.clone())
    } else {
        return Err(DatacullError::InvalidSelection(
            "choose one of --all, --base-only, or --datasets".to_string(),
        ));
    };

    let manifest = dedup::MatchManifest::load(&args.root, &args.base)?;
    let targets = dedup::manifest::resolve_delete_targets(&manifest, &args.base, &scope)?;

    println!("You are about to delete matched files from:");
    for name in &targets {
        println!("  - {name}");
    }

    if !args.dry_run && !args.yes && !confirm("Are you sure? (y/n): ")? {
        println!("Deletion cancelled.");
        return Ok(());
    }

    let report = dedup::manifest::delete_matches(&args.root, &manifest, &targets, args.dry_run);
    print!("{report}");

    Ok(())
}

fn run_split(args: SplitArgs) -> Result<(), DatacullError> {
    println!(
        "Target split ratio 0.7/0.2/0.1; train/val sub-ratio {}/{}",
        split::TRAIN_FRACTION,
        split::VAL_FRACTION
    );

    let plan = split::plan_partition(&args.root, &args.train, &args.test)?;
    println!(
        "Train pool: {} image(s); test pool: {} image(s); planned test slice: {}",
        plan.train_pool, plan.test_pool, plan.wish_test
    );

    let report = split::execute_split(&args.root, &args.train, &args.test, &plan, args.seed)?;
    print!("{report}");

    Ok(())
}

fn run_class_scan(args: ClassScanArgs) -> Result<(), DatacullError> {
    let log = classfix::scan_classes(&args.root)?;

    println!("Class occurrences:");
    for (class, count) in &log.class_counts {
        println!("  {class}: {count}");
    }

    let path = log.save(&args.root)?;
    println!("Scan complete. Results saved to {}.", path.display());

    Ok(())
}

fn run_class_fix(args: ClassFixArgs) -> Result<(), DatacullError> {
    let log = classfix::ClassScanLog::load(&args.root)?;

    println!(
        "About to rewrite the class id in {} label file(s) to '{}'.",
        log.file_class_map.len(),
        args.class
    );
    if !args.yes && !confirm("Are you sure? (y/n): ")? {
        println!("Fix cancelled.");
        return Ok(());
    }

    let report = classfix::fix_classes(&args.root, &log, &args.class);
    print!("{report}");

    Ok(())
}

fn confirm(prompt: &str) -> Result<bool, DatacullError> {
    print!("{prompt}");
    io::stdout().flush()?;

    let mut answer = String::new();
    io::stdin().read_line(&mut answer)?;
    Ok(answer.trim().eq_ignore_ascii_case("y"))
}
