//! Command-line arguments

use std::path::PathBuf;

use bloom_filters::HashStrategy;
use clap::{Args, Parser, Subcommand};

/// bloom: create, query and combine Bloom filters stored on disk
#[derive(Parser, Debug)]
#[command(name = "bloom", version)]
#[command(about = "Create, query and combine Bloom filters stored on disk")]
pub struct Cli {
    /// Filter file to operate on
    #[arg(short, long, global = true, default_value = "filter.bloom")]
    pub filter: PathBuf,

    /// Log at debug level (overrides BLOOM_LOG)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Write a new, empty filter
    Create(CreateArgs),

    /// Insert one or more keys
    Insert {
        #[arg(required = true)]
        keys: Vec<String>,
        #[command(flatten)]
        encoding: KeyEncoding,
    },

    /// Exit 0 if the key is possibly present, 1 if definitely absent
    Contains {
        key: String,
        #[command(flatten)]
        encoding: KeyEncoding,
    },

    /// Remove a key (counting filters only); exit 1 if it is not present
    Remove {
        key: String,
        #[command(flatten)]
        encoding: KeyEncoding,
    },

    /// Merge another filter of the same shape into this one (bitwise OR)
    Union(CombineArgs),

    /// Approximate intersection with another filter (bitwise AND)
    Intersect(CombineArgs),

    /// Print parameters, fill and estimates
    Stats {
        /// Emit JSON instead of text
        #[arg(long)]
        json: bool,
    },
}

#[derive(Args, Debug)]
pub struct CreateArgs {
    /// Size in bits
    #[arg(long, requires = "k", conflicts_with_all = ["n", "p"])]
    pub m: Option<usize>,

    /// Number of hash positions per key
    #[arg(long, requires = "m")]
    pub k: Option<usize>,

    /// Expected number of elements
    #[arg(long, requires = "p")]
    pub n: Option<usize>,

    /// Target false positive rate, in (0, 1)
    #[arg(long, requires = "n")]
    pub p: Option<f64>,

    /// Seed tweak (overrides BLOOM_TWEAK)
    #[arg(long)]
    pub tweak: Option<u32>,

    /// Position derivation: double or seeded (overrides BLOOM_HASH_STRATEGY)
    #[arg(long)]
    pub strategy: Option<HashStrategy>,

    /// Use 4-bit counters so keys can be removed
    #[arg(long)]
    pub counting: bool,

    /// Overwrite an existing filter file
    #[arg(long)]
    pub force: bool,
}

#[derive(Args, Debug)]
pub struct CombineArgs {
    /// The other filter file
    pub other: PathBuf,

    /// Write the result here instead of replacing the filter file
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

#[derive(Args, Debug, Clone, Copy)]
pub struct KeyEncoding {
    /// Keys are hex encoded bytes rather than UTF-8 text
    #[arg(long)]
    pub hex: bool,
}
