//! Command execution
//!
//! Every command reads the filter file, applies one operation and, if the
//! filter changed, writes it back atomically. Human-readable results go to
//! the supplied writer; the process exit status comes from [`Outcome`].

use std::io::Write;
use std::path::Path;

use anyhow::{bail, Context, Result};
use bloom_filters::{AnyFilter, BloomConfig, BloomConfigBuilder, BloomFilter, FilterError};
use tracing::{debug, info};

use crate::cli::{Cli, CombineArgs, Command, CreateArgs, KeyEncoding};
use crate::storage::{read_filter, write_filter};

/// Exit status for a command that ran to completion
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    Done,
    /// `contains`: possibly present
    Present,
    /// `contains`: definitely absent
    Absent,
    /// `remove`: a targeted counter was already zero
    NotPresent,
}

impl Outcome {
    pub fn exit_code(self) -> u8 {
        match self {
            Outcome::Done | Outcome::Present => 0,
            Outcome::Absent | Outcome::NotPresent => 1,
        }
    }
}

/// Which bitwise combination to apply
#[derive(Clone, Copy, Debug)]
enum Combine {
    Union,
    Intersect,
}

/// Run the parsed command
///
/// `defaults` supplies the seed tweak and strategy for `create` when the
/// command line leaves them out.
pub fn run(cli: &Cli, defaults: &BloomConfig, out: &mut impl Write) -> Result<Outcome> {
    let path = cli.filter.as_path();
    match &cli.command {
        Command::Create(args) => create(path, args, defaults, out),
        Command::Insert { keys, encoding } => insert(path, keys, *encoding, out),
        Command::Contains { key, encoding } => contains(path, key, *encoding, out),
        Command::Remove { key, encoding } => remove(path, key, *encoding, out),
        Command::Union(args) => combine(path, args, Combine::Union, out),
        Command::Intersect(args) => combine(path, args, Combine::Intersect, out),
        Command::Stats { json } => stats(path, *json, out),
    }
}

fn create(
    path: &Path,
    args: &CreateArgs,
    defaults: &BloomConfig,
    out: &mut impl Write,
) -> Result<Outcome> {
    let mut builder = BloomConfigBuilder::new()
        .tweak(args.tweak.unwrap_or(defaults.tweak))
        .strategy(args.strategy.unwrap_or(defaults.strategy))
        .counting(args.counting);
    if let Some(m) = args.m {
        builder = builder.size_bits(m);
    }
    if let Some(k) = args.k {
        builder = builder.hash_count(k);
    }
    if let Some(n) = args.n {
        builder = builder.expected_elements(n);
    }
    if let Some(p) = args.p {
        builder = builder.target_fpr(p);
    }

    let filter = builder
        .build()
        .and_then(|config| config.build_filter())
        .context("Cannot create filter")?;
    write_filter(path, &filter, args.force)?;

    info!("[bloom] Created {} at {}", filter.params(), path.display());
    writeln!(
        out,
        "Created {} filter {} at {}",
        filter.layout(),
        filter.params(),
        path.display()
    )?;
    Ok(Outcome::Done)
}

fn insert(
    path: &Path,
    keys: &[String],
    encoding: KeyEncoding,
    out: &mut impl Write,
) -> Result<Outcome> {
    let keys = keys
        .iter()
        .map(|key| decode_key(key, encoding))
        .collect::<Result<Vec<_>>>()?;

    let mut filter = read_filter(path)?;
    for key in &keys {
        filter.insert(key);
    }
    write_filter(path, &filter, true)?;

    debug!("[bloom] Inserted {} keys into {}", keys.len(), path.display());
    writeln!(out, "Inserted {} key(s)", keys.len())?;
    Ok(Outcome::Done)
}

fn contains(path: &Path, key: &str, encoding: KeyEncoding, out: &mut impl Write) -> Result<Outcome> {
    let key = decode_key(key, encoding)?;
    let filter = read_filter(path)?;

    if filter.contains(&key) {
        writeln!(out, "possibly present")?;
        Ok(Outcome::Present)
    } else {
        writeln!(out, "definitely absent")?;
        Ok(Outcome::Absent)
    }
}

fn remove(path: &Path, key: &str, encoding: KeyEncoding, out: &mut impl Write) -> Result<Outcome> {
    let key = decode_key(key, encoding)?;
    let mut counting = match read_filter(path)? {
        AnyFilter::Counting(filter) => filter,
        AnyFilter::Standard(_) => bail!(
            "{} is a standard filter; only counting filters (create --counting) support remove",
            path.display()
        ),
    };

    match counting.remove(&key) {
        Ok(()) => {
            write_filter(path, &AnyFilter::from(counting), true)?;
            writeln!(out, "removed")?;
            Ok(Outcome::Done)
        }
        Err(FilterError::NotPresent) => {
            writeln!(out, "not present")?;
            Ok(Outcome::NotPresent)
        }
        Err(e) => Err(e.into()),
    }
}

fn combine(path: &Path, args: &CombineArgs, op: Combine, out: &mut impl Write) -> Result<Outcome> {
    let mut left = standard(read_filter(path)?, path)?;
    let right = standard(read_filter(&args.other)?, &args.other)?;

    let combined = match op {
        Combine::Union => left.union_with(&right),
        Combine::Intersect => left.intersect_with(&right),
    };
    combined.with_context(|| format!("Cannot combine with {}", args.other.display()))?;

    let target = args.output.as_deref().unwrap_or(path);
    let bits_set = left.bits_set();
    write_filter(target, &AnyFilter::from(left), true)?;

    info!("[bloom] Wrote {:?} result to {}", op, target.display());
    writeln!(out, "Wrote {} bits set to {}", bits_set, target.display())?;
    Ok(Outcome::Done)
}

fn stats(path: &Path, json: bool, out: &mut impl Write) -> Result<Outcome> {
    let stats = read_filter(path)?.stats();

    if json {
        serde_json::to_writer_pretty(&mut *out, &stats).context("Failed to encode stats")?;
        writeln!(out)?;
        return Ok(Outcome::Done);
    }

    writeln!(out, "variant:               {:?}", stats.variant)?;
    writeln!(out, "size bits (m):         {}", stats.size_bits)?;
    writeln!(out, "hash count (k):        {}", stats.hash_count)?;
    writeln!(out, "seed:                  {}/{}", stats.strategy, stats.tweak)?;
    writeln!(
        out,
        "cells set:             {} ({:.2}%)",
        stats.cells_set,
        stats.fill_ratio * 100.0
    )?;
    match stats.insertions {
        Some(n) => writeln!(out, "insertions:            {}", n)?,
        None => writeln!(out, "insertions:            unknown")?,
    }
    match stats.estimated_cardinality {
        Some(n) => writeln!(out, "estimated cardinality: {:.1}", n)?,
        None => writeln!(out, "estimated cardinality: saturated")?,
    }
    writeln!(out, "estimated fpr:         {:.6}", stats.estimated_fpr)?;
    Ok(Outcome::Done)
}

fn standard(filter: AnyFilter, path: &Path) -> Result<BloomFilter> {
    match filter {
        AnyFilter::Standard(filter) => Ok(filter),
        AnyFilter::Counting(_) => bail!(
            "{} is a counting filter; union and intersect need standard filters",
            path.display()
        ),
    }
}

fn decode_key(key: &str, encoding: KeyEncoding) -> Result<Vec<u8>> {
    if encoding.hex {
        hex::decode(key).with_context(|| format!("Invalid hex key {:?}", key))
    } else {
        Ok(key.as_bytes().to_vec())
    }
}
