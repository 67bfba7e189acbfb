//! End-to-end command tests against filter files in a temporary directory

use std::fs;
use std::path::{Path, PathBuf};

use bloom_cli::{run, Cli, Outcome};
use bloom_filters::{AnyFilter, BloomConfig, HashStrategy};
use clap::Parser;
use tempfile::TempDir;

// =============================================================================
// TEST HELPERS
// =============================================================================

struct Workspace {
    dir: TempDir,
}

impl Workspace {
    fn new() -> Self {
        Self {
            dir: tempfile::tempdir().unwrap(),
        }
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    /// Run `bloom --filter <name> <args...>` with default environment config
    fn bloom(&self, name: &str, args: &[&str]) -> anyhow::Result<(Outcome, String)> {
        self.bloom_with(name, args, &BloomConfig::default())
    }

    fn bloom_with(
        &self,
        name: &str,
        args: &[&str],
        defaults: &BloomConfig,
    ) -> anyhow::Result<(Outcome, String)> {
        let filter = self.path(name);
        let mut argv = vec!["bloom", "--filter", filter.to_str().unwrap()];
        argv.extend_from_slice(args);
        let cli = Cli::try_parse_from(argv).unwrap();

        let mut out = Vec::new();
        let outcome = run(&cli, defaults, &mut out)?;
        Ok((outcome, String::from_utf8(out).unwrap()))
    }

    fn load(&self, name: &str) -> AnyFilter {
        load(&self.path(name))
    }
}

fn load(path: &Path) -> AnyFilter {
    AnyFilter::from_bytes(&fs::read(path).unwrap()).unwrap()
}

// =============================================================================
// CREATE
// =============================================================================

#[test]
fn test_create_explicit_shape() {
    let ws = Workspace::new();

    let (outcome, out) = ws.bloom("f.bloom", &["create", "--m", "10", "--k", "3"]).unwrap();

    assert_eq!(outcome, Outcome::Done);
    assert!(out.contains("Created bits filter"), "got: {}", out);
    let filter = ws.load("f.bloom");
    assert_eq!(filter.params().size_bits(), 10);
    assert_eq!(filter.params().hash_count(), 3);
    assert!(matches!(filter, AnyFilter::Standard(_)));
}

#[test]
fn test_create_from_capacity() {
    let ws = Workspace::new();

    ws.bloom("f.bloom", &["create", "--n", "1000", "--p", "0.01"]).unwrap();

    let params = ws.load("f.bloom").params();
    assert_eq!(params.size_bits(), 9586);
    assert_eq!(params.hash_count(), 7);
}

#[test]
fn test_create_refuses_to_overwrite_without_force() {
    let ws = Workspace::new();
    ws.bloom("f.bloom", &["create", "--m", "64", "--k", "2"]).unwrap();
    ws.bloom("f.bloom", &["insert", "kept"]).unwrap();

    let err = ws
        .bloom("f.bloom", &["create", "--m", "128", "--k", "2"])
        .unwrap_err();
    assert!(err.to_string().contains("already exists"));
    assert!(ws.load("f.bloom").contains(b"kept"), "Existing filter untouched");

    ws.bloom("f.bloom", &["create", "--m", "128", "--k", "2", "--force"])
        .unwrap();
    let replaced = ws.load("f.bloom");
    assert_eq!(replaced.params().size_bits(), 128);
    assert!(!replaced.contains(b"kept"));
}

#[test]
fn test_create_rejects_invalid_parameters() {
    let ws = Workspace::new();

    assert!(ws.bloom("f.bloom", &["create", "--m", "0", "--k", "3"]).is_err());
    assert!(ws.bloom("f.bloom", &["create", "--n", "100", "--p", "1.5"]).is_err());
    assert!(ws
        .bloom("f.bloom", &["create", "--m", "10000000000000000000", "--k", "1"])
        .is_err());
    assert!(ws
        .bloom("f.bloom", &["create", "--n", "4611686018427387904", "--p", "0.5"])
        .is_err());
    assert!(!ws.path("f.bloom").exists(), "No file for a refused create");
}

#[test]
fn test_create_uses_environment_defaults_unless_overridden() {
    let ws = Workspace::new();
    let defaults = BloomConfig::default()
        .with_tweak(77)
        .with_strategy(HashStrategy::Seeded);

    ws.bloom_with("env.bloom", &["create"], &defaults).unwrap();
    ws.bloom_with(
        "flags.bloom",
        &["create", "--tweak", "5", "--strategy", "double"],
        &defaults,
    )
    .unwrap();

    let env_seed = ws.load("env.bloom").params().seed();
    assert_eq!(env_seed.tweak, 77);
    assert_eq!(env_seed.strategy, HashStrategy::Seeded);

    let flag_seed = ws.load("flags.bloom").params().seed();
    assert_eq!(flag_seed.tweak, 5);
    assert_eq!(flag_seed.strategy, HashStrategy::DoubleHashing);
}

// =============================================================================
// INSERT / CONTAINS / REMOVE
// =============================================================================

#[test]
fn test_insert_then_contains_exit_codes() {
    let ws = Workspace::new();
    ws.bloom("f.bloom", &["create", "--n", "100", "--p", "0.001"]).unwrap();

    let (_, out) = ws.bloom("f.bloom", &["insert", "hello", "chat"]).unwrap();
    assert!(out.contains("Inserted 2 key(s)"));

    let (outcome, out) = ws.bloom("f.bloom", &["contains", "hello"]).unwrap();
    assert_eq!(outcome, Outcome::Present);
    assert_eq!(outcome.exit_code(), 0);
    assert_eq!(out.trim(), "possibly present");

    let (outcome, out) = ws.bloom("f.bloom", &["contains", "never-inserted"]).unwrap();
    assert_eq!(outcome, Outcome::Absent);
    assert_eq!(outcome.exit_code(), 1);
    assert_eq!(out.trim(), "definitely absent");
}

#[test]
fn test_hex_keys_match_raw_bytes() {
    let ws = Workspace::new();
    ws.bloom("f.bloom", &["create", "--n", "100", "--p", "0.001"]).unwrap();

    ws.bloom("f.bloom", &["insert", "--hex", "68656c6c6f"]).unwrap();

    let (outcome, _) = ws.bloom("f.bloom", &["contains", "hello"]).unwrap();
    assert_eq!(outcome, Outcome::Present, "68656c6c6f is \"hello\"");
    assert!(ws.load("f.bloom").contains(b"hello"));
}

#[test]
fn test_malformed_hex_key_is_an_error() {
    let ws = Workspace::new();
    ws.bloom("f.bloom", &["create", "--m", "64", "--k", "2"]).unwrap();

    let before = fs::read(ws.path("f.bloom")).unwrap();
    assert!(ws.bloom("f.bloom", &["insert", "--hex", "ab", "zz"]).is_err());
    assert_eq!(
        fs::read(ws.path("f.bloom")).unwrap(),
        before,
        "A bad key must not insert the good ones"
    );
}

#[test]
fn test_remove_on_counting_filter() {
    let ws = Workspace::new();
    ws.bloom("c.bloom", &["create", "--m", "1024", "--k", "4", "--counting"])
        .unwrap();
    ws.bloom("c.bloom", &["insert", "x"]).unwrap();

    let (outcome, _) = ws.bloom("c.bloom", &["remove", "x"]).unwrap();
    assert_eq!(outcome, Outcome::Done);

    let (outcome, _) = ws.bloom("c.bloom", &["contains", "x"]).unwrap();
    assert_eq!(outcome, Outcome::Absent);

    let (outcome, out) = ws.bloom("c.bloom", &["remove", "x"]).unwrap();
    assert_eq!(outcome, Outcome::NotPresent);
    assert_eq!(outcome.exit_code(), 1);
    assert_eq!(out.trim(), "not present");
}

#[test]
fn test_remove_on_standard_filter_is_an_error() {
    let ws = Workspace::new();
    ws.bloom("f.bloom", &["create", "--m", "64", "--k", "2"]).unwrap();
    ws.bloom("f.bloom", &["insert", "x"]).unwrap();

    let err = ws.bloom("f.bloom", &["remove", "x"]).unwrap_err();
    assert!(err.to_string().contains("counting"));
}

#[test]
fn test_corrupt_file_is_an_error() {
    let ws = Workspace::new();
    fs::write(ws.path("f.bloom"), b"definitely not a filter").unwrap();

    assert!(ws.bloom("f.bloom", &["contains", "x"]).is_err());
    assert!(ws.bloom("missing.bloom", &["contains", "x"]).is_err());
}

// =============================================================================
// UNION / INTERSECT
// =============================================================================

#[test]
fn test_union_into_output_file() {
    let ws = Workspace::new();
    for name in ["a.bloom", "b.bloom"] {
        ws.bloom(name, &["create", "--n", "100", "--p", "0.001"]).unwrap();
    }
    ws.bloom("a.bloom", &["insert", "left"]).unwrap();
    ws.bloom("b.bloom", &["insert", "right"]).unwrap();

    let other = ws.path("b.bloom");
    let output = ws.path("u.bloom");
    ws.bloom(
        "a.bloom",
        &["union", other.to_str().unwrap(), "--output", output.to_str().unwrap()],
    )
    .unwrap();

    let merged = load(&output);
    assert!(merged.contains(b"left"));
    assert!(merged.contains(b"right"));
    assert!(
        !ws.load("a.bloom").contains(b"right"),
        "Source filter unchanged when --output is given"
    );
}

#[test]
fn test_intersect_in_place() {
    let ws = Workspace::new();
    for name in ["a.bloom", "b.bloom"] {
        ws.bloom(name, &["create", "--n", "100", "--p", "0.001"]).unwrap();
    }
    ws.bloom("a.bloom", &["insert", "both", "only-a"]).unwrap();
    ws.bloom("b.bloom", &["insert", "both", "only-b"]).unwrap();

    let other = ws.path("b.bloom");
    ws.bloom("a.bloom", &["intersect", other.to_str().unwrap()])
        .unwrap();

    let result = ws.load("a.bloom");
    assert!(result.contains(b"both"));
    assert!(!result.contains(b"only-a"));
}

#[test]
fn test_union_shape_mismatch_leaves_files_untouched() {
    let ws = Workspace::new();
    ws.bloom("a.bloom", &["create", "--m", "100", "--k", "3"]).unwrap();
    ws.bloom("b.bloom", &["create", "--m", "100", "--k", "3", "--tweak", "1"])
        .unwrap();
    ws.bloom("a.bloom", &["insert", "x"]).unwrap();

    let before = fs::read(ws.path("a.bloom")).unwrap();
    let other = ws.path("b.bloom");
    let err = ws
        .bloom("a.bloom", &["union", other.to_str().unwrap()])
        .unwrap_err();

    assert!(format!("{:#}", err).contains("shape mismatch"));
    assert_eq!(fs::read(ws.path("a.bloom")).unwrap(), before);
}

#[test]
fn test_union_refuses_counting_filters() {
    let ws = Workspace::new();
    ws.bloom("a.bloom", &["create", "--m", "100", "--k", "3"]).unwrap();
    ws.bloom("c.bloom", &["create", "--m", "100", "--k", "3", "--counting"])
        .unwrap();

    let other = ws.path("c.bloom");
    assert!(ws.bloom("a.bloom", &["union", other.to_str().unwrap()]).is_err());
}

// =============================================================================
// STATS
// =============================================================================

#[test]
fn test_stats_json() {
    let ws = Workspace::new();
    ws.bloom("f.bloom", &["create", "--m", "1000", "--k", "4", "--tweak", "9"])
        .unwrap();
    ws.bloom("f.bloom", &["insert", "a", "b", "c"]).unwrap();

    let (_, out) = ws.bloom("f.bloom", &["stats", "--json"]).unwrap();
    let json: serde_json::Value = serde_json::from_str(&out).unwrap();

    assert_eq!(json["variant"], "standard");
    assert_eq!(json["size_bits"], 1000);
    assert_eq!(json["hash_count"], 4);
    assert_eq!(json["tweak"], 9);
    assert_eq!(json["strategy"], "double_hashing");
    assert!(json["cells_set"].as_u64().unwrap() <= 12);
    // The insertion count is not persisted
    assert!(json["insertions"].is_null());
}

#[test]
fn test_stats_text() {
    let ws = Workspace::new();
    ws.bloom("f.bloom", &["create", "--m", "64", "--k", "2", "--counting"])
        .unwrap();

    let (outcome, out) = ws.bloom("f.bloom", &["stats"]).unwrap();

    assert_eq!(outcome, Outcome::Done);
    assert!(out.contains("variant:               Counting"), "got: {}", out);
    assert!(out.contains("size bits (m):         64"));
    assert!(out.contains("cells set:             0 (0.00%)"));
    assert!(out.contains("insertions:            unknown"));
}
