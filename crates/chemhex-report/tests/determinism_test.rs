//! Determinism Acceptance Test
//!
//! Running the pipeline twice on the same tables must produce byte-for-byte
//! identical datasets.json, regardless of thread scheduling.

use chemhex_report::{ReportConfig, ReportPipeline};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

/// Deterministic query table with many chemicals sharing cells
fn create_deterministic_table(seed: u64, n: usize) -> String {
    let mut lines = Vec::with_capacity(n);
    for i in 0..n {
        let pseudo_rand = (seed.wrapping_mul(1103515245).wrapping_add(12345) ^ (i as u64 * 7919)) % 10_000;
        let logp = -4.0 + (pseudo_rand % 130) as f64 / 10.0;
        let mass = 50.0 + (pseudo_rand % 1200) as f64;
        let count = 1 + (i % 13);
        let weighted = (pseudo_rand % 97) as f64 / 7.0;
        lines.push(format!(
            "CHEBI:{}\t{}\t{}\tchemical {}\t{}\t{}\t[]",
            1000 + i,
            count,
            weighted,
            i,
            mass,
            logp
        ));
    }
    lines.join("\n")
}

fn run_once(input: &Path, output: &Path) -> Vec<u8> {
    let mut config = ReportConfig {
        input_dir: input.to_path_buf(),
        output_dir: output.to_path_buf(),
        ..Default::default()
    };
    config.figures.enabled = false;
    let pipeline = ReportPipeline::new(config).unwrap();
    pipeline.run().unwrap();
    fs::read(pipeline.output().datasets_json()).unwrap()
}

#[test]
fn test_datasets_json_is_byte_identical() {
    env_logger::try_init().ok();

    let tmp = TempDir::new().unwrap();
    let input = tmp.path().join("tables");
    fs::create_dir_all(&input).unwrap();
    for (i, name) in ["alpha", "beta", "gamma", "delta"].iter().enumerate() {
        fs::write(
            input.join(format!("{}_hits.tsv", name)),
            create_deterministic_table(42 + i as u64, 200),
        )
        .unwrap();
    }

    let first = run_once(&input, &tmp.path().join("run1"));
    let second = run_once(&input, &tmp.path().join("run2"));

    assert!(!first.is_empty());
    assert_eq!(first, second, "datasets.json differs between runs");
}
