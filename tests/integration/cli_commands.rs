#![allow(missing_docs)]

use std::fs;
use std::path::{Path, PathBuf};

use assert_cmd::cargo::cargo_bin_cmd;
use serde_json::Value;
use tempfile::TempDir;

const NODES: &str = "\
geneID,geneSymbol,studyID,model_species,common_name,cell_culture_comment,tissue,htt_length,detection_method_annot,study_id
3064,HTT,s1,Mouse,R6/2,,striatum,Q150,two hybrid,Smith 2010
3064,HTT,s2,Human,,,cortex,Q23,pull down,Lee 2012
9001,HAP1,s1,Mouse,R6/2,,striatum,Q150,two hybrid,Smith 2010
6667,SP1,s3,Mouse,,,liver,,pull down,Chen 2015
";

const EDGES: &str = "\
GENE_ID_A,GENE_ID_B,combined_score
3064,9001,0.9
3064,6667,0.7
9001,6667,0.2
";

struct Fixture {
    dir: TempDir,
    nodes: PathBuf,
    edges: PathBuf,
}

fn fixture() -> Fixture {
    let dir = TempDir::new().expect("tempdir");
    let nodes = dir.path().join("nodes.csv");
    let edges = dir.path().join("edges.csv");
    fs::write(&nodes, NODES).expect("write nodes");
    fs::write(&edges, EDGES).expect("write edges");
    Fixture { dir, nodes, edges }
}

fn run_json(dir: &Path, args: &[&str]) -> Value {
    let output = cargo_bin_cmd!("interactome")
        .env_remove("INTERACTOME_CONFIG")
        .env_remove("INTERACTOME_LOG")
        .env("XDG_CONFIG_HOME", dir)
        .args(["--format", "json", "--quiet"])
        .args(args)
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    serde_json::from_slice(&output).expect("json output")
}

impl Fixture {
    fn view<'a>(&'a self, args: &[&'a str]) -> Vec<&'a str> {
        let mut all = vec![
            "--nodes",
            self.nodes.to_str().expect("utf-8 path"),
            "--edges",
            self.edges.to_str().expect("utf-8 path"),
        ];
        all.extend_from_slice(args);
        all
    }
}

#[test]
fn summary_reports_the_default_view() {
    let fx = fixture();
    let mut args = vec!["summary"];
    args.extend(fx.view(&[]));
    let json = run_json(fx.dir.path(), &args);

    assert_eq!(json["status"], "3 of 3 nodes shown");
    assert_eq!(json["node_rows"], 4);
    assert_eq!(json["genes"], 3);
    assert_eq!(json["selected_edges"], 2);
    assert_eq!(json["visible"]["nodes"].as_array().map(Vec::len), Some(3));
    assert_eq!(json["visible"]["nodes"][0]["gene_symbol"], "HTT");
}

#[test]
fn summary_applies_filters_and_queries() {
    let fx = fixture();
    let mut args = vec!["summary"];
    args.extend(fx.view(&["--filter", "Tissue=striatum"]));
    let json = run_json(fx.dir.path(), &args);
    assert_eq!(json["status"], "2 of 2 nodes shown");
    assert_eq!(json["filtered_rows"], 2);

    let mut args = vec!["summary"];
    args.extend(fx.view(&["--query", "HTT", "--query", "TP53"]));
    let json = run_json(fx.dir.path(), &args);
    assert_eq!(
        json["status"],
        "1 of 1 nodes shown, 1 of 2 queried nodes found, 1 unconnected"
    );
    assert_eq!(json["query"]["found"], 1);
}

#[test]
fn options_lists_values_with_gene_counts() {
    let fx = fixture();
    let mut args = vec!["options", "tissue"];
    args.extend(fx.view(&[]));
    let json = run_json(fx.dir.path(), &args);

    let options: Vec<(String, u64)> = json
        .as_array()
        .expect("array")
        .iter()
        .map(|o| {
            (
                o["value"].as_str().unwrap_or_default().to_string(),
                o["gene_count"].as_u64().unwrap_or_default(),
            )
        })
        .collect();
    assert_eq!(options, vec![
        ("cortex".to_string(), 1),
        ("liver".to_string(), 1),
        ("striatum".to_string(), 2),
    ]);
}

#[test]
fn export_writes_four_tables() {
    let fx = fixture();
    let out = fx.dir.path().join("export");
    let out_arg = out.to_str().expect("utf-8 path").to_string();
    let mut args = vec!["export", "--out", out_arg.as_str()];
    args.extend(fx.view(&["--threshold", "0.8"]));
    run_json(fx.dir.path(), &args);

    for name in [
        "visible_nodes.tsv",
        "visible_edges.tsv",
        "selected_nodes.tsv",
        "selected_edges.tsv",
    ] {
        assert!(out.join(name).is_file(), "{name} missing");
    }
    let edges = fs::read_to_string(out.join("selected_edges.tsv")).expect("edges");
    assert_eq!(edges.lines().count(), 2, "header plus the one strong edge");
}

#[test]
fn unknown_filter_field_fails() {
    let fx = fixture();
    let mut args = vec!["summary"];
    args.extend(fx.view(&["--filter", "colour=red"]));
    let output = cargo_bin_cmd!("interactome")
        .env_remove("INTERACTOME_CONFIG")
        .env("XDG_CONFIG_HOME", fx.dir.path())
        .args(&args)
        .assert()
        .failure()
        .get_output()
        .stderr
        .clone();
    let stderr = String::from_utf8_lossy(&output);
    assert!(stderr.contains("unknown filter field 'colour'"), "{stderr}");
}

#[test]
fn generated_dataset_loads_back() {
    let dir = TempDir::new().expect("tempdir");
    let out = dir.path().join("synthetic");
    let out_arg = out.to_str().expect("utf-8 path");
    let json = run_json(dir.path(), &[
        "generate", "--out", out_arg, "--genes", "60", "--studies", "8", "--seed", "5",
    ]);
    assert!(json["node_rows"].as_u64().unwrap_or_default() >= 60);

    let nodes = out.join("nodes.csv");
    let edges = out.join("edges.csv");
    let summary = run_json(dir.path(), &[
        "summary",
        "--nodes",
        nodes.to_str().expect("utf-8 path"),
        "--edges",
        edges.to_str().expect("utf-8 path"),
        "--max-nodes",
        "10",
    ]);
    assert_eq!(summary["genes"], 60);
    assert_eq!(summary["visible"]["nodes"].as_array().map(Vec::len), Some(10));
}
