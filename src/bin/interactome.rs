//! Command-line front end: loads an interaction network, applies view inputs
//! and reports or exports the resulting subgraph.
#![forbid(unsafe_code)]

#[path = "interactome/ui.rs"]
mod ui;

use std::collections::BTreeMap;
use std::error::Error;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use serde::Serialize;
use tracing::{info, warn};

use interactome::config::DatasetConfig;
use interactome::enrichment::{EnrichmentRequest, EnrichmentView};
use interactome::export::{export_all, ExportSummary};
use interactome::filter::{Combinator, Composition, FieldFilter};
use interactome::generator::{DataGenerator, Shape};
use interactome::io;
use interactome::omics::{observation_counts, sum_observations, OmicsSelection, ProfilePoint};
use interactome::query::QueryHits;
use interactome::selection::{Priority, SelectedNode};
use interactome::visible::{UnconnectedMode, VisibleSubgraph};
use interactome::{Change, DataQualityWarning, Dataset, GeneId, Session, StatusSummary};

use ui::{format_duration, Theme, Ui};

#[derive(Parser, Debug)]
#[command(
    name = "interactome",
    version,
    about = "Filter and explore a protein-protein interaction network",
    disable_help_subcommand = true
)]
struct Cli {
    #[arg(
        long,
        global = true,
        value_name = "FILE",
        env = "INTERACTOME_CONFIG",
        help = "Dataset configuration (TOML)"
    )]
    config: Option<PathBuf>,

    #[arg(
        long,
        global = true,
        value_enum,
        default_value_t = OutputFormat::Text,
        help = "Output format for reports"
    )]
    format: OutputFormat,

    #[arg(long, global = true, value_enum, default_value_t = Theme::Auto)]
    theme: Theme,

    #[arg(
        long,
        global = true,
        value_name = "FILTER",
        env = "INTERACTOME_LOG",
        default_value = "warn",
        help = "tracing filter directive, e.g. info or interactome::pipeline=debug"
    )]
    log_level: String,

    #[arg(long, short, global = true, help = "Suppress decorations and spinners")]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args, Debug, Default)]
struct ViewArgs {
    #[arg(long, value_name = "FILE", help = "Node table (CSV, or TSV with .tsv/.txt)")]
    nodes: Option<PathBuf>,

    #[arg(long, value_name = "FILE", help = "Edge table (CSV, or TSV with .tsv/.txt)")]
    edges: Option<PathBuf>,

    #[arg(
        long = "filter",
        value_name = "FIELD[:AND|OR|NOT]=V1|V2",
        action = ArgAction::Append,
        value_parser = parse_filter,
        help = "Categorical filter on a field name or alias (repeatable)"
    )]
    filters: Vec<FilterArg>,

    #[arg(long, value_name = "MODE", help = "Filter composition: progressive or independent")]
    composition: Option<Composition>,

    #[arg(
        long = "query",
        value_name = "GENE",
        action = ArgAction::Append,
        help = "Gene ID or symbol to look up (repeatable)"
    )]
    query: Vec<String>,

    #[arg(long, value_name = "FILE", help = "File with one gene ID or symbol per line")]
    query_file: Option<PathBuf>,

    #[arg(long, value_name = "SCORE", help = "Minimum edge score, inclusive")]
    threshold: Option<f64>,

    #[arg(long, value_name = "N", help = "Maximum number of visible nodes")]
    max_nodes: Option<usize>,

    #[arg(long, value_name = "N", help = "Minimum PPI observations per gene")]
    ppi_cutoff: Option<u32>,

    #[arg(long, help = "Ranking statistic: total or filtered")]
    priority: Option<Priority>,

    #[arg(long, help = "Unconnected nodes: show or hide")]
    unconnected: Option<UnconnectedMode>,

    #[arg(long, value_name = "FILE", help = "Tab-separated node rows to merge")]
    upload: Option<PathBuf>,

    #[arg(long, help = "Drop edges whose endpoints are not in the node table")]
    prune_edges: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    #[command(about = "Summarise the view produced by the given inputs")]
    Summary {
        #[command(flatten)]
        view: ViewArgs,
        #[arg(long, default_value_t = 20, help = "Visible nodes listed in text output")]
        top: usize,
    },
    #[command(about = "List the values of a categorical field with gene counts")]
    Options {
        #[arg(value_name = "FIELD")]
        field: String,
        #[command(flatten)]
        view: ViewArgs,
    },
    #[command(about = "Write visible and selected nodes/edges as TSV files")]
    Export {
        #[arg(long, value_name = "DIR")]
        out: PathBuf,
        #[command(flatten)]
        view: ViewArgs,
    },
    #[command(about = "Build an enrichment request for the visible genes")]
    Enrichment(EnrichmentCmd),
    #[command(about = "Omics profiles of one gene or the mean over visible genes")]
    Omics(OmicsCmd),
    #[command(about = "Write a seeded synthetic dataset")]
    Generate(GenerateCmd),
}

#[derive(Args, Debug)]
struct EnrichmentCmd {
    #[arg(
        long,
        value_name = "SET",
        default_value = "GO biological process",
        help = "Annotation data set label"
    )]
    annotation: String,

    #[arg(long, help = "Use every selected gene as the reference list")]
    background: bool,

    #[arg(long, value_name = "FILE", help = "Service response to attach (CSV)")]
    results: Option<PathBuf>,

    #[command(flatten)]
    view: ViewArgs,
}

#[derive(Args, Debug)]
struct OmicsCmd {
    #[arg(long, value_name = "FILE", help = "Long-format omics table (CSV)")]
    data: Option<PathBuf>,

    #[arg(long, value_name = "GENE_ID", help = "Profile one gene instead of the mean")]
    gene: Option<u64>,

    #[arg(long = "tissue", value_name = "TISSUE", action = ArgAction::Append)]
    tissues: Vec<String>,

    #[arg(long = "age", value_name = "MONTHS", action = ArgAction::Append)]
    ages: Vec<i64>,

    #[arg(
        long,
        value_name = "FIELD",
        help = "Also count observations per value of this field"
    )]
    observations: Option<String>,

    #[command(flatten)]
    view: ViewArgs,
}

#[derive(Args, Debug)]
struct GenerateCmd {
    #[arg(long, value_name = "DIR")]
    out: PathBuf,

    #[arg(long, default_value_t = 1_000)]
    genes: usize,

    #[arg(long, default_value_t = 40)]
    studies: usize,

    #[arg(long, default_value_t = 8)]
    edges_per_gene: usize,

    #[arg(long, default_value_t = 42)]
    seed: u64,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Clone, Debug)]
struct FilterArg {
    field: String,
    filter: FieldFilter,
}

fn parse_filter(raw: &str) -> Result<FilterArg, String> {
    let (lhs, values) = raw
        .split_once('=')
        .ok_or_else(|| format!("invalid filter '{raw}', expected FIELD[:AND|OR|NOT]=V1|V2"))?;
    let (field, combinator) = match lhs.rsplit_once(':') {
        Some((field, suffix)) => match suffix.parse::<Combinator>() {
            Ok(combinator) => (field, combinator),
            Err(_) => (lhs, Combinator::default()),
        },
        None => (lhs, Combinator::default()),
    };
    let field = field.trim();
    if field.is_empty() {
        return Err(format!("filter '{raw}' names no field"));
    }
    let values = values.split('|').map(str::trim).filter(|v| !v.is_empty());
    Ok(FilterArg {
        field: field.to_string(),
        filter: FieldFilter::new(values, combinator),
    })
}

fn main() {
    let cli = Cli::parse();
    if let Err(err) = interactome::logging::init_logging(&cli.log_level) {
        eprintln!("warning: {err}");
    }
    if let Err(err) = run(cli) {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn Error>> {
    let config = DatasetConfig::load_or_default(cli.config.clone())?;
    let ui = Ui::new(cli.theme, cli.quiet);
    match cli.command {
        Command::Summary { view, top } => {
            let (session, warnings) = open_session(&config, &view, &ui)?;
            let report = SummaryReport::new(&session, warnings);
            emit(cli.format, &report, || print_summary(&ui, &report, top))?;
        }
        Command::Options { field, view } => {
            let (session, _) = open_session(&config, &view, &ui)?;
            let options = session.filter_options(&field)?;
            emit(cli.format, &options, || {
                let mut rows = vec![vec!["value".to_string(), "genes".to_string()]];
                rows.extend(
                    options
                        .iter()
                        .map(|o| vec![o.value.clone(), o.gene_count.to_string()]),
                );
                ui.table(&field, &rows);
            })?;
        }
        Command::Export { out, view } => {
            let (session, _) = open_session(&config, &view, &ui)?;
            let summary = export_all(&session, &out)?;
            emit(cli.format, &summary, || print_export(&ui, &summary, &session))?;
        }
        Command::Enrichment(cmd) => run_enrichment(&config, cmd, cli.format, &ui)?,
        Command::Omics(cmd) => run_omics(&config, cmd, cli.format, &ui)?,
        Command::Generate(cmd) => run_generate(&config, &cmd, cli.format, &ui)?,
    }
    Ok(())
}

fn open_session(
    config: &DatasetConfig,
    view: &ViewArgs,
    ui: &Ui,
) -> Result<(Session, Vec<DataQualityWarning>), Box<dyn Error>> {
    let nodes_path = view
        .nodes
        .clone()
        .or_else(|| config.data.nodes.clone())
        .ok_or("no node table; pass --nodes or set data.nodes in the config")?;
    let edges_path = view
        .edges
        .clone()
        .or_else(|| config.data.edges.clone())
        .ok_or("no edge table; pass --edges or set data.edges in the config")?;

    let task = ui.task(format!("loading {}", nodes_path.display()));
    let nodes = io::read_nodes(&nodes_path, config.schema()?)?;
    let mut edges = io::read_edges(&edges_path, &config.edge_columns())?;
    if view.prune_edges {
        let dropped = edges.retain_known(&nodes.gene_ids());
        if dropped > 0 {
            warn!(dropped, "dropped edges with endpoints outside the node table");
        }
    }
    let dataset = Arc::new(Dataset::new(nodes, edges)?);
    let elapsed = task.finish();
    info!(elapsed = %format_duration(elapsed), "dataset loaded");

    let mut options = config.session_options();
    if let Some(threshold) = view.threshold {
        options.score_threshold = threshold;
    }
    if let Some(max_nodes) = view.max_nodes {
        options.max_nodes = max_nodes;
    }
    if let Some(cutoff) = view.ppi_cutoff {
        options.ppi_cutoff = cutoff;
    }
    if let Some(priority) = view.priority {
        options.priority = priority;
    }
    if let Some(mode) = view.unconnected {
        options.unconnected = mode;
    }
    if let Some(composition) = view.composition {
        options.composition = composition;
    }
    let mut session = Session::new(dataset, options);

    // Merging rebuilds the annotation index and clears filters, so it goes first.
    let mut warnings = Vec::new();
    if let Some(path) = &view.upload {
        let upload = io::read_upload(path)?;
        let report = session.merge_upload(&upload)?;
        for warning in &report.warnings {
            ui.warn(&warning.to_string());
        }
        warnings = report.warnings;
    }

    let mut changes: Vec<Change> = view
        .filters
        .iter()
        .map(|arg| Change::Filter {
            field: arg.field.clone(),
            filter: arg.filter.clone(),
        })
        .collect();
    let query = query_text(view)?;
    if !query.is_empty() {
        changes.push(Change::Query(query));
    }
    if !changes.is_empty() {
        session.apply(changes)?;
    }
    Ok((session, warnings))
}

fn query_text(view: &ViewArgs) -> Result<String, Box<dyn Error>> {
    let mut lines = view.query.clone();
    if let Some(path) = &view.query_file {
        let text = fs::read_to_string(path)
            .map_err(|err| format!("failed to read {}: {err}", path.display()))?;
        lines.extend(text.lines().map(str::to_string));
    }
    Ok(lines.join("\n"))
}

fn emit<T, F>(format: OutputFormat, value: &T, printer: F) -> Result<(), Box<dyn Error>>
where
    T: Serialize,
    F: FnOnce(),
{
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(value)?),
        OutputFormat::Text => printer(),
    }
    Ok(())
}

#[derive(Serialize)]
struct SummaryReport<'a> {
    status: String,
    summary: StatusSummary,
    node_rows: usize,
    genes: usize,
    edges: usize,
    filtered_rows: usize,
    queried_genes: usize,
    query: Option<QueryHits>,
    selected_nodes: usize,
    selected_edges: usize,
    warnings: Vec<DataQualityWarning>,
    visible: &'a VisibleSubgraph,
}

impl<'a> SummaryReport<'a> {
    fn new(session: &'a Session, warnings: Vec<DataQualityWarning>) -> Self {
        let summary = session.status();
        Self {
            status: summary.to_string(),
            summary,
            node_rows: session.nodes().len(),
            genes: session.index().genes().len(),
            edges: session.dataset().edges().len(),
            filtered_rows: session.filtered().len(),
            queried_genes: session.queried().gene_ids().len(),
            query: session.query_hits(),
            selected_nodes: session.selected_nodes().len(),
            selected_edges: session.selected_edges().len(),
            warnings,
            visible: session.visible(),
        }
    }
}

fn print_summary(ui: &Ui, report: &SummaryReport<'_>, top: usize) {
    ui.section("Dataset", [
        ("node rows", report.node_rows),
        ("genes", report.genes),
        ("edges", report.edges),
    ]);
    ui.section("View", [
        ("filtered rows", report.filtered_rows),
        ("queried genes", report.queried_genes),
        ("selected nodes", report.selected_nodes),
        ("selected edges", report.selected_edges),
        ("visible edges", report.visible.edges.len()),
    ]);
    let mut rows = vec![["gene ID", "symbol", "PPI total", "PPI filtered", "connectivity"]
        .iter()
        .map(|s| s.to_string())
        .collect::<Vec<_>>()];
    rows.extend(report.visible.nodes.iter().take(top).map(|n| {
        vec![
            n.node.gene_id.to_string(),
            n.node.gene_symbol.clone(),
            n.node.ppi_sum_total.to_string(),
            n.node.ppi_sum_filtered.to_string(),
            n.connectivity.to_string(),
        ]
    }));
    ui.table("Visible nodes", &rows);
    ui.success(&report.status);
}

fn print_export(ui: &Ui, summary: &ExportSummary, session: &Session) {
    ui.section("Export", [
        ("visible nodes", summary.visible_nodes.display()),
        ("visible edges", summary.visible_edges.display()),
        ("selected nodes", summary.selected_nodes.display()),
        ("selected edges", summary.selected_edges.display()),
    ]);
    ui.success(&session.status().to_string());
}

#[derive(Serialize)]
struct EnrichmentReport {
    request: EnrichmentRequest,
    #[serde(skip_serializing_if = "Option::is_none")]
    results: Option<EnrichmentView>,
}

fn run_enrichment(
    config: &DatasetConfig,
    cmd: EnrichmentCmd,
    format: OutputFormat,
    ui: &Ui,
) -> Result<(), Box<dyn Error>> {
    let (session, _) = open_session(config, &cmd.view, ui)?;
    let mut store = config.enrichment_store();
    let genes: Vec<SelectedNode> = session
        .visible()
        .nodes
        .iter()
        .map(|n| n.node.clone())
        .collect();
    let background = cmd.background.then(|| session.selected_nodes().as_slice());
    let request = store.begin(&genes, background, &cmd.annotation)?;

    let results = match &cmd.results {
        Some(path) => {
            let terms = io::read_enrichment(path)?;
            store.complete(request.id, terms);
            Some(store.view(&config.enrichment.display))
        }
        None => None,
    };
    let report = EnrichmentReport { request, results };
    emit(format, &report, || {
        ui.section("Request", [
            ("id", report.request.id.to_string()),
            ("annotation", report.request.annotation_set.clone()),
            ("data set", report.request.dataset_id.clone()),
            ("organism", report.request.organism.to_string()),
            ("genes", report.request.genes.len().to_string()),
            (
                "reference genes",
                report
                    .request
                    .background
                    .as_ref()
                    .map_or_else(|| "service default".to_string(), |b| b.len().to_string()),
            ),
        ]);
        if let Some(view) = &report.results {
            let mut rows = vec![vec![
                "term".to_string(),
                "genes".to_string(),
                "fold".to_string(),
                "FDR".to_string(),
            ]];
            rows.extend(view.terms.iter().rev().map(|t| {
                vec![
                    t.label.clone(),
                    t.number_in_list.to_string(),
                    format!("{:.2}", t.fold_enrichment),
                    format!("{:.2e}", t.fdr),
                ]
            }));
            ui.table(&view.title, &rows);
        }
    })
}

#[derive(Serialize)]
struct OmicsReport {
    genes: Vec<GeneId>,
    profile: Vec<ProfilePoint>,
    #[serde(skip_serializing_if = "Option::is_none")]
    observations: Option<BTreeMap<String, u32>>,
}

fn run_omics(
    config: &DatasetConfig,
    cmd: OmicsCmd,
    format: OutputFormat,
    ui: &Ui,
) -> Result<(), Box<dyn Error>> {
    let path = cmd
        .data
        .clone()
        .or_else(|| config.data.omics.clone())
        .ok_or("no omics table; pass --data or set data.omics in the config")?;
    let table = io::read_omics(&path)?;
    let (session, _) = open_session(config, &cmd.view, ui)?;

    let selection = if cmd.tissues.is_empty() && cmd.ages.is_empty() {
        table.select_all()
    } else {
        let all = table.select_all();
        OmicsSelection {
            tissues: if cmd.tissues.is_empty() {
                all.tissues
            } else {
                cmd.tissues.iter().cloned().collect()
            },
            ages: if cmd.ages.is_empty() {
                all.ages
            } else {
                cmd.ages.iter().copied().collect()
            },
        }
    };

    let genes: Vec<GeneId> = match cmd.gene {
        Some(gene) => vec![GeneId(gene)],
        None => session.visible().nodes.iter().map(|n| n.node.gene_id).collect(),
    };
    let profile = match genes.as_slice() {
        [gene] => table.gene_profile(*gene, &selection),
        _ => table.mean_profile(&genes, &selection),
    };
    let observations = match &cmd.observations {
        Some(field) => {
            let field = session.field_id(field)?;
            let counts = observation_counts(session.nodes(), field);
            Some(sum_observations(&counts, &genes))
        }
        None => None,
    };

    let report = OmicsReport {
        genes,
        profile,
        observations,
    };
    emit(format, &report, || {
        let mut rows = vec![["type", "tissue", "Q-length", "age", "value"]
            .iter()
            .map(|s| s.to_string())
            .collect::<Vec<_>>()];
        rows.extend(report.profile.iter().map(|p| {
            vec![
                p.condition.kind.clone(),
                p.condition.tissue.clone(),
                p.condition.q_length.to_string(),
                p.condition.age.to_string(),
                format!("{:.3}", p.value),
            ]
        }));
        ui.table(&format!("Profile over {} gene(s)", report.genes.len()), &rows);
        if let Some(observations) = &report.observations {
            ui.section(
                "Observations",
                observations.iter().map(|(value, count)| (value.as_str(), count)),
            );
        }
    })
}

#[derive(Serialize)]
struct GenerateReport {
    nodes: PathBuf,
    edges: PathBuf,
    node_rows: usize,
    edge_count: usize,
}

fn run_generate(
    config: &DatasetConfig,
    cmd: &GenerateCmd,
    format: OutputFormat,
    ui: &Ui,
) -> Result<(), Box<dyn Error>> {
    let shape = Shape {
        genes: cmd.genes,
        studies: cmd.studies,
        edges_per_gene: cmd.edges_per_gene,
        ..Shape::default()
    };
    let mut generator = DataGenerator::new(cmd.seed);
    let nodes = generator.nodes(Arc::new(config.schema()?), &shape);
    let edges = generator.edges(&shape);

    fs::create_dir_all(&cmd.out)?;
    let nodes_path = cmd.out.join("nodes.csv");
    let edges_path = cmd.out.join("edges.csv");
    io::write_nodes(create(&nodes_path)?, &nodes)?;
    io::write_edges(create(&edges_path)?, &edges, &config.edge_columns())?;

    let report = GenerateReport {
        nodes: nodes_path,
        edges: edges_path,
        node_rows: nodes.len(),
        edge_count: edges.len(),
    };
    emit(format, &report, || {
        ui.success(&format!(
            "Wrote {} node rows to {} and {} edges to {}",
            report.node_rows,
            report.nodes.display(),
            report.edge_count,
            report.edges.display()
        ));
    })
}

fn create(path: &Path) -> Result<File, Box<dyn Error>> {
    File::create(path).map_err(|err| format!("failed to create {}: {err}", path.display()).into())
}
