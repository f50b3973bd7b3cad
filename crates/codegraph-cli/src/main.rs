use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use codegraph_core::{EntityId, GraphStore};
use colored::Colorize;
use serde::Serialize;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "codegraph")]
#[command(about = "CodeGraph CLI - code relationship graph, blast radius, governance and expertise analysis", long_about = None)]
#[command(version)]
struct Cli {
    /// Output format (json, pretty, table)
    #[arg(short, long, global = true, default_value = "pretty")]
    output: OutputFormat,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    Json,
    Pretty,
    Table,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan a repository, building the entity graph and reporting summary counts
    Scan {
        /// Repository root to scan
        path: PathBuf,
    },

    /// Calculate the blast radius of a single entity
    Impact {
        /// Repository root to scan
        path: PathBuf,

        /// Target entity id (e.g. "src/app.py:handler" or "src/app.py" for a module)
        target: String,
    },

    /// Architectural governance: boundary validation and drift detection
    #[command(subcommand)]
    Governance(GovernanceCommands),

    /// Ownership and expertise analysis
    #[command(subcommand)]
    Expertise(ExpertiseCommands),

    /// System information
    Status,
}

#[derive(Subcommand)]
enum GovernanceCommands {
    /// Validate every import in a repository against the clean-architecture layers
    Validate {
        /// Repository root to scan
        path: PathBuf,
    },

    /// Compare a repository's current architectural metrics against a saved baseline
    Drift {
        /// Repository root to scan
        path: PathBuf,

        /// Path to a JSON baseline snapshot produced by a prior `governance drift` run
        #[arg(short, long)]
        baseline: Option<PathBuf>,

        /// Write the current snapshot to this path as the new baseline
        #[arg(long)]
        save_baseline: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
enum ExpertiseCommands {
    /// Recommend the expert(s) for a single file
    Expert {
        /// Repository root (must be a git working copy)
        path: PathBuf,

        /// File path, relative to the repository root
        file: String,
    },

    /// Build the repository-wide expertise heatmap
    Heatmap {
        /// Repository root (must be a git working copy)
        path: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    let result = match &cli.command {
        Commands::Scan { path } => execute_scan_command(path).await,
        Commands::Impact { path, target } => execute_impact_command(path, target).await,
        Commands::Governance(cmd) => execute_governance_command(cmd).await,
        Commands::Expertise(cmd) => execute_expertise_command(cmd).await,
        Commands::Status => execute_status_command(),
    }?;

    print_output(&cli.output, &result)
}

#[derive(Serialize)]
struct ScanResult {
    files_scanned: usize,
    files_failed: usize,
    functions: usize,
    classes: usize,
    relationships: usize,
    nodes: usize,
    edges: usize,
}

async fn build_pipeline(
    root: &Path,
) -> Result<(
    Vec<codegraph_core::ParsedFile>,
    Vec<codegraph_core::Relationship>,
    codegraph_graph::InMemoryGraphStore,
)> {
    let parsed_files = codegraph_parser::scan_repository(root, &codegraph_parser::ScanConfig::default())
        .context("failed to scan repository")?;

    let registry = codegraph_resolve::EntityRegistry::build(&parsed_files);
    let relationships = codegraph_resolve::RelationshipExtractor::new(&parsed_files, &registry).extract_all();

    let mut store = codegraph_graph::InMemoryGraphStore::new();
    codegraph_graph::build_graph(&mut store, &parsed_files, &relationships)
        .await
        .context("failed to build graph")?;

    Ok((parsed_files, relationships, store))
}

async fn execute_scan_command(path: &Path) -> Result<serde_json::Value> {
    let (parsed_files, relationships, store) = build_pipeline(path).await?;

    let result = ScanResult {
        files_scanned: parsed_files.len(),
        files_failed: parsed_files.iter().filter(|p| !p.parse_success).count(),
        functions: parsed_files.iter().map(|p| p.functions.len()).sum(),
        classes: parsed_files.iter().map(|p| p.classes.len()).sum(),
        relationships: relationships.len(),
        nodes: store.node_count().await?,
        edges: store.edge_count().await?,
    };

    Ok(serde_json::to_value(result)?)
}

async fn execute_impact_command(path: &Path, target: &str) -> Result<serde_json::Value> {
    let (_, _, store) = build_pipeline(path).await?;

    let analyzer = codegraph_impact::ImpactAnalyzer::default();
    let target_id = EntityId(target.to_string());
    let assessment = analyzer
        .calculate_blast_radius(&store, &target_id, None, None)
        .await
        .context("failed to calculate blast radius")?;

    Ok(serde_json::json!({
        "target": assessment.target.as_str(),
        "blast_radius": assessment.blast_radius,
        "direct_callers": assessment.direct_callers.len(),
        "indirect_callers": assessment.indirect_callers.len(),
        "affected_tests": assessment.affected_tests.len(),
        "overall_risk_score": assessment.overall_risk_score,
        "risk_level": format!("{:?}", assessment.risk_level),
        "recommendations": assessment.recommendations,
    }))
}

async fn execute_governance_command(cmd: &GovernanceCommands) -> Result<serde_json::Value> {
    match cmd {
        GovernanceCommands::Validate { path } => {
            let config = codegraph_governance::GovernanceConfig::clean_architecture();
            let result = codegraph_governance::validate_repository(path, &config).context("governance validation failed")?;

            Ok(serde_json::json!({
                "root_path": result.root_path,
                "total_files": result.total_files,
                "total_imports": result.total_imports,
                "total_violations": result.total_violations(),
                "total_warnings": result.total_warnings(),
                "violations": result
                    .all_violations()
                    .into_iter()
                    .map(|v| serde_json::json!({
                        "file": v.file_path,
                        "line": v.line_number,
                        "from": v.from_module,
                        "to": v.to_module,
                        "rule": v.rule_name,
                        "message": v.message,
                    }))
                    .collect::<Vec<_>>(),
            }))
        }

        GovernanceCommands::Drift {
            path,
            baseline,
            save_baseline,
        } => {
            let config = codegraph_governance::GovernanceConfig::clean_architecture();
            let now = chrono::Utc::now();

            let baseline_metrics = match baseline {
                Some(p) => {
                    let contents = std::fs::read_to_string(p).context("failed to read baseline file")?;
                    Some(serde_json::from_str(&contents).context("failed to parse baseline file")?)
                }
                None => None,
            };

            let report = codegraph_governance::detect_drift(path, &config, baseline_metrics, now)
                .context("drift detection failed")?;

            if let Some(save_path) = save_baseline {
                let json = serde_json::to_string_pretty(&report.current)?;
                std::fs::write(save_path, json).context("failed to write baseline file")?;
            }

            Ok(serde_json::json!({
                "drift_score": report.drift_score,
                "current": report.current,
                "recommendations": report.recommendations,
            }))
        }
    }
}

async fn execute_expertise_command(cmd: &ExpertiseCommands) -> Result<serde_json::Value> {
    match cmd {
        ExpertiseCommands::Expert { path, file } => {
            let provider = codegraph_expertise::LocalGitProvider::open(path).context("failed to open git repository")?;
            let config = codegraph_core::ExpertiseConfig::default();

            let touches = codegraph_core::GitProvider::commits_touching_file(&provider, file, usize::MAX).await?;
            let classified = codegraph_expertise::classify_commits(touches, &config);

            let mut by_dev: std::collections::HashMap<String, Vec<codegraph_expertise::ClassifiedCommit>> = std::collections::HashMap::new();
            for commit in &classified {
                by_dev.entry(commit.touch.author_email.clone()).or_default().push(commit.clone());
            }

            let mut scores: Vec<codegraph_expertise::ExpertiseScore> = by_dev
                .iter()
                .map(|(email, dev_commits)| {
                    let name = dev_commits.first().map(|c| c.touch.author_name.clone()).unwrap_or_default();
                    codegraph_expertise::score_expertise(&config, email, &name, file, dev_commits, &classified, chrono::Utc::now())
                })
                .collect();
            scores.sort_by(|a, b| b.total_score.partial_cmp(&a.total_score).unwrap());

            let recommendation = codegraph_expertise::build_recommendation(file, &scores, &config);

            Ok(serde_json::json!({
                "target": recommendation.target,
                "recommendation": recommendation.recommendation_text,
                "bus_factor": recommendation.bus_factor,
                "primary_expert": recommendation.primary_expert.map(|s| serde_json::json!({
                    "email": s.developer_email,
                    "name": s.developer_name,
                    "score": s.total_score,
                    "confidence": s.confidence,
                    "reasoning": s.reasoning,
                })),
            }))
        }

        ExpertiseCommands::Heatmap { path } => {
            let provider = codegraph_expertise::LocalGitProvider::open(path).context("failed to open git repository")?;
            let config = codegraph_core::ExpertiseConfig::default();

            let files = codegraph_core::GitProvider::all_tracked_files(&provider).await?;
            let mut by_file = std::collections::HashMap::new();

            for file in &files {
                let touches = codegraph_core::GitProvider::commits_touching_file(&provider, file, usize::MAX).await?;
                if touches.is_empty() {
                    continue;
                }
                let classified = codegraph_expertise::classify_commits(touches, &config);

                let mut by_dev: std::collections::HashMap<String, Vec<codegraph_expertise::ClassifiedCommit>> = std::collections::HashMap::new();
                for commit in &classified {
                    by_dev.entry(commit.touch.author_email.clone()).or_default().push(commit.clone());
                }

                let scores: Vec<codegraph_expertise::ExpertiseScore> = by_dev
                    .iter()
                    .map(|(email, dev_commits)| {
                        let name = dev_commits.first().map(|c| c.touch.author_name.clone()).unwrap_or_default();
                        codegraph_expertise::score_expertise(&config, email, &name, file, dev_commits, &classified, chrono::Utc::now())
                    })
                    .collect();
                by_file.insert(file.clone(), scores);
            }

            let heatmap = codegraph_expertise::build_heatmap(&by_file, &config);

            Ok(serde_json::json!({
                "total_files_analyzed": heatmap.total_files_analyzed,
                "total_developers": heatmap.total_developers,
                "average_bus_factor": heatmap.average_bus_factor,
                "risk_areas": heatmap.risk_areas,
                "knowledge_gaps": heatmap.knowledge_gaps,
            }))
        }
    }
}

#[derive(Serialize)]
struct StatusResult {
    status: String,
    message: String,
}

fn execute_status_command() -> Result<serde_json::Value> {
    let result = StatusResult {
        status: "ok".to_string(),
        message: "CodeGraph is operational".to_string(),
    };
    Ok(serde_json::to_value(result)?)
}

fn print_output(format: &OutputFormat, value: &serde_json::Value) -> Result<()> {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(value)?);
        }
        OutputFormat::Pretty => {
            print_pretty(value, 0)?;
        }
        OutputFormat::Table => {
            // Nested structures (violations, recommendations) don't flatten cleanly
            // into a table; pretty print covers them without losing information.
            print_pretty(value, 0)?;
        }
    }
    Ok(())
}

fn print_pretty(value: &serde_json::Value, depth: usize) -> Result<()> {
    let indent = "  ".repeat(depth);
    match value {
        serde_json::Value::Object(map) => {
            for (key, val) in map {
                let key_colored = key.cyan().bold();
                match val {
                    serde_json::Value::String(s) => println!("{indent}{key_colored}: {}", s.green()),
                    serde_json::Value::Number(n) => println!("{indent}{key_colored}: {}", n.to_string().yellow()),
                    serde_json::Value::Bool(b) => {
                        let val_colored = if *b { "true".green() } else { "false".red() };
                        println!("{indent}{key_colored}: {val_colored}");
                    }
                    serde_json::Value::Array(_) | serde_json::Value::Object(_) => {
                        println!("{indent}{key_colored}:");
                        print_pretty(val, depth + 1)?;
                    }
                    _ => println!("{indent}{key_colored}: {val}"),
                }
            }
        }
        serde_json::Value::Array(arr) => {
            for (i, item) in arr.iter().enumerate() {
                println!("{indent}{} {}:", "-".cyan(), (i + 1).to_string().yellow());
                print_pretty(item, depth + 1)?;
            }
        }
        _ => println!("{indent}{value}"),
    }
    Ok(())
}
