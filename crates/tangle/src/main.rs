use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use log::error;
use tangle::{
    analysis::{analyze_package, evaluate_lazy_imports, rank_extraction_candidates},
    callgraph::build_call_graph,
    config::Config,
    diff::{GitCli, diff_snapshots},
};

#[derive(Parser)]
#[command(name = "tangle", version, about = "Structural analysis of Python package dependencies")]
struct Cli {
    /// Increase log verbosity (-v, -vv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Path to a TOML configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Output format
    #[arg(long, global = true, value_enum, default_value_t = Format::Text)]
    format: Format,

    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Command {
    /// Module-level dependency and complexity analysis
    Analyze {
        /// Package root paths or installed package names; failures are
        /// isolated per package
        roots: Vec<PathBuf>,
    },
    /// Function-level call-graph analysis (cycle counts are upper bounds)
    Functions { root: PathBuf },
    /// Test whether lazy imports break import cycles
    Lazy { root: PathBuf },
    /// Rank module extraction candidates by cycle relief
    Advise { root: PathBuf },
    /// Diff structural metrics between two revisions of a repository
    Diff {
        /// Path to the version-controlled repository
        repo: PathBuf,
        /// Package path relative to the repository root
        package: PathBuf,
        before: String,
        after: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };

    match cli.command {
        Command::Analyze { roots } => {
            let mut failures = 0usize;
            for root in &roots {
                // One bad package must not abort the rest of the batch.
                match analyze_package(root, &config) {
                    Ok(analysis) => print_analysis(&analysis, cli.format)?,
                    Err(err) => {
                        failures += 1;
                        error!("{}: {err}", root.display());
                    }
                }
            }
            if failures == roots.len() && !roots.is_empty() {
                anyhow::bail!("all {failures} package(s) failed to analyze");
            }
        }
        Command::Functions { root } => {
            let analysis = build_call_graph(&root, &config)?;
            match cli.format {
                Format::Json => {
                    println!("{}", serde_json::to_string_pretty(&analysis.snapshot)?);
                }
                Format::Text => {
                    println!("functions: {}", analysis.functions.len());
                    print_snapshot(&analysis.snapshot);
                    println!("note: cycle count is an upper bound (ambiguous name resolution)");
                    for cycle in analysis.cycle_names() {
                        println!("  cycle: {}", cycle.join(" -> "));
                    }
                }
            }
        }
        Command::Lazy { root } => {
            let analysis = analyze_package(&root, &config)?;
            let report = evaluate_lazy_imports(&analysis);
            match cli.format {
                Format::Json => println!("{}", serde_json::to_string_pretty(&report)?),
                Format::Text => {
                    for occurrence in &report.occurrences {
                        println!(
                            "{}:{} {} -> {} [{}]",
                            occurrence.module,
                            occurrence.line,
                            occurrence.function,
                            occurrence.target,
                            if occurrence.cycle_breaking {
                                "cycle-breaking"
                            } else {
                                "not cycle-breaking"
                            }
                        );
                    }
                    println!("verdict: {}", report.verdict);
                }
            }
        }
        Command::Advise { root } => {
            let analysis = analyze_package(&root, &config)?;
            let report = rank_extraction_candidates(&analysis, &config);
            match cli.format {
                Format::Json => println!("{}", serde_json::to_string_pretty(&report)?),
                Format::Text => {
                    println!("cycles: {}", report.original_cycles);
                    for candidate in &report.candidates {
                        println!(
                            "  {} in {} cycle(s): removal -> {} cycle(s), composite {:.2}, -{:.0}%",
                            candidate.module,
                            candidate.cycles_involved,
                            candidate.post_removal_cycles,
                            candidate.post_removal_composite,
                            candidate.cycle_reduction_pct
                        );
                    }
                }
            }
        }
        Command::Diff {
            repo,
            package,
            before,
            after,
        } => {
            let vcs = GitCli::new(&repo);
            let diff = diff_snapshots(&vcs, &repo, &package, &before, &after, &config)?;
            match cli.format {
                Format::Json => println!("{}", serde_json::to_string_pretty(&diff)?),
                Format::Text => {
                    println!("before ({}):", diff.before_revision);
                    print_snapshot(&diff.before);
                    println!("after ({}):", diff.after_revision);
                    print_snapshot(&diff.after);
                    println!(
                        "delta: composite {:+.2}, cycles {:+}",
                        diff.delta.composite, diff.delta.cycle_count
                    );
                    println!("verdict: {}", diff.verdict);
                }
            }
        }
    }

    Ok(())
}

fn print_analysis(
    analysis: &tangle::analysis::PackageAnalysis,
    format: Format,
) -> Result<()> {
    match format {
        Format::Json => println!("{}", serde_json::to_string_pretty(&analysis.snapshot)?),
        Format::Text => {
            println!("package: {} ({})", analysis.package, analysis.root.display());
            print_snapshot(&analysis.snapshot);
            println!(
                "static graph: {} edge(s), {} cycle(s)",
                analysis.static_graph.edge_count(),
                analysis.static_cycles.len()
            );
            for cycle in analysis.cycle_names(&analysis.runtime_cycles) {
                println!("  cycle: {}", cycle.join(" -> "));
            }
            if !analysis.lazy_imports.is_empty() {
                println!("lazy imports: {}", analysis.lazy_imports.len());
            }
        }
    }
    Ok(())
}

fn print_snapshot(snapshot: &tangle::metrics::MetricsSnapshot) {
    println!(
        "  modules {} | edges {} | K_avg {:.2} | K_max {} | hub {:.2} | cycles {} | composite {:.2} | burden {:.2} | {} | {} lines",
        snapshot.modules,
        snapshot.edges,
        snapshot.avg_out_degree,
        snapshot.max_out_degree,
        snapshot.hub_share,
        snapshot.cycle_count,
        snapshot.composite,
        snapshot.burden,
        snapshot.architecture,
        snapshot.total_lines
    );
}
