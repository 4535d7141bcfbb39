use std::path::PathBuf;

use chrono::{DateTime, NaiveDate, Utc};
use clap::{Args, CommandFactory, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use miette::{miette, Context, IntoDiagnostic, Result};

use tributary_core::{
    Category, CentralityKind, Constraints, OutputFormat, Quantum, TributaryConfig,
};
use tributary_graph::builder::{self, build_graphs, resolve_author};
use tributary_graph::centrality::centrality;
use tributary_graph::project::{project, Decay};
use tributary_vcs::registry::Registry;
use tributary_vcs::source::SourceOptions;
use tributary_vcs::sync::Store;

#[derive(Parser)]
#[command(
    name = "tributary",
    version,
    about = "Contributor-centrality mining over version-control history",
    long_about = "Tributary ingests commit history from a curated set of repositories,\n\
                   builds typed graphs relating commits, files, authors, and email\n\
                   identities, and ranks contributors by social-network centrality.\n\n\
                   Examples:\n  \
                     tributary sync                     Clone or fetch every registered repo\n  \
                     tributary build                    Build graphs and print a summary\n  \
                     tributary rank --kind betweenness  Rank authors by betweenness\n  \
                     tributary rank --author alice@x.com --distance 2\n                                     \
                     Rank alice's 2-hop ego network"
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    /// Path to configuration file (default: .tributary.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Data directory holding lists/ and stor/ (default: ~/.tributary)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Output format
    #[arg(long, global = true, default_value = "text")]
    format: OutputFormat,
}

#[derive(Subcommand)]
enum Command {
    /// Clone or fetch every registered repository
    #[command(long_about = "Clone or fetch every registered repository.\n\n\
        Reads list files under <data_dir>/lists/ (one per category, one clone URL\n\
        per line) and brings <data_dir>/stor/ up to date. This is the only command\n\
        that touches the network; build and rank refuse to run on missing clones.\n\n\
        Examples:\n  tributary sync\n  tributary sync --purge")]
    Sync {
        /// Also remove on-disk clones no list file mentions anymore
        #[arg(long)]
        purge: bool,
    },
    /// Build the commit graphs and print a summary
    #[command(long_about = "Build the commit graphs and print a summary.\n\n\
        Mines every in-scope repository's history into the six canonical graphs\n\
        (email_author, author_commit, file_commit, file_author, repo_author,\n\
        repo_merge) and\n\
        prints node/edge counts plus any skipped repositories.\n\n\
        Examples:\n  tributary build\n  tributary build --category kernel --since 2020-01-01")]
    Build {
        #[command(flatten)]
        scope: ScopeArgs,
    },
    /// Rank authors by centrality over the projected graph
    #[command(long_about = "Rank authors by centrality over the projected graph.\n\n\
        Builds the graphs, projects file-author membership onto an author-author\n\
        proximity graph (persons/groups duality), and ranks authors by degree,\n\
        closeness, or betweenness centrality.\n\n\
        Examples:\n  tributary rank --kind degree --num 10\n  \
        tributary rank --kind closeness --subtree usr/src/uts\n  \
        tributary rank --author alice@x.com --distance 2 --kind betweenness")]
    Rank {
        #[command(flatten)]
        scope: ScopeArgs,

        /// Centrality measure: degree, closeness, or betweenness
        #[arg(long, default_value = "degree")]
        kind: CentralityKind,

        /// Restrict to this author's neighborhood (name or email)
        #[arg(long)]
        author: Option<String>,

        /// Ego-network hop limit around --author
        #[arg(long)]
        distance: Option<usize>,

        /// Show only the top N authors
        #[arg(long)]
        num: Option<usize>,
    },
    /// Create a default .tributary.toml configuration file
    #[command(long_about = "Create a default .tributary.toml configuration file.\n\n\
        Generates a commented template with all available options.\n\
        Fails if .tributary.toml already exists.")]
    Init,
    /// Generate shell completion scripts
    #[command(hide = true)]
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

/// Flags shared by build and rank that scope which commits count.
#[derive(Args)]
struct ScopeArgs {
    /// Restrict to one repository (owner/name)
    #[arg(long)]
    repo: Option<String>,

    /// Restrict to one registry category
    #[arg(long)]
    category: Option<Category>,

    /// Subtree prefix a file must live under to count (repeatable)
    #[arg(long)]
    subtree: Vec<String>,

    /// Earliest commit date (YYYY-MM-DD or RFC 3339)
    #[arg(long)]
    since: Option<String>,

    /// Latest commit date (default: now)
    #[arg(long)]
    until: Option<String>,

    /// Quantum of work: commit, file, or line
    #[arg(long, default_value = "file")]
    quantum: Quantum,
}

impl ScopeArgs {
    fn into_constraints(self) -> Result<Constraints> {
        Ok(Constraints {
            repo: self.repo,
            category: self.category,
            subtrees: self.subtree,
            since: self.since.as_deref().map(parse_date).transpose()?,
            until: self.until.as_deref().map(parse_date).transpose()?,
            quantum: self.quantum,
            ..Constraints::default()
        })
    }
}

fn parse_date(s: &str) -> Result<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }
    let date: NaiveDate = s
        .parse()
        .map_err(|_| miette!("unparseable date: {s} (expected YYYY-MM-DD or RFC 3339)"))?;
    let midnight = date
        .and_hms_opt(0, 0, 0)
        .ok_or_else(|| miette!("unrepresentable date: {s}"))?;
    Ok(DateTime::from_naive_utc_and_offset(midnight, Utc))
}

fn main() -> Result<()> {
    human_panic::setup_panic!();
    let cli = Cli::parse();

    let config = load_config(cli.config.as_deref())?;
    let data_dir = cli
        .data_dir
        .clone()
        .or_else(|| config.data_dir.clone())
        .or_else(|| dirs::home_dir().map(|h| h.join(".tributary")))
        .ok_or_else(|| miette!("cannot determine a data directory; pass --data-dir"))?;

    match cli.command {
        None => {
            print_welcome();
            Ok(())
        }
        Some(Command::Sync { purge }) => run_sync(&data_dir, purge, cli.format),
        Some(Command::Build { scope }) => {
            run_build(&data_dir, &config, scope.into_constraints()?, cli.format)
        }
        Some(Command::Rank {
            scope,
            kind,
            author,
            distance,
            num,
        }) => {
            let mut constraints = scope.into_constraints()?;
            constraints.kind = kind;
            constraints.author = author;
            constraints.distance = distance;
            constraints.num = num;
            run_rank(&data_dir, &config, constraints, cli.format)
        }
        Some(Command::Init) => run_init(),
        Some(Command::Completions { shell }) => {
            let mut cmd = Cli::command();
            clap_complete::generate(shell, &mut cmd, "tributary", &mut std::io::stdout());
            Ok(())
        }
    }
}

fn load_config(path: Option<&std::path::Path>) -> Result<TributaryConfig> {
    match path {
        Some(path) => TributaryConfig::from_file(path)
            .into_diagnostic()
            .wrap_err(format!("reading {}", path.display())),
        None => {
            let default = std::path::Path::new(".tributary.toml");
            if default.exists() {
                TributaryConfig::from_file(default)
                    .into_diagnostic()
                    .wrap_err("reading .tributary.toml")
            } else {
                Ok(TributaryConfig::default())
            }
        }
    }
}

fn run_sync(data_dir: &std::path::Path, purge: bool, format: OutputFormat) -> Result<()> {
    let registry = Registry::load(data_dir)
        .into_diagnostic()
        .wrap_err("loading registry lists")?;
    if registry.is_empty() {
        eprintln!(
            "no repositories registered; add list files under {}",
            data_dir.join("lists").display()
        );
        return Ok(());
    }

    let store = Store::new(data_dir.join("stor"));
    let bar = ProgressBar::new(registry.len() as u64).with_style(
        ProgressStyle::with_template("{bar:30} {pos}/{len} {msg}").into_diagnostic()?,
    );

    let mut outcomes = Vec::with_capacity(registry.len());
    for repo in registry.iter() {
        bar.set_message(repo.key());
        outcomes.push(store.sync(repo).into_diagnostic()?);
        bar.inc(1);
    }
    bar.finish_and_clear();

    let purged = if purge {
        store.purge_unrecognized(&registry).into_diagnostic()?
    } else {
        Vec::new()
    };

    match format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::to_string_pretty(&outcomes).into_diagnostic()?
            );
        }
        OutputFormat::Text => {
            for outcome in &outcomes {
                println!("{:>8?}  {}", outcome.action, outcome.repo);
            }
            for path in &purged {
                println!("  purged  {}", path.display());
            }
            println!("{} repositories up to date", outcomes.len());
        }
    }
    Ok(())
}

fn run_build(
    data_dir: &std::path::Path,
    config: &TributaryConfig,
    constraints: Constraints,
    format: OutputFormat,
) -> Result<()> {
    let output = build(data_dir, config, &constraints)?;

    match format {
        OutputFormat::Json => {
            let graphs: Vec<serde_json::Value> = output
                .store
                .names()
                .filter_map(|name| {
                    output.store.get(name).map(|g| {
                        serde_json::json!({
                            "graph": name,
                            "nodes": g.node_count(),
                            "edges": g.edge_count(),
                        })
                    })
                })
                .collect();
            let doc = serde_json::json!({ "graphs": graphs, "report": output.report });
            println!("{}", serde_json::to_string_pretty(&doc).into_diagnostic()?);
        }
        OutputFormat::Text => {
            println!("{:<16} {:>10} {:>10}", "graph", "nodes", "edges");
            for name in output.store.names() {
                if let Some(g) = output.store.get(name) {
                    println!("{:<16} {:>10} {:>10}", name, g.node_count(), g.edge_count());
                }
            }
            print_report(&output.report);
        }
    }
    Ok(())
}

fn run_rank(
    data_dir: &std::path::Path,
    config: &TributaryConfig,
    mut constraints: Constraints,
    format: OutputFormat,
) -> Result<()> {
    let output = build(data_dir, config, &constraints)?;

    // The projection keys authors by name; accept an email too.
    if let Some(query) = &constraints.author {
        match resolve_author(&output.store, query) {
            Some(author) => constraints.author = Some(author),
            None => {
                eprintln!("author not found in the mined history: {query}");
                return Ok(());
            }
        }
    }

    let decay = Decay::from_config(&config.projection).into_diagnostic()?;
    let projected = project(
        &output.store,
        builder::FILE_AUTHOR,
        &decay,
        config.projection.max_group_fanin,
    )
    .into_diagnostic()?;
    let ranked = centrality(&projected, &constraints);

    match format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::to_string_pretty(&ranked).into_diagnostic()?
            );
        }
        OutputFormat::Text => {
            if ranked.is_empty() {
                println!("no authors matched the active constraints");
            } else {
                println!("{:<6} {:>12}  author", "rank", constraints.kind.to_string());
                for (i, row) in ranked.iter().enumerate() {
                    println!("{:<6} {:>12.4}  {}", i + 1, row.score, row.author);
                }
            }
            print_report(&output.report);
        }
    }
    Ok(())
}

fn build(
    data_dir: &std::path::Path,
    config: &TributaryConfig,
    constraints: &Constraints,
) -> Result<tributary_graph::BuildOutput> {
    let registry = Registry::load(data_dir)
        .into_diagnostic()
        .wrap_err("loading registry lists")?;
    let store = Store::new(data_dir.join("stor"));
    let options = SourceOptions {
        max_files_per_commit: config.mining.max_files_per_commit,
    };
    build_graphs(&registry, constraints, &store, &options)
        .into_diagnostic()
        .wrap_err("building graphs")
}

fn print_report(report: &tributary_graph::BuildReport) {
    println!(
        "{} repositories mined, {} commits folded",
        report.repos_mined, report.commits_folded
    );
    for skip in &report.skipped {
        eprintln!("skipped {}: {}", skip.repo, skip.reason);
    }
}

fn run_init() -> Result<()> {
    let path = std::path::Path::new(".tributary.toml");
    if path.exists() {
        return Err(miette!(".tributary.toml already exists"));
    }
    std::fs::write(path, DEFAULT_CONFIG).into_diagnostic()?;
    println!("wrote {}", path.display());
    Ok(())
}

const DEFAULT_CONFIG: &str = "\
# Tributary configuration.

# Data directory holding lists/ and stor/ (default: ~/.tributary).
# data_dir = \"/home/you/.tributary\"

[mining]
# Skip commits touching more files than this.
# max_files_per_commit = 64

[projection]
# Temporal decay: \"constant\", \"exponential\", or \"inverse\".
# decay = \"constant\"
# half_life_days = 180.0
# Per-file cap on authors considered when pairing.
# max_group_fanin = 256
";

fn print_welcome() {
    let version = env!("CARGO_PKG_VERSION");
    println!("tributary v{version} — contributor centrality from version-control history\n");
    println!("Quick start:");
    println!("  tributary init          Create a .tributary.toml config file");
    println!("  tributary sync          Clone or fetch every registered repository");
    println!("  tributary rank          Rank authors by degree centrality\n");
    println!("All commands:");
    println!("  sync     Clone or fetch registered repositories");
    println!("  build    Build commit graphs and print a summary");
    println!("  rank     Rank authors by degree, closeness, or betweenness");
    println!("  init     Create default configuration\n");
    println!("Run 'tributary <command> --help' for details.");
}
