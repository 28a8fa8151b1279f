use anyhow::Context;
use clap::Parser;
use pydep_graph::{Config, DependencyAnalyzer, LogLevel, pyproject};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "pydep-graph")]
#[command(about = "Import dependency graph for a Python entry file")]
struct Args {
    /// Project root directory
    dirpath: PathBuf,

    /// Entry source file, inside the project root
    filepath: PathBuf,

    /// Logging verbosity
    #[arg(short = 'l', long = "log-level", value_enum)]
    log_level: Option<LogLevel>,

    /// Fail on imports that cannot be resolved instead of recording a placeholder
    #[arg(short = 's', long)]
    strict: bool,

    /// Render the graph with Graphviz
    #[arg(short = 'g', long)]
    graph: bool,

    /// Label imports whose binding is never used
    #[arg(short = 'u', long)]
    unused: bool,

    /// Where the rendered DOT file is written
    #[arg(long)]
    graph_output: Option<PathBuf>,

    /// Also print every file with its direct dependencies
    #[arg(long)]
    print_graph: bool,
}

fn main() -> ExitCode {
    let args = Args::parse();

    if !args.dirpath.is_dir() {
        eprintln!("\n[Command Line Error] Invalid directory \"{}\".", args.dirpath.display());
        return ExitCode::from(2);
    }
    if !args.filepath.is_file() {
        eprintln!("\n[Command Line Error] Invalid file \"{}\".", args.filepath.display());
        return ExitCode::from(2);
    }

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> anyhow::Result<()> {
    let project = pyproject::load(&args.dirpath)
        .with_context(|| format!("Failed to load settings from '{}'", args.dirpath.display()))?;

    let mut config = Config::default().with_pyproject(&project);
    config.strict |= args.strict;
    config.render_graph |= args.graph;
    config.find_unused |= args.unused;
    config.print_graph = args.print_graph;
    if args.log_level.is_some() {
        config.log_level = args.log_level;
    }
    if let Some(output) = &args.graph_output {
        config.graph_output = output.clone();
    }

    init_logging(config.log_level);

    let mut analyzer = DependencyAnalyzer::new(config)?;
    analyzer
        .run(&args.dirpath, &args.filepath)
        .with_context(|| format!("Error analyzing '{}'", args.filepath.display()))?;
    Ok(())
}

fn init_logging(level: Option<LogLevel>) {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"));
    if let Some(level) = level {
        builder.filter_level(level.to_level_filter());
    }
    builder.target(env_logger::Target::Stderr).init();
}
