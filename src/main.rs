use std::path::{Path, PathBuf};
use std::process;

use anyhow::Result;
use clap::{CommandFactory, Parser};

use hotstep::{pick_seed, Config, SortKey, Statement};

#[derive(Parser)]
#[command(
    name = "hotstep",
    version,
    about = "Run a step script under the profiler and report timing statistics"
)]
struct Cli {
    /// Write the statistics dump to PATH instead of printing a report.
    #[arg(short = 'o', long = "outfile", value_name = "PATH")]
    outfile: Option<PathBuf>,

    /// Sort key for the report.
    #[arg(short = 's', long = "sort", value_name = "KEY")]
    sort: Option<SortKey>,

    /// Script to profile, followed by the arguments handed through to it.
    /// Option parsing stops at the script path.
    #[arg(value_name = "SCRIPT [ARGS]...", trailing_var_arg = true, allow_hyphen_values = true)]
    statement: Vec<String>,
}

impl Cli {
    fn statement(&self) -> Option<Statement> {
        let (script, args) = self.statement.split_first()?;
        Some(Statement::new(PathBuf::from(script), args.to_vec()))
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = Config::load_optional(Path::new("hotstep.toml"));

    match cli.statement() {
        Some(statement) => {
            let sort = cli.sort.or(config.default_sort).unwrap_or(SortKey::None);
            let seed = pick_seed(config.seed);
            hotstep::run(&statement, cli.outfile.as_deref(), sort, seed, config.report_limit)?;
        }
        None => {
            // Options but no script: usage only, normal exit.
            println!("{}", Cli::command().render_usage());
        }
    }
    Ok(())
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    if std::env::args_os().len() <= 1 {
        eprintln!("{}", Cli::command().render_usage());
        process::exit(2);
    }

    let cli = Cli::parse();
    if let Err(err) = run(cli) {
        eprintln!("error: {err:#}");
        process::exit(1);
    }
}
