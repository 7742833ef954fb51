use std::path::PathBuf;

use clap::builder::FalseyValueParser;
use clap::Parser as ClapParser;
use fmtspec::{CommandEngine, EngineBuild, Harness, InstaStore, Registry, Settings};
use miette::{miette, IntoDiagnostic};
use tracing::{error, info};

/// Differential test runner for source code formatters
///
/// Formats every fixture of the given directories under each parser their `format.spec.json`
/// declares, plus the companion parsers that must agree with them, and checks the results.
#[derive(ClapParser)]
#[command(version, about)]
struct Args {
    /// Fixture directories, each holding a `format.spec.json`
    #[arg(required = true)]
    dirs: Vec<PathBuf>,
    /// Root the reserved directories (`misc/errors`, ...) are resolved against
    #[arg(long, default_value = ".")]
    root: PathBuf,
    /// Program implementing the local build of the engine
    #[arg(long)]
    engine: PathBuf,
    /// Program implementing the standalone build of the engine
    #[arg(long)]
    standalone_engine: Option<PathBuf>,
    /// Use the standalone build
    #[arg(long, env = "TEST_STANDALONE", value_parser = FalseyValueParser::new())]
    standalone: bool,
    /// Also check idempotence, structural trees, line endings and byte order marks, and record
    /// snapshots
    #[arg(long, env = "FULL_TEST", value_parser = FalseyValueParser::new())]
    full: bool,
    /// Require every directory to declare parsers able to read its fixtures
    #[arg(long, env = "CHECK_TEST_PARSERS", value_parser = FalseyValueParser::new())]
    check_parsers: bool,
    /// Accept new and changed snapshots instead of failing on them
    #[arg(long)]
    accept: bool,
    /// Print debugging output (can be repeated for more detail)
    #[arg(short = 'd', long = "debug", action = clap::ArgAction::Count)]
    debug_level: u8,
}

fn main() -> miette::Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_timer(tracing_subscriber::fmt::time::uptime())
        .with_level(true)
        .with_target(false)
        .with_max_level(match args.debug_level {
            0 => tracing::Level::WARN,
            1 => tracing::Level::INFO,
            2 => tracing::Level::DEBUG,
            _ => tracing::Level::TRACE,
        })
        .init();

    if args.accept {
        std::env::set_var("INSTA_UPDATE", "always");
    }

    let settings = Settings {
        format_root: args.root.canonicalize().into_diagnostic()?,
        full_test: args.full,
        check_parsers: args.check_parsers,
        engine_build: if args.standalone {
            EngineBuild::Standalone
        } else {
            EngineBuild::Local
        },
    };

    let local = CommandEngine::new(&args.engine);
    let standalone = match (&args.standalone_engine, settings.engine_build) {
        (Some(program), _) => CommandEngine::new(program),
        (None, EngineBuild::Standalone) => {
            return Err(miette!("--standalone needs --standalone-engine"));
        }
        (None, EngineBuild::Local) => local.clone(),
    };
    let engine = settings.engine_build.select(&local, &standalone);
    let registry = Registry::builtin();

    let mut entries = 0;
    let mut failed = 0;
    for dir in &args.dirs {
        let dir = dir.canonicalize().into_diagnostic()?;
        let snapshots = InstaStore::new(dir.join("__snapshots__"));
        let harness = Harness::new(engine, &snapshots, &registry, settings.clone());
        let report = harness.run_dir(&dir)?;
        entries += report.len();
        if !report.is_success() {
            failed += report.failures().count();
            error!(dir = %dir.display(), "Found failing entries");
            eprintln!("{}", report.render_failures());
        }
    }

    if failed > 0 {
        Err(miette!("{failed} of {entries} entries failed"))
    } else {
        info!(entries, "✨All entries passed✨");
        Ok(())
    }
}
