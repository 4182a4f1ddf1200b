use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use composer_updates::command::{self, CheckOptions};
use composer_updates::report::ReportFormat;

#[derive(Parser)]
#[command(name = "composer-updates")]
#[command(version, about = "Check Composer dependencies for available updates")]
struct Cli {
    #[command(flatten)]
    check: CheckArgs,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Args, Clone)]
struct CheckArgs {
    /// Directory containing composer.json
    #[arg(short = 'd', long, global = true, default_value = ".")]
    working_dir: PathBuf,

    /// Show up-to-date packages and debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output format: table, list or json
    #[arg(long, global = true, default_value_t = ReportFormat::Table)]
    format: ReportFormat,

    /// Also check require-dev
    #[arg(long, global = true)]
    dev: bool,

    /// Use cached metadata only
    #[arg(long, global = true)]
    offline: bool,

    /// Leave platform packages (php, ext-*) out of the check
    #[arg(long, global = true)]
    no_platform: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Compare installed versions with the newest allowed and the newest published (default)
    CheckUpdates,
    /// Manage cached repository metadata
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
}

#[derive(Subcommand)]
enum CacheAction {
    /// Remove all cached metadata
    Clear,
}

impl From<CheckArgs> for CheckOptions {
    fn from(args: CheckArgs) -> Self {
        Self {
            working_dir: args.working_dir,
            format: args.format,
            include_dev: args.dev,
            offline: args.offline,
            no_platform: args.no_platform,
            verbose: args.verbose,
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let _guard = composer_updates::logging::init(cli.check.verbose);

    match cli.command.unwrap_or(Command::CheckUpdates) {
        Command::CheckUpdates => {
            let options = CheckOptions::from(cli.check);
            tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .build()?
                .block_on(command::check_updates(&options))?;
        }
        Command::Cache {
            action: CacheAction::Clear,
        } => {
            let removed = command::clear_cache()?;
            println!("Removed {} cached packages", removed);
        }
    }

    Ok(())
}
