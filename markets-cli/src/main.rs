//! schema-manager - reconcile the SA Markets Directory backend schema.

use clap::{CommandFactory, Parser};

use markets_cli::cli::{Cli, Command};
use markets_cli::commands::{self, Context};
use markets_cli::config::Config;
use markets_cli::error::{CliError, CliResult};
use markets_cli::logging::{self, LogBuffer};
use markets_cli::output;
use markets_cli::runlog::RunLog;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let buffer = LogBuffer::new();
    logging::init(cli.debug_enabled(), buffer.clone());

    let (config, config_error) = match Config::load_or_default(&cli.config) {
        Ok(config) => (config, None),
        Err(e) => (Config::default(), Some(e)),
    };
    let ctx = Context::new(config, cli.url.clone());

    let command_line = std::env::args().collect::<Vec<_>>().join(" ");
    let run_log = RunLog::start(&ctx.config.log.file, command_line, &ctx.url, buffer);
    run_log.install_panic_hook();

    let code = {
        let _guard = run_log.guard();
        tracing::info!(url = %ctx.url, "schema-manager starting");

        let result = match config_error {
            Some(e) => Err(e),
            None => run(cli.command, &ctx).await,
        };

        match result {
            Ok(()) => 0,
            Err(e) => {
                tracing::error!("{e}");
                report(e);
                1
            }
        }
    };

    std::process::exit(code);
}

async fn run(command: Option<Command>, ctx: &Context) -> CliResult<()> {
    let Some(command) = command else {
        Cli::command().print_help()?;
        return Ok(());
    };

    match command {
        Command::Generate(args) => commands::generate::run(ctx, args).await,
        Command::Compare(args) => commands::compare::run(ctx, args).await,
        Command::Apply(args) => commands::apply::run(ctx, args).await,
        Command::Seed => commands::seed::run(ctx).await,
        Command::Setup => commands::setup::run(ctx).await,
        Command::Validate(args) => commands::validate::run(ctx, args).await,
        Command::Logout => commands::logout::run(ctx).await,
    }
}

fn report(error: CliError) {
    output::newline();
    match error {
        CliError::Schema(_) => eprintln!("{:?}", miette::Report::new(error)),
        CliError::Cancelled => output::warn("Cancelled"),
        other => {
            output::error(&other.to_string());
            if let Some(help) = miette::Diagnostic::help(&other) {
                eprintln!("  {help}");
            }
        }
    }
}
