//! `setup-tool` entry point.

use clap::Parser;
use setup_tool::tracing::{TracingConfig, init_tracing};
use setup_tool::{Cli, Settings, Workflow, WorkflowCommands, installer_config};
use setup_tool_core::TokioProcessRunner;
use std::io::{self, Write};
use std::process::ExitCode;
use tracing::{error, instrument};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = init_tracing(TracingConfig {
        format: cli.log_format,
        level: cli.log_level.into(),
        filter: None,
    }) {
        let _ = writeln!(io::stderr(), "{e:?}");
    }

    let mut commands = WorkflowCommands::new(io::stdout());
    match run(&cli, &mut commands).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "Setup failed");
            let _ = commands.error(&e.to_string());
            ExitCode::FAILURE
        }
    }
}

#[instrument(name = "setup_tool_main", skip_all)]
async fn run<W: Write>(cli: &Cli, commands: &mut WorkflowCommands<W>) -> setup_tool_core::Result<()> {
    let settings = Settings::from_cli(cli)?;
    let installer = installer_config(cli).build()?;
    let runner = TokioProcessRunner;

    Workflow::new(&settings, &installer, &runner)
        .run(commands)
        .await
}
