//! # cyhy-mailer
//!
//! Mails cyber hygiene reports, scorecards and notifications to the
//! stakeholders they describe, and sends operator-authored broadcasts.
//!
//! Exit status is `0` when every message went out (or was skipped), `2`
//! when the run finished with at least one failed send and `1` when the
//! run could not start or was stopped by a fatal error.

mod cli;
mod run;

use std::process::ExitCode;

use clap::Parser;
use tracing::error;

use cli::{Cli, Command, DbCommand};

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let global = cli.global.clone();
    let command = cli.into_command().unwrap_or_else(|err| err.exit());
    run::init_tracing(global.debug);

    let outcome = match &command {
        Command::Send(args) => run::send(&global, args).await.map(Some),
        Command::Adhoc(args) => run::adhoc(&global, args).await.map(Some),
        Command::Db(DbCommand::Preflight) => {
            run::db_preflight(&global).await.map(|()| None)
        }
    };

    match outcome {
        Ok(Some(report)) if report.has_failures() => ExitCode::from(2),
        Ok(_) => ExitCode::SUCCESS,
        Err(err) => {
            error!(error = %format!("{err:#}"), "cyhy-mailer failed");
            eprintln!("Error: {err:#}");
            ExitCode::FAILURE
        }
    }
}
