use std::path::PathBuf;

use clap::error::ErrorKind;
use clap::{Args, CommandFactory, Parser, Subcommand};
use cyhy_mailer_config::ConfigOverrides;

#[derive(Parser, Debug)]
#[command(name = "cyhy-mailer")]
#[command(
    about = "Mail cyber hygiene reports and notifications to stakeholders",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Arguments for the default `send` command
    #[command(flatten)]
    pub send: SendArgs,

    #[command(flatten)]
    pub global: GlobalArgs,
}

#[derive(Args, Debug, Clone, Default)]
pub struct GlobalArgs {
    /// Path to cyhy-mailer.toml
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Path to a .env file to load before reading the environment
    #[arg(long, global = true)]
    pub env_file: Option<PathBuf>,

    /// Verbose diagnostics for the mailer crates
    #[arg(long, global = true, default_value_t = false)]
    pub debug: bool,

    /// JSON export of the stakeholder collection, used instead of the database
    #[arg(long, global = true)]
    pub stakeholder_file: Option<PathBuf>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Send every enabled report category (default)
    Send(SendArgs),
    /// Send an operator-authored message to explicit addresses and/or stakeholders
    Adhoc(AdhocArgs),
    #[command(subcommand)]
    Db(DbCommand),
}

#[derive(Debug, Subcommand)]
pub enum DbCommand {
    /// Check connectivity and that the stakeholders table is readable
    Preflight,
}

/// Flags shared by `send` and `adhoc`.
#[derive(Args, Debug, Clone, Default, PartialEq, Eq)]
pub struct RunArgs {
    /// Operators who receive the end-of-run summary (comma separated)
    #[arg(long, value_delimiter = ',')]
    pub summary_to: Vec<String>,

    /// Resolve and compose everything but do not send
    #[arg(long, default_value_t = false)]
    pub dry_run: bool,

    /// Stakeholder records fetched per directory query
    #[arg(long)]
    pub batch_size: Option<u32>,

    /// Print the run report as JSON instead of summary lines
    #[arg(long, default_value_t = false)]
    pub json: bool,
}

#[derive(Args, Debug, Clone, Default, PartialEq, Eq)]
pub struct SendArgs {
    /// Directory holding Cyber Hygiene reports
    #[arg(long)]
    pub cyhy_report_dir: Option<PathBuf>,

    /// Directory holding Trustworthy Email reports
    #[arg(long)]
    pub tmail_report_dir: Option<PathBuf>,

    /// Directory holding HTTPS reports
    #[arg(long)]
    pub https_report_dir: Option<PathBuf>,

    /// Directory holding the CYBEX scorecard
    #[arg(long)]
    pub cybex_scorecard_dir: Option<PathBuf>,

    /// Directory holding Cyber Hygiene notifications
    #[arg(long)]
    pub notification_dir: Option<PathBuf>,

    /// Date shown in report subjects, e.g. "December 15, 2017"
    #[arg(long)]
    pub report_date: Option<String>,

    /// TOML file mapping region codes to advisor addresses
    #[arg(long)]
    pub advisor_map: Option<PathBuf>,

    #[command(flatten)]
    pub run: RunArgs,
}

#[derive(Args, Debug, Clone)]
pub struct AdhocArgs {
    /// Subject line of the message
    #[arg(long)]
    pub subject: String,

    /// File containing the HTML body
    #[arg(long, value_name = "FILE")]
    pub html_body: PathBuf,

    /// File containing the plain-text body
    #[arg(long, value_name = "FILE")]
    pub text_body: PathBuf,

    /// Explicit recipients (repeatable or comma separated)
    #[arg(long, value_name = "ADDR", value_delimiter = ',')]
    pub to: Vec<String>,

    /// Send to every active stakeholder
    #[arg(long, default_value_t = false)]
    pub all_stakeholders: bool,

    /// Send to every active federal stakeholder
    #[arg(long, default_value_t = false)]
    pub federal_stakeholders: bool,

    #[command(flatten)]
    pub run: RunArgs,
}

impl Cli {
    /// Resolve the command to run. Send flags given ahead of a subcommand
    /// are folded into it; ahead of a subcommand that cannot take them they
    /// are rejected rather than ignored.
    pub fn into_command(self) -> Result<Command, clap::Error> {
        let outer = self.send;
        match self.command {
            None => Ok(Command::Send(outer)),
            Some(Command::Send(mut args)) => {
                args.absorb(outer);
                Ok(Command::Send(args))
            }
            Some(Command::Adhoc(mut args)) => {
                if outer.has_report_flags() {
                    return Err(misplaced("report directory flags", "adhoc"));
                }
                args.run.absorb(outer.run);
                Ok(Command::Adhoc(args))
            }
            Some(Command::Db(db)) => {
                if outer != SendArgs::default() {
                    return Err(misplaced("send flags", "db"));
                }
                Ok(Command::Db(db))
            }
        }
    }
}

fn misplaced(what: &str, subcommand: &str) -> clap::Error {
    Cli::command().error(
        ErrorKind::ArgumentConflict,
        format!("{what} cannot be combined with the `{subcommand}` subcommand"),
    )
}

impl RunArgs {
    /// Fill flags not given here from those given before the subcommand.
    fn absorb(&mut self, outer: RunArgs) {
        if self.summary_to.is_empty() {
            self.summary_to = outer.summary_to;
        }
        self.dry_run |= outer.dry_run;
        self.batch_size = self.batch_size.or(outer.batch_size);
        self.json |= outer.json;
    }

    fn apply(&self, overrides: &mut ConfigOverrides) {
        if !self.summary_to.is_empty() {
            overrides.summary_to = Some(self.summary_to.clone());
        }
        if self.dry_run {
            overrides.dry_run = Some(true);
        }
        overrides.batch_size = self.batch_size;
    }
}

impl SendArgs {
    fn absorb(&mut self, outer: SendArgs) {
        self.cyhy_report_dir = self.cyhy_report_dir.take().or(outer.cyhy_report_dir);
        self.tmail_report_dir = self.tmail_report_dir.take().or(outer.tmail_report_dir);
        self.https_report_dir = self.https_report_dir.take().or(outer.https_report_dir);
        self.cybex_scorecard_dir =
            self.cybex_scorecard_dir.take().or(outer.cybex_scorecard_dir);
        self.notification_dir = self.notification_dir.take().or(outer.notification_dir);
        self.report_date = self.report_date.take().or(outer.report_date);
        self.advisor_map = self.advisor_map.take().or(outer.advisor_map);
        self.run.absorb(outer.run);
    }

    fn has_report_flags(&self) -> bool {
        SendArgs {
            run: RunArgs::default(),
            ..self.clone()
        } != SendArgs::default()
    }

    pub fn overrides(&self, global: &GlobalArgs) -> ConfigOverrides {
        let mut overrides = ConfigOverrides {
            stakeholder_file: global.stakeholder_file.clone(),
            cyhy_report_dir: self.cyhy_report_dir.clone(),
            trustworthy_mail_report_dir: self.tmail_report_dir.clone(),
            https_scan_report_dir: self.https_report_dir.clone(),
            cybex_scorecard_dir: self.cybex_scorecard_dir.clone(),
            notification_dir: self.notification_dir.clone(),
            report_date: self.report_date.clone(),
            advisor_map: self.advisor_map.clone(),
            ..ConfigOverrides::default()
        };
        self.run.apply(&mut overrides);
        overrides
    }
}

impl AdhocArgs {
    pub fn overrides(&self, global: &GlobalArgs) -> ConfigOverrides {
        let mut overrides = ConfigOverrides {
            stakeholder_file: global.stakeholder_file.clone(),
            ..ConfigOverrides::default()
        };
        self.run.apply(&mut overrides);
        overrides
    }
}
