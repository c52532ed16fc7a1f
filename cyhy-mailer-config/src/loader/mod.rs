pub mod secrets;
pub mod error;

use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use cyhy_mailer_core::{
    ReportCategory, compose::DEFAULT_FROM, dispatch::DEFAULT_BATCH_SIZE,
};

use crate::models::{
    AdvisorsConfig, CategorySettings, Config, ConfigMetadata, DEFAULT_SMTP_PORT,
    DEFAULT_SMTP_SERVER, DEFAULT_SMTP_TIMEOUT, DatabaseConfig, DirectoryConfig,
    MailConfig, ReportsConfig, SummaryConfig,
    sources::{
        ConfigOverrides, EnvConfig, FileCategoryConfig, FileConfig, FileMailConfig,
    },
};
use crate::validation::{self, ConfigWarnings};
use secrets::{read_secret_file, resolve_database_url};
pub use error::ConfigLoadError;

const DEFAULT_CONFIG_LOCATIONS: [&str; 2] =
    ["cyhy-mailer.toml", "config/cyhy-mailer.toml"];

#[derive(Debug, Default, Clone)]
pub struct ConfigLoaderOptions {
    pub config_path: Option<PathBuf>,
    pub env_file: Option<PathBuf>,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Default)]
pub struct ConfigLoader {
    options: ConfigLoaderOptions,
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: ConfigLoaderOptions) -> Self {
        Self { options }
    }

    pub fn with_config_path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.options.config_path = Some(path.into());
        self
    }

    pub fn with_env_file<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.options.env_file = Some(path.into());
        self
    }

    pub fn with_overrides(mut self, overrides: ConfigOverrides) -> Self {
        self.options.overrides = overrides;
        self
    }

    pub fn load(&self) -> Result<ConfigLoad, ConfigLoadError> {
        let env_file_loaded = match &self.options.env_file {
            Some(path) => dotenvy::from_path(path).map(|_| true).or_else(
                |err| match err {
                    dotenvy::Error::Io(_) => Ok(false),
                    _ => Err(err),
                },
            )?,
            None => {
                dotenvy::dotenv().map(|_| true).or_else(|err| match err {
                    dotenvy::Error::Io(_) => Ok(false),
                    _ => Err(err),
                })?
            }
        };

        let env_config = EnvConfig::gather()?;

        let (file_config, config_path) = self.load_file_config(&env_config)?;

        let (config, warnings) = self.compose_config(
            file_config,
            env_config,
            config_path,
            env_file_loaded,
        )?;

        Ok(ConfigLoad { config, warnings })
    }

    fn load_file_config(
        &self,
        env_config: &EnvConfig,
    ) -> Result<(Option<FileConfig>, Option<PathBuf>), ConfigLoadError> {
        let mut source = ConfigPathSource::default();

        if let Some(explicit) = &self.options.config_path {
            source.explicit = Some(explicit.clone());
        } else if let Some(from_env) = &env_config.config_path {
            source.env = Some(from_env.clone());
        } else {
            source.default = DEFAULT_CONFIG_LOCATIONS
                .iter()
                .map(PathBuf::from)
                .find(|candidate| candidate.exists());
        }

        let Some((path, provenance)) = source.resolved_path() else {
            return Ok((None, None));
        };

        if !path.exists() {
            if provenance.is_explicit() {
                return Err(ConfigLoadError::MissingConfig { path });
            }
            return Ok((None, None));
        }

        let contents =
            fs::read_to_string(&path).map_err(|err| ConfigLoadError::Io {
                path: path.clone(),
                source: err,
            })?;
        let file_config: FileConfig =
            toml::from_str(&contents).map_err(|err| ConfigLoadError::Parse {
                path: path.clone(),
                source: err,
            })?;
        tracing::debug!(path = %path.display(), ?provenance, "loaded configuration file");

        Ok((Some(file_config), Some(path)))
    }

    fn compose_config(
        &self,
        file_config: Option<FileConfig>,
        env: EnvConfig,
        config_path: Option<PathBuf>,
        env_file_loaded: bool,
    ) -> Result<(Config, ConfigWarnings), ConfigLoadError> {
        let mut warnings = ConfigWarnings::default();

        if config_path.is_none() {
            warnings.push_with_hint(
                "No cyhy-mailer.toml detected; using environment variables and defaults",
                "Pass --config or set CYHY_MAILER_CONFIG to use a configuration file",
            );
        }

        let cli = &self.options.overrides;
        let FileConfig {
            database: file_database,
            directory: file_directory,
            mail: file_mail,
            reports: file_reports,
            advisors: file_advisors,
            summary: file_summary,
            dry_run: file_dry_run,
        } = file_config.unwrap_or_default();

        // Relative paths in the file are taken relative to the file.
        let base = config_path
            .as_deref()
            .and_then(Path::parent)
            .map(Path::to_path_buf);
        let from_file = |path: Option<PathBuf>| -> Option<PathBuf> {
            path.map(|p| match &base {
                Some(base) if p.is_relative() => base.join(p),
                _ => p,
            })
        };

        let database = DatabaseConfig {
            url: resolve_database_url(&env, &file_database)?,
        };

        let directory = DirectoryConfig {
            stakeholder_file: cli
                .stakeholder_file
                .clone()
                .or(env.stakeholder_file.clone())
                .or(from_file(file_directory.stakeholder_file)),
            batch_size: cli
                .batch_size
                .or(env.batch_size)
                .or(file_directory.batch_size)
                .unwrap_or(DEFAULT_BATCH_SIZE),
        };

        let mail = compose_mail(&env, file_mail)?;

        let categories = ReportCategory::ALL
            .into_iter()
            .map(|category| {
                let (cli_dir, env_dir, file_category) = match category {
                    ReportCategory::CyhyReport => (
                        &cli.cyhy_report_dir,
                        &env.cyhy_report_dir,
                        file_reports.cyhy_report.clone(),
                    ),
                    ReportCategory::TrustworthyMailReport => (
                        &cli.trustworthy_mail_report_dir,
                        &env.trustworthy_mail_report_dir,
                        file_reports.trustworthy_mail_report.clone(),
                    ),
                    ReportCategory::HttpsScanReport => (
                        &cli.https_scan_report_dir,
                        &env.https_scan_report_dir,
                        file_reports.https_scan_report.clone(),
                    ),
                    ReportCategory::CybexScorecard => (
                        &cli.cybex_scorecard_dir,
                        &env.cybex_scorecard_dir,
                        file_reports.cybex_scorecard.clone(),
                    ),
                    ReportCategory::Notification => (
                        &cli.notification_dir,
                        &env.notification_dir,
                        file_reports.notification.clone(),
                    ),
                };
                let FileCategoryConfig {
                    dir,
                    pattern,
                    recipients,
                } = file_category.unwrap_or_default();
                CategorySettings {
                    category,
                    directory: cli_dir
                        .clone()
                        .or(env_dir.clone())
                        .or(from_file(dir)),
                    pattern,
                    recipients,
                }
            })
            .collect();

        let reports = ReportsConfig {
            report_date: cli
                .report_date
                .clone()
                .or(env.report_date.clone())
                .or(file_reports.report_date)
                .filter(|date| !date.trim().is_empty()),
            categories,
        };

        let advisors = AdvisorsConfig {
            map_path: cli
                .advisor_map
                .clone()
                .or(env.advisor_map.clone())
                .or(from_file(file_advisors.map)),
        };

        let summary = SummaryConfig {
            to: cli
                .summary_to
                .clone()
                .or(env.summary_to.clone())
                .or(file_summary.to)
                .unwrap_or_default(),
        };

        let dry_run = cli.dry_run.or(env.dry_run).or(file_dry_run).unwrap_or(false);

        let config = Config {
            database,
            directory,
            mail,
            reports,
            advisors,
            summary,
            dry_run,
            metadata: ConfigMetadata {
                config_path,
                env_file_loaded,
            },
        };

        let guard_warnings = validation::apply_guard_rails(&config)?;
        warnings.extend(guard_warnings);

        Ok((config, warnings))
    }
}

fn compose_mail(
    env: &EnvConfig,
    file_mail: FileMailConfig,
) -> Result<MailConfig, ConfigLoadError> {
    let timeout = match env.smtp_timeout.clone().or(file_mail.timeout) {
        Some(raw) => parse_timeout(&raw)?,
        None => DEFAULT_SMTP_TIMEOUT,
    };

    let mut password = env
        .smtp_password
        .clone()
        .filter(|value| !value.trim().is_empty());
    if password.is_none() {
        for path in [env.smtp_password_file.as_ref(), file_mail.password_file.as_ref()]
            .into_iter()
            .flatten()
        {
            if let Some(secret) = read_secret_file(path)? {
                password = Some(secret);
                break;
            }
        }
    }

    Ok(MailConfig {
        server: env
            .smtp_server
            .clone()
            .or(file_mail.server)
            .unwrap_or_else(|| DEFAULT_SMTP_SERVER.to_string()),
        port: env.smtp_port.or(file_mail.port).unwrap_or(DEFAULT_SMTP_PORT),
        starttls: env.smtp_starttls.or(file_mail.starttls).unwrap_or(false),
        username: env
            .smtp_username
            .clone()
            .or(file_mail.username)
            .filter(|value| !value.trim().is_empty()),
        password,
        timeout,
        from: env
            .mail_from
            .clone()
            .or(file_mail.from)
            .unwrap_or_else(|| DEFAULT_FROM.to_string()),
        cc: env.mail_cc.clone().or(file_mail.cc).unwrap_or_default(),
        bcc: env.mail_bcc.clone().or(file_mail.bcc).unwrap_or_default(),
    })
}

fn parse_timeout(raw: &str) -> Result<Duration, ConfigLoadError> {
    humantime::parse_duration(raw.trim()).map_err(|source| {
        ConfigLoadError::InvalidTimeout {
            value: raw.to_string(),
            source,
        }
    })
}

#[derive(Debug, Default)]
struct ConfigPathSource {
    explicit: Option<PathBuf>,
    env: Option<PathBuf>,
    default: Option<PathBuf>,
}

impl ConfigPathSource {
    fn resolved_path(&self) -> Option<(PathBuf, ConfigPathProvenance)> {
        if let Some(path) = &self.explicit {
            return Some((path.clone(), ConfigPathProvenance::Explicit));
        }
        if let Some(path) = &self.env {
            return Some((path.clone(), ConfigPathProvenance::Env));
        }
        if let Some(path) = &self.default {
            return Some((path.clone(), ConfigPathProvenance::Default));
        }
        None
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ConfigPathProvenance {
    Explicit,
    Env,
    Default,
}

impl ConfigPathProvenance {
    fn is_explicit(self) -> bool {
        matches!(
            self,
            ConfigPathProvenance::Explicit | ConfigPathProvenance::Env
        )
    }
}

#[derive(Debug)]
pub struct ConfigLoad {
    pub config: Config,
    pub warnings: ConfigWarnings,
}
