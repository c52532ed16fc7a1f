//! Configuration for cyhy-mailer.
//!
//! Values are layered in this order, later layers winning: built-in
//! defaults, a TOML file (`cyhy-mailer.toml`), environment variables
//! (optionally seeded from a `.env` file), then command-line overrides.
//! [`ConfigLoader::load`] returns the composed [`Config`] together with
//! non-fatal [`ConfigWarnings`]; hard errors come back as
//! [`ConfigLoadError`].

pub mod loader;
pub mod models;
pub mod util;
pub mod validation;

pub use loader::{ConfigLoad, ConfigLoader, ConfigLoaderOptions, error::ConfigLoadError};
pub use models::{
    AdvisorsConfig, CategorySettings, Config, ConfigMetadata, DatabaseConfig,
    DirectoryConfig, DirectorySource, MailConfig, ReportsConfig, SummaryConfig,
    sources::ConfigOverrides,
};
pub use validation::{
    ConfigGuardRailError, ConfigWarning, ConfigWarnings, require_enabled_category,
};
