//! Configuration management.
//!
//! Two documents drive a run: the XML search-query document
//! ([`SearchConfig`]: syntax rules and term categories) and the TOML
//! search-parameter document ([`SearchParams`]: databases, filters,
//! search-type bindings, screening).
//!
//! # Parameter File Format
//!
//! ```toml
//! [search]
//! databases = ["PubMed", "ACM", "IEEE"]
//! start_year = 2015
//! end_year = 2024
//! max_results = 500
//!
//! [search.search_types]
//! movement = "Title/Abstract"
//! exclusion = "Title"
//!
//! [screening]
//! mode = "pilot"
//! nr_randomizations = 25
//! seed = 42
//!
//! [logging]
//! level = "info"
//! ```
//!
//! Every value can be overridden from the environment with the `LITSEARCH_`
//! prefix and `__` between sections, e.g. `LITSEARCH_SEARCH__MAX_RESULTS=100`.

mod search_config;

pub use search_config::SearchConfig;

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::error::ConfigError;
use crate::models::{DatabaseId, QuerySpec, TermModel};
use crate::reconcile::{Filters, ScreeningConfig, ScreeningMode};

const ENV_PREFIX: &str = "LITSEARCH";
const CONFIG_FILE_NAME: &str = "litsearch.toml";

/// Search-parameter document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    pub search: SearchSection,

    #[serde(default)]
    pub screening: ScreeningSection,

    #[serde(default)]
    pub logging: LoggingSection,
}

/// `[search]` section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchSection {
    /// Databases to query, in order
    #[serde(default = "default_databases")]
    pub databases: Vec<String>,

    #[serde(default)]
    pub start_year: Option<i32>,

    #[serde(default)]
    pub end_year: Option<i32>,

    #[serde(default)]
    pub max_results: Option<usize>,

    /// IEEE Xplore export file or directory for the file-import source
    #[serde(default)]
    pub ieee_export: Option<PathBuf>,

    /// Category name -> search type name
    #[serde(default)]
    pub search_types: BTreeMap<String, String>,
}

impl Default for SearchSection {
    fn default() -> Self {
        Self {
            databases: default_databases(),
            start_year: None,
            end_year: None,
            max_results: None,
            ieee_export: None,
            search_types: BTreeMap::new(),
        }
    }
}

fn default_databases() -> Vec<String> {
    vec!["PubMed".to_string(), "ACM".to_string(), "IEEE".to_string()]
}

/// `[screening]` section
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScreeningSection {
    #[serde(default)]
    pub mode: ScreeningMode,

    #[serde(default)]
    pub nr_randomizations: usize,

    /// Fixed seed for a reproducible sample
    #[serde(default)]
    pub seed: Option<u64>,
}

/// `[logging]` section
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingSection {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl SearchParams {
    /// Load parameters from an optional file plus `LITSEARCH_*` environment overrides
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path).required(true));
        }

        let settings = builder
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| ConfigError::Document(e.to_string()))?;

        let params: SearchParams = settings
            .try_deserialize()
            .map_err(|e| ConfigError::Document(e.to_string()))?;
        params.filters().validate()?;

        Ok(params)
    }

    /// Write the parameters as a TOML document
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let content =
            toml::to_string_pretty(self).map_err(|e| ConfigError::Document(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Starter document written by `litsearch init`
    pub fn starter() -> Self {
        let mut params = Self::default();
        params.search.start_year = Some(2015);
        params.search.max_results = Some(500);
        params.screening.nr_randomizations = 25;
        params
    }

    /// Configured databases, parsed
    pub fn databases(&self) -> Vec<DatabaseId> {
        self.search.databases.iter().map(|d| DatabaseId::parse(d)).collect()
    }

    pub fn filters(&self) -> Filters {
        Filters {
            start_year: self.search.start_year,
            end_year: self.search.end_year,
            max_results: self.search.max_results,
        }
    }

    pub fn screening(&self) -> ScreeningConfig {
        ScreeningConfig {
            mode: self.screening.mode,
            nr_randomizations: self.screening.nr_randomizations,
        }
    }

    /// Random generator for the screening sample: seeded if a seed is configured
    pub fn screening_rng(&self) -> StdRng {
        match self.screening.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        }
    }

    /// Bind the term model to one database, validating the search-type bindings
    pub fn query_spec(
        &self,
        database: DatabaseId,
        terms: &TermModel,
    ) -> Result<QuerySpec, ConfigError> {
        let spec = QuerySpec::from_model(database, terms)
            .search_types(
                self.search
                    .search_types
                    .iter()
                    .map(|(category, search_type)| (category, search_type.as_str())),
            )
            .years(self.search.start_year, self.search.end_year)
            .max_results(self.search.max_results);
        spec.validate()?;
        Ok(spec)
    }
}

/// Look for `./litsearch.toml`, then `<config dir>/litsearch/config.toml`
pub fn find_config_file() -> Option<PathBuf> {
    let local = PathBuf::from(CONFIG_FILE_NAME);
    if local.is_file() {
        return Some(local);
    }

    dirs::config_dir()
        .map(|dir| dir.join("litsearch").join("config.toml"))
        .filter(|path| path.is_file())
}
