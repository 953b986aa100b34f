//! # litsearch
//!
//! Boolean query composition and record reconciliation for systematic
//! literature reviews.
//!
//! ## Architecture
//!
//! The library is organized into several modules:
//!
//! - [`models`]: Term model, query specs and the canonical [`Record`]
//! - [`query`]: Syntax registry and the boolean query composer
//! - [`normalize`]: Per-source raw records and their normalization
//! - [`reconcile`]: Year filtering, duplicate flagging, screening samples and search comparison
//! - [`sources`]: Source plugins that run the composed queries
//! - [`config`]: The XML search-query document and the TOML parameter document
//! - [`utils`]: HTTP client, retry helper and record export

pub mod config;
pub mod error;
pub mod models;
pub mod normalize;
pub mod query;
pub mod reconcile;
pub mod sources;
pub mod utils;

// Re-export commonly used types
pub use error::{ConfigError, MalformedRecordError};
pub use models::{DatabaseId, QuerySpec, Record, TermModel};
pub use query::{compose, SyntaxRegistry};
pub use reconcile::reconcile;
pub use sources::{Source, SourceRegistry};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
