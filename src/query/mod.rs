//! Query composition: the syntax registry and the composer that turns the
//! boolean term model into database-specific query strings.
//!
//! # Example
//!
//! ```rust
//! use litsearch::models::{Category, DatabaseId, QuerySpec, SearchType};
//! use litsearch::query::{compose, SyntaxRegistry};
//!
//! let registry = SyntaxRegistry::builtin();
//! let spec = QuerySpec::new(DatabaseId::PubMed, vec![Category::new("Gait", ["Gait"])])
//!     .search_type("Gait", SearchType::Title);
//!
//! assert_eq!(compose(&spec, &registry).unwrap(), "(Gait[Title])");
//! ```

mod composer;
mod syntax;

pub use composer::{category_group, compose, compose_for_databases};
pub use syntax::{SyntaxRegistry, SyntaxRule, Wrap, WrapLayout, WrapPosition};
