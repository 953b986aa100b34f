//! Core data models: the boolean term model and canonical publication records.

mod query;
mod record;

pub use query::{
    is_reserved_exclusion_name, Category, QuerySpec, SearchType, Term, TermModel, TermModelError,
};
pub use record::{DatabaseId, Record, RecordBuilder};
