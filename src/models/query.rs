//! Boolean term model: categories of OR-connected terms and the query spec
//! that binds them to a database.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::ConfigError;
use crate::models::DatabaseId;

/// Category names that mark the exclusion category when no explicit flag is given
const RESERVED_EXCLUSION_NAMES: &[&str] = &["exclusion", "exclusion_category"];

/// Logical field scope of a query clause
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum SearchType {
    Title,
    TitleAbstract,
    TitleAbstractKeyword,
    FullText,
    Other(String),
}

impl SearchType {
    /// Parse a search type name case-insensitively
    pub fn parse(name: &str) -> Self {
        let compact: String = name
            .trim()
            .to_lowercase()
            .chars()
            .filter(|c| !c.is_whitespace() && *c != '_' && *c != '-')
            .collect();

        match compact.as_str() {
            "title" => SearchType::Title,
            "title/abstract" | "titleabstract" => SearchType::TitleAbstract,
            "title/abstract/keyword" | "titleabstractkeyword" => SearchType::TitleAbstractKeyword,
            "fulltext" => SearchType::FullText,
            _ => SearchType::Other(name.trim().to_string()),
        }
    }

    /// Returns the display name of the search type
    pub fn name(&self) -> &str {
        match self {
            SearchType::Title => "Title",
            SearchType::TitleAbstract => "Title/Abstract",
            SearchType::TitleAbstractKeyword => "Title/Abstract/Keyword",
            SearchType::FullText => "FullText",
            SearchType::Other(s) => s,
        }
    }

    /// Case-insensitive lookup key
    pub fn key(&self) -> String {
        self.name().to_lowercase()
    }
}

impl std::fmt::Display for SearchType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl From<String> for SearchType {
    fn from(name: String) -> Self {
        SearchType::parse(&name)
    }
}

impl From<&str> for SearchType {
    fn from(name: &str) -> Self {
        SearchType::parse(name)
    }
}

impl From<SearchType> for String {
    fn from(search_type: SearchType) -> Self {
        search_type.name().to_string()
    }
}

/// A literal search phrase.
///
/// Truncation wildcards such as a trailing `*` are kept verbatim; the target
/// database interprets them.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Term(String);

impl Term {
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Term {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Term {
    fn from(text: &str) -> Self {
        Term::new(text)
    }
}

impl From<String> for Term {
    fn from(text: String) -> Self {
        Term(text)
    }
}

/// Named group of OR-connected search terms
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub name: String,
    pub terms: Vec<Term>,
    pub is_exclusion: bool,
}

impl Category {
    /// Create a category; reserved names ("Exclusion", "exclusion_category")
    /// mark it as the exclusion category
    pub fn new<I, T>(name: impl Into<String>, terms: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<Term>,
    {
        let name = name.into();
        let is_exclusion = is_reserved_exclusion_name(&name);
        Self {
            name,
            terms: terms.into_iter().map(Into::into).collect(),
            is_exclusion,
        }
    }

    /// Create an explicitly flagged exclusion category
    pub fn exclusion<I, T>(name: impl Into<String>, terms: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<Term>,
    {
        Self {
            is_exclusion: true,
            ..Self::new(name, terms)
        }
    }

    fn term_position(&self, term: &str) -> Option<usize> {
        let term = term.to_lowercase();
        self.terms
            .iter()
            .position(|t| t.as_str().to_lowercase() == term)
    }
}

/// Whether a category name is one of the reserved exclusion names
pub fn is_reserved_exclusion_name(name: &str) -> bool {
    let name = name.trim().to_lowercase();
    RESERVED_EXCLUSION_NAMES.contains(&name.as_str())
}

/// Errors from editing the term model
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TermModelError {
    #[error("Category '{0}' already exists")]
    DuplicateCategory(String),

    #[error("Category '{0}' not found")]
    UnknownCategory(String),

    #[error("Term '{term}' already in category '{category}'")]
    DuplicateTerm { category: String, term: String },

    #[error("Term '{term}' not found in category '{category}'")]
    UnknownTerm { category: String, term: String },
}

/// Ordered set of categories; the exclusion category, if any, is kept last
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TermModel {
    categories: Vec<Category>,
}

impl TermModel {
    /// Build a model, rejecting duplicate names and multiple exclusion categories
    pub fn new(categories: Vec<Category>) -> Result<Self, ConfigError> {
        let exclusions = categories.iter().filter(|c| c.is_exclusion).count();
        if exclusions > 1 {
            return Err(ConfigError::MultipleExclusions(exclusions));
        }

        let mut seen: Vec<String> = Vec::with_capacity(categories.len());
        for category in &categories {
            let key = category.name.to_lowercase();
            if seen.contains(&key) {
                return Err(ConfigError::DuplicateCategory(category.name.clone()));
            }
            seen.push(key);
        }

        let (mut ordered, exclusion): (Vec<Category>, Vec<Category>) =
            categories.into_iter().partition(|c| !c.is_exclusion);
        ordered.extend(exclusion);

        Ok(Self {
            categories: ordered,
        })
    }

    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    pub fn category_names(&self) -> Vec<&str> {
        self.categories.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn exclusion(&self) -> Option<&Category> {
        self.categories.iter().find(|c| c.is_exclusion)
    }

    pub fn get(&self, name: &str) -> Option<&Category> {
        self.position(name).map(|i| &self.categories[i])
    }

    fn position(&self, name: &str) -> Option<usize> {
        let name = name.to_lowercase();
        self.categories
            .iter()
            .position(|c| c.name.to_lowercase() == name)
    }

    /// Add an empty category; the exclusion category stays last
    pub fn add_category(&mut self, name: &str) -> Result<(), TermModelError> {
        if self.position(name).is_some() {
            return Err(TermModelError::DuplicateCategory(name.to_string()));
        }

        let category = Category::new(name, Vec::<Term>::new());
        if category.is_exclusion && self.exclusion().is_some() {
            return Err(TermModelError::DuplicateCategory(name.to_string()));
        }

        match self.categories.iter().position(|c| c.is_exclusion) {
            Some(idx) if !category.is_exclusion => self.categories.insert(idx, category),
            _ => self.categories.push(category),
        }
        tracing::debug!("Category '{}' was added", name);
        Ok(())
    }

    pub fn remove_category(&mut self, name: &str) -> Result<Category, TermModelError> {
        let idx = self
            .position(name)
            .ok_or_else(|| TermModelError::UnknownCategory(name.to_string()))?;
        tracing::debug!("Category '{}' was removed", name);
        Ok(self.categories.remove(idx))
    }

    /// Append a term; terms are compared case-insensitively
    pub fn add_term(&mut self, category: &str, term: &str) -> Result<(), TermModelError> {
        let idx = self
            .position(category)
            .ok_or_else(|| TermModelError::UnknownCategory(category.to_string()))?;
        let target = &mut self.categories[idx];

        if target.term_position(term).is_some() {
            return Err(TermModelError::DuplicateTerm {
                category: target.name.clone(),
                term: term.to_string(),
            });
        }
        target.terms.push(Term::new(term));
        Ok(())
    }

    pub fn remove_term(&mut self, category: &str, term: &str) -> Result<Term, TermModelError> {
        let idx = self
            .position(category)
            .ok_or_else(|| TermModelError::UnknownCategory(category.to_string()))?;
        let target = &mut self.categories[idx];

        let term_idx = target
            .term_position(term)
            .ok_or_else(|| TermModelError::UnknownTerm {
                category: target.name.clone(),
                term: term.to_string(),
            })?;
        Ok(target.terms.remove(term_idx))
    }
}

/// Everything needed to compose one query string for one database
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuerySpec {
    pub database: DatabaseId,
    pub categories: Vec<Category>,
    /// Keyed by lowercase category name
    search_types: BTreeMap<String, SearchType>,
    pub start_year: Option<i32>,
    pub end_year: Option<i32>,
    pub max_results: Option<usize>,
}

impl QuerySpec {
    pub fn new(database: DatabaseId, categories: Vec<Category>) -> Self {
        Self {
            database,
            categories,
            search_types: BTreeMap::new(),
            start_year: None,
            end_year: None,
            max_results: None,
        }
    }

    /// Build a spec from a term model
    pub fn from_model(database: DatabaseId, model: &TermModel) -> Self {
        Self::new(database, model.categories().to_vec())
    }

    /// Bind a category to a search type
    pub fn search_type(mut self, category: &str, search_type: impl Into<SearchType>) -> Self {
        self.search_types
            .insert(category.to_lowercase(), search_type.into());
        self
    }

    /// Bind several categories at once
    pub fn search_types<I, K, S>(mut self, bindings: I) -> Self
    where
        I: IntoIterator<Item = (K, S)>,
        K: AsRef<str>,
        S: Into<SearchType>,
    {
        for (category, search_type) in bindings {
            self.search_types
                .insert(category.as_ref().to_lowercase(), search_type.into());
        }
        self
    }

    pub fn years(mut self, start: Option<i32>, end: Option<i32>) -> Self {
        self.start_year = start;
        self.end_year = end;
        self
    }

    pub fn max_results(mut self, max: Option<usize>) -> Self {
        self.max_results = max;
        self
    }

    /// The same spec aimed at another database
    pub fn for_database(&self, database: DatabaseId) -> Self {
        Self {
            database,
            ..self.clone()
        }
    }

    /// Search type bound to a category (case-insensitive)
    pub fn search_type_for(&self, category: &str) -> Option<&SearchType> {
        self.search_types.get(&category.to_lowercase())
    }

    /// Check that every non-exclusion category has a search type and the year
    /// range is well-formed
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(missing) = self
            .categories
            .iter()
            .find(|c| !c.is_exclusion && self.search_type_for(&c.name).is_none())
        {
            return Err(ConfigError::MissingSearchType {
                category: missing.name.clone(),
            });
        }

        let exclusions = self.categories.iter().filter(|c| c.is_exclusion).count();
        if exclusions > 1 {
            return Err(ConfigError::MultipleExclusions(exclusions));
        }

        if let (Some(start), Some(end)) = (self.start_year, self.end_year) {
            if start > end {
                return Err(ConfigError::InvalidYearRange { start, end });
            }
        }

        Ok(())
    }
}
