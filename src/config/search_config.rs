//! XML search-query document: per-database syntax rules and the term categories.
//!
//! # Document Format
//!
//! ```xml
//! <SearchConfig>
//!   <Databases>
//!     <Database name="PubMed">
//!       <Syntax name="Title"><Term position="After">[Title]</Term></Syntax>
//!     </Database>
//!     <Database name="ACM">
//!       <Syntax name="Title/Abstract">
//!         <Term position="Before" text="Title:( "/>
//!         <Term position="After">)</Term>
//!       </Syntax>
//!     </Database>
//!   </Databases>
//!   <Categories>
//!     <Category name="Movement">
//!       <SearchTerms><Term>Movement</Term><Term>Kinesiology</Term></SearchTerms>
//!     </Category>
//!     <Category name="Exclusion">
//!       <SearchTerms><Term>Gait</Term></SearchTerms>
//!     </Category>
//!   </Categories>
//! </SearchConfig>
//! ```
//!
//! Wrap text whose surrounding whitespace matters goes in the `text`
//! attribute. Without a `<Databases>` section the built-in PubMed, ACM and
//! IEEE rules are used.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::ConfigError;
use crate::models::{Category, TermModel};
use crate::query::{SyntaxRegistry, SyntaxRule, Wrap, WrapPosition};

/// Parsed search-query document
#[derive(Debug, Clone)]
pub struct SearchConfig {
    pub registry: SyntaxRegistry,
    pub terms: TermModel,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename = "SearchConfig")]
struct SearchConfigDoc {
    #[serde(rename = "Databases", default, skip_serializing_if = "Option::is_none")]
    databases: Option<DatabasesDoc>,
    #[serde(rename = "Categories", default)]
    categories: CategoriesDoc,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct DatabasesDoc {
    #[serde(rename = "Database", default)]
    databases: Vec<DatabaseDoc>,
}

#[derive(Debug, Serialize, Deserialize)]
struct DatabaseDoc {
    #[serde(rename = "@name")]
    name: String,
    #[serde(rename = "Syntax", default)]
    syntaxes: Vec<SyntaxDoc>,
}

#[derive(Debug, Serialize, Deserialize)]
struct SyntaxDoc {
    #[serde(rename = "@name")]
    name: String,
    #[serde(rename = "Term", default)]
    wraps: Vec<WrapDoc>,
}

#[derive(Debug, Serialize, Deserialize)]
struct WrapDoc {
    #[serde(rename = "@position")]
    position: WrapPosition,
    #[serde(rename = "@text", default, skip_serializing_if = "Option::is_none")]
    text_attr: Option<String>,
    #[serde(rename = "$text", default)]
    text: String,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct CategoriesDoc {
    #[serde(rename = "Category", default)]
    categories: Vec<CategoryDoc>,
}

#[derive(Debug, Serialize, Deserialize)]
struct CategoryDoc {
    #[serde(rename = "@name")]
    name: String,
    #[serde(rename = "@exclusion", default, skip_serializing_if = "Option::is_none")]
    exclusion: Option<bool>,
    #[serde(rename = "SearchTerms", default)]
    search_terms: SearchTermsDoc,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct SearchTermsDoc {
    #[serde(rename = "Term", default)]
    terms: Vec<String>,
}

impl WrapDoc {
    fn into_wrap(self) -> Wrap {
        Wrap {
            text: self.text_attr.unwrap_or(self.text),
            position: self.position,
        }
    }

    fn from_wrap(wrap: &Wrap) -> Self {
        let significant_whitespace = wrap.text.trim() != wrap.text;
        Self {
            position: wrap.position,
            text_attr: significant_whitespace.then(|| wrap.text.clone()),
            text: if significant_whitespace {
                String::new()
            } else {
                wrap.text.clone()
            },
        }
    }
}

impl SearchConfig {
    /// Parse a search-query document
    pub fn from_xml(xml: &str) -> Result<Self, ConfigError> {
        let doc: SearchConfigDoc = quick_xml::de::from_str(xml)?;

        let registry = match doc.databases {
            Some(databases) => {
                let mut rules = Vec::new();
                for database in databases.databases {
                    for syntax in database.syntaxes {
                        rules.push(SyntaxRule::new(
                            database.name.as_str().into(),
                            syntax.name.as_str().into(),
                            syntax.wraps.into_iter().map(WrapDoc::into_wrap).collect(),
                        )?);
                    }
                }
                SyntaxRegistry::from_rules(rules)
            }
            None => {
                tracing::info!("No <Databases> section, using the built-in syntax rules");
                SyntaxRegistry::builtin()
            }
        };

        let categories = doc
            .categories
            .categories
            .into_iter()
            .map(|c| {
                let terms = c
                    .search_terms
                    .terms
                    .iter()
                    .map(|t| t.trim())
                    .filter(|t| !t.is_empty())
                    .map(str::to_string)
                    .collect::<Vec<_>>();
                match c.exclusion {
                    Some(true) => Category::exclusion(c.name.trim(), terms),
                    Some(false) => Category {
                        is_exclusion: false,
                        ..Category::new(c.name.trim(), terms)
                    },
                    None => Category::new(c.name.trim(), terms),
                }
            })
            .collect();
        let terms = TermModel::new(categories)?;

        tracing::debug!(
            "Loaded {} syntax rules and {} categories",
            registry.len(),
            terms.categories().len()
        );
        Ok(Self { registry, terms })
    }

    /// Read and parse a search-query document
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let xml = std::fs::read_to_string(path)?;
        Self::from_xml(&xml)
    }

    /// Serialize back into a search-query document
    pub fn to_xml(&self) -> Result<String, ConfigError> {
        let mut databases = Vec::new();
        for database in self.registry.databases() {
            let mut syntaxes = Vec::new();
            for search_type in self.registry.search_types(database) {
                let rule = self.registry.lookup(database, search_type)?;
                syntaxes.push(SyntaxDoc {
                    name: rule.search_type.name().to_string(),
                    wraps: rule.wraps.iter().map(WrapDoc::from_wrap).collect(),
                });
            }
            databases.push(DatabaseDoc {
                name: database.name().to_string(),
                syntaxes,
            });
        }

        let doc = SearchConfigDoc {
            databases: Some(DatabasesDoc { databases }),
            categories: CategoriesDoc {
                categories: self
                    .terms
                    .categories()
                    .iter()
                    .map(|c| CategoryDoc {
                        name: c.name.clone(),
                        exclusion: c.is_exclusion.then_some(true),
                        search_terms: SearchTermsDoc {
                            terms: c.terms.iter().map(|t| t.as_str().to_string()).collect(),
                        },
                    })
                    .collect(),
            },
        };

        quick_xml::se::to_string(&doc).map_err(|e| ConfigError::Document(format!("XML: {}", e)))
    }

    /// Write the document to disk
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        std::fs::write(path, self.to_xml()?)?;
        Ok(())
    }
}
