//! Registry of per-database, per-search-type term wrapping rules.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::ConfigError;
use crate::models::{DatabaseId, SearchType};

/// Where a wrap is placed relative to the term (group)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WrapPosition {
    #[serde(alias = "Before", alias = "before", alias = "prefix")]
    Prefix,
    #[serde(alias = "After", alias = "after", alias = "suffix")]
    Suffix,
}

/// Literal text a database requires before or after a term to scope it to a field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Wrap {
    pub text: String,
    pub position: WrapPosition,
}

impl Wrap {
    pub fn prefix(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            position: WrapPosition::Prefix,
        }
    }

    pub fn suffix(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            position: WrapPosition::Suffix,
        }
    }
}

/// How a rule's flat wrap list groups terms into field clauses.
///
/// Determined once from the prefix/suffix counts when the rule is built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WrapLayout {
    /// No wraps: every term is its own clause
    Bare,
    /// Suffixes only (PubMed `[Title]`): `term<suffix>` per suffix and term
    Suffixed(Vec<String>),
    /// Prefixes only (IEEE `"Document Title":`): `<prefix>term` per prefix and term
    Prefixed(Vec<String>),
    /// One suffix per prefix (ACM): `<prefix>t1 OR .. OR tn<suffix>` per pair
    Paired(Vec<(String, String)>),
    /// Several prefixes closed once by one shared suffix:
    /// `<p1>t1 OR .. OR tn OR <p2>t1 OR .. OR tn<suffix>`
    SharedSuffix { prefixes: Vec<String>, suffix: String },
}

impl WrapLayout {
    /// Classify a wrap list, or `None` if the shape is ambiguous
    fn classify(wraps: &[Wrap]) -> Option<Self> {
        let prefixes: Vec<String> = wraps
            .iter()
            .filter(|w| w.position == WrapPosition::Prefix)
            .map(|w| w.text.clone())
            .collect();
        let mut suffixes: Vec<String> = wraps
            .iter()
            .filter(|w| w.position == WrapPosition::Suffix)
            .map(|w| w.text.clone())
            .collect();

        match (prefixes.len(), suffixes.len()) {
            (0, 0) => Some(WrapLayout::Bare),
            (0, _) => Some(WrapLayout::Suffixed(suffixes)),
            (_, 0) => Some(WrapLayout::Prefixed(prefixes)),
            (p, s) if p == s => Some(WrapLayout::Paired(
                prefixes.into_iter().zip(suffixes).collect(),
            )),
            (p, 1) if p > 1 => Some(WrapLayout::SharedSuffix {
                prefixes,
                suffix: suffixes.remove(0),
            }),
            _ => None,
        }
    }

    /// OR-operands produced for a term group, in wrap order.
    ///
    /// For [`WrapLayout::SharedSuffix`] the clauses are left open; [`WrapLayout::group`]
    /// appends the suffix after the last one.
    pub fn field_clauses(&self, terms: &[&str]) -> Vec<String> {
        match self {
            WrapLayout::Bare => terms.iter().map(|t| t.to_string()).collect(),
            WrapLayout::Suffixed(suffixes) => suffixes
                .iter()
                .flat_map(|s| terms.iter().map(move |t| format!("{}{}", t, s)))
                .collect(),
            WrapLayout::Prefixed(prefixes) => prefixes
                .iter()
                .flat_map(|p| terms.iter().map(move |t| format!("{}{}", p, t)))
                .collect(),
            WrapLayout::Paired(pairs) => {
                let group = terms.join(" OR ");
                pairs
                    .iter()
                    .map(|(p, s)| format!("{}{}{}", p, group, s))
                    .collect()
            }
            WrapLayout::SharedSuffix { prefixes, .. } => {
                let group = terms.join(" OR ");
                prefixes.iter().map(|p| format!("{}{}", p, group)).collect()
            }
        }
    }

    /// The whole OR-group for a term group, without outer parentheses
    pub fn group(&self, terms: &[&str]) -> String {
        let mut group = self.field_clauses(terms).join(" OR ");
        if let WrapLayout::SharedSuffix { suffix, .. } = self {
            group.push_str(suffix);
        }
        group
    }
}

/// Wrapping rule for one (database, search type) pair
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxRule {
    pub database: DatabaseId,
    pub search_type: SearchType,
    pub wraps: Vec<Wrap>,
    layout: WrapLayout,
}

impl SyntaxRule {
    /// Build a rule, rejecting wrap lists that match no supported layout
    pub fn new(
        database: DatabaseId,
        search_type: SearchType,
        wraps: Vec<Wrap>,
    ) -> Result<Self, ConfigError> {
        let layout = WrapLayout::classify(&wraps).ok_or_else(|| {
            let prefixes = wraps
                .iter()
                .filter(|w| w.position == WrapPosition::Prefix)
                .count();
            ConfigError::AmbiguousWraps {
                database: database.clone(),
                search_type: search_type.to_string(),
                prefixes,
                suffixes: wraps.len() - prefixes,
            }
        })?;

        Ok(Self {
            database,
            search_type,
            wraps,
            layout,
        })
    }

    pub fn layout(&self) -> &WrapLayout {
        &self.layout
    }
}

/// Immutable lookup table of syntax rules.
///
/// Built once from configuration and only read afterwards, so it can be shared
/// freely between composer invocations.
#[derive(Debug, Clone, Default)]
pub struct SyntaxRegistry {
    rules: HashMap<(String, String), SyntaxRule>,
    databases: Vec<DatabaseId>,
}

impl SyntaxRegistry {
    /// Build a registry; a later rule for the same pair replaces an earlier one
    pub fn from_rules(rules: impl IntoIterator<Item = SyntaxRule>) -> Self {
        let mut registry = Self::default();

        for rule in rules {
            let key = (rule.database.id(), rule.search_type.key());
            if !registry.databases.contains(&rule.database) {
                registry.databases.push(rule.database.clone());
            }
            if let Some(previous) = registry.rules.insert(key, rule) {
                tracing::warn!(
                    "Syntax for '{}' in database '{}' defined more than once, using the last definition",
                    previous.search_type,
                    previous.database
                );
            }
        }

        registry
    }

    /// Rules for PubMed, ACM and IEEE field searches
    pub fn builtin() -> Self {
        let rule = |db: DatabaseId, st: SearchType, wraps: Vec<Wrap>| {
            SyntaxRule::new(db, st, wraps)
                .map_err(|e| tracing::error!("Invalid built-in syntax rule: {}", e))
                .ok()
        };

        Self::from_rules([
            rule(
                DatabaseId::PubMed,
                SearchType::Title,
                vec![Wrap::suffix("[Title]")],
            ),
            rule(
                DatabaseId::PubMed,
                SearchType::TitleAbstract,
                vec![Wrap::suffix("[Title/Abstract]")],
            ),
            rule(
                DatabaseId::PubMed,
                SearchType::TitleAbstractKeyword,
                vec![Wrap::suffix("[Title/Abstract]"), Wrap::suffix("[Other Term]")],
            ),
            rule(
                DatabaseId::PubMed,
                SearchType::FullText,
                vec![Wrap::suffix("[All Fields]")],
            ),
            rule(
                DatabaseId::Acm,
                SearchType::Title,
                vec![Wrap::prefix("Title:("), Wrap::suffix(")")],
            ),
            rule(
                DatabaseId::Acm,
                SearchType::TitleAbstract,
                vec![
                    Wrap::prefix("Title:("),
                    Wrap::suffix(")"),
                    Wrap::prefix("Abstract:("),
                    Wrap::suffix(")"),
                ],
            ),
            rule(
                DatabaseId::Acm,
                SearchType::TitleAbstractKeyword,
                vec![
                    Wrap::prefix("Title:("),
                    Wrap::suffix(")"),
                    Wrap::prefix("Abstract:("),
                    Wrap::suffix(")"),
                    Wrap::prefix("Keyword:("),
                    Wrap::suffix(")"),
                ],
            ),
            rule(
                DatabaseId::Acm,
                SearchType::FullText,
                vec![Wrap::prefix("Fulltext:("), Wrap::suffix(")")],
            ),
            rule(
                DatabaseId::Ieee,
                SearchType::Title,
                vec![Wrap::prefix("\"Document Title\":")],
            ),
            rule(
                DatabaseId::Ieee,
                SearchType::TitleAbstract,
                vec![
                    Wrap::prefix("\"Document Title\":"),
                    Wrap::prefix("\"Abstract\":"),
                ],
            ),
            rule(
                DatabaseId::Ieee,
                SearchType::TitleAbstractKeyword,
                vec![
                    Wrap::prefix("\"Document Title\":"),
                    Wrap::prefix("\"Abstract\":"),
                    Wrap::prefix("\"Author Keywords\":"),
                ],
            ),
            rule(
                DatabaseId::Ieee,
                SearchType::FullText,
                vec![Wrap::prefix("\"Full Text & Metadata\":")],
            ),
        ]
        .into_iter()
        .flatten())
    }

    /// Find the rule for a (database, search type) pair
    pub fn lookup(
        &self,
        database: &DatabaseId,
        search_type: &SearchType,
    ) -> Result<&SyntaxRule, ConfigError> {
        if !self.has_database(database) {
            return Err(ConfigError::UnknownDatabase(database.to_string()));
        }

        self.rules
            .get(&(database.id(), search_type.key()))
            .ok_or_else(|| ConfigError::MissingSyntax {
                database: database.clone(),
                search_type: search_type.to_string(),
            })
    }

    pub fn has_database(&self, database: &DatabaseId) -> bool {
        let id = database.id();
        self.databases.iter().any(|d| d.id() == id)
    }

    /// Databases in the order they were first defined
    pub fn databases(&self) -> &[DatabaseId] {
        &self.databases
    }

    /// Search types defined for a database
    pub fn search_types(&self, database: &DatabaseId) -> Vec<&SearchType> {
        let id = database.id();
        let mut types: Vec<&SearchType> = self
            .rules
            .iter()
            .filter(|((db, _), _)| *db == id)
            .map(|(_, rule)| &rule.search_type)
            .collect();
        types.sort_by_key(|st| st.key());
        types
    }

    pub fn rules(&self) -> impl Iterator<Item = &SyntaxRule> {
        self.rules.values()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_layouts() {
        let rule = SyntaxRule::new(
            DatabaseId::PubMed,
            SearchType::Title,
            vec![Wrap::suffix("[Title]")],
        )
        .unwrap();
        assert_eq!(rule.layout(), &WrapLayout::Suffixed(vec!["[Title]".to_string()]));

        let rule = SyntaxRule::new(
            DatabaseId::Ieee,
            SearchType::TitleAbstract,
            vec![Wrap::prefix("\"Document Title\":"), Wrap::prefix("\"Abstract\":")],
        )
        .unwrap();
        assert!(matches!(rule.layout(), WrapLayout::Prefixed(p) if p.len() == 2));

        let rule = SyntaxRule::new(
            DatabaseId::Acm,
            SearchType::TitleAbstract,
            vec![
                Wrap::prefix("Title:("),
                Wrap::prefix("Abstract:("),
                Wrap::suffix(")"),
            ],
        )
        .unwrap();
        assert!(matches!(rule.layout(), WrapLayout::SharedSuffix { prefixes, .. } if prefixes.len() == 2));

        let rule = SyntaxRule::new(DatabaseId::Acm, SearchType::FullText, vec![]).unwrap();
        assert_eq!(rule.layout(), &WrapLayout::Bare);
    }

    #[test]
    fn test_ambiguous_wraps_rejected() {
        let result = SyntaxRule::new(
            DatabaseId::Acm,
            SearchType::Title,
            vec![Wrap::prefix("Title:("), Wrap::suffix(")"), Wrap::suffix(")")],
        );
        match result {
            Err(ConfigError::AmbiguousWraps {
                prefixes, suffixes, ..
            }) => {
                assert_eq!(prefixes, 1);
                assert_eq!(suffixes, 2);
            }
            other => panic!("unexpected: {:?}", other),
        }

        let result = SyntaxRule::new(
            DatabaseId::Acm,
            SearchType::Title,
            vec![
                Wrap::prefix("a"),
                Wrap::prefix("b"),
                Wrap::prefix("c"),
                Wrap::suffix(")"),
                Wrap::suffix(")"),
            ],
        );
        assert!(matches!(result, Err(ConfigError::AmbiguousWraps { .. })));
    }

    #[test]
    fn test_field_clauses() {
        let terms = ["Movement", "Kinesiology"];

        let layout = WrapLayout::Suffixed(vec!["[Title]".to_string()]);
        assert_eq!(
            layout.field_clauses(&terms),
            vec!["Movement[Title]", "Kinesiology[Title]"]
        );

        let layout = WrapLayout::Prefixed(vec!["A:".to_string(), "B:".to_string()]);
        assert_eq!(
            layout.field_clauses(&terms),
            vec!["A:Movement", "A:Kinesiology", "B:Movement", "B:Kinesiology"]
        );

        let layout = WrapLayout::SharedSuffix {
            prefixes: vec!["Title:(".to_string(), "Abstract:(".to_string()],
            suffix: ")".to_string(),
        };
        assert_eq!(
            layout.field_clauses(&terms),
            vec!["Title:(Movement OR Kinesiology", "Abstract:(Movement OR Kinesiology"]
        );
        assert_eq!(
            layout.group(&terms),
            "Title:(Movement OR Kinesiology OR Abstract:(Movement OR Kinesiology)"
        );
    }

    #[test]
    fn test_shared_suffix_closes_group_once() {
        let layout = WrapLayout::SharedSuffix {
            prefixes: vec!["TI=(".to_string(), "AB=(".to_string()],
            suffix: ")".to_string(),
        };
        let group = layout.group(&["a", "b"]);
        assert_eq!(group, "TI=(a OR b OR AB=(a OR b)");
        assert_eq!(group.matches(')').count(), 1);
        assert_eq!(group.matches(" OR ").count(), 3);

        let paired = WrapLayout::Paired(vec![
            ("TI=(".to_string(), ")".to_string()),
            ("AB=(".to_string(), ")".to_string()),
        ]);
        assert_eq!(paired.group(&["a", "b"]), "TI=(a OR b) OR AB=(a OR b)");
    }

    #[test]
    fn test_lookup() {
        let registry = SyntaxRegistry::builtin();
        assert_eq!(registry.databases().len(), 3);

        let rule = registry
            .lookup(&DatabaseId::parse("pubmed"), &SearchType::parse("title"))
            .unwrap();
        assert_eq!(rule.wraps, vec![Wrap::suffix("[Title]")]);

        assert!(matches!(
            registry.lookup(&DatabaseId::parse("Scopus"), &SearchType::Title),
            Err(ConfigError::UnknownDatabase(_))
        ));
        assert!(matches!(
            registry.lookup(&DatabaseId::Acm, &SearchType::Other("MeSH".to_string())),
            Err(ConfigError::MissingSyntax { .. })
        ));
    }

    #[test]
    fn test_builtin_shapes() {
        let registry = SyntaxRegistry::builtin();
        assert_eq!(registry.len(), 12);
        for database in registry.databases() {
            for search_type in registry.search_types(database) {
                let rule = registry.lookup(database, search_type).unwrap();
                let expected = match database {
                    DatabaseId::PubMed => matches!(rule.layout(), WrapLayout::Suffixed(_)),
                    DatabaseId::Acm => matches!(rule.layout(), WrapLayout::Paired(_)),
                    DatabaseId::Ieee => matches!(rule.layout(), WrapLayout::Prefixed(_)),
                    DatabaseId::Other(_) => false,
                };
                assert!(expected, "{} {} has layout {:?}", database, search_type, rule.layout());
            }
        }
    }

    #[test]
    fn test_later_rule_wins() {
        let registry = SyntaxRegistry::from_rules([
            SyntaxRule::new(DatabaseId::PubMed, SearchType::Title, vec![Wrap::suffix("[ti]")])
                .unwrap(),
            SyntaxRule::new(DatabaseId::PubMed, SearchType::Title, vec![Wrap::suffix("[Title]")])
                .unwrap(),
        ]);
        assert_eq!(registry.len(), 1);
        let rule = registry.lookup(&DatabaseId::PubMed, &SearchType::Title).unwrap();
        assert_eq!(rule.wraps, vec![Wrap::suffix("[Title]")]);
    }
}
