//! Turns a [`QuerySpec`] into a database-specific boolean query string.

use crate::error::ConfigError;
use crate::models::{Category, DatabaseId, QuerySpec};
use crate::query::syntax::{SyntaxRegistry, SyntaxRule};

const AND: &str = " AND ";
const NOT: &str = "NOT ";

/// Compose the query string for `spec.database`.
///
/// Non-exclusion categories become parenthesized OR-groups joined with `AND`;
/// the exclusion category is appended last with `NOT`. Categories without
/// terms are left out. Every rule is resolved before any text is produced, so
/// a missing rule yields an error and never a partial query.
pub fn compose(spec: &QuerySpec, registry: &SyntaxRegistry) -> Result<String, ConfigError> {
    let mut groups: Vec<String> = Vec::new();
    let mut exclusion: Option<String> = None;

    let exclusions = spec.categories.iter().filter(|c| c.is_exclusion).count();
    if exclusions > 1 {
        return Err(ConfigError::MultipleExclusions(exclusions));
    }

    for category in spec.categories.iter().filter(|c| !c.is_exclusion) {
        let search_type =
            spec.search_type_for(&category.name)
                .ok_or_else(|| ConfigError::MissingSearchType {
                    category: category.name.clone(),
                })?;
        let rule = registry.lookup(&spec.database, search_type)?;

        match category_group(category, rule) {
            Some(group) => groups.push(group),
            None => tracing::debug!("Skipping empty category '{}'", category.name),
        }
    }

    if let Some(category) = spec.categories.iter().find(|c| c.is_exclusion) {
        match spec.search_type_for(&category.name) {
            Some(search_type) => {
                let rule = registry.lookup(&spec.database, search_type)?;
                exclusion = category_group(category, rule);
            }
            None => tracing::warn!(
                "No search type configured for exclusion category '{}', leaving it out of the {} query",
                category.name,
                spec.database
            ),
        }
    }

    let mut query = groups
        .iter()
        .map(|g| format!("({})", g))
        .collect::<Vec<_>>()
        .join(AND);

    if let Some(group) = exclusion {
        if !query.is_empty() {
            query.push(' ');
        }
        query.push_str(&format!("{}({})", NOT, group));
    }

    tracing::debug!("Composed {} query: {}", spec.database, query);
    Ok(query)
}

/// OR-joined field clauses for one category, without the outer parentheses.
///
/// Returns `None` for a category without terms.
pub fn category_group(category: &Category, rule: &SyntaxRule) -> Option<String> {
    if category.terms.is_empty() {
        return None;
    }

    let terms: Vec<&str> = category.terms.iter().map(|t| t.as_str()).collect();
    Some(rule.layout().group(&terms))
}

/// Compose the same spec for several databases, in the given order.
///
/// Fails on the first database whose rules are incomplete.
pub fn compose_for_databases(
    spec: &QuerySpec,
    registry: &SyntaxRegistry,
    databases: &[DatabaseId],
) -> Result<Vec<(DatabaseId, String)>, ConfigError> {
    databases
        .iter()
        .map(|database| {
            compose(&spec.for_database(database.clone()), registry).map(|query| (database.clone(), query))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{SearchType, TermModel};
    use crate::query::syntax::Wrap;

    fn registry() -> SyntaxRegistry {
        let acm_example = SyntaxRule::new(
            DatabaseId::Acm,
            SearchType::TitleAbstract,
            vec![
                Wrap::prefix("Title:( "),
                Wrap::suffix(")"),
                Wrap::prefix("Abstract:("),
                Wrap::suffix(") "),
            ],
        )
        .unwrap();

        let builtin = SyntaxRegistry::builtin();
        SyntaxRegistry::from_rules(
            builtin
                .rules()
                .cloned()
                .chain(std::iter::once(acm_example)),
        )
    }

    fn count(haystack: &str, needle: &str) -> usize {
        haystack.matches(needle).count()
    }

    #[test]
    fn test_empty_category_list() {
        let spec = QuerySpec::new(DatabaseId::PubMed, Vec::new());
        assert_eq!(compose(&spec, &registry()).unwrap(), "");
    }

    #[test]
    fn test_pubmed_title_single_term() {
        let spec = QuerySpec::new(DatabaseId::PubMed, vec![Category::new("Gait", ["Gait"])])
            .search_type("Gait", SearchType::Title);
        assert_eq!(compose(&spec, &registry()).unwrap(), "(Gait[Title])");
    }

    #[test]
    fn test_acm_title_abstract_example() {
        let spec = QuerySpec::new(
            DatabaseId::Acm,
            vec![Category::new("Movement", ["Movement", "Kinesiology"])],
        )
        .search_type("Movement", "Title/Abstract");

        assert_eq!(
            compose(&spec, &registry()).unwrap(),
            "(Title:( Movement OR Kinesiology) OR Abstract:(Movement OR Kinesiology) )"
        );
    }

    #[test]
    fn test_ieee_prefixed_fields() {
        let spec = QuerySpec::new(
            DatabaseId::Ieee,
            vec![Category::new("Sensor", ["IMU", "EMG"])],
        )
        .search_type("Sensor", SearchType::TitleAbstract);

        assert_eq!(
            compose(&spec, &registry()).unwrap(),
            "(\"Document Title\":IMU OR \"Document Title\":EMG OR \"Abstract\":IMU OR \"Abstract\":EMG)"
        );
    }

    #[test]
    fn test_and_not_structure() {
        let model = TermModel::new(vec![
            Category::new("Exclusion", ["Gait", "robot*"]),
            Category::new("Movement", ["Movement", "Kinesiology"]),
            Category::new("Sensor", ["\"Motion capture\"", "EMG", "IMU"]),
        ])
        .unwrap();
        let spec = QuerySpec::from_model(DatabaseId::PubMed, &model)
            .search_type("Movement", SearchType::TitleAbstract)
            .search_type("Sensor", SearchType::TitleAbstract)
            .search_type("Exclusion", SearchType::Title);

        let query = compose(&spec, &registry()).unwrap();
        assert_eq!(
            query,
            "(Movement[Title/Abstract] OR Kinesiology[Title/Abstract]) AND \
             (\"Motion capture\"[Title/Abstract] OR EMG[Title/Abstract] OR IMU[Title/Abstract]) \
             NOT (Gait[Title] OR robot*[Title])"
        );
        assert_eq!(count(&query, " AND "), 1);
        assert_eq!(count(&query, "NOT "), 1);
        assert!(query.find("NOT").unwrap() > query.rfind("AND").unwrap());
    }

    #[test]
    fn test_or_count_per_category() {
        for n in 2..6 {
            let terms: Vec<String> = (0..n).map(|i| format!("term{}", i)).collect();
            let spec = QuerySpec::new(DatabaseId::PubMed, vec![Category::new("A", terms)])
                .search_type("A", SearchType::Title);
            let query = compose(&spec, &registry()).unwrap();
            assert!(query.starts_with('(') && query.ends_with(')'));
            assert_eq!(count(&query, " OR "), n - 1);
        }
    }

    #[test]
    fn test_and_count_across_categories() {
        for n in 2..5 {
            let categories: Vec<Category> = (0..n)
                .map(|i| Category::new(format!("C{}", i), ["x", "y"]))
                .collect();
            let mut spec = QuerySpec::new(DatabaseId::Ieee, categories);
            for i in 0..n {
                spec = spec.search_type(&format!("C{}", i), SearchType::Title);
            }
            let query = compose(&spec, &registry()).unwrap();
            assert_eq!(count(&query, " AND "), n - 1);
        }
    }

    #[test]
    fn test_empty_category_omitted() {
        let spec = QuerySpec::new(
            DatabaseId::PubMed,
            vec![
                Category::new("A", ["a"]),
                Category::new("Empty", Vec::<String>::new()),
                Category::new("B", ["b"]),
            ],
        )
        .search_type("A", SearchType::Title)
        .search_type("Empty", SearchType::Title)
        .search_type("B", SearchType::Title);

        let query = compose(&spec, &registry()).unwrap();
        assert_eq!(query, "(a[Title]) AND (b[Title])");
        assert!(!query.contains("()"));
    }

    #[test]
    fn test_shared_suffix_rule() {
        let shared = SyntaxRule::new(
            DatabaseId::parse("Scopus"),
            SearchType::TitleAbstract,
            vec![Wrap::prefix("TI=("), Wrap::prefix("AB=("), Wrap::suffix(")")],
        )
        .unwrap();
        let registry = SyntaxRegistry::from_rules([shared]);
        let spec = QuerySpec::new(
            DatabaseId::parse("Scopus"),
            vec![Category::new("Movement", ["Movement", "Kinesiology"])],
        )
        .search_type("Movement", SearchType::TitleAbstract);

        let query = compose(&spec, &registry).unwrap();
        assert_eq!(
            query,
            "(TI=(Movement OR Kinesiology OR AB=(Movement OR Kinesiology))"
        );
        assert_eq!(count(&query, " OR "), 3);
        assert_eq!(count(&query, ")"), 2);
    }

    #[test]
    fn test_empty_exclusion_omitted() {
        let spec = QuerySpec::new(
            DatabaseId::PubMed,
            vec![
                Category::new("A", ["a"]),
                Category::new("Exclusion", Vec::<String>::new()),
            ],
        )
        .search_type("A", SearchType::Title)
        .search_type("Exclusion", SearchType::Title);

        let query = compose(&spec, &registry()).unwrap();
        assert_eq!(query, "(a[Title])");
        assert!(!query.contains("NOT"));
        assert!(!query.contains("()"));
    }

    #[test]
    fn test_only_exclusion() {
        let spec = QuerySpec::new(DatabaseId::PubMed, vec![Category::new("Exclusion", ["Gait"])])
            .search_type("Exclusion", SearchType::Title);
        assert_eq!(compose(&spec, &registry()).unwrap(), "NOT (Gait[Title])");
    }

    #[test]
    fn test_unbound_exclusion_left_out() {
        let spec = QuerySpec::new(
            DatabaseId::PubMed,
            vec![Category::new("A", ["a"]), Category::new("Exclusion", ["Gait"])],
        )
        .search_type("A", SearchType::Title);
        assert_eq!(compose(&spec, &registry()).unwrap(), "(a[Title])");
    }

    #[test]
    fn test_missing_syntax_fails_without_partial_query() {
        let spec = QuerySpec::new(
            DatabaseId::Acm,
            vec![Category::new("A", ["a"]), Category::new("B", ["b"])],
        )
        .search_type("A", SearchType::Title)
        .search_type("B", SearchType::Other("MeSH".to_string()));

        match compose(&spec, &registry()) {
            Err(ConfigError::MissingSyntax {
                database,
                search_type,
            }) => {
                assert_eq!(database, DatabaseId::Acm);
                assert_eq!(search_type, "MeSH");
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_missing_binding() {
        let spec = QuerySpec::new(DatabaseId::Acm, vec![Category::new("A", ["a"])]);
        assert!(matches!(
            compose(&spec, &registry()),
            Err(ConfigError::MissingSearchType { .. })
        ));
    }

    #[test]
    fn test_wildcards_verbatim_and_idempotent() {
        let spec = QuerySpec::new(
            DatabaseId::Acm,
            vec![Category::new("Method", ["Neural Network*", "Dimension* reduction"])],
        )
        .search_type("Method", SearchType::Title);

        let first = compose(&spec, &registry()).unwrap();
        let second = compose(&spec, &registry()).unwrap();
        assert_eq!(first, second);
        assert_eq!(first, "(Title:(Neural Network* OR Dimension* reduction))");
    }

    #[test]
    fn test_compose_for_databases() {
        let spec = QuerySpec::new(DatabaseId::PubMed, vec![Category::new("A", ["a"])])
            .search_type("A", SearchType::Title);
        let queries = compose_for_databases(
            &spec,
            &registry(),
            &[DatabaseId::Ieee, DatabaseId::PubMed],
        )
        .unwrap();

        assert_eq!(queries.len(), 2);
        assert_eq!(queries[0], (DatabaseId::Ieee, "(\"Document Title\":a)".to_string()));
        assert_eq!(queries[1], (DatabaseId::PubMed, "(a[Title])".to_string()));

        let result = compose_for_databases(&spec, &registry(), &[DatabaseId::parse("Scopus")]);
        assert!(matches!(result, Err(ConfigError::UnknownDatabase(_))));
    }
}
