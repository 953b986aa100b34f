//! Integration tests for litsearch
//!
//! These tests run the pieces together: the XML search-query document feeding
//! the composer, normalized batches feeding reconciliation, record files on
//! disk, and a registry of mock sources standing in for the databases.

use litsearch::config::{SearchConfig, SearchParams};
use litsearch::models::{DatabaseId, Record, RecordBuilder};
use litsearch::normalize::{
    normalize_batch, AbstractSection, AcmAuthors, AcmRaw, IeeeRaw, PubMedAuthor, PubMedRaw,
    RawRecord,
};
use litsearch::query::{compose, compose_for_databases};
use litsearch::reconcile::{
    compare_searches, reconcile, ComparisonNote, Filters, ScreeningConfig,
};
use litsearch::sources::{MockSource, SourceRegistry};
use litsearch::utils::{read_records, write_records};
use litsearch::ConfigError;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::Arc;
use tempfile::tempdir;

const SEARCH_CONFIG: &str = r#"
<SearchConfig>
  <Categories>
    <Category name="Movement">
      <SearchTerms><Term>Movement</Term><Term>Kinesiology</Term></SearchTerms>
    </Category>
    <Category name="Exclusion">
      <SearchTerms><Term>Gait</Term><Term>robot*</Term></SearchTerms>
    </Category>
    <Category name="Sensor">
      <SearchTerms><Term>"Motion capture"</Term><Term>EMG</Term><Term>IMU</Term></SearchTerms>
    </Category>
  </Categories>
</SearchConfig>
"#;

fn params() -> SearchParams {
    let mut params = SearchParams::default();
    params
        .search
        .search_types
        .insert("movement".to_string(), "Title/Abstract".to_string());
    params
        .search
        .search_types
        .insert("sensor".to_string(), "Title/Abstract".to_string());
    params
        .search
        .search_types
        .insert("exclusion".to_string(), "Title".to_string());
    params
}

fn record(title: &str, doi: Option<&str>, year: Option<i32>) -> Record {
    let mut builder = RecordBuilder::new(title, DatabaseId::PubMed).year(year);
    if let Some(doi) = doi {
        builder = builder.doi(doi);
    }
    builder.build()
}

#[test]
fn test_search_config_composes_every_database() {
    let config = SearchConfig::from_xml(SEARCH_CONFIG).unwrap();
    let params = params();

    let pubmed = params
        .query_spec(DatabaseId::PubMed, &config.terms)
        .unwrap();
    assert_eq!(
        compose(&pubmed, &config.registry).unwrap(),
        "(Movement[Title/Abstract] OR Kinesiology[Title/Abstract]) AND \
         (\"Motion capture\"[Title/Abstract] OR EMG[Title/Abstract] OR IMU[Title/Abstract]) \
         NOT (Gait[Title] OR robot*[Title])"
    );

    let acm = params.query_spec(DatabaseId::Acm, &config.terms).unwrap();
    let query = compose(&acm, &config.registry).unwrap();
    assert!(query.starts_with(
        "(Title:(Movement OR Kinesiology) OR Abstract:(Movement OR Kinesiology)) AND "
    ));
    assert!(query.ends_with("NOT (Title:(Gait OR robot*))"));

    let queries =
        compose_for_databases(&pubmed, &config.registry, &params.databases()).unwrap();
    let databases: Vec<DatabaseId> = queries.iter().map(|(db, _)| db.clone()).collect();
    assert_eq!(
        databases,
        vec![DatabaseId::PubMed, DatabaseId::Acm, DatabaseId::Ieee]
    );
    assert!(queries[2].1.contains("\"Document Title\":Movement"));
}

#[test]
fn test_missing_binding_is_reported_before_composing() {
    let config = SearchConfig::from_xml(SEARCH_CONFIG).unwrap();
    let mut params = params();
    params.search.search_types.remove("sensor");

    match params.query_spec(DatabaseId::PubMed, &config.terms) {
        Err(ConfigError::MissingSearchType { category }) => assert_eq!(category, "Sensor"),
        other => panic!("unexpected: {:?}", other),
    }
}

#[test]
fn test_edited_terms_survive_save_and_reload() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("search_config.xml");

    let mut config = SearchConfig::from_xml(SEARCH_CONFIG).unwrap();
    config.terms.add_category("Population").unwrap();
    config.terms.add_term("Population", "elderly").unwrap();
    config.terms.remove_term("sensor", "emg").unwrap();
    config.save(&path).unwrap();

    let reloaded = SearchConfig::load(&path).unwrap();
    assert_eq!(
        reloaded.terms.category_names(),
        vec!["Movement", "Sensor", "Population", "Exclusion"]
    );
    let sensor = reloaded.terms.get("Sensor").unwrap();
    assert_eq!(sensor.terms.len(), 2);
    assert_eq!(reloaded.terms.exclusion().unwrap().name, "Exclusion");
}

#[test]
fn test_normalize_reconcile_and_write() {
    let pubmed = vec![
        RawRecord::from(PubMedRaw {
            pmid: Some("111".to_string()),
            title: Some("Wearable sensors for movement analysis".to_string()),
            authors: vec![PubMedAuthor {
                fore_name: Some("Ada".to_string()),
                last_name: Some("Lovelace".to_string()),
                collective_name: None,
            }],
            abstract_sections: vec![AbstractSection {
                label: Some("BACKGROUND".to_string()),
                text: "Sensors.".to_string(),
            }],
            pub_year: Some("2021".to_string()),
            doi: Some("10.1000/ABC".to_string()),
            ..Default::default()
        }),
        RawRecord::from(PubMedRaw {
            pmid: Some("112".to_string()),
            title: None,
            ..Default::default()
        }),
    ];
    let acm = vec![RawRecord::from(AcmRaw {
        title: Some("Wearable Sensors for Movement Analysis".to_string()),
        authors: AcmAuthors::Line("Ada Lovelace, Charles Babbage".to_string()),
        published: Some("Mar 2021".to_string()),
        doi: Some("https://doi.org/10.1000/abc".to_string()),
        ..Default::default()
    })];
    let ieee = vec![
        RawRecord::from(IeeeRaw {
            title: Some("IMU based kinesiology".to_string()),
            authors: Some("A. Author; B. Author".to_string()),
            publication_year: Some(serde_json::json!(2012)),
            ..Default::default()
        }),
        RawRecord::from(IeeeRaw {
            title: Some("EMG in rehabilitation".to_string()),
            publication_year: Some(serde_json::json!("2019")),
            ..Default::default()
        }),
    ];

    let batches: Vec<Vec<Record>> = [pubmed, acm, ieee]
        .into_iter()
        .map(|raw| normalize_batch(raw).records)
        .collect();
    assert_eq!(batches.iter().map(Vec::len).collect::<Vec<_>>(), vec![1, 1, 2]);

    let filters = Filters {
        start_year: Some(2015),
        end_year: None,
        max_results: None,
    };
    let mut rng = StdRng::seed_from_u64(7);
    let records = reconcile(batches, &filters, &ScreeningConfig::pilot(2), &mut rng).unwrap();

    // the 2012 IEEE record is filtered out
    assert_eq!(records.len(), 3);
    assert_eq!(records[0].source, DatabaseId::PubMed);
    assert_eq!(records[1].source, DatabaseId::Acm);
    assert_eq!(records[1].doi.as_deref(), Some("10.1000/abc"));

    // PubMed and ACM share a DOI; the IEEE record has none
    assert_eq!(
        records.iter().map(|r| r.is_duplicate).collect::<Vec<_>>(),
        vec![true, true, true]
    );
    assert_eq!(records.iter().filter(|r| r.screening_sample).count(), 2);

    let dir = tempdir().unwrap();
    let path = write_records(dir.path(), &records).unwrap();
    assert!(path
        .file_name()
        .unwrap()
        .to_string_lossy()
        .ends_with("_complete_articles.json"));

    let raw: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(raw[2]["article_id"], 2);

    let back = read_records(&path).unwrap();
    assert_eq!(back, records);
}

#[test]
fn test_duplicate_flags_example() {
    let batches = vec![
        vec![
            record("A", Some("10.1/x"), Some(2020)),
            record("B", None, Some(2020)),
        ],
        vec![
            record("C", Some("10.1/X"), Some(2021)),
            record("D", Some("10.1/y"), Some(2021)),
        ],
    ];

    let mut rng = StdRng::seed_from_u64(1);
    let records = reconcile(
        batches,
        &Filters::default(),
        &ScreeningConfig::none(),
        &mut rng,
    )
    .unwrap();

    assert_eq!(
        records.iter().map(|r| r.is_duplicate).collect::<Vec<_>>(),
        vec![true, true, true, false]
    );
    assert!(records.iter().all(|r| !r.screening_sample));
}

#[test]
fn test_oversized_screening_sample_fails() {
    let batches = vec![vec![record("A", Some("10.1/a"), None)]];
    let mut rng = StdRng::seed_from_u64(1);

    let result = reconcile(
        batches,
        &Filters::default(),
        &ScreeningConfig::pilot(5),
        &mut rng,
    );
    assert!(matches!(
        result,
        Err(ConfigError::ScreeningSampleTooLarge {
            requested: 5,
            population: 1
        })
    ));
}

#[test]
fn test_compare_written_searches() {
    let dir = tempdir().unwrap();
    let old_dir = dir.path().join("old");
    let new_dir = dir.path().join("new");

    let old = vec![record("Kept study", None, None), record("Dropped study", None, None)];
    let new = vec![record("kept   STUDY", None, None), record("Fresh study", None, None)];

    let old_path = write_records(&old_dir, &old).unwrap();
    let new_path = write_records(&new_dir, &new).unwrap();

    let compared = compare_searches(
        &read_records(&new_path).unwrap(),
        &read_records(&old_path).unwrap(),
    );
    let notes: Vec<(&str, ComparisonNote)> = compared
        .iter()
        .map(|c| (c.record.title.as_str(), c.note))
        .collect();

    assert_eq!(
        notes,
        vec![
            ("Kept study", ComparisonNote::Unchanged),
            ("Dropped study", ComparisonNote::Remove),
            ("Fresh study", ComparisonNote::Add),
        ]
    );
}

#[tokio::test]
async fn test_registry_pipeline_with_mock_sources() {
    let config = SearchConfig::from_xml(SEARCH_CONFIG).unwrap();
    let mut params = params();
    params.search.databases = vec!["PubMed".to_string(), "ACM".to_string()];

    let pubmed = Arc::new(MockSource::with_records(
        DatabaseId::PubMed,
        vec![RawRecord::from(PubMedRaw {
            title: Some("Gait-free movement study".to_string()),
            doi: Some("10.2000/one".to_string()),
            pub_year: Some("2020".to_string()),
            ..Default::default()
        })],
    ));
    let acm = Arc::new(MockSource::with_records(
        DatabaseId::Acm,
        vec![
            RawRecord::from(AcmRaw {
                title: Some("Kinesiology with IMUs".to_string()),
                doi: Some("10.2000/two".to_string()),
                published: Some("2022".to_string()),
                ..Default::default()
            }),
            RawRecord::from(AcmRaw::default()),
        ],
    ));

    let mut registry = SourceRegistry::new();
    registry.register(pubmed.clone());
    registry.register(acm.clone());

    let queries = params
        .databases()
        .into_iter()
        .map(|database| {
            let spec = params.query_spec(database.clone(), &config.terms).unwrap();
            let query = compose(&spec, &config.registry).unwrap();
            (database, query)
        })
        .collect::<Vec<_>>();

    let results = registry.search_all(&queries, None).await.unwrap();
    assert_eq!(results.len(), 2);
    assert_eq!(results[0].0, DatabaseId::PubMed);
    assert_eq!(results[1].1.len(), 2);

    assert_eq!(pubmed.queries(), vec![queries[0].1.clone()]);
    assert_eq!(acm.queries(), vec![queries[1].1.clone()]);

    let batches: Vec<Vec<Record>> = results
        .into_iter()
        .map(|(_, raw)| normalize_batch(raw).records)
        .collect();
    let mut rng = params.screening_rng();
    let records = reconcile(batches, &params.filters(), &params.screening(), &mut rng).unwrap();

    assert_eq!(records.len(), 2);
    assert!(records.iter().all(|r| !r.is_duplicate));
    assert_eq!(records[1].year, Some(2022));
}

#[tokio::test]
async fn test_unregistered_database_fails_search() {
    let registry = SourceRegistry::new();
    let result = registry
        .search_all(&[(DatabaseId::Ieee, "(x)".to_string())], None)
        .await;
    assert!(result.is_err());
}
