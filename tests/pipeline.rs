//! End-to-end tests: CSV on disk to persona lookups.

use std::io::{Cursor, Write};

use persona_revenue::config::{Config, LookupConfig};
use persona_revenue::report::{generate_markdown_report, TableReport};
use persona_revenue::{
    load_records, CategoricalDomain, LookupService, PersonaError, PersonaTable, ProfileQuery,
    SessionOutcome,
};
use tempfile::NamedTempFile;

fn create_test_csv() -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "PRICE,SOURCE,SEX,COUNTRY,AGE").unwrap();
    for line in [
        "39,android,female,tur,33",
        "49,android,female,tur,35",
        "29,ios,female,fra,36",
        "39,ios,female,fra,38",
        "19,android,male,usa,20",
        "29,android,male,usa,22",
        "59,ios,male,usa,59",
        "9,ios,male,bra,15",
        "49,android,female,bra,75",
    ] {
        writeln!(file, "{}", line).unwrap();
    }
    file
}

fn build(config: &Config) -> (Vec<persona_revenue::Record>, PersonaTable) {
    let file = create_test_csv();
    let records = load_records(file.path(), &config.data).unwrap();
    let table = PersonaTable::build(
        &records,
        &config.age_buckets().unwrap(),
        &config.segmenter().unwrap(),
    )
    .unwrap();
    (records, table)
}

#[test]
fn test_full_pipeline() {
    let config = Config::default();
    let (records, table) = build(&config);

    assert_eq!(records.len(), 9);
    assert_eq!(table.dropped_records(), 1);
    assert_eq!(table.len(), 5);

    let (_, tur) = table.lookup_str("TUR_ANDROID_FEMALE_31_40").unwrap();
    assert_eq!(tur.mean_price, 44.0);
    assert_eq!(tur.count, 2);

    let (_, usa) = table.lookup_str("USA_ANDROID_MALE_19_23").unwrap();
    assert_eq!(usa.mean_price, 24.0);

    // Means: BRA 9, USA-android 24, FRA 34, TUR 44, USA-ios 59.
    let labels: Vec<(String, String)> = table
        .entries()
        .map(|(k, e)| (k.to_string(), e.segment.label.clone()))
        .collect();
    assert!(labels.contains(&("BRA_IOS_MALE_0_18".to_string(), "D".to_string())));
    assert!(labels.contains(&("USA_IOS_MALE_41_69".to_string(), "A".to_string())));

    let stats = table.segment_stats();
    assert_eq!(stats.iter().map(|s| s.personas).sum::<usize>(), table.len());
}

#[test]
fn test_lookup_service_over_loaded_batch() {
    let config = Config::default();
    let (records, table) = build(&config);
    let service = LookupService::new(
        &table,
        CategoricalDomain::from_records(&records),
        config.lookup.clone(),
    );

    let resolved = service
        .resolve(&ProfileQuery {
            country: "france".to_string(),
            platform: "iOS".to_string(),
            sex: "Female".to_string(),
            age: 37,
        })
        .unwrap();
    assert_eq!(resolved.key.to_string(), "FRA_IOS_FEMALE_31_40");
    assert_eq!(resolved.entry.mean_price, 34.0);

    let missing = service.resolve(&ProfileQuery {
        country: "bra".to_string(),
        platform: "android".to_string(),
        sex: "female".to_string(),
        age: 30,
    });
    assert!(matches!(missing, Err(PersonaError::PersonaNotFound { .. })));
}

#[test]
fn test_interactive_session_end_to_end() {
    let config = Config::default();
    let (records, table) = build(&config);
    let service = LookupService::new(
        &table,
        CategoricalDomain::from_records(&records),
        LookupConfig {
            max_attempts: 2,
            country_code_len: 3,
        },
    );

    let mut input = Cursor::new("usa\nweb\nios\nmale\n5\n45\n");
    let mut output = Vec::new();
    let outcome = service.run_session(&mut input, &mut output).unwrap();

    // Age 5 is bucketable under the defaults; the session ends on the first valid age.
    match outcome {
        SessionOutcome::NotFound { key } => assert_eq!(key.to_string(), "USA_IOS_MALE_0_18"),
        other => panic!("unexpected outcome: {:?}", other),
    }
}

#[test]
fn test_custom_boundaries_change_keys() {
    let mut config = Config::default();
    config.buckets.boundaries = vec![18, 40, 80];
    let (_, table) = build(&config);

    // Age 15 no longer has a bucket; age 75 now does.
    assert_eq!(table.dropped_records(), 1);
    assert!(table.lookup_str("BRA_ANDROID_FEMALE_40_79").is_ok());
    assert!(table.lookup_str("TUR_ANDROID_FEMALE_18_39").is_ok());
}

#[test]
fn test_report_from_loaded_table() {
    let config = Config::default();
    let (records, table) = build(&config);

    let report = TableReport::from_table(&table, "test.csv", records.len(), true);
    let markdown = generate_markdown_report(&report);

    assert!(markdown.contains("`FRA_IOS_FEMALE_31_40`"));
    assert!(markdown.contains("**Records:** 9"));
}
