//! Integration tests for the normalize → filter → requirement → aggregate flow.

use attendance_report::prelude::*;
use chrono::NaiveDate;
use std::io::Write;

fn record(date: &str, region: &str, minutes: i64, visits: i64) -> Record {
    let mut r = Record::new();
    r.insert("date".into(), date.into());
    r.insert("region".into(), region.into());
    r.insert("minutes".into(), Value::Integer(minutes));
    r.insert("visits".into(), Value::Integer(visits));
    r
}

fn english_schema() -> NormalizeConfig {
    NormalizeConfig {
        region_column: "region".into(),
        sex_column: None,
        date_columns: vec!["date".into()],
        drop_columns: Vec::new(),
        ..NormalizeConfig::default()
    }
}

fn requirements() -> RequirementSet {
    RequirementSet::new("combined")
        .with("minutes", RequirementSpec::new("minutes", ">", 10.0, "minutes_ok").unwrap())
        .unwrap()
        .with("visits", RequirementSpec::new("visits", ">=", 3.0, "visits_ok").unwrap())
        .unwrap()
}

#[test]
fn test_two_participant_scenario() {
    let raw = Dataset::from_records(vec![
        record("2024-01-01", "Sonora", 20, 5),
        record("2024-01-01", "Sonora", 5, 1),
    ]);

    let normalized = normalize(&raw, &english_schema()).unwrap();
    let filtered = apply_filters(&normalized, &[]).unwrap();
    let evaluated = evaluate(&filtered, &requirements()).unwrap();

    let labels = |i: usize| -> Vec<String> {
        ["minutes_ok", "visits_ok", "combined"]
            .iter()
            .map(|c| evaluated.records[i][*c].to_string())
            .collect()
    };
    assert_eq!(labels(0), vec!["Sí", "Sí", "Sí"]);
    assert_eq!(labels(1), vec!["No", "No", "No"]);

    let table = count_values(&evaluated, "date", "combined").unwrap();
    let jan1 = Value::Date(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
    assert_eq!(
        table.rows,
        vec![
            CountRow {
                group: jan1.clone(),
                category: YES.into(),
                count: 1,
                pct: 50.0
            },
            CountRow {
                group: jan1,
                category: NO.into(),
                count: 1,
                pct: 50.0
            },
        ]
    );
}

#[test]
fn test_stages_do_not_mutate_inputs() {
    let raw = Dataset::from_records(vec![
        record("2024-01-01", "sonora", 20, 5),
        record("2024-01-08", "Oaxaca", 5, 1),
    ]);
    let raw_copy = raw.clone();
    let normalized = normalize(&raw, &english_schema()).unwrap();
    assert_eq!(raw, raw_copy);

    let normalized_copy = normalized.clone();
    let filters = vec![FilterSpec::new("minutes", ">", 10, true).unwrap()];
    let _ = apply_filters(&normalized, &filters).unwrap();
    let _ = evaluate(&normalized, &requirements()).unwrap();
    assert_eq!(normalized, normalized_copy);
}

#[test]
fn test_normalization_is_idempotent_on_noisy_data() {
    let mut config = NormalizeConfig::default();
    config.allowed_regions.push("Estado de México".into());
    config
        .region_aliases
        .push(("QUERÉTARO".into(), "Querétaro".into()));

    let mut rows = Vec::new();
    for (i, (region, sex)) in [
        ("Estado De México", "femenino"),
        ("Estado de México", "Masculino"),
        ("QUERÉTARO", "Otro"),
        ("Yucatán", "Mujer"),
        ("Coahuila", "x"),
    ]
    .iter()
    .enumerate()
    {
        let mut r = Record::new();
        r.insert("Entidad".into(), (*region).into());
        r.insert("Sexo".into(), (*sex).into());
        r.insert("Fecha".into(), format!("2024-02-0{}", i + 1).into());
        r.insert("total_encuestas".into(), Value::Integer(2));
        rows.push(r);
    }
    let raw = Dataset::from_records(rows);

    let once = normalize(&raw, &config).unwrap();
    let twice = normalize(&once, &config).unwrap();
    assert_eq!(once, twice);
    assert_eq!(once.len(), 4);
    assert_eq!(once.unique_values("Entidad").len(), 3);
    assert!(!once.has_column("total_encuestas"));
    for sex in once.unique_values("Sexo") {
        let label = sex.as_str().unwrap();
        assert!(Sex::ALL.iter().any(|s| s.label() == label), "{label}");
    }
}

#[test]
fn test_unknown_fields_fail_before_output() {
    let ds = normalize(
        &Dataset::from_records(vec![record("2024-01-01", "Sonora", 20, 5)]),
        &english_schema(),
    )
    .unwrap();

    let filters = vec![FilterSpec::new("age", ">=", 18, true).unwrap()];
    assert!(matches!(
        apply_filters(&ds, &filters),
        Err(PipelineError::UnknownField { ref field, stage: Stage::Filter }) if field == "age"
    ));

    let set = RequirementSet::new("combined")
        .with("hours", RequirementSpec::new("hours", ">", 1.0, "hours_ok").unwrap())
        .unwrap();
    assert!(matches!(
        evaluate(&ds, &set),
        Err(PipelineError::UnknownField { stage: Stage::Requirement, .. })
    ));
}

#[test]
fn test_filtered_to_nothing_gives_empty_breakdowns() {
    let raw = Dataset::from_records(vec![
        record("2024-01-01", "Sonora", 20, 5),
        record("2024-01-08", "Campeche", 5, 1),
    ]);
    let normalized = normalize(&raw, &english_schema()).unwrap();
    let filters = vec![FilterSpec::new("region", "=", "Coahuila", true).unwrap()];
    let filtered = apply_filters(&normalized, &filters).unwrap();
    assert!(filtered.is_empty());

    let evaluated = evaluate(&filtered, &requirements()).unwrap();
    let table = count_values(&evaluated, "date", "combined").unwrap();
    assert!(table.is_empty());
    assert_eq!(count_table_batch(&table).unwrap().num_rows(), 0);
}

#[test]
fn test_report_from_csv_file() {
    let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
    writeln!(file, "Fecha,Entidad,Sexo,Puesto,minutos_app,total_asist,total_encuestas").unwrap();
    writeln!(file, "2024-01-08,Sonora,femenino,Docente,45,3,1").unwrap();
    writeln!(file, "2024-01-08,Sonora,Masculino,Docente,5,1,0").unwrap();
    writeln!(file, "2024-01-08,Jalisco,Masculino,Docente,90,4,2").unwrap();
    writeln!(file, "2024-01-15,Nuevo Leon,Otro,Directivo,30,1,0").unwrap();
    writeln!(file, "2024-01-15,Oaxaca,Mujer,Docente,0,0,0").unwrap();
    file.flush().unwrap();

    let raw = load_files(&[file.path()]).unwrap();

    let config = ReportConfig::from_json(
        r#"{
            "filters": [
                {"name": "Minutos", "field": "minutos_app", "operator": ">", "value": 0, "enabled": true}
            ],
            "requirements": [
                {"name": "Minutos", "field": "minutos_app", "operator": ">=", "threshold": 30, "output_column": "Cumple_Minutos"},
                {"name": "Asistencias", "field": "total_asist", "operator": ">", "threshold": 2, "output_column": "Cumple_Asistencias"}
            ]
        }"#,
    )
    .unwrap();

    let report = run_report(&raw, &config).unwrap();
    assert_eq!(report.normalized.len(), 4);
    assert_eq!(report.filtered.len(), 3);

    let combined = report.breakdowns[0].table.sorted_by_group();
    assert_eq!(report.breakdowns[0].column, "Cumple_Ambos");
    let summary: Vec<(String, String, u64, f64)> = combined
        .rows
        .iter()
        .map(|r| (r.group.to_string(), r.category.to_string(), r.count, r.pct))
        .collect();
    assert_eq!(
        summary,
        vec![
            ("2024-01-08".to_string(), "Sí".to_string(), 1, 50.0),
            ("2024-01-08".to_string(), "No".to_string(), 1, 50.0),
            ("2024-01-15".to_string(), "No".to_string(), 1, 100.0),
        ]
    );

    for breakdown in &report.breakdowns {
        let groups: std::collections::BTreeSet<&Value> =
            breakdown.table.rows.iter().map(|r| &r.group).collect();
        for group in groups {
            let total: f64 = breakdown.table.group(group).map(|r| r.pct).sum();
            assert!((total - 100.0).abs() <= 0.1);
        }
    }
}

#[test]
fn test_general_aggregation_by_region_and_date() {
    let raw = Dataset::from_records(vec![
        record("2024-01-01", "Sonora", 20, 5),
        record("2024-01-01", "Sonora", 10, 1),
        record("2024-01-01", "Oaxaca", 7, 2),
        record("2024-01-08", "Sonora", 30, 3),
    ]);
    let ds = normalize(&raw, &english_schema()).unwrap();

    let sums = aggregate(&ds, &["date", "region"], "minutes", AggOp::Sum).unwrap();
    let values: Vec<Value> = sums.rows.iter().map(|r| r.value.clone()).collect();
    assert_eq!(
        values,
        vec![Value::Integer(30), Value::Integer(7), Value::Integer(30)]
    );

    let means = aggregate(&ds, &["region"], "visits", AggOp::Mean).unwrap();
    assert_eq!(means.rows[0].keys, vec![Value::from("Sonora")]);
    assert_eq!(means.rows[0].value, Value::Float(3.0));
}

#[test]
fn test_report_from_empty_json_file() {
    let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
    write!(file, "[]").unwrap();
    file.flush().unwrap();

    let raw = load_files(&[file.path()]).unwrap();
    let report = run_report(&raw, &ReportConfig::default()).unwrap();
    assert!(report.filtered.is_empty());
    assert!(report.breakdowns.iter().all(|b| b.table.is_empty()));
}
