// tests/pipeline.rs
//
// End-to-end: report files on disk in, consolidated dataset out.

use arrow::array::{Array, Int64Array, StringArray, TimestampMillisecondArray};
use chrono::NaiveDate;
use corrections_loader::{
    export, heatmap, load_corrections, ConsolidatedDataset, DateError, DateInput, LoaderConfig,
};
use std::{fs, path::Path};
use tempfile::TempDir;

fn init_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("debug")
        .with_test_writer()
        .try_init();
}

fn metadata_table(timestamp: &str, delay_line: Option<&str>) -> String {
    let mut rows = format!("<tr><th>Timestamp</th><td>{}</td></tr>", timestamp);
    if let Some(dl) = delay_line {
        rows.push_str(&format!("<tr><th>Delay line number</th><td>{}</td></tr>", dl));
    }
    rows.push_str("<tr><th>Operator</th><td>night shift</td></tr>");
    format!("<table>{}</table>", rows)
}

fn corrections_table(rails: usize) -> String {
    let body: String = (1..=rails)
        .map(|r| format!("<tr><th>{}</th><td>{}.25</td><td>-0.{}</td></tr>", r, r, r))
        .collect();
    format!(
        "<table><thead>\
           <tr><th></th><th colspan=\"2\">Correction</th></tr>\
           <tr><th>Rail</th><th>dx</th><th>dy</th></tr>\
         </thead><tbody>{}</tbody></table>",
        body
    )
}

fn report(humidity: &str, pairs: &[(&str, Option<&str>, usize)]) -> String {
    let tables: String = pairs
        .iter()
        .map(|(ts, dl, n)| metadata_table(ts, *dl) + &corrections_table(*n))
        .collect();
    format!(
        "<html><body><h3>Tunnel humidity {}</h3>{}</body></html>",
        humidity, tables
    )
}

fn write(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

fn strings(ds: &ConsolidatedDataset, name: &str) -> Vec<Option<String>> {
    ds.column(name)
        .unwrap()
        .as_any()
        .downcast_ref::<StringArray>()
        .unwrap()
        .iter()
        .map(|v| v.map(str::to_string))
        .collect()
}

fn timestamps(ds: &ConsolidatedDataset) -> Vec<Option<i64>> {
    ds.column("Timestamp")
        .unwrap()
        .as_any()
        .downcast_ref::<TimestampMillisecondArray>()
        .unwrap()
        .iter()
        .collect()
}

fn millis(y: i32, m: u32, d: u32, h: u32) -> i64 {
    NaiveDate::from_ymd_opt(y, m, d)
        .unwrap()
        .and_hms_opt(h, 0, 0)
        .unwrap()
        .and_utc()
        .timestamp_millis()
}

fn range(config: &LoaderConfig, start: &str, end: &str) -> corrections_loader::LoadReport {
    load_corrections(config, &DateInput::from(start), &DateInput::from(end))
}

#[test]
fn two_pairs_plus_sidecar_yield_eight_rows() {
    init_test_logging();
    let dir = TempDir::new().unwrap();
    write(
        dir.path(),
        "corrections_report_2022-07-10.html",
        &report(
            "45.3%",
            &[
                ("2022-07-10 08:00:00", Some("3"), 3),
                ("2022-07-10 09:30:00", Some("5"), 5),
            ],
        ),
    );
    write(dir.path(), "._corrections_report_2022-07-11.html", "\u{0}\u{5}garbage");

    let config = LoaderConfig::with_root(dir.path());
    let report = range(&config, "2022-07-10", "2022-07-12");

    assert!(report.date_error.is_none());
    assert_eq!(report.files.len(), 1);
    assert_eq!(report.succeeded().count(), 1);

    let ds = report.into_dataset();
    assert_eq!(ds.num_rows(), 8);
    assert_eq!(
        ds.column_names(),
        vec![
            "Timestamp",
            "Delay line number",
            "Tunnel Relative Humidity",
            "Rail number",
            "dx",
            "dy"
        ]
    );

    let mut expected = vec![Some(millis(2022, 7, 10, 8)); 3];
    expected.extend(vec![Some(millis(2022, 7, 10, 9) + 30 * 60 * 1000); 5]);
    assert_eq!(timestamps(&ds), expected);

    let lines = strings(&ds, "Delay line number");
    assert_eq!(&lines[..3], &vec![Some("3".to_string()); 3][..]);
    assert_eq!(&lines[3..], &vec![Some("5".to_string()); 5][..]);
    assert_eq!(
        strings(&ds, "Tunnel Relative Humidity"),
        vec![Some("45.3%".to_string()); 8]
    );

    let rails = ds
        .column("Rail number")
        .unwrap()
        .as_any()
        .downcast_ref::<Int64Array>()
        .unwrap()
        .values()
        .to_vec();
    assert_eq!(rails, vec![1, 2, 3, 1, 2, 3, 4, 5]);
}

#[test]
fn round_trip_replicates_metadata() {
    let dir = TempDir::new().unwrap();
    write(
        dir.path(),
        "corrections_report_2022-07-10.html",
        &report("40%", &[("2022-07-10 08:00:00", Some("3"), 2)]),
    );
    let ds = range(&LoaderConfig::with_root(dir.path()), "2022-07-10", "2022-07-10").into_dataset();

    assert_eq!(ds.num_rows(), 2);
    assert_eq!(timestamps(&ds), vec![Some(millis(2022, 7, 10, 8)); 2]);
    assert_eq!(strings(&ds, "Delay line number"), vec![Some("3".to_string()); 2]);
    assert_eq!(
        strings(&ds, "Tunnel Relative Humidity"),
        vec![Some("40.0%".to_string()); 2]
    );
}

#[test]
fn range_bounds_are_inclusive_and_nested_dirs_found() {
    let dir = TempDir::new().unwrap();
    for (rel, day) in [
        ("2022/07/corrections_report_2022-07-09.html", "2022-07-09"),
        ("2022/07/corrections_report_2022-07-10.html", "2022-07-10"),
        ("corrections_report_2022-07-12.html", "2022-07-12"),
        ("old/corrections_report_2022-07-13.html", "2022-07-13"),
    ] {
        write(
            dir.path(),
            rel,
            &report("50%", &[(format!("{} 07:00:00", day).as_str(), Some("1"), 1)]),
        );
    }
    write(dir.path(), "other_report_2022-07-11.html", &report("50%", &[("2022-07-11", Some("1"), 4)]));

    let report = range(&LoaderConfig::with_root(dir.path()), "2022-07-10", "2022-07-12");
    let names: Vec<_> = report.files.iter().map(|f| f.display_name.clone()).collect();
    assert_eq!(
        names,
        vec![
            "corrections_report_2022-07-10.html",
            "corrections_report_2022-07-12.html"
        ]
    );
    assert_eq!(report.dataset.num_rows(), 2);
}

#[test]
fn repeated_and_parallel_loads_agree() {
    let dir = TempDir::new().unwrap();
    for d in 10..=14 {
        write(
            dir.path(),
            &format!("corrections_report_2022-07-{}.html", d),
            &report(
                "61%",
                &[
                    (format!("2022-07-{} 08:00:00", d).as_str(), Some("2"), d as usize - 8),
                    (format!("2022-07-{} 20:00:00", d).as_str(), Some("4"), 1),
                ],
            ),
        );
    }

    let mut config = LoaderConfig::with_root(dir.path());
    let first = range(&config, "2022-07-10", "2022-07-14").into_dataset();
    let second = range(&config, "2022-07-10", "2022-07-14").into_dataset();
    config.parallel = true;
    let parallel = range(&config, "2022-07-10", "2022-07-14").into_dataset();

    assert_eq!(first.num_rows(), (2 + 3 + 4 + 5 + 6) + 5);
    assert_eq!(first.batch(), second.batch());
    assert_eq!(first.batch(), parallel.batch());
}

#[test]
fn datetime_start_keeps_its_own_day() {
    let dir = TempDir::new().unwrap();
    write(
        dir.path(),
        "corrections_report_2022-07-10.html",
        &report("40%", &[("2022-07-10 08:00:00", Some("3"), 2)]),
    );
    let start = NaiveDate::from_ymd_opt(2022, 7, 10)
        .unwrap()
        .and_hms_opt(8, 0, 0)
        .unwrap();
    let end = NaiveDate::from_ymd_opt(2022, 7, 10).unwrap();
    let report = load_corrections(
        &LoaderConfig::with_root(dir.path()),
        &DateInput::from(start),
        &DateInput::from(end),
    );

    assert!(report.date_error.is_none());
    assert_eq!(report.files.len(), 1);
    assert_eq!(report.dataset.num_rows(), 2);
}

#[test]
fn invalid_date_returns_empty_with_error() {
    let dir = TempDir::new().unwrap();
    write(
        dir.path(),
        "corrections_report_2022-07-10.html",
        &report("40%", &[("2022-07-10 08:00:00", Some("3"), 2)]),
    );
    let report = range(&LoaderConfig::with_root(dir.path()), "not-a-date", "2022-07-12");

    assert!(report.dataset.is_empty());
    assert!(report.files.is_empty());
    assert!(matches!(
        report.date_error,
        Some(DateError::InvalidFormat { ref param, .. }) if param == "start"
    ));
}

#[test]
fn reversed_range_loads_nothing() {
    let dir = TempDir::new().unwrap();
    write(
        dir.path(),
        "corrections_report_2022-07-10.html",
        &report("40%", &[("2022-07-10 08:00:00", Some("3"), 2)]),
    );
    let report = range(&LoaderConfig::with_root(dir.path()), "2022-07-12", "2022-07-10");
    assert!(report.date_error.is_none());
    assert!(report.files.is_empty());
    assert!(report.dataset.is_empty());
}

#[test]
fn pair_without_delay_line_is_skipped() {
    let dir = TempDir::new().unwrap();
    write(
        dir.path(),
        "corrections_report_2022-07-10.html",
        &report(
            "40%",
            &[
                ("2022-07-10 08:00:00", None, 4),
                ("2022-07-10 09:00:00", Some("7"), 3),
            ],
        ),
    );
    let ds = range(&LoaderConfig::with_root(dir.path()), "2022-07-10", "2022-07-10").into_dataset();
    assert_eq!(ds.num_rows(), 3);
    assert_eq!(strings(&ds, "Delay line number"), vec![Some("7".to_string()); 3]);
}

#[test]
fn file_without_tables_does_not_disturb_others() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "corrections_report_2022-07-10.html", "<html><p>empty day</p></html>");
    write(
        dir.path(),
        "corrections_report_2022-07-11.html",
        &report("40%", &[("2022-07-11 08:00:00", Some("3"), 2)]),
    );
    fs::write(
        dir.path().join("corrections_report_2022-07-12.html"),
        [0xff, 0xfe, 0x00, 0x3c],
    )
    .unwrap();

    let report = range(&LoaderConfig::with_root(dir.path()), "2022-07-10", "2022-07-12");
    assert_eq!(report.files.len(), 3);
    assert_eq!(report.failed().count(), 0);
    assert_eq!(report.dataset.num_rows(), 2);
}

#[test]
fn empty_layout_table_does_not_hide_pairs() {
    let dir = TempDir::new().unwrap();
    let html = report("40%", &[("2022-07-10 08:00:00", Some("3"), 2)])
        .replace("<body>", "<body><table></table>");
    write(dir.path(), "corrections_report_2022-07-10.html", &html);

    let ds = range(&LoaderConfig::with_root(dir.path()), "2022-07-10", "2022-07-10").into_dataset();
    assert_eq!(ds.num_rows(), 2);
    assert_eq!(strings(&ds, "Delay line number"), vec![Some("3".to_string()); 2]);
}

#[test]
fn no_matching_files_is_empty_not_error() {
    let dir = TempDir::new().unwrap();
    let report = range(&LoaderConfig::with_root(dir.path()), "2022-07-10", "2022-07-12");
    assert!(report.date_error.is_none());
    assert!(report.dataset.is_empty());
    assert_eq!(export::format_dataset(&report.dataset, 5).unwrap(), "(no rows)");
}

#[test]
fn loaded_dataset_feeds_heatmap_and_parquet() {
    let dir = TempDir::new().unwrap();
    write(
        dir.path(),
        "reports/corrections_report_2022-07-10.html",
        &report(
            "40%",
            &[
                ("2022-07-10 08:00:00", Some("3"), 7),
                ("2022-07-10 09:00:00", Some("1"), 2),
            ],
        ),
    );
    let ds = range(&LoaderConfig::with_root(dir.path()), "2022-07-10", "2022-07-10").into_dataset();

    let maps = heatmap::heatmaps(&ds, 5).unwrap();
    assert_eq!(maps.len(), 1);
    assert_eq!(maps[0].delay_lines, vec!["1", "3"]);
    assert_eq!(maps[0].total(), 9);
    assert_eq!(maps[0].counts, vec![vec![2, 0], vec![5, 2]]);

    let out = dir.path().join("out/corrections.parquet");
    export::write_parquet(&ds, &out).unwrap();
    assert!(out.exists());
}
