use std::fs::File;
use std::io::Write;

use pourer_config::{BucketRow, load_pour_table_csv, load_toml};
use rstest::rstest;
use tempfile::tempdir;

const HEADER: &str = "lower_g,upper_g,angle_offset_deg,duration_lower_ms,duration_upper_ms";

fn write_csv(lines: &[&str]) -> (tempfile::TempDir, std::path::PathBuf) {
    let dir = tempdir().unwrap();
    let path = dir.path().join("pour.csv");
    let mut f = File::create(&path).unwrap();
    for l in lines {
        writeln!(f, "{l}").unwrap();
    }
    (dir, path)
}

#[rstest]
fn loads_well_formed_table() {
    let (_dir, path) = write_csv(&[HEADER, "850,1000,0.0,1800,1500", "700,850,10.0,2200,1800"]);
    let rows = load_pour_table_csv(&path).unwrap();
    assert_eq!(
        rows,
        vec![
            BucketRow {
                lower_g: 850,
                upper_g: 1000,
                angle_offset_deg: 0.0,
                duration_lower_ms: 1800,
                duration_upper_ms: 1500,
            },
            BucketRow {
                lower_g: 700,
                upper_g: 850,
                angle_offset_deg: 10.0,
                duration_lower_ms: 2200,
                duration_upper_ms: 1800,
            },
        ]
    );
}

#[rstest]
fn wrong_headers_error() {
    let (_dir, path) = write_csv(&["lower,upper,angle,d0,d1", "850,1000,0.0,1800,1500"]);
    let err = load_pour_table_csv(&path).expect_err("should error on bad headers");
    assert!(format!("{err}").contains("must have headers"));
}

#[rstest]
#[case("abc,1000,0.0,1800,1500", "invalid CSV row 2")]
#[case("900,850,0.0,1800,1500", "lower_g (900) must be < upper_g (850)")]
#[case("850,1000,0.0,-5,1500", "invalid CSV row 2")]
fn bad_rows_error(#[case] row: &str, #[case] needle: &str) {
    let (_dir, path) = write_csv(&[HEADER, row]);
    let err = load_pour_table_csv(&path).expect_err("row should be rejected");
    assert!(format!("{err}").contains(needle), "{err}");
}

#[rstest]
fn header_only_is_empty_table_error() {
    let (_dir, path) = write_csv(&[HEADER]);
    let err = load_pour_table_csv(&path).unwrap_err();
    assert!(format!("{err}").contains("no rows"));
}

#[rstest]
fn missing_file_names_path() {
    let err = load_pour_table_csv(std::path::Path::new("/nonexistent/pour.csv")).unwrap_err();
    assert!(format!("{err}").contains("open pour table CSV"));
}

#[rstest]
fn config_resolves_csv_over_builtin() {
    let (_dir, path) = write_csv(&[HEADER, "400,1000,15.0,3000,1500"]);
    let toml = format!("[pour]\ntable_csv = {:?}\n", path.display().to_string());
    let cfg = load_toml(&toml).unwrap();
    cfg.validate().unwrap();
    let rows = cfg.pour_buckets().unwrap().expect("csv table");
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].angle_offset_deg, 15.0);
}
