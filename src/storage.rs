use crate::errors::{Result, TrafficError};
use crate::models::{TrafficDataset, TrafficRecord};
use chrono::NaiveDate;
use std::fmt::Write as _;
use std::{
    ffi::OsString,
    path::{Path, PathBuf},
};
use tokio::{fs, io::AsyncWriteExt};
use tracing::{debug, info};

pub const CSV_HEADER: &str = "date,clones,clones_uniques,views,views_uniques";
pub const DEFAULT_DATA_PATH: &str = "traffic_data.csv";
const DATE_FORMAT: &str = "%Y-%m-%d";

/// Reads the persisted dataset. A missing file is `Ok(None)`; anything that
/// cannot be read or parsed is an error rather than an empty history.
pub async fn load_dataset(path: &Path) -> Result<Option<TrafficDataset>> {
    let text = match fs::read_to_string(path).await {
        Ok(text) => text,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            info!("no dataset at {}, starting fresh", path.display());
            return Ok(None);
        }
        Err(err) => return Err(TrafficError::io(path, err)),
    };

    let dataset = parse_dataset(path, &text)?;
    debug!(rows = dataset.len(), "loaded dataset from {}", path.display());
    Ok(Some(dataset))
}

pub fn parse_dataset(path: &Path, text: &str) -> Result<TrafficDataset> {
    let mut lines = text
        .lines()
        .enumerate()
        .map(|(index, line)| (index + 1, line.trim_end_matches('\r')))
        .filter(|(_, line)| !line.trim().is_empty());

    let Some((_, header)) = lines.next() else {
        return Err(TrafficError::persistence(path, 1, "file is empty"));
    };
    if header.trim_start_matches('\u{feff}').trim() != CSV_HEADER {
        return Err(TrafficError::persistence(
            path,
            1,
            format!("expected header '{CSV_HEADER}', found '{header}'"),
        ));
    }

    let mut dataset = TrafficDataset::default();
    for (line_no, line) in lines {
        let record = parse_row(line).map_err(|msg| TrafficError::persistence(path, line_no, msg))?;
        let date = record.date;
        if !dataset.insert_new(record) {
            return Err(TrafficError::persistence(
                path,
                line_no,
                format!("duplicate date {date}"),
            ));
        }
    }

    Ok(dataset)
}

fn parse_row(line: &str) -> Result<TrafficRecord, String> {
    let fields: Vec<&str> = line.split(',').map(str::trim).collect();
    let &[date, clones, clones_uniques, views, views_uniques] = fields.as_slice() else {
        return Err(format!("expected 5 fields, found {}", fields.len()));
    };

    Ok(TrafficRecord {
        date: parse_date(date)?,
        clones: parse_count(clones)?,
        clones_uniques: parse_count(clones_uniques)?,
        views: parse_count(views)?,
        views_uniques: parse_count(views_uniques)?,
    })
}

/// Accepts `2024-01-01` and datetime forms like `2024-01-01 00:00:00`.
fn parse_date(field: &str) -> Result<NaiveDate, String> {
    let day = field
        .split(|c: char| c == ' ' || c == 'T')
        .next()
        .unwrap_or_default();
    NaiveDate::parse_from_str(day, DATE_FORMAT).map_err(|err| format!("invalid date '{field}': {err}"))
}

/// Empty means not reported. Integral floats (`12.0`) are accepted because
/// tabular tools promote integer columns with gaps to floats.
fn parse_count(field: &str) -> Result<Option<u64>, String> {
    if field.is_empty() || field.eq_ignore_ascii_case("nan") {
        return Ok(None);
    }
    if let Ok(value) = field.parse::<u64>() {
        return Ok(Some(value));
    }
    match field.parse::<f64>() {
        Ok(value) if value.is_finite() && value >= 0.0 && value.fract() == 0.0 => {
            Ok(Some(value as u64))
        }
        _ => Err(format!("invalid count '{field}'")),
    }
}

pub fn render_csv(dataset: &TrafficDataset) -> String {
    let mut out = String::with_capacity(CSV_HEADER.len() + 1 + dataset.len() * 32);
    out.push_str(CSV_HEADER);
    out.push('\n');
    for record in dataset.records() {
        let _ = writeln!(
            out,
            "{},{},{},{},{}",
            record.date.format(DATE_FORMAT),
            count_field(record.clones),
            count_field(record.clones_uniques),
            count_field(record.views),
            count_field(record.views_uniques),
        );
    }
    out
}

fn count_field(value: Option<u64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

pub async fn save_dataset(path: &Path, dataset: &TrafficDataset) -> Result<()> {
    write_atomic(path, render_csv(dataset).as_bytes())
        .await
        .map_err(|err| TrafficError::io(path, err))?;
    info!(rows = dataset.len(), "wrote dataset to {}", path.display());
    Ok(())
}

/// Writes to a sibling temp file and renames it over `path`, so a failed
/// write never leaves a truncated target behind.
pub async fn write_atomic(path: &Path, payload: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).await?;
    }

    let tmp_path = temp_path(path);
    let result: std::io::Result<()> = async {
        let mut file = fs::File::create(&tmp_path).await?;
        file.write_all(payload).await?;
        file.sync_all().await?;
        drop(file);
        fs::rename(&tmp_path, path).await
    }
    .await;

    if result.is_err() {
        let _ = fs::remove_file(&tmp_path).await;
    }
    result
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(OsString::from)
        .unwrap_or_else(|| OsString::from("output"));
    name.push(".tmp");
    path.with_file_name(name)
}
