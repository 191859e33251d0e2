// Reads delivery exports into loosely-typed rows for the normalizer.
//
// Stands in for the spreadsheet importer: CSV files come in as text cells,
// JSON files as an array of objects with numbers, strings, booleans or null.
use crate::types::{CellValue, RawRow};
use anyhow::{bail, Context, Result};
use csv::ReaderBuilder;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use tracing::{debug, info};

pub fn read_rows(path: &Path) -> Result<Vec<RawRow>> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());
    let rows = match ext.as_deref() {
        Some("csv") => read_csv(path)?,
        Some("json") => read_json(path)?,
        _ => bail!("unsupported input format: {} (expected .csv or .json)", path.display()),
    };
    info!(path = %path.display(), rows = rows.len(), "read input rows");
    Ok(rows)
}

/// Spreadsheet exports use `;` as often as `,`; pick whichever the header uses more.
fn sniff_delimiter(path: &Path) -> Result<u8> {
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    let mut header = String::new();
    BufReader::new(file)
        .read_line(&mut header)
        .with_context(|| format!("reading header of {}", path.display()))?;
    let semicolons = header.matches(';').count();
    let commas = header.matches(',').count();
    Ok(if semicolons > commas { b';' } else { b',' })
}

fn read_csv(path: &Path) -> Result<Vec<RawRow>> {
    let delimiter = sniff_delimiter(path)?;
    debug!(delimiter = %(delimiter as char), "csv delimiter");
    let mut rdr = ReaderBuilder::new()
        .flexible(true)
        .delimiter(delimiter)
        .from_path(path)
        .with_context(|| format!("opening {}", path.display()))?;
    let headers: Vec<String> = rdr
        .headers()?
        .iter()
        .map(|h| h.trim_start_matches('\u{feff}').trim().to_string())
        .collect();

    let mut rows = Vec::new();
    for (line, record) in rdr.records().enumerate() {
        let record = record.with_context(|| format!("reading record {} of {}", line + 1, path.display()))?;
        let row: RawRow = headers
            .iter()
            .zip(record.iter())
            .map(|(h, v)| {
                let cell = if v.trim().is_empty() {
                    CellValue::Empty
                } else {
                    CellValue::Text(v.to_string())
                };
                (h.clone(), cell)
            })
            .collect();
        rows.push(row);
    }
    Ok(rows)
}

fn read_json(path: &Path) -> Result<Vec<RawRow>> {
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    let rows: Vec<RawRow> = serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("parsing {}", path.display()))?;
    Ok(rows)
}
