//! Query result tables and name tables
//!
//! Query tables are tab-separated, one chemical per line:
//!
//! ```text
//! id  count  weighted  name  mass  logP  [class ids]
//! ```
//!
//! `NaN`, `-` or an empty field parse to an absent mass/logP. Records
//! lacking either property are dropped later, before binning.

use anyhow::{Context, Result};
use chemhex_core::{ChemhexError, EntityRecord};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

/// One named query and its chemicals.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryInput {
    pub name: String,
    pub records: Vec<EntityRecord>,
    /// Free-text description lines (search term, date, hit counts)
    pub metadata: Vec<String>,
}

impl QueryInput {
    pub fn new(name: impl Into<String>, records: Vec<EntityRecord>) -> Self {
        Self {
            name: name.into(),
            records,
            metadata: Vec::new(),
        }
    }
}

/// Query name of a table file: the file name up to the first `_`.
pub fn query_name_from_path(path: &Path) -> String {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    stem.split('_').next().unwrap_or_default().to_string()
}

fn parse_optional_f64(field: &str, line: usize, column: &str) -> chemhex_core::Result<Option<f64>> {
    let field = field.trim();
    if field.is_empty() || field == "-" || field.eq_ignore_ascii_case("nan") {
        return Ok(None);
    }
    field
        .parse::<f64>()
        .map(Some)
        .map_err(|_| ChemhexError::parse(line, format!("invalid {} '{}'", column, field)))
}

/// Splits a class column such as `['CHEBI:33822', 'CHEBI:50860']`, optionally
/// wrapped in double quotes.
fn parse_class_labels(field: &str) -> Vec<String> {
    field
        .trim()
        .trim_matches('"')
        .trim()
        .trim_start_matches('[')
        .trim_end_matches(']')
        .split(',')
        .map(|label| label.trim().trim_matches(|c| c == '\'' || c == '"').trim())
        .filter(|label| !label.is_empty())
        .map(str::to_string)
        .collect()
}

fn is_header(fields: &[&str]) -> bool {
    fields[0].trim().eq_ignore_ascii_case("id")
        || fields
            .get(1)
            .map(|count| count.trim().parse::<f64>().is_err())
            .unwrap_or(false)
}

/// Parses the text of one query table.
///
/// The first content line is a header when its count column is not a number.
pub fn parse_query_table(content: &str) -> chemhex_core::Result<Vec<EntityRecord>> {
    let mut records = Vec::new();
    let mut first_row = true;

    for (index, raw_line) in content.lines().enumerate() {
        let line_no = index + 1;
        let line = raw_line.trim_end_matches('\r');
        if line.trim().is_empty() || line.starts_with('#') {
            continue;
        }
        let fields: Vec<&str> = line.split('\t').collect();
        if std::mem::take(&mut first_row) && is_header(&fields) {
            continue;
        }
        if fields.len() < 6 {
            return Err(ChemhexError::parse(
                line_no,
                format!("expected at least 6 tab-separated columns, found {}", fields.len()),
            ));
        }

        let entity_id = fields[0].trim().to_string();
        let raw_count = fields[1]
            .trim()
            .parse::<u64>()
            .map_err(|_| ChemhexError::parse(line_no, format!("invalid count '{}'", fields[1])))?;
        let weighted_count = fields[2].trim().parse::<f64>().map_err(|_| {
            ChemhexError::parse(line_no, format!("invalid weighted count '{}'", fields[2]))
        })?;

        records.push(EntityRecord {
            entity_id,
            raw_count,
            weighted_count,
            display_name: fields[3].trim().to_string(),
            mass: parse_optional_f64(fields[4], line_no, "mass")?,
            logp: parse_optional_f64(fields[5], line_no, "logP")?,
            class_labels: fields.get(6).map(|f| parse_class_labels(f)).unwrap_or_default(),
        });
    }

    Ok(records)
}

/// Reads one query table; the query is named after the file.
pub fn read_query_table(path: &Path) -> Result<QueryInput> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read query table: {}", path.display()))?;
    let records = parse_query_table(&content)
        .with_context(|| format!("Failed to parse query table: {}", path.display()))?;
    log::debug!("Read {} records from {}", records.len(), path.display());
    Ok(QueryInput::new(query_name_from_path(path), records))
}

/// Reads the optional `metadata/<query>.txt` description next to the tables.
pub fn read_query_metadata(folder: &Path, query: &str) -> Result<Vec<String>> {
    let path = folder.join("metadata").join(format!("{}.txt", query));
    if !path.exists() {
        return Ok(Vec::new());
    }
    let content = fs::read_to_string(&path)
        .with_context(|| format!("Failed to read query metadata: {}", path.display()))?;
    Ok(content.lines().map(|l| l.trim().to_string()).collect())
}

/// Reads every `.tsv` table of a folder in file-name order.
pub fn read_query_folder(folder: &Path) -> Result<Vec<QueryInput>> {
    let mut paths: Vec<PathBuf> = fs::read_dir(folder)
        .with_context(|| format!("Failed to list input folder: {}", folder.display()))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.is_file() && path.extension().map(|e| e == "tsv").unwrap_or(false))
        .collect();
    paths.sort();

    let mut queries = Vec::with_capacity(paths.len());
    for path in &paths {
        let mut query = read_query_table(path)?;
        query.metadata = read_query_metadata(folder, &query.name)?;
        queries.push(query);
    }
    log::info!("Loaded {} query tables from {}", queries.len(), folder.display());
    Ok(queries)
}

/// Reads a two-column `id<TAB>name` table.
pub fn read_name_table(path: &Path) -> Result<HashMap<String, String>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read name table: {}", path.display()))?;
    let mut names = HashMap::new();
    for (index, line) in content.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let mut fields = line.splitn(2, '\t');
        let id = fields.next().unwrap_or_default().trim();
        let name = fields
            .next()
            .ok_or_else(|| ChemhexError::parse(index + 1, "expected id<TAB>name"))
            .with_context(|| format!("Failed to parse name table: {}", path.display()))?
            .trim();
        names.insert(id.to_string(), name.to_string());
    }
    Ok(names)
}
