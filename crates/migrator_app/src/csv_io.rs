//! Reading the CMS export and writing the migrated dataset.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use migrator_core::{FieldMapping, Row, RowSchema};
use migrator_engine::{decode_export, AtomicFileWriter};
use migrator_logging::{migrator_info, migrator_warn};

pub struct LoadedExport {
    pub schema: Arc<RowSchema>,
    pub rows: Vec<Row>,
}

/// Load every data row, numbered from 0 in file order. Empty cells are null.
///
/// A record the CSV parser rejects is kept as an empty (malformed) row so it is
/// reported instead of silently dropped.
pub fn load_export(path: &Path, mapping: &FieldMapping) -> Result<LoadedExport> {
    let bytes = fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    let decoded = decode_export(&bytes)?;
    migrator_info!("Decoded {} as {}", path.display(), decoded.encoding_label);

    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(decoded.text.as_bytes());
    let headers = reader
        .headers()
        .with_context(|| format!("missing header row in {}", path.display()))?
        .clone();
    let schema = Arc::new(RowSchema::resolve(headers.iter(), mapping));

    let mut rows = Vec::new();
    for (index, record) in reader.records().enumerate() {
        let cells = match record {
            Ok(record) => record
                .iter()
                .map(|cell| (!cell.is_empty()).then(|| cell.to_string()))
                .collect(),
            Err(err) => {
                migrator_warn!("Row {}: unreadable CSV record: {}", index, err);
                Vec::new()
            }
        };
        rows.push(Row::new(index, schema.clone(), cells));
    }
    migrator_info!("Loaded {} rows from {}", rows.len(), path.display());
    Ok(LoadedExport { schema, rows })
}

/// Write `rows` under `schema`'s headers, replacing `path` atomically.
pub fn write_rows<'a>(
    path: &Path,
    schema: &RowSchema,
    rows: impl IntoIterator<Item = &'a Row>,
) -> Result<PathBuf> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(schema.headers())?;
    for row in rows {
        writer.write_record(row.cells().iter().map(|cell| cell.as_deref().unwrap_or("")))?;
    }
    let buffer = writer
        .into_inner()
        .map_err(|err| anyhow::anyhow!("failed to flush CSV output: {}", err.error()))?;

    let filename = path
        .file_name()
        .and_then(|name| name.to_str())
        .with_context(|| format!("output path {} has no file name", path.display()))?;
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    let written = AtomicFileWriter::new(dir).write_bytes(filename, &buffer)?;
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use migrator_core::Field;

    #[test]
    fn loads_rows_with_nulls_and_short_records() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("export.csv");
        fs::write(&input, "\u{feff}Status,Name\nPublished,First\n,\nDraft\n").unwrap();

        let loaded = load_export(&input, &FieldMapping::default()).unwrap();

        assert_eq!(loaded.schema.headers(), &["status", "name"]);
        assert_eq!(loaded.rows.len(), 3);
        assert_eq!(loaded.rows[0].get(Field::Name), Some("First"));
        assert_eq!(loaded.rows[1].cells(), &[None::<String>, None]);
        assert_eq!(loaded.rows[2].original_index(), 2);
        assert!(!loaded.rows[2].is_well_formed());
    }

    #[test]
    fn writes_nulls_as_empty_and_quotes_markup() {
        let dir = tempfile::tempdir().unwrap();
        let schema = Arc::new(RowSchema::resolve(["name", "body"], &FieldMapping::default()));
        let rows = vec![
            Row::new(
                0,
                schema.clone(),
                vec![Some("A".into()), Some(r#"<p class="x">hi, there</p>"#.into())],
            ),
            Row::new(1, schema.clone(), vec![None, Some("plain".into())]),
        ];

        let path = write_rows(&dir.path().join("out.csv"), &schema, &rows).unwrap();

        assert_eq!(
            fs::read_to_string(path).unwrap(),
            "name,body\nA,\"<p class=\"\"x\"\">hi, there</p>\"\n,plain\n"
        );
    }
}
