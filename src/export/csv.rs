use crate::error::ExportError;
use crate::model::{ElementRow, HEADERS};
use std::fs::File;
use std::path::Path;

/// Output settings for the CSV writer.
#[derive(Debug, Clone)]
pub struct ExportOptions {
    pub delimiter: u8,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self { delimiter: b',' }
    }
}

/// Writes the header and `rows` to `path`, replacing any existing file.
pub fn export_csv<P: AsRef<Path>>(
    rows: &[ElementRow],
    path: P,
    options: &ExportOptions,
) -> Result<(), ExportError> {
    let path_ref = path.as_ref();
    let file = File::create(path_ref).map_err(|source| ExportError::FileCreate {
        path: path_ref.to_path_buf(),
        source,
    })?;

    let mut writer = csv::WriterBuilder::new()
        .delimiter(options.delimiter)
        .from_writer(file);

    writer.write_record(HEADERS)?;
    for row in rows {
        writer.write_record(row.to_record())?;
    }

    writer.flush().map_err(|e| ExportError::WriteError {
        message: e.to_string(),
    })?;

    tracing::info!(path = %path_ref.display(), rows = rows.len(), "Wrote CSV");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::fs;

    fn row(id: u64, material: &str) -> ElementRow {
        ElementRow {
            object_id: id,
            global_id: format!("guid-{id}"),
            name: "N/A".to_string(),
            description: "N/A".to_string(),
            object_type: "N/A".to_string(),
            material: material.to_string(),
            volume: "1.20".to_string(),
            surface_area: "14.00".to_string(),
            top_elevation: "3.00".to_string(),
            bottom_elevation: "0.00".to_string(),
        }
    }

    fn temp_path(name: &str) -> std::path::PathBuf {
        std::env::temp_dir().join(format!("ifc-metrics-{}-{name}", std::process::id()))
    }

    #[test]
    fn writes_header_and_quotes_composite_materials() {
        let path = temp_path("rows.csv");
        export_csv(&[row(7, "A, B")], &path, &ExportOptions::default()).unwrap();

        let written = fs::read_to_string(&path).unwrap();
        fs::remove_file(&path).ok();
        assert_eq!(
            written,
            "ObjectID,GlobalId,Name,Description,ObjectType,Material,Volume (m³),Surface Area (m²),Top Elevation (m),Bottom Elevation (m)\n\
             7,guid-7,N/A,N/A,N/A,\"A, B\",1.20,14.00,3.00,0.00\n"
        );
    }

    #[test]
    fn custom_delimiter_and_overwrite() {
        let path = temp_path("semicolon.csv");
        fs::write(&path, "stale content\nmore\nlines\n").unwrap();

        export_csv(&[], &path, &ExportOptions { delimiter: b';' }).unwrap();

        let written = fs::read_to_string(&path).unwrap();
        fs::remove_file(&path).ok();
        assert_eq!(written.lines().count(), 1);
        assert!(written.starts_with("ObjectID;GlobalId;Name;"));
    }

    #[test]
    fn unwritable_path_is_reported() {
        let path = temp_path("missing-dir").join("out.csv");
        let err = export_csv(&[], &path, &ExportOptions::default()).unwrap_err();
        assert!(matches!(err, ExportError::FileCreate { .. }));
    }
}
