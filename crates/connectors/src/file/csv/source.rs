use crate::file::csv::{error::FileError, settings::CsvSettings};
use model::records::record::SourceRecord;
use std::{
    collections::HashSet,
    fs::File,
    io::{self, Read},
    path::Path,
};
use tracing::debug;

/// Streams the data rows of a CSV input as [`SourceRecord`]s, in file order.
///
/// Line numbers are 1-based source lines, so the first data row of a file
/// with a single-line header is line 2.
pub struct CsvRecordSource<R: Read> {
    name: String,
    headers: Vec<String>,
    records: csv::StringRecordsIntoIter<R>,
}

impl CsvRecordSource<File> {
    pub fn from_path(path: impl AsRef<Path>, settings: &CsvSettings) -> Result<Self, FileError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|err| match err.kind() {
            io::ErrorKind::NotFound => FileError::NotFound(path.display().to_string()),
            io::ErrorKind::PermissionDenied => {
                FileError::PermissionDenied(path.display().to_string())
            }
            _ => FileError::IoError(err),
        })?;
        Self::from_reader(path.display().to_string(), file, settings)
    }
}

impl<R: Read> CsvRecordSource<R> {
    pub fn from_reader(
        name: impl Into<String>,
        reader: R,
        settings: &CsvSettings,
    ) -> Result<Self, FileError> {
        let name = name.into();
        let mut reader = settings.reader_builder().from_reader(reader);
        let headers = reader
            .headers()?
            .iter()
            .map(String::from)
            .collect::<Vec<_>>();

        if headers.is_empty() || headers.iter().all(|h| h.trim().is_empty()) {
            return Err(FileError::InvalidHeader(format!("{name}: header row is empty")));
        }

        let mut seen = HashSet::new();
        for header in &headers {
            if !seen.insert(header.trim().to_lowercase()) {
                return Err(FileError::InvalidHeader(format!(
                    "{name}: duplicate column '{header}'"
                )));
            }
        }

        debug!(source = %name, columns = ?headers, "Opened CSV source");
        Ok(CsvRecordSource {
            name,
            headers,
            records: reader.into_records(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    fn to_record(&self, record: csv::StringRecord) -> SourceRecord {
        let line = record.position().map_or(0, |p| p.line());
        let fields = self
            .headers
            .iter()
            .zip(record.iter())
            .map(|(h, v)| (h.trim().to_string(), v.to_string()))
            .collect();
        SourceRecord::new(line, fields)
    }
}

impl<R: Read> Iterator for CsvRecordSource<R> {
    type Item = Result<SourceRecord, FileError>;

    fn next(&mut self) -> Option<Self::Item> {
        let next = self.records.next()?;
        Some(match next {
            Ok(record) => Ok(self.to_record(record)),
            Err(err) => Err(match err.kind() {
                csv::ErrorKind::Io(_) => FileError::CsvError(err),
                _ => FileError::MalformedRecord {
                    line: err.position().map_or(0, |p| p.line()),
                    reason: err.to_string(),
                },
            }),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn source(content: &str) -> CsvRecordSource<&[u8]> {
        CsvRecordSource::from_reader("inline", content.as_bytes(), &CsvSettings::default())
            .unwrap()
    }

    #[test]
    fn yields_records_with_source_lines() {
        let records = source("colid,cola\n1,a\n2,b\n")
            .collect::<Result<Vec<_>, _>>()
            .unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].line, 2);
        assert_eq!(records[1].line, 3);
        assert_eq!(records[1].get("COLA"), Some("b"));
    }

    #[test]
    fn reports_ragged_row_and_continues() {
        let mut src = source("a,b\n1,2\n3\n4,5\n");
        assert!(src.next().unwrap().is_ok());

        let err = src.next().unwrap().unwrap_err();
        assert!(err.is_recoverable());
        assert_eq!(err.line(), Some(3));

        let last = src.next().unwrap().unwrap();
        assert_eq!(last.get("a"), Some("4"));
        assert!(src.next().is_none());
    }

    #[test]
    fn rejects_duplicate_headers() {
        let result =
            CsvRecordSource::from_reader("inline", "id,ID\n".as_bytes(), &CsvSettings::default());
        assert!(matches!(result, Err(FileError::InvalidHeader(_))));
    }

    #[test]
    fn honors_custom_delimiter() {
        let settings = CsvSettings::new(';');
        let mut src =
            CsvRecordSource::from_reader("inline", "id;name\n7;x\n".as_bytes(), &settings).unwrap();
        let record = src.next().unwrap().unwrap();
        assert_eq!(record.get("name"), Some("x"));
    }

    #[test]
    fn opens_files_and_maps_missing_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "id\n1").unwrap();
        let src = CsvRecordSource::from_path(file.path(), &CsvSettings::default()).unwrap();
        assert_eq!(src.count(), 1);

        let missing = CsvRecordSource::from_path("/nonexistent/input.csv", &CsvSettings::default());
        assert!(matches!(missing, Err(FileError::NotFound(_))));
    }
}
