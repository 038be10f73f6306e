// 📥 Raw tabular batches
// What the extraction connectors hand over: named columns + rows of optional strings.
// Nothing here is typed yet; the cleaner owns the mapping into canonical records.

use crate::errors::DataFormatError;
use crate::models::Dataset;
use std::io::Read;
use std::path::Path;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawBatch {
    columns: Vec<String>,
    rows: Vec<Vec<Option<String>>>,
}

impl RawBatch {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Option<String>>>) -> Self {
        RawBatch { columns, rows }
    }

    /// Build a batch from string literals. Empty cells become nulls.
    pub fn from_records(columns: &[&str], rows: &[&[&str]]) -> Self {
        RawBatch {
            columns: columns.iter().map(|c| c.to_string()).collect(),
            rows: rows
                .iter()
                .map(|row| row.iter().map(|cell| cell_value(cell)).collect())
                .collect(),
        }
    }

    /// Read a CSV stream with a header row.
    pub fn read_csv<R: Read>(dataset: Dataset, reader: R) -> Result<Self, DataFormatError> {
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let unreadable = |e: csv::Error| DataFormatError::Unreadable {
            dataset,
            detail: e.to_string(),
        };

        let columns = rdr
            .headers()
            .map_err(unreadable)?
            .iter()
            .map(|h| h.to_string())
            .collect::<Vec<_>>();

        let mut rows = Vec::new();
        for result in rdr.records() {
            let record = result.map_err(unreadable)?;
            rows.push(record.iter().map(cell_value).collect());
        }

        Ok(RawBatch::new(columns, rows))
    }

    pub fn read_csv_path(dataset: Dataset, path: &Path) -> Result<Self, DataFormatError> {
        let file = std::fs::File::open(path).map_err(|e| DataFormatError::Unreadable {
            dataset,
            detail: format!("{}: {}", path.display(), e),
        })?;
        Self::read_csv(dataset, file)
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> impl Iterator<Item = &[Option<String>]> + '_ {
        self.rows.iter().map(|r| r.as_slice())
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Reject batches that cannot be read as a table at all.
    pub fn check_shape(&self, dataset: Dataset) -> Result<(), DataFormatError> {
        if self.columns.is_empty() || self.rows.is_empty() {
            return Err(DataFormatError::EmptyBatch { dataset });
        }

        let expected = self.columns.len();
        for (i, row) in self.rows.iter().enumerate() {
            if row.len() != expected {
                return Err(DataFormatError::RaggedRow {
                    dataset,
                    row: i + 1,
                    expected,
                    found: row.len(),
                });
            }
        }

        Ok(())
    }

    /// Position of the first column whose normalized header matches one of `aliases`.
    pub fn find_column(&self, aliases: &[&str]) -> Option<usize> {
        let normalized: Vec<String> = self.columns.iter().map(|c| normalize_header(c)).collect();
        aliases
            .iter()
            .find_map(|alias| normalized.iter().position(|c| c == alias))
    }
}

fn cell_value(cell: &str) -> Option<String> {
    let trimmed = cell.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Lowercase, fold Spanish accents, and turn spaces/dots into underscores.
///
/// "Precio Surtidor" → "precio_surtidor", "Período" → "periodo"
pub fn normalize_header(header: &str) -> String {
    header
        .trim()
        .to_lowercase()
        .chars()
        .map(|c| match c {
            'á' | 'à' | 'ä' => 'a',
            'é' | 'è' | 'ë' => 'e',
            'í' | 'ì' | 'ï' => 'i',
            'ó' | 'ò' | 'ö' => 'o',
            'ú' | 'ù' | 'ü' => 'u',
            'ñ' => 'n',
            ' ' | '.' | '-' => '_',
            other => other,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_header() {
        assert_eq!(normalize_header("Precio Surtidor"), "precio_surtidor");
        assert_eq!(normalize_header(" Período "), "periodo");
        assert_eq!(normalize_header("brent.price"), "brent_price");
    }

    #[test]
    fn test_read_csv_turns_empty_cells_into_nulls() {
        let data = "date,brent_price\n2024-01-02,80.5\n2024-01-03,\n";
        let batch = RawBatch::read_csv(Dataset::Benchmark, data.as_bytes()).unwrap();

        assert_eq!(batch.columns(), &["date".to_string(), "brent_price".to_string()]);
        assert_eq!(batch.len(), 2);
        let rows: Vec<_> = batch.rows().collect();
        assert_eq!(rows[0][1].as_deref(), Some("80.5"));
        assert_eq!(rows[1][1], None);
    }

    #[test]
    fn test_read_csv_rejects_ragged_file() {
        let data = "date,brent_price\n2024-01-02,80.5,extra\n";
        let err = RawBatch::read_csv(Dataset::Benchmark, data.as_bytes()).unwrap_err();

        assert!(matches!(err, DataFormatError::Unreadable { .. }));
    }

    #[test]
    fn test_new_keeps_connector_nulls() {
        let batch = RawBatch::new(
            vec!["date".to_string(), "brent_price".to_string()],
            vec![vec![Some("2024-01-02".to_string()), None]],
        );

        assert_eq!(batch, RawBatch::from_records(&["date", "brent_price"], &[&["2024-01-02", ""]]));
        assert!(batch.check_shape(Dataset::Benchmark).is_ok());
    }

    #[test]
    fn test_check_shape() {
        let empty = RawBatch::from_records(&["date", "price"], &[]);
        assert_eq!(
            empty.check_shape(Dataset::Benchmark),
            Err(DataFormatError::EmptyBatch {
                dataset: Dataset::Benchmark
            })
        );

        let ragged = RawBatch::from_records(&["date", "price"], &[&["2024-01-01"]]);
        assert!(matches!(
            ragged.check_shape(Dataset::Benchmark),
            Err(DataFormatError::RaggedRow { row: 1, .. })
        ));
    }

    #[test]
    fn test_find_column_uses_aliases_in_order() {
        let batch = RawBatch::from_records(&["Fecha", "Brent_Price_USD"], &[]);

        assert_eq!(batch.find_column(&["date", "fecha"]), Some(0));
        assert_eq!(batch.find_column(&["brent_price", "brent_price_usd"]), Some(1));
        assert_eq!(batch.find_column(&["close"]), None);
    }

    #[test]
    fn test_read_csv_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("brent.csv");
        std::fs::write(&path, "date,brent_price\n2024-01-02,80.5\n").unwrap();

        let batch = RawBatch::read_csv_path(Dataset::Benchmark, &path).unwrap();
        assert_eq!(batch.len(), 1);

        let missing = RawBatch::read_csv_path(Dataset::Benchmark, &dir.path().join("nope.csv"));
        assert!(matches!(missing, Err(DataFormatError::Unreadable { .. })));
    }
}
