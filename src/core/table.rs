use color_eyre::{
    eyre::{bail, Context},
    Result,
};
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Label written into the first column of an appended averages row
pub const AVERAGES_LABEL: &str = "Averages";

/// Pick the field delimiter for a table by its file name.
pub fn delimiter_for(path: &Path) -> u8 {
    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) if ["tsv", "txt", "het"].contains(&ext.to_ascii_lowercase().as_str()) => b'\t',
        _ => b',',
    }
}

/// Parse a cell as a number. Empty cells and NaN count as zero.
pub fn parse_number(cell: &str) -> Option<f64> {
    let cell = cell.trim();
    if cell.is_empty() {
        return Some(0.0);
    }
    cell.parse::<f64>()
        .ok()
        .map(|v| if v.is_nan() { 0.0 } else { v })
}

/// Render a computed value. Undefined or infinite values become empty cells.
///
/// Values are written in the shortest form that reads back to the same
/// `f64`, without rounding, so a sum such as `0.1 + 0.05` comes out as
/// `0.15000000000000002`.
pub fn format_number(value: f64) -> String {
    if !value.is_finite() {
        String::new()
    } else {
        value.to_string()
    }
}

/// Arithmetic mean, undefined for an empty slice
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// A delimited text table held as strings, with a header row
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new(headers: Vec<String>, rows: Vec<Vec<String>>) -> Result<Self> {
        for (idx, row) in rows.iter().enumerate() {
            if row.len() != headers.len() {
                bail!(
                    "Row {} has {} fields but the header has {}",
                    idx + 1,
                    row.len(),
                    headers.len()
                );
            }
        }
        Ok(Self { headers, rows })
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let file = File::open(path)
            .wrap_err_with(|| format!("Failed to open table: {}", path.display()))?;
        Self::from_reader(file, delimiter_for(path))
            .wrap_err_with(|| format!("Failed to parse table: {}", path.display()))
    }

    pub fn from_reader<R: Read>(reader: R, delimiter: u8) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(delimiter)
            .has_headers(true)
            .from_reader(reader);

        let headers = reader
            .headers()
            .wrap_err("Failed to read header row")?
            .iter()
            .map(str::to_string)
            .collect();

        let mut rows = Vec::new();
        for (line_num, result) in reader.records().enumerate() {
            let record =
                result.wrap_err_with(|| format!("Failed to parse data row {}", line_num + 1))?;
            rows.push(record.iter().map(str::to_string).collect());
        }

        Self::new(headers, rows)
    }

    pub fn write_path(&self, path: &Path) -> Result<()> {
        let file = File::create(path)
            .wrap_err_with(|| format!("Couldn't create output file: {}", path.display()))?;
        let mut writer = csv::WriterBuilder::new()
            .delimiter(delimiter_for(path))
            .from_writer(file);

        writer.write_record(&self.headers)?;
        for row in &self.rows {
            writer.write_record(row)?;
        }
        writer.flush()?;
        Ok(())
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn num_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    /// Names from `required` that are not columns of this table
    pub fn missing_columns<'a>(&self, required: &[&'a str]) -> Vec<&'a str> {
        required
            .iter()
            .filter(|name| self.column_index(name).is_none())
            .copied()
            .collect()
    }

    /// All values of a column as numbers, or None if any cell is not numeric
    pub fn numeric_column(&self, idx: usize) -> Option<Vec<f64>> {
        self.rows.iter().map(|row| parse_number(&row[idx])).collect()
    }

    /// Like [`numeric_column`](Self::numeric_column), looked up by name
    pub fn numeric_column_by_name(&self, name: &str) -> Option<Vec<f64>> {
        self.numeric_column(self.column_index(name)?)
    }

    pub fn last_value(&self, column: &str) -> Option<&str> {
        let idx = self.column_index(column)?;
        self.rows.last().map(|row| row[idx].as_str())
    }

    /// Append a column, or replace it if it already exists.
    pub fn set_column(&mut self, name: &str, values: Vec<String>) -> Result<()> {
        if values.len() != self.rows.len() {
            bail!(
                "Column '{}' has {} values for {} rows",
                name,
                values.len(),
                self.rows.len()
            );
        }
        match self.column_index(name) {
            Some(idx) => {
                for (row, value) in self.rows.iter_mut().zip(values) {
                    row[idx] = value;
                }
            }
            None => {
                self.headers.push(name.to_string());
                for (row, value) in self.rows.iter_mut().zip(values) {
                    row.push(value);
                }
            }
        }
        Ok(())
    }

    pub fn has_averages_row(&self) -> bool {
        self.rows
            .last()
            .and_then(|row| row.first())
            .is_some_and(|first| first == AVERAGES_LABEL)
    }

    /// Append a row holding the mean of each numeric column, labelled in the
    /// first column. Non-numeric columns get an empty cell. Returns false if
    /// the table already ends with an averages row.
    pub fn append_averages(&mut self) -> bool {
        if self.has_averages_row() {
            return false;
        }

        let mut averages: Vec<String> = (0..self.headers.len())
            .map(|idx| match self.numeric_column(idx) {
                Some(values) => format_number(mean(&values)),
                None => String::new(),
            })
            .collect();
        if let Some(first) = averages.first_mut() {
            *first = AVERAGES_LABEL.to_string();
        }

        self.rows.push(averages);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use tempfile::TempDir;

    fn pi_table() -> Table {
        Table::from_reader("CHR,POS,PI\nCHR1,1,0.1\nCHR1,2,0.3\n".as_bytes(), b',').unwrap()
    }

    #[test]
    fn test_append_averages() {
        let mut table = pi_table();
        assert!(table.append_averages());
        assert_eq!(table.num_rows(), 3);
        assert_eq!(table.rows()[2], vec!["Averages", "1.5", "0.2"]);
    }

    #[test]
    fn test_averages_not_duplicated() {
        let mut table = pi_table();
        assert!(table.append_averages());
        assert!(!table.append_averages());
        assert_eq!(table.num_rows(), 3);
    }

    #[test]
    fn test_missing_values_average_as_zero() {
        let mut table =
            Table::from_reader("CHROM,POS,TajimaD\nc,1,nan\nc,2,\nc,3,3\n".as_bytes(), b',')
                .unwrap();
        table.append_averages();
        assert_eq!(table.last_value("TajimaD"), Some("1"));
    }

    #[test]
    fn test_text_column_average_is_empty() {
        let mut table =
            Table::from_reader("POS,CHR,V\n1,a,2\n3,b,4\n".as_bytes(), b',').unwrap();
        table.append_averages();
        assert_eq!(table.rows()[2], vec!["Averages", "", "3"]);
    }

    #[test]
    fn test_empty_table_averages() {
        let mut table = Table::from_reader("CHR,POS,PI\n".as_bytes(), b',').unwrap();
        table.append_averages();
        assert_eq!(table.rows()[0], vec!["Averages", "", ""]);
    }

    #[rstest]
    #[case(0.2, "0.2")]
    #[case(1.5, "1.5")]
    #[case(3.0, "3")]
    #[case(0.1 + 0.05, "0.15000000000000002")]
    #[case(f64::NAN, "")]
    #[case(f64::INFINITY, "")]
    fn test_format_number(#[case] value: f64, #[case] expected: &str) {
        assert_eq!(format_number(value), expected);
    }

    #[test]
    fn test_set_column_appends_and_replaces() {
        let mut table = pi_table();
        table
            .set_column("X", vec!["a".to_string(), "b".to_string()])
            .unwrap();
        assert_eq!(table.headers(), &["CHR", "POS", "PI", "X"]);
        table
            .set_column("PI", vec!["0".to_string(), "0".to_string()])
            .unwrap();
        assert_eq!(table.numeric_column_by_name("PI"), Some(vec![0.0, 0.0]));
        assert!(table.set_column("Y", vec![]).is_err());
    }

    #[test]
    fn test_missing_columns() {
        let table = pi_table();
        assert_eq!(table.missing_columns(&["PI", "FIS", "POS"]), vec!["FIS"]);
    }

    #[test]
    fn test_ragged_rows_rejected() {
        assert!(Table::from_reader("A,B\n1,2,3\n".as_bytes(), b',').is_err());
    }

    #[rstest]
    #[case("A.het", b'\t')]
    #[case("list.txt", b'\t')]
    #[case("x.TSV", b'\t')]
    #[case("A_Pi.csv", b',')]
    #[case("A.Tajima.D", b',')]
    #[case("A.hwe", b',')]
    fn test_delimiter_for(#[case] name: &str, #[case] expected: u8) {
        assert_eq!(delimiter_for(Path::new(name)), expected);
    }

    #[test]
    fn test_write_and_read_back() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("A_Pi.csv");
        let mut table = pi_table();
        table.append_averages();
        table.write_path(&path).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(
            content,
            "CHR,POS,PI\nCHR1,1,0.1\nCHR1,2,0.3\nAverages,1.5,0.2\n"
        );
        assert_eq!(Table::from_path(&path).unwrap(), table);
    }
}
