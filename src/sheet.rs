use std::collections::HashMap;
use std::path::Path;

use calamine::{Data, Reader};
use tracing::{debug, info};

use crate::error::{FarmaciaError, Result};
use crate::models::Value;

/// Columns every input must carry; channel groups are optional.
pub const REQUIRED_COLUMNS: &[&str] = &["tipo", "denominacion", "gfh", "espec", "registrado", "tipo_e_s"];

/// In-memory copy of one sheet, headers normalized.
#[derive(Debug, Clone, Default)]
pub struct Table {
    columns: Vec<String>,
    index: HashMap<String, usize>,
    rows: Vec<Vec<Value>>,
}

impl Table {
    pub fn new(headers: Vec<String>, rows: Vec<Vec<Value>>) -> Self {
        let columns: Vec<String> = headers.iter().map(|h| normalize_header(h)).collect();
        let mut index = HashMap::new();
        for (i, name) in columns.iter().enumerate() {
            // first occurrence wins on duplicate headers
            index.entry(name.clone()).or_insert(i);
        }
        let width = columns.len();
        let rows = rows
            .into_iter()
            .map(|mut row| {
                row.resize(width, Value::Null);
                row
            })
            .filter(|row| row.iter().any(|v| !v.is_null()))
            .collect();
        Self { columns, index, rows }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    pub fn rows(&self) -> impl Iterator<Item = &[Value]> {
        self.rows.iter().map(|r| r.as_slice())
    }

    /// Every value of a column, or `None` when the column is absent.
    pub fn column(&self, name: &str) -> Option<impl Iterator<Item = &Value>> {
        let idx = self.column_index(name)?;
        Some(self.rows.iter().map(move |r| &r[idx]))
    }

    pub fn has_nulls(&self, name: &str) -> bool {
        self.column(name).map_or(false, |mut values| values.any(Value::is_null))
    }

    pub fn missing_columns(&self, required: &[&str]) -> Vec<String> {
        required
            .iter()
            .filter(|name| self.column_index(name).is_none())
            .map(|name| name.to_string())
            .collect()
    }

    pub fn require_columns(&self, required: &[&str]) -> Result<()> {
        let missing = self.missing_columns(required);
        if missing.is_empty() {
            Ok(())
        } else {
            Err(FarmaciaError::MissingColumns(missing))
        }
    }
}

pub fn normalize_header(raw: &str) -> String {
    raw.trim().to_lowercase()
}

pub fn excel_serial_to_date(serial: f64) -> String {
    // Excel epoch is 1899-12-30 (accounting for the 1900 leap year bug)
    let base = chrono::NaiveDate::from_ymd_opt(1899, 12, 30).unwrap_or_default();
    let date = base + chrono::Duration::days(serial as i64);
    date.format("%Y-%m-%d").to_string()
}

/// Read the input file into a [`Table`], picking the reader by extension.
pub fn load_table(path: &Path, sheet: Option<&str>) -> Result<Table> {
    if !path.exists() {
        return Err(FarmaciaError::InputNotFound(path.to_path_buf()));
    }
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();
    let table = match ext.as_str() {
        "csv" => load_csv(path)?,
        "xlsx" | "xlsm" | "xlsb" | "xls" | "ods" => load_workbook(path, sheet)?,
        other => {
            return Err(FarmaciaError::InputFormat(format!(
                "unsupported file type '{other}' for {}",
                path.display()
            )))
        }
    };

    info!(columns = ?table.columns(), "columns in input");
    info!(rows = table.len(), "rows read");
    if table.column_index("gfh").is_some() {
        info!(has_nulls = table.has_nulls("gfh"), "null values in 'gfh'");
    }
    Ok(table)
}

fn cell_value(cell: &Data) -> Value {
    match cell {
        Data::Empty => Value::Null,
        Data::String(s) if s.trim().is_empty() => Value::Null,
        Data::String(s) => Value::Text(s.trim().to_string()),
        Data::Float(f) => Value::Number(*f),
        Data::Int(i) => Value::Number(*i as f64),
        Data::Bool(b) => Value::Text(b.to_string()),
        Data::DateTime(dt) => Value::Text(excel_serial_to_date(dt.as_f64())),
        Data::DateTimeIso(s) | Data::DurationIso(s) => Value::Text(s.clone()),
        Data::Error(_) => Value::Null,
    }
}

fn load_workbook(path: &Path, sheet: Option<&str>) -> Result<Table> {
    let mut workbook = calamine::open_workbook_auto(path)
        .map_err(|e| FarmaciaError::InputFormat(format!("failed to open {}: {e}", path.display())))?;

    let sheet_name = match sheet {
        Some(name) => name.to_string(),
        None => workbook
            .sheet_names()
            .first()
            .cloned()
            .ok_or_else(|| FarmaciaError::InputFormat(format!("{} has no sheets", path.display())))?,
    };
    debug!(sheet = %sheet_name, "reading worksheet");

    let range = workbook
        .worksheet_range(&sheet_name)
        .map_err(|e| FarmaciaError::InputFormat(format!("cannot read sheet '{sheet_name}': {e}")))?;

    let mut rows = range.rows();
    let headers: Vec<String> = match rows.next() {
        Some(header) => header.iter().map(|c| cell_value(c).as_text().unwrap_or_default()).collect(),
        None => return Err(FarmaciaError::InputFormat(format!("sheet '{sheet_name}' is empty"))),
    };
    let data = rows.map(|row| row.iter().map(cell_value).collect()).collect();
    Ok(Table::new(headers, data))
}

/// CSV cells stay text so keys keep their exact spelling ("007", "1.50");
/// figure columns are parsed later by `Value::as_number`.
fn csv_value(raw: &str) -> Value {
    let s = raw.trim();
    if s.is_empty() {
        Value::Null
    } else {
        Value::Text(s.to_string())
    }
}

fn load_csv(path: &Path) -> Result<Table> {
    let file = std::fs::File::open(path)?;
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(std::io::BufReader::new(file));
    let headers: Vec<String> = rdr.headers()?.iter().map(str::to_string).collect();
    if headers.iter().all(|h| h.trim().is_empty()) {
        return Err(FarmaciaError::InputFormat(format!("{} has no header row", path.display())));
    }
    let mut rows = Vec::new();
    for record in rdr.records() {
        let record = record?;
        rows.push(record.iter().map(csv_value).collect());
    }
    Ok(Table::new(headers, rows))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_file(dir: &Path, name: &str, content: &str) -> std::path::PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_normalize_header() {
        assert_eq!(normalize_header("  GFH "), "gfh");
        assert_eq!(normalize_header("Unidades_UH"), "unidades_uh");
    }

    #[test]
    fn test_excel_serial_to_date() {
        assert_eq!(excel_serial_to_date(45667.0), "2025-01-10");
    }

    #[test]
    fn test_table_pads_short_rows_and_skips_blank_rows() {
        let table = Table::new(
            vec!["A".into(), "B".into()],
            vec![
                vec![Value::Text("x".into())],
                vec![Value::Null, Value::Null],
                vec![Value::Number(1.0), Value::Number(2.0)],
            ],
        );
        assert_eq!(table.len(), 2);
        let first: Vec<_> = table.rows().next().unwrap().to_vec();
        assert_eq!(first, vec![Value::Text("x".into()), Value::Null]);
        assert!(table.has_nulls("b"));
        assert!(!table.has_nulls("a"));
    }

    #[test]
    fn test_missing_columns() {
        let table = Table::new(vec!["tipo".into(), " GFH".into()], vec![]);
        assert_eq!(table.missing_columns(&["tipo", "gfh", "espec"]), vec!["espec".to_string()]);
        assert!(matches!(
            table.require_columns(&["espec"]),
            Err(FarmaciaError::MissingColumns(_))
        ));
    }

    #[test]
    fn test_load_csv_normalizes_headers() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(
            dir.path(),
            "in.csv",
            " Tipo ,DENOMINACION,gfh,Unidades_UH\nH,Farmacia,1001,12\nH,Urgencias,1002,\n",
        );
        let table = load_table(&path, None).unwrap();
        assert_eq!(table.columns(), &["tipo", "denominacion", "gfh", "unidades_uh"]);
        assert_eq!(table.len(), 2);
        let units: Vec<_> = table.column("unidades_uh").unwrap().cloned().collect();
        assert_eq!(units, vec![Value::Text("12".into()), Value::Null]);
        let gfh: Vec<_> = table.column("gfh").unwrap().filter_map(Value::as_text).collect();
        assert_eq!(gfh, vec!["1001", "1002"]);
    }

    #[test]
    fn test_load_csv_keeps_key_spelling() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(
            dir.path(),
            "in.csv",
            "gfh,espec,registrado\n007,0654321,1.50\nINF,X,NaN\n",
        );
        let table = load_table(&path, None).unwrap();
        let gfh: Vec<_> = table.column("gfh").unwrap().filter_map(Value::as_text).collect();
        assert_eq!(gfh, vec!["007", "INF"]);
        let espec: Vec<_> = table.column("espec").unwrap().filter_map(Value::as_text).collect();
        assert_eq!(espec, vec!["0654321", "X"]);
        let names: Vec<_> = table.column("registrado").unwrap().filter_map(Value::as_text).collect();
        assert_eq!(names, vec!["1.50", "NaN"]);
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_table(&dir.path().join("nope.xlsx"), None).unwrap_err();
        assert!(matches!(err, FarmaciaError::InputNotFound(_)));
    }

    #[test]
    fn test_load_rejects_unknown_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(dir.path(), "in.txt", "tipo\n");
        let err = load_table(&path, None).unwrap_err();
        assert!(matches!(err, FarmaciaError::InputFormat(_)));
    }

    #[test]
    fn test_load_rejects_corrupt_workbook() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(dir.path(), "in.xlsx", "this is not a zip archive");
        let err = load_table(&path, None).unwrap_err();
        assert!(matches!(err, FarmaciaError::InputFormat(_)));
    }

    #[test]
    fn test_load_xlsx() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("in.xlsx");
        let mut workbook = rust_xlsxwriter::Workbook::new();
        let sheet = workbook.add_worksheet();
        sheet.write_string(0, 0, " GFH ").unwrap();
        sheet.write_string(0, 1, "PML_UH").unwrap();
        sheet.write_number(1, 0, 1001.0).unwrap();
        sheet.write_number(1, 1, 2.5).unwrap();
        workbook.save(&path).unwrap();

        let table = load_table(&path, None).unwrap();
        assert_eq!(table.columns(), &["gfh", "pml_uh"]);
        let row: Vec<_> = table.rows().next().unwrap().to_vec();
        assert_eq!(row[0].as_text().as_deref(), Some("1001"));
        assert_eq!(row[1], Value::Number(2.5));
    }

    #[test]
    fn test_load_xlsx_unknown_sheet() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("in.xlsx");
        let mut workbook = rust_xlsxwriter::Workbook::new();
        workbook.add_worksheet().write_string(0, 0, "gfh").unwrap();
        workbook.save(&path).unwrap();
        let err = load_table(&path, Some("Hoja9")).unwrap_err();
        assert!(matches!(err, FarmaciaError::InputFormat(_)));
    }
}
