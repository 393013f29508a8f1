use std::path::Path;

use comfy_table::{Cell, Table};

use crate::db::{count_rows, get_connection, table_exists, DATA_TABLES};
use crate::error::{FarmaciaError, Result};
use crate::fmt::{format_bytes, number};

const RECENT_LOADS: i64 = 10;

pub fn run(db_path: &Path) -> Result<()> {
    if !db_path.exists() {
        return Err(FarmaciaError::StoreNotFound(db_path.to_path_buf()));
    }

    println!("Store:   {}", db_path.display());
    println!("Size:    {}", format_bytes(std::fs::metadata(db_path)?.len()));

    let conn = get_connection(db_path)?;

    let mut counts = Table::new();
    counts.set_header(vec!["Table", "Rows"]);
    for name in DATA_TABLES {
        let rows = if table_exists(&conn, name)? {
            number(count_rows(&conn, name)? as usize)
        } else {
            "(missing)".to_string()
        };
        counts.add_row(vec![Cell::new(name), Cell::new(rows)]);
    }
    println!("\n{counts}");

    if !table_exists(&conn, "carga")? {
        println!("\nNo loads recorded.");
        return Ok(());
    }

    let mut stmt = conn.prepare(
        "SELECT fecha, archivo, filas, checksum FROM carga ORDER BY id DESC LIMIT ?1",
    )?;
    let loads: Vec<(Option<String>, String, i64, String)> = stmt
        .query_map([RECENT_LOADS], |row| {
            Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    if loads.is_empty() {
        println!("\nNo loads recorded.");
        return Ok(());
    }

    let mut table = Table::new();
    table.set_header(vec!["Loaded at", "File", "Rows", "Checksum"]);
    for (fecha, archivo, filas, checksum) in loads {
        table.add_row(vec![
            Cell::new(fecha.unwrap_or_default()),
            Cell::new(archivo),
            Cell::new(number(filas as usize)),
            Cell::new(&checksum[..checksum.len().min(12)]),
        ]);
    }
    println!("\nRecent loads\n{table}");
    Ok(())
}
