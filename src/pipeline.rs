use std::path::{Path, PathBuf};

use rusqlite::Connection;
use sha2::{Digest, Sha256};
use tracing::{info, warn};

use crate::db::{get_connection, init_db};
use crate::error::Result;
use crate::movements::{insert_details, insert_movements, pivot_details, read_channels};
use crate::reference::insert_references;
use crate::sheet::{load_table, Table, REQUIRED_COLUMNS};

/// Paths for one run, resolved once at startup.
#[derive(Debug, Clone, PartialEq)]
pub struct RunConfig {
    pub input: PathBuf,
    pub db: PathBuf,
    pub sheet: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoadReport {
    pub rows_read: usize,
    pub units_inserted: usize,
    pub products_inserted: usize,
    pub movements_inserted: usize,
    pub details_inserted: usize,
    /// The same file contents were loaded before; movements are now duplicated.
    pub previously_loaded: bool,
}

pub fn compute_checksum(file_path: &Path) -> Result<String> {
    let data = std::fs::read(file_path)?;
    let mut hasher = Sha256::new();
    hasher.update(&data);
    Ok(hex::encode(hasher.finalize()))
}

fn was_loaded(conn: &Connection, checksum: &str) -> Result<bool> {
    let mut stmt = conn.prepare("SELECT 1 FROM carga WHERE checksum = ?1")?;
    Ok(stmt.exists([checksum])?)
}

fn record_load(conn: &Connection, file_path: &Path, checksum: &str, rows: usize) -> Result<()> {
    conn.execute(
        "INSERT INTO carga (archivo, checksum, filas) VALUES (?1, ?2, ?3)",
        rusqlite::params![
            file_path.file_name().and_then(|n| n.to_str()).unwrap_or(""),
            checksum,
            rows as i64,
        ],
    )?;
    Ok(())
}

/// Run the store stages for an already loaded table. Each stage commits on
/// its own, so a failure leaves earlier stages in place.
///
/// Not safe to run concurrently with another writer on the same store.
pub fn load_into(conn: &Connection, input: &Path, table: &Table) -> Result<LoadReport> {
    table.require_columns(REQUIRED_COLUMNS)?;
    if table.is_empty() {
        warn!(file = %input.display(), "input has no data rows");
    }

    // every figure is parsed before the first write
    let groups = read_channels(table)?;

    init_db(conn)?;

    let refs = insert_references(conn, table)?;
    info!(
        units = refs.units_inserted,
        products = refs.products_inserted,
        "reference data inserted"
    );

    let checksum = compute_checksum(input)?;
    let previously_loaded = was_loaded(conn, &checksum)?;
    if previously_loaded {
        warn!(
            file = %input.display(),
            "this file was loaded before; its movements and details will be inserted again"
        );
    }

    let ids = insert_movements(conn, table)?;
    info!(movements = ids.len(), "movements inserted");

    let details = pivot_details(&groups, &ids)?;
    let details_inserted = insert_details(conn, &details)?;
    info!(details = details_inserted, "movement details inserted");

    record_load(conn, input, &checksum, table.len())?;

    Ok(LoadReport {
        rows_read: table.len(),
        units_inserted: refs.units_inserted,
        products_inserted: refs.products_inserted,
        movements_inserted: ids.len(),
        details_inserted,
        previously_loaded,
    })
}

pub fn run(config: &RunConfig) -> Result<LoadReport> {
    info!(input = %config.input.display(), db = %config.db.display(), "starting load");
    // a bad input must fail before the store file is created
    let table = load_table(&config.input, config.sheet.as_deref())?;
    table.require_columns(REQUIRED_COLUMNS)?;

    let conn = get_connection(&config.db)?;
    load_into(&conn, &config.input, &table)
}
