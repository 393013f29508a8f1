use std::path::Path;

use rusqlite::Connection;

use crate::error::{FarmaciaError, Result};

pub const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS unidad (
    tipo         TEXT NOT NULL,
    denominacion TEXT NOT NULL,
    gfh          TEXT NOT NULL UNIQUE PRIMARY KEY
);

CREATE TABLE IF NOT EXISTS producto (
    espec  TEXT NOT NULL UNIQUE PRIMARY KEY,
    nombre TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS movimiento (
    id             INTEGER PRIMARY KEY AUTOINCREMENT,
    unidad_gfh     TEXT NOT NULL,
    producto_espec TEXT NOT NULL,
    tipo_e_s       TEXT CHECK (tipo_e_s IN ('E', 'S')) NOT NULL,
    fecha          DATETIME DEFAULT CURRENT_TIMESTAMP,
    FOREIGN KEY (unidad_gfh) REFERENCES unidad (gfh),
    FOREIGN KEY (producto_espec) REFERENCES producto (espec)
);

CREATE TABLE IF NOT EXISTS detalle_movimiento (
    id            INTEGER PRIMARY KEY AUTOINCREMENT,
    movimiento_id INTEGER NOT NULL,
    canal         TEXT CHECK (canal IN ('uh', 'ex', 'dis', 'es', 'imp')) NOT NULL,
    unidades      INTEGER,
    pml           DECIMAL(15, 4),
    pvf           DECIMAL(15, 4),
    pmf           DECIMAL(15, 4),
    pvl           DECIMAL(15, 4),
    pvp           DECIMAL(15, 4),
    FOREIGN KEY (movimiento_id) REFERENCES movimiento (id)
);

CREATE TABLE IF NOT EXISTS carga (
    id       INTEGER PRIMARY KEY AUTOINCREMENT,
    archivo  TEXT NOT NULL,
    checksum TEXT NOT NULL,
    filas    INTEGER NOT NULL,
    fecha    DATETIME DEFAULT CURRENT_TIMESTAMP
);
";

/// Tables holding loaded inventory data, in dependency order.
pub const DATA_TABLES: &[&str] = &["unidad", "producto", "movimiento", "detalle_movimiento"];

pub fn get_connection(db_path: &Path) -> Result<Connection> {
    let open = || -> rusqlite::Result<Connection> {
        let conn = Connection::open(db_path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
        Ok(conn)
    };
    open().map_err(|source| FarmaciaError::StoreConnection {
        path: db_path.to_path_buf(),
        source,
    })
}

pub fn init_db(conn: &Connection) -> Result<()> {
    conn.execute_batch(SCHEMA)?;
    Ok(())
}

pub fn table_exists(conn: &Connection, table: &str) -> Result<bool> {
    let mut stmt = conn.prepare("SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1")?;
    Ok(stmt.exists([table])?)
}

pub fn count_rows(conn: &Connection, table: &str) -> Result<i64> {
    let count = conn.query_row(&format!("SELECT count(*) FROM {table}"), [], |r| r.get(0))?;
    Ok(count)
}
