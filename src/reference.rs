use std::collections::HashSet;
use std::hash::Hash;

use rusqlite::Connection;
use tracing::{debug, info};

use crate::error::Result;
use crate::models::{Product, Unit, Value};
use crate::sheet::Table;

/// Drop repeated items, keeping the first occurrence of each.
fn dedup<T: Eq + Hash + Clone>(items: impl IntoIterator<Item = T>) -> Vec<T> {
    let mut seen = HashSet::new();
    items.into_iter().filter(|item| seen.insert(item.clone())).collect()
}

fn text_at(row: &[Value], idx: Option<usize>) -> Option<String> {
    idx.and_then(|i| row[i].as_text())
}

pub fn extract_units(table: &Table) -> Vec<Unit> {
    let (tipo, denominacion, gfh) = (
        table.column_index("tipo"),
        table.column_index("denominacion"),
        table.column_index("gfh"),
    );
    dedup(table.rows().map(|row| Unit {
        tipo: text_at(row, tipo),
        denominacion: text_at(row, denominacion),
        gfh: text_at(row, gfh),
    }))
}

pub fn extract_products(table: &Table) -> Vec<Product> {
    let (espec, nombre) = (table.column_index("espec"), table.column_index("registrado"));
    dedup(table.rows().map(|row| Product {
        espec: text_at(row, espec),
        nombre: text_at(row, nombre),
    }))
}

/// Insert units, leaving any existing row with the same `gfh` untouched.
/// Returns how many rows were actually added.
pub fn insert_units(conn: &Connection, units: &[Unit]) -> Result<usize> {
    let tx = conn.unchecked_transaction()?;
    let mut inserted = 0usize;
    {
        let mut stmt = tx.prepare_cached(
            "INSERT OR IGNORE INTO unidad (tipo, denominacion, gfh) VALUES (?1, ?2, ?3)",
        )?;
        for unit in units {
            inserted += stmt.execute(rusqlite::params![unit.tipo, unit.denominacion, unit.gfh])?;
        }
    }
    tx.commit()?;
    debug!(candidates = units.len(), inserted, "units stage committed");
    Ok(inserted)
}

pub fn insert_products(conn: &Connection, products: &[Product]) -> Result<usize> {
    let tx = conn.unchecked_transaction()?;
    let mut inserted = 0usize;
    {
        let mut stmt =
            tx.prepare_cached("INSERT OR IGNORE INTO producto (espec, nombre) VALUES (?1, ?2)")?;
        for product in products {
            inserted += stmt.execute(rusqlite::params![product.espec, product.nombre])?;
        }
    }
    tx.commit()?;
    debug!(candidates = products.len(), inserted, "products stage committed");
    Ok(inserted)
}

pub struct ReferenceResult {
    pub units_inserted: usize,
    pub products_inserted: usize,
}

pub fn insert_references(conn: &Connection, table: &Table) -> Result<ReferenceResult> {
    let units = extract_units(table);
    let keys: Vec<&str> = dedup(units.iter().filter_map(|u| u.gfh.as_deref()));
    info!(gfh = ?keys, "unit keys referenced by input");

    let units_inserted = insert_units(conn, &units)?;
    let products_inserted = insert_products(conn, &extract_products(table))?;
    Ok(ReferenceResult {
        units_inserted,
        products_inserted,
    })
}
