use rusqlite::Connection;
use tracing::debug;

use crate::error::{FarmaciaError, Result};
use crate::models::{Channel, ChannelFigures, DetailRow, Direction, Value, ALL_CHANNELS};
use crate::sheet::Table;

// ---------------------------------------------------------------------------
// Phase 1: one movement per input row
// ---------------------------------------------------------------------------

/// Insert a movement for every row, in row order, and return the generated
/// ids in the same order.
pub fn insert_movements(conn: &Connection, table: &Table) -> Result<Vec<i64>> {
    let gfh = table.column_index("gfh");
    let espec = table.column_index("espec");
    let dir_col = table.column_index("tipo_e_s");

    let tx = conn.unchecked_transaction()?;
    let mut ids = Vec::with_capacity(table.len());
    {
        let mut stmt = tx.prepare_cached(
            "INSERT INTO movimiento (unidad_gfh, producto_espec, tipo_e_s) VALUES (?1, ?2, ?3)",
        )?;
        for (i, row) in table.rows().enumerate() {
            let line = i + 2; // 1-based plus the header row
            let raw_dir = dir_col.and_then(|c| row[c].as_text()).unwrap_or_default();
            let direction = Direction::parse(&raw_dir).ok_or_else(|| {
                FarmaciaError::ConstraintViolation(format!(
                    "row {line}: tipo_e_s must be 'E' or 'S', got '{raw_dir}'"
                ))
            })?;
            let unit = gfh.and_then(|c| row[c].as_text());
            let product = espec.and_then(|c| row[c].as_text());

            let changed = stmt
                .execute(rusqlite::params![unit, product, direction.code()])
                .map_err(|e| FarmaciaError::from_insert(e, || format!("row {line}: movement")))?;
            if changed != 1 {
                return Err(FarmaciaError::IdentifierRecoveryMismatch {
                    inserted: table.len(),
                    recovered: ids.len(),
                });
            }
            ids.push(tx.last_insert_rowid());
        }
    }
    if ids.len() != table.len() {
        return Err(FarmaciaError::IdentifierRecoveryMismatch {
            inserted: table.len(),
            recovered: ids.len(),
        });
    }
    tx.commit()?;
    debug!(movements = ids.len(), "movements stage committed");
    Ok(ids)
}

// ---------------------------------------------------------------------------
// Phase 2: wide channel columns to long detail rows
// ---------------------------------------------------------------------------

/// Positions of one channel's columns in the input; `None` when absent.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChannelColumns {
    pub channel: Channel,
    pub unidades: Option<usize>,
    pub pml: Option<usize>,
    pub pmf: Option<usize>,
    pub pvl: Option<usize>,
    pub pvp: Option<usize>,
    pub pvf: Option<usize>,
}

impl ChannelColumns {
    pub fn resolve(table: &Table, channel: Channel) -> Self {
        let find = |field: &str| table.column_index(&channel.column(field));
        Self {
            channel,
            unidades: find("unidades"),
            pml: find("pml"),
            pmf: find("pmf"),
            pvl: find("pvl"),
            pvp: find("pvp"),
            pvf: find("pvf"),
        }
    }

    pub fn is_absent(&self) -> bool {
        [self.unidades, self.pml, self.pmf, self.pvl, self.pvp, self.pvf]
            .iter()
            .all(Option::is_none)
    }

    fn read(&self, table: &Table, row: &[Value], line: usize) -> Result<ChannelFigures> {
        let get = |idx: Option<usize>| -> Result<Option<f64>> {
            let Some(i) = idx else { return Ok(None) };
            row[i].as_number().map_err(|raw| {
                FarmaciaError::InputFormat(format!(
                    "row {line}, column '{}': '{raw}' is not a number",
                    table.columns()[i]
                ))
            })
        };
        Ok(ChannelFigures {
            unidades: get(self.unidades)?,
            pml: get(self.pml)?,
            pmf: get(self.pmf)?,
            pvl: get(self.pvl)?,
            pvp: get(self.pvp)?,
            pvf: get(self.pvf)?,
        })
    }
}

/// Every row's figures for one channel, in input row order.
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelGroup {
    pub channel: Channel,
    pub figures: Vec<ChannelFigures>,
}

/// Parse the figures of every channel. Runs before any movement is written so
/// a bad cell leaves no movement without its details.
pub fn read_channels(table: &Table) -> Result<Vec<ChannelGroup>> {
    let mut groups = Vec::with_capacity(ALL_CHANNELS.len());
    for &channel in ALL_CHANNELS {
        let columns = ChannelColumns::resolve(table, channel);
        if columns.is_absent() {
            debug!(channel = %columns.channel, "no columns for channel, details will be null");
        }
        let figures = table
            .rows()
            .enumerate()
            .map(|(i, row)| columns.read(table, row, i + 2))
            .collect::<Result<Vec<_>>>()?;
        groups.push(ChannelGroup { channel, figures });
    }
    Ok(groups)
}

/// Attach movement ids to the parsed groups, channel-major: every row for
/// `uh`, then every row for `ex`, and so on. `movement_ids[i]` belongs to
/// input row `i`.
pub fn pivot_details(groups: &[ChannelGroup], movement_ids: &[i64]) -> Result<Vec<DetailRow>> {
    let mut details = Vec::with_capacity(groups.len() * movement_ids.len());
    for group in groups {
        if group.figures.len() != movement_ids.len() {
            return Err(FarmaciaError::IdentifierRecoveryMismatch {
                inserted: group.figures.len(),
                recovered: movement_ids.len(),
            });
        }
        details.extend(group.figures.iter().zip(movement_ids).map(|(figures, &movimiento_id)| {
            DetailRow {
                movimiento_id,
                channel: group.channel,
                figures: figures.clone(),
            }
        }));
    }
    Ok(details)
}

pub fn insert_details(conn: &Connection, details: &[DetailRow]) -> Result<usize> {
    let tx = conn.unchecked_transaction()?;
    {
        let mut stmt = tx.prepare_cached(
            "INSERT INTO detalle_movimiento (movimiento_id, canal, unidades, pml, pmf, pvl, pvp, pvf) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        )?;
        for d in details {
            let f = &d.figures;
            stmt.execute(rusqlite::params![
                d.movimiento_id,
                d.channel.tag(),
                f.unidades,
                f.pml,
                f.pmf,
                f.pvl,
                f.pvp,
                f.pvf,
            ])
            .map_err(|e| {
                FarmaciaError::from_insert(e, || {
                    format!("detail for movement {} ({})", d.movimiento_id, d.channel)
                })
            })?;
        }
    }
    tx.commit()?;
    let empty = details.iter().filter(|d| d.figures.is_empty()).count();
    debug!(details = details.len(), empty, "details stage committed");
    Ok(details.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{count_rows, get_connection, init_db};
    use crate::reference::insert_references;

    fn test_db() -> (tempfile::TempDir, Connection) {
        let dir = tempfile::tempdir().unwrap();
        let conn = get_connection(&dir.path().join("test.db")).unwrap();
        init_db(&conn).unwrap();
        (dir, conn)
    }

    fn text(s: &str) -> Value {
        Value::Text(s.to_string())
    }

    fn table_with(extra_headers: &[&str], rows: Vec<Vec<Value>>) -> Table {
        let mut headers: Vec<String> = ["tipo", "denominacion", "gfh", "espec", "registrado", "tipo_e_s"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        headers.extend(extra_headers.iter().map(|s| s.to_string()));
        Table::new(headers, rows)
    }

    fn base_row(gfh: &str, espec: &str, dir: &str) -> Vec<Value> {
        vec![text("H"), text("Unidad"), text(gfh), text(espec), text("Producto"), text(dir)]
    }

    #[test]
    fn test_insert_movements_returns_ids_in_row_order() {
        let (_dir, conn) = test_db();
        let table = table_with(
            &[],
            vec![base_row("A", "X", "E"), base_row("A", "X", "E"), base_row("B", "Y", "S")],
        );
        insert_references(&conn, &table).unwrap();
        let ids = insert_movements(&conn, &table).unwrap();
        assert_eq!(ids.len(), 3);
        assert!(ids.windows(2).all(|w| w[0] < w[1]));

        let last: (String, String) = conn
            .query_row(
                "SELECT unidad_gfh, tipo_e_s FROM movimiento WHERE id = ?1",
                [ids[2]],
                |r| Ok((r.get(0)?, r.get(1)?)),
            )
            .unwrap();
        assert_eq!(last, ("B".to_string(), "S".to_string()));
    }

    #[test]
    fn test_insert_movements_rejects_bad_direction() {
        let (_dir, conn) = test_db();
        let table = table_with(&[], vec![base_row("A", "X", "E"), base_row("A", "X", "Q")]);
        insert_references(&conn, &table).unwrap();
        let err = insert_movements(&conn, &table).unwrap_err();
        assert!(matches!(err, FarmaciaError::ConstraintViolation(ref m) if m.contains("row 3")));
        assert_eq!(count_rows(&conn, "movimiento").unwrap(), 0);
    }

    #[test]
    fn test_insert_movements_rejects_unknown_unit() {
        let (_dir, conn) = test_db();
        let table = table_with(&[], vec![base_row("A", "X", "E")]);
        let err = insert_movements(&conn, &table).unwrap_err();
        assert!(matches!(err, FarmaciaError::ConstraintViolation(_)));
    }

    #[test]
    fn test_channel_columns_resolve() {
        let table = table_with(&["pml_uh", "unidades_uh", "pvf_imp"], vec![]);
        let uh = ChannelColumns::resolve(&table, Channel::Uh);
        assert_eq!(uh.pml, Some(6));
        assert_eq!(uh.unidades, Some(7));
        assert_eq!(uh.pvp, None);
        assert!(ChannelColumns::resolve(&table, Channel::Ex).is_absent());
        assert!(!ChannelColumns::resolve(&table, Channel::Imp).is_absent());
    }

    #[test]
    fn test_pivot_details_is_channel_major_with_nulls() {
        let mut r1 = base_row("A", "X", "E");
        r1.extend([Value::Number(10.0), Value::Number(1.5)]);
        let mut r2 = base_row("B", "Y", "S");
        r2.extend([Value::Number(4.0), Value::Null]);
        let table = table_with(&["unidades_uh", "pml_uh"], vec![r1, r2]);

        let groups = read_channels(&table).unwrap();
        assert_eq!(groups.len(), 5);
        let details = pivot_details(&groups, &[101, 102]).unwrap();
        assert_eq!(details.len(), 10);
        let order: Vec<_> = details.iter().map(|d| (d.channel.tag(), d.movimiento_id)).collect();
        assert_eq!(&order[..4], &[("uh", 101), ("uh", 102), ("ex", 101), ("ex", 102)]);
        assert_eq!(details[0].figures.unidades, Some(10.0));
        assert_eq!(details[0].figures.pml, Some(1.5));
        assert_eq!(details[1].figures.pml, None);
        assert!(details[2..].iter().all(|d| d.figures.is_empty()));
    }

    #[test]
    fn test_read_channels_rejects_non_numeric_price() {
        let mut row = base_row("A", "X", "E");
        row.push(text("caro"));
        let table = table_with(&["pvp_es"], vec![row]);
        let err = read_channels(&table).unwrap_err();
        assert!(matches!(err, FarmaciaError::InputFormat(ref m) if m.contains("pvp_es")));
    }

    #[test]
    fn test_read_channels_accepts_decimal_comma() {
        let mut row = base_row("A", "X", "E");
        row.push(text("1,25"));
        let table = table_with(&["pml_uh"], vec![row]);
        let groups = read_channels(&table).unwrap();
        assert_eq!(groups[0].figures[0].pml, Some(1.25));
    }

    #[test]
    fn test_pivot_details_checks_id_count() {
        let table = table_with(&[], vec![base_row("A", "X", "E")]);
        let groups = read_channels(&table).unwrap();
        let err = pivot_details(&groups, &[]).unwrap_err();
        assert!(matches!(err, FarmaciaError::IdentifierRecoveryMismatch { inserted: 1, recovered: 0 }));
    }

    #[test]
    fn test_insert_details_stores_null_figures() {
        let (_dir, conn) = test_db();
        let mut row = base_row("A", "X", "E");
        row.push(Value::Number(3.0));
        let table = table_with(&["pvl_dis"], vec![row]);
        let groups = read_channels(&table).unwrap();
        insert_references(&conn, &table).unwrap();
        let ids = insert_movements(&conn, &table).unwrap();
        let details = pivot_details(&groups, &ids).unwrap();
        assert_eq!(insert_details(&conn, &details).unwrap(), 5);

        let pvl: Option<f64> = conn
            .query_row("SELECT pvl FROM detalle_movimiento WHERE canal = 'dis'", [], |r| r.get(0))
            .unwrap();
        assert_eq!(pvl, Some(3.0));
        let pml: Option<f64> = conn
            .query_row("SELECT pml FROM detalle_movimiento WHERE canal = 'imp'", [], |r| r.get(0))
            .unwrap();
        assert_eq!(pml, None);
    }
}
