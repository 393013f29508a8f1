use std::path::Path;

use crate::db::{get_connection, init_db};
use crate::error::Result;

pub fn run(db_path: &Path) -> Result<()> {
    if let Some(dir) = db_path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)?;
    }
    let conn = get_connection(db_path)?;
    init_db(&conn)?;
    println!("Initialized store at {}", db_path.display());
    Ok(())
}
