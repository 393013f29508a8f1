use std::path::Path;

use crate::error::Result;
use crate::settings::{load_settings, save_settings};

pub fn run(
    settings_file: &Path,
    input: Option<String>,
    db: Option<String>,
    sheet: Option<String>,
) -> Result<()> {
    let mut settings = load_settings(settings_file)?;
    if input.is_some() {
        settings.input_path = input;
    }
    if db.is_some() {
        settings.db_path = db;
    }
    if sheet.is_some() {
        settings.sheet = sheet;
    }
    save_settings(settings_file, &settings)?;

    let show = |v: &Option<String>| v.clone().unwrap_or_else(|| "(default)".to_string());
    println!("Settings saved to {}", settings_file.display());
    println!("Input:   {}", show(&settings.input_path));
    println!("Store:   {}", show(&settings.db_path));
    println!("Sheet:   {}", show(&settings.sheet));
    Ok(())
}
