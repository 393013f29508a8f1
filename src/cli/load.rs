use colored::Colorize;

use crate::error::Result;
use crate::fmt::number;
use crate::pipeline::{self, RunConfig};

pub fn run(config: &RunConfig) -> Result<()> {
    let report = pipeline::run(config)?;

    println!("{}", "Load complete.".green().bold());
    println!("Rows read:          {}", number(report.rows_read));
    println!("Units added:        {}", number(report.units_inserted));
    println!("Products added:     {}", number(report.products_inserted));
    println!("Movements added:    {}", number(report.movements_inserted));
    println!("Details added:      {}", number(report.details_inserted));
    if report.previously_loaded {
        println!(
            "{}",
            "This file had been loaded before; its movements are now duplicated.".yellow()
        );
    }
    println!("Store:              {}", config.db.display());
    Ok(())
}
