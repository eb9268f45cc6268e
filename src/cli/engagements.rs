use comfy_table::{Cell, Table};

use crate::cli::open_db;
use crate::engagements::{add_engagement, list_engagements};
use crate::error::Result;
use crate::models::NewEngagement;

pub fn add(new: &NewEngagement) -> Result<()> {
    let conn = open_db()?;
    let id = add_engagement(&conn, new)?;
    println!("Logged engagement #{id}");
    Ok(())
}

pub fn list(donor_id: Option<i64>, limit: i64) -> Result<()> {
    let conn = open_db()?;
    let rows = list_engagements(&conn, donor_id, limit)?;
    if rows.is_empty() {
        println!("No engagements logged.");
        return Ok(());
    }

    let mut table = Table::new();
    table.set_header(vec!["ID", "Date", "Donor", "Type", "Summary", "Next Step", "Follow Up"]);
    for e in &rows {
        table.add_row(vec![
            Cell::new(e.id),
            Cell::new(&e.engagement_date),
            Cell::new(&e.donor_name),
            Cell::new(&e.engagement_type),
            Cell::new(&e.summary),
            Cell::new(e.next_step.as_deref().unwrap_or("")),
            Cell::new(e.follow_up_date.as_deref().unwrap_or("")),
        ]);
    }
    println!("Engagements\n{table}");
    Ok(())
}
