use comfy_table::{Cell, Table};

use crate::cli::{open_db, today};
use crate::error::Result;
use crate::fmt::money;
use crate::reports::{donations_by_month, upcoming_followups, DEFAULT_FOLLOWUP_LIMIT};

pub fn trend(months: u32) -> Result<()> {
    let conn = open_db()?;
    let totals = donations_by_month(&conn, months, today())?;

    let mut table = Table::new();
    table.set_header(vec!["Month", "Raised"]);
    let mut sum = 0i64;
    for m in &totals {
        sum += m.total_cents;
        table.add_row(vec![Cell::new(&m.month_key), Cell::new(money(m.total_cents))]);
    }
    table.add_row(vec![Cell::new("Total"), Cell::new(money(sum))]);
    println!("Giving Trend\n{table}");
    Ok(())
}

pub fn followups(days: i64) -> Result<()> {
    let conn = open_db()?;
    let due = upcoming_followups(&conn, days, today(), DEFAULT_FOLLOWUP_LIMIT)?;
    if due.is_empty() {
        println!("No follow-ups due in the next {days} day(s).");
        return Ok(());
    }

    let mut table = Table::new();
    table.set_header(vec!["Due", "Donor", "Type", "Next Step", "Owner"]);
    for e in &due {
        table.add_row(vec![
            Cell::new(e.follow_up_date.as_deref().unwrap_or("")),
            Cell::new(&e.donor_name),
            Cell::new(&e.engagement_type),
            Cell::new(e.next_step.as_deref().unwrap_or(&e.summary)),
            Cell::new(e.owner.as_deref().unwrap_or("")),
        ]);
    }
    println!("Upcoming Follow-ups\n{table}");
    Ok(())
}
