use comfy_table::{Cell, Table};

use crate::cli::open_db;
use crate::donors::{add_donor, list_donors};
use crate::error::Result;
use crate::fmt::money;
use crate::models::{DonorType, NewDonor};

pub fn add(donor_type: &str, new: &NewDonor) -> Result<()> {
    let donor_type: DonorType = donor_type.parse()?;
    let conn = open_db()?;
    let id = add_donor(&conn, donor_type, new)?;
    println!("Added donor #{id}");
    Ok(())
}

pub fn list(search: Option<&str>, smart: bool) -> Result<()> {
    let conn = open_db()?;
    let donors = list_donors(&conn, search.unwrap_or(""), smart)?;
    if donors.is_empty() {
        println!("No donors found.");
        return Ok(());
    }

    let mut table = Table::new();
    table.set_header(vec!["ID", "Name", "Type", "Stage", "Email", "Phone", "Total Given", "Last Gift"]);
    for donor in &donors {
        table.add_row(vec![
            Cell::new(donor.id),
            Cell::new(donor.display_name()),
            Cell::new(&donor.donor_type),
            Cell::new(&donor.lifecycle_stage),
            Cell::new(donor.email.as_deref().unwrap_or("")),
            Cell::new(donor.phone.as_deref().unwrap_or("")),
            Cell::new(money(donor.total_given_cents)),
            Cell::new(donor.last_donation_date.as_deref().unwrap_or("")),
        ]);
    }
    println!("Donors\n{table}");
    Ok(())
}
