use std::path::Path;

use colored::Colorize;
use comfy_table::{Cell, Table};

use crate::cli::open_db;
use crate::db::records_for_scan;
use crate::error::Result;
use crate::scanner::{scan, write_findings_csv, FindingFilter, ScanSummary, Severity};

pub fn run(severities: &[String], objects: &[String], keyword: Option<&str>, csv_path: Option<&Path>) -> Result<()> {
    let severities = severities
        .iter()
        .map(|s| s.parse::<Severity>())
        .collect::<Result<Vec<_>>>()?;
    let filter = FindingFilter {
        severities,
        objects: objects.to_vec(),
        keyword: keyword.map(str::to_string),
    };

    let conn = open_db()?;
    let records = records_for_scan(&conn)?;
    let findings = scan(&records);
    let summary = ScanSummary::from_findings(&findings);

    println!(
        "Scanned {} record(s): {} finding(s) across {} record(s) ({} high, {} medium, {} low)",
        records.len(),
        summary.total,
        summary.records_impacted,
        summary.high.to_string().red().bold(),
        summary.medium.to_string().yellow(),
        summary.low,
    );

    let shown = filter.apply(&findings);
    if shown.is_empty() {
        println!("{}", "No findings to show.".green());
    } else {
        let mut table = Table::new();
        table.set_header(vec!["Severity", "Object", "Record", "Field", "Signal", "Conf.", "Match", "Context"]);
        for f in &shown {
            let severity = match f.severity {
                Severity::High => f.severity.as_str().red().bold(),
                Severity::Medium => f.severity.as_str().yellow(),
                Severity::Low => f.severity.as_str().normal(),
            };
            table.add_row(vec![
                Cell::new(severity),
                Cell::new(&f.object_name),
                Cell::new(f.record_id),
                Cell::new(&f.field_name),
                Cell::new(f.signal.label()),
                Cell::new(f.confidence),
                Cell::new(&f.matched_text),
                Cell::new(&f.context),
            ]);
        }
        println!("Findings\n{table}");
    }

    if let Some(path) = csv_path {
        let file = std::fs::File::create(path)?;
        write_findings_csv(&shown, file)?;
        println!("Wrote {} finding(s) to {}", shown.len(), path.display());
    }
    Ok(())
}
