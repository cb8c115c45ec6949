//! Hours command implementation.

use timeclock_client::AppContext;
use timeclock_protocol::{date_of, now_millis};

/// Runs the hours command.
pub fn run(ctx: &AppContext, date: Option<&str>) -> Result<(), Box<dyn std::error::Error>> {
    let date = match date {
        Some(date) => date.to_string(),
        None => date_of(now_millis()),
    };
    let hours = ctx.records().worked_hours_on(&date);
    println!("{date}: {hours:.2} h");
    Ok(())
}
