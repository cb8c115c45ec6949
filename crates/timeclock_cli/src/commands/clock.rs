//! Clock command implementation.

use timeclock_client::AppContext;
use timeclock_protocol::{format_time, ClockAction};

/// Runs the clock command.
pub async fn run(ctx: &AppContext) -> Result<(), Box<dyn std::error::Error>> {
    let record = ctx.toggle().await?;

    let verb = match record.action {
        ClockAction::ClockIn => "Clocked in",
        ClockAction::ClockOut => "Clocked out",
    };
    println!("✓ {} at {} on {} (record {})", verb, format_time(record.timestamp), record.date, record.id);
    if let Some(location) = record.location {
        println!(
            "  Location: {:.5}, {:.5} (±{:.0} m)",
            location.latitude, location.longitude, location.accuracy
        );
    }
    if record.action == ClockAction::ClockOut {
        println!("  Worked today: {:.2} h", ctx.records().worked_hours_on(&record.date));
    }
    Ok(())
}
