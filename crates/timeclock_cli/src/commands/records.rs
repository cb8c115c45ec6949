//! Records command implementation.

use timeclock_client::AppContext;
use timeclock_protocol::{format_time, ClockRecord};

/// Runs the records command.
pub async fn run(
    ctx: &AppContext,
    refresh: bool,
    limit: Option<usize>,
    format: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    if refresh {
        let count = ctx.refresh_records().await?;
        tracing::info!(count, "records refreshed");
    }

    let mut records = ctx.records().records();
    if let Some(limit) = limit {
        records.truncate(limit);
    }

    match format {
        "json" => {
            println!("{}", serde_json::to_string_pretty(&records)?);
        }
        _ => {
            print_text_output(&records);
        }
    }

    Ok(())
}

fn print_text_output(records: &[ClockRecord]) {
    if records.is_empty() {
        println!("No records");
        return;
    }

    println!("{:<12} {:<6} {:<10} {:<10} ID", "Date", "Time", "Action", "State");
    for record in records {
        println!(
            "{:<12} {:<6} {:<10} {:<10} {}",
            record.date,
            format_time(record.timestamp),
            record.action.as_str(),
            format!("{:?}", record.sync_state).to_lowercase(),
            record.id
        );
    }
}
