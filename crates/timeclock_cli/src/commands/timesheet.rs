//! Timesheet command implementation.

use std::io::Write;
use std::path::Path;
use timeclock_client::AppContext;
use timeclock_protocol::{DateRange, ExportFormat};

/// Runs the timesheet command.
///
/// Without `export` the summary is printed as JSON.
pub async fn run(
    ctx: &AppContext,
    from: &str,
    to: &str,
    export: Option<ExportFormat>,
    output: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    let range = DateRange::between(from, to);

    let Some(format) = export else {
        let summary = ctx.api().timesheet_summary(&range).await?;
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    };

    let document = ctx.api().export_timesheet(format, &range).await?;
    match output {
        Some(path) => {
            std::fs::write(path, &document)?;
            println!("✓ Wrote {} bytes to {}", document.len(), path.display());
        }
        None => std::io::stdout().write_all(&document)?,
    }
    Ok(())
}
