//! Status command implementation.

use timeclock_client::AppContext;
use timeclock_protocol::{date_of, format_time, now_millis};

/// Runs the status command.
pub async fn run(ctx: &AppContext) -> Result<(), Box<dyn std::error::Error>> {
    let report = ctx.start().await?;

    println!("Timeclock Status");
    println!("================");
    println!();
    match ctx.session().user() {
        Some(user) if report.authenticated => {
            println!("User:    {} ({})", user.nick_name.as_deref().unwrap_or(&user.id), user.role);
        }
        _ => println!("User:    not signed in"),
    }
    println!("Status:  clocked {}", report.status);

    if let Some(last) = ctx.records().head() {
        println!(
            "Last:    {} at {} on {} ({:?})",
            last.action,
            format_time(last.timestamp),
            last.date,
            last.sync_state
        );
    }

    let today = date_of(now_millis());
    println!("Today:   {:.2} h", ctx.records().worked_hours_on(&today));
    println!();
    println!(
        "Records: {} cached{}",
        ctx.records().len(),
        if report.refreshed { ", refreshed from server" } else { " (offline)" }
    );
    Ok(())
}
