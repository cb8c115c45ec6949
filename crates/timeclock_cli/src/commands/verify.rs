//! Verify command implementation.

use timeclock_client::AppContext;

/// Runs the verify command.
pub async fn run(ctx: &AppContext) -> Result<(), Box<dyn std::error::Error>> {
    if ctx.session().token().is_none() {
        println!("Not signed in");
        return Err("No session to verify".into());
    }

    if ctx.session().verify_current().await {
        println!("✓ Session is valid");
        Ok(())
    } else {
        println!("✗ Session was rejected or the server could not be reached");
        Err("Verification failed".into())
    }
}
