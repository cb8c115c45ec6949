//! Login and logout command implementations.

use timeclock_client::AppContext;

/// Runs the login command.
pub async fn run(ctx: &AppContext, code: &str) -> Result<(), Box<dyn std::error::Error>> {
    let user = ctx.login(code).await?;
    println!("✓ Signed in as {} ({})", user.nick_name.as_deref().unwrap_or(&user.id), user.role);
    println!("  Status: {}", ctx.records().status());
    Ok(())
}

/// Runs the logout command.
pub fn logout(ctx: &AppContext) -> Result<(), Box<dyn std::error::Error>> {
    if !ctx.session().is_authenticated() {
        println!("Not signed in");
        return Ok(());
    }
    ctx.logout()?;
    println!("✓ Signed out, local cache cleared");
    Ok(())
}
