//! Profile command implementation.

use timeclock_client::AppContext;

/// Runs the profile command.
pub async fn run(ctx: &AppContext) -> Result<(), Box<dyn std::error::Error>> {
    let profile = ctx.api().profile().await?;

    println!("ID:     {}", profile.id);
    println!("Role:   {}", profile.role);
    if let Some(name) = &profile.nick_name {
        println!("Name:   {name}");
    }
    if let Some(avatar) = &profile.avatar_url {
        println!("Avatar: {avatar}");
    }
    Ok(())
}
