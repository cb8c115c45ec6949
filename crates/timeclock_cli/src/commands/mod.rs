//! CLI command implementations.

pub mod clock;
pub mod hours;
pub mod login;
pub mod profile;
pub mod records;
pub mod status;
pub mod timesheet;
pub mod verify;

use timeclock_client::Navigator;

/// Tells the user to sign in again after the server rejected the session.
pub struct LoginPrompt;

impl Navigator for LoginPrompt {
    fn route_to_login(&self) {
        eprintln!("Session expired. Sign in again with `timeclock login --code <code>`.");
    }
}
