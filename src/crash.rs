//! Fatal error reporting

use std::fmt::Display;

use log::error;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub fn generate_crash_report(reason: &dyn Display) -> String {
    format!(
        "tilecs {} crash report\n\n\
        Local time: {}\n\
        Build type: {}\n\n\
        {}",
        VERSION,
        chrono::Local::now(),
        if cfg!(debug_assertions) { "Debug" } else { "Release" },
        reason,
    )
}

/// Logs a crash report for `reason` and takes the process down.
///
/// Used for conditions the store cannot recover from locally, such as a
/// failed pool allocation.
#[cold]
pub fn fatal(reason: impl Display) -> ! {
    error!("{}", generate_crash_report(&reason));
    panic!("fatal: {reason}");
}
