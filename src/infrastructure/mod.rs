#[cfg(unix)]
pub mod daemon;
pub mod imap;
pub mod logging;
