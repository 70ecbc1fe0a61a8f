// SPDX-License-Identifier: GPL-3.0-only

//! Notification surface for decoded text and user-facing messages

use crate::scanner::Scan;
use std::io::Write;
use tracing::info;

/// Shows scan results and messages to the user
pub trait Notifier: Send + Sync {
    /// Show decoded text; stays visible until the user dismisses it
    fn show_scan(&self, scan: &Scan);

    /// Show a transient message (permission denied, errors)
    fn show_message(&self, message: &str);
}

/// Prints notifications to the terminal
///
/// Scan results go to stdout so they can be piped; messages go to stderr.
#[derive(Debug, Default, Clone, Copy)]
pub struct TerminalNotifier;

impl Notifier for TerminalNotifier {
    fn show_scan(&self, scan: &Scan) {
        info!(format = %scan.format, text = %scan.text, "Code found");
        let mut stdout = std::io::stdout().lock();
        let _ = writeln!(stdout, "[{}] {}", scan.format, scan.text);
        let _ = stdout.flush();
    }

    fn show_message(&self, message: &str) {
        eprintln!("{}", message);
    }
}
