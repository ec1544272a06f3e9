//! Scanning progress display
//!
//! A single indicatif spinner on stderr that shows how many list lines have been read and
//! which path is being checked. It is hidden in quiet mode and when stderr is not a
//! terminal, so piped runs only carry log output.

use std::time::Duration;

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

/// Build the scanning spinner
pub fn scan_spinner(enabled: bool) -> ProgressBar {
    let is_terminal = atty::is(atty::Stream::Stderr);
    if !enabled || !is_terminal {
        return ProgressBar::with_draw_target(None, ProgressDrawTarget::hidden());
    }

    let spinner = ProgressBar::new_spinner();
    if let Ok(style) =
        ProgressStyle::default_spinner().template("{spinner:.green} [{elapsed}] {pos} lines {msg}")
    {
        spinner.set_style(style.tick_strings(&["◐", "◓", "◑", "◒", "●"]));
    }
    spinner.enable_steady_tick(Duration::from_millis(120));
    spinner
}
