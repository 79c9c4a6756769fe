use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};

/// Byte-counting bar for downloads of known size.
pub fn create_transfer_progress(total: u64) -> ProgressBar {
    let pb = ProgressBar::new(total);
    let style = ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({bytes_per_sec}, {eta})")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ");
    pb.set_style(style);
    pb
}

/// Ticking spinner for calls with no measurable progress (listing, upload, token exchange).
///
/// `quiet` hides it entirely, for `--json` output.
pub fn create_spinner(msg: &str, quiet: bool) -> ProgressBar {
    let pb = if quiet {
        ProgressBar::hidden()
    } else {
        ProgressBar::new_spinner()
    };
    pb.set_message(msg.to_string());
    if !quiet {
        pb.enable_steady_tick(Duration::from_millis(100));
    }
    pb
}
