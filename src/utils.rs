use indicatif::{ProgressBar, ProgressStyle};

pub const USER_AGENT: &str = concat!("icn-database/", env!("CARGO_PKG_VERSION"));

pub fn progress_bar(len: u64) -> ProgressBar {
    ProgressBar::new(len).with_style(
        ProgressStyle::with_template(
            "[{elapsed_precise}] {human_pos}/{human_len} {percent}% ({per_sec}) {msg}",
        )
        .expect("hardcoded"),
    )
}

/// Trims a spreadsheet cell, treating the `#N/A` placeholder as empty.
pub fn clean_field(raw: &str) -> Option<&str> {
    match raw.trim() {
        "" | "#N/A" => None,
        x => Some(x),
    }
}

pub fn strip_bom(s: &str) -> &str {
    s.strip_prefix('\u{feff}').unwrap_or(s)
}
