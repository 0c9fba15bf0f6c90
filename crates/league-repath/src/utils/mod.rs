use std::path::{Path, PathBuf};

use colored::Colorize;

pub mod config;

#[macro_export]
macro_rules! println_pad {
    ($($arg:tt)*) => {{
        let __s = format!($($arg)*);
        for __line in __s.lines() {
            println!("    {}", __line);
        }
    }};
}

/// Status tag printed in front of per-reference result lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Good,
    Fixed,
    Missing,
}

impl Status {
    pub fn tag(self) -> colored::ColoredString {
        match self {
            Status::Good => "[GOOD]".bright_green().bold(),
            Status::Fixed => "[FIXD]".bright_yellow().bold(),
            Status::Missing => "[MISS]".bright_red().bold(),
        }
    }
}

pub fn print_status(status: Status, message: impl std::fmt::Display) {
    println_pad!("{} {}", status.tag(), message);
}

/// `<parent>/<stem><suffix>`, or just `<stem><suffix>` for a bare file name.
pub fn sibling_with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string());
    path.with_file_name(format!("{stem}{suffix}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sibling_suffix() {
        assert_eq!(
            sibling_with_suffix(Path::new("mods/skin0.bin"), "_fixed"),
            PathBuf::from("mods/skin0_fixed")
        );
        assert_eq!(
            sibling_with_suffix(Path::new("skin0.bin"), ".json"),
            PathBuf::from("skin0.json")
        );
    }
}
