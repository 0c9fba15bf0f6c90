use std::path::PathBuf;

use crate::commands::{lookup_sources, write_output};
use crate::println_pad;
use crate::utils::config::AppConfig;
use crate::utils::{print_status, Status};
use colored::Colorize;
use miette::Result;

pub struct ExtractArgs {
    pub paths: Vec<String>,
    pub sources: Vec<String>,
    pub output_dir: String,
}

/// Extracts each path from the first source that has it.
pub fn extract_paths(args: ExtractArgs, config: &AppConfig) -> Result<()> {
    let sources = lookup_sources(&args.sources, config)?;
    let output_dir = PathBuf::from(&args.output_dir);

    println_pad!(
        "{} {}",
        "📁 Extracting to:".bright_yellow(),
        output_dir.display().to_string().bright_white().bold()
    );

    let paths: Vec<&str> = args.paths.iter().map(String::as_str).collect();
    let found = ltk_archive::extract(&paths, &sources);

    let mut missing = 0;
    for (path, data) in paths.iter().zip(found) {
        match data {
            Some(data) => {
                write_output(&output_dir.join(path), &data)?;
                print_status(Status::Good, path);
            }
            None => {
                missing += 1;
                print_status(Status::Missing, path);
            }
        }
    }

    if missing == 0 {
        println_pad!("{}", "✅ Extraction complete!".bright_green().bold());
    } else {
        println_pad!(
            "{}",
            format!("⚠️  {missing} path(s) not found in any source").bright_yellow()
        );
    }
    Ok(())
}
