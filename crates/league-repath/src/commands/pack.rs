use std::path::PathBuf;

use crate::errors::CliError;
use crate::println_pad;
use crate::utils::sibling_with_suffix;
use colored::Colorize;
use ltk_archive::{ArchiveWriter, PackOptions};
use miette::Result;

pub struct PackArgs {
    pub input_dir: String,
    pub output: Option<String>,
    pub no_compress: bool,
    pub level: i32,
}

pub fn pack_archive(args: PackArgs) -> Result<()> {
    let input_dir = PathBuf::from(&args.input_dir);
    if !input_dir.is_dir() {
        return Err(CliError::file_not_found(input_dir).into());
    }
    let output = args
        .output
        .map(PathBuf::from)
        .unwrap_or_else(|| sibling_with_suffix(&input_dir, ".wad.client"));

    println_pad!(
        "{} {}",
        "📦 Packing folder:".bright_blue().bold(),
        input_dir.display().to_string().bright_cyan().bold()
    );

    let options = PackOptions {
        compress: !args.no_compress,
        zstd_level: args.level,
    };
    let writer = ArchiveWriter::from_directory(&input_dir, &options)
        .map_err(|e| CliError::archive_failed(&input_dir, e))?;
    let summary = writer
        .write_to_file(&output)
        .map_err(|e| CliError::archive_failed(&output, e))?;

    println_pad!(
        "{} {} {}",
        "🧾 Entries:".bright_yellow(),
        summary.entries.to_string().bright_white().bold(),
        format!(
            "({} unique, {} deduplicated)",
            summary.unique_payloads, summary.deduplicated
        )
        .dimmed()
    );
    println_pad!(
        "{} {}",
        "✅ Wrote archive:".bright_green().bold(),
        output.display().to_string().bright_white().bold()
    );
    Ok(())
}
