use std::path::PathBuf;

use crate::commands::{read_input, write_output};
use crate::errors::CliError;
use crate::println_pad;
use crate::utils::sibling_with_suffix;
use colored::Colorize;
use miette::Result;

pub struct BuildArgs {
    pub input: String,
    pub output: Option<String>,
}

/// Encodes a JSON document back into a binary property bin.
pub fn build_property_bin(args: BuildArgs) -> Result<()> {
    let input = PathBuf::from(&args.input);
    let bytes = read_input(&input)?;
    let text = String::from_utf8(bytes).map_err(|e| {
        CliError::from(std::io::Error::new(std::io::ErrorKind::InvalidData, e))
    })?;

    let tree = ltk_bin::text::from_json_str(&text).map_err(|e| CliError::invalid_document(&input, e))?;
    let encoded = ltk_bin::to_bytes(&tree).map_err(|e| CliError::invalid_document(&input, e))?;

    let output = args
        .output
        .map(PathBuf::from)
        .unwrap_or_else(|| sibling_with_suffix(&input, ".bin"));
    write_output(&output, &encoded)?;

    println_pad!(
        "{} {} {}",
        "✅ Wrote property bin:".bright_green().bold(),
        output.display().to_string().bright_white().bold(),
        format!("({} bytes)", encoded.len()).dimmed()
    );
    Ok(())
}
