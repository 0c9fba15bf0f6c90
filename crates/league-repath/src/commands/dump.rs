use std::path::{Path, PathBuf};

use crate::commands::{read_input, write_output};
use crate::errors::CliError;
use crate::println_pad;
use colored::Colorize;
use miette::Result;

pub struct DumpArgs {
    pub input: String,
    pub output: Option<String>,
}

/// Writes a property bin as its JSON document form, or prints it.
pub fn dump_property_bin(args: DumpArgs) -> Result<()> {
    let input = PathBuf::from(&args.input);
    let bytes = read_input(&input)?;
    let tree = ltk_bin::from_bytes(&bytes).map_err(|e| CliError::invalid_property_bin(&input, e))?;
    let json = ltk_bin::text::to_json_string(&tree)
        .map_err(|e| CliError::invalid_property_bin(&input, e))?;

    match args.output {
        Some(output) => {
            write_output(Path::new(&output), json.as_bytes())?;
            println_pad!(
                "{} {}",
                "✅ Wrote document:".bright_green().bold(),
                output.bright_white().bold()
            );
        }
        None => println!("{json}"),
    }
    Ok(())
}
