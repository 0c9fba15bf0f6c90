use std::path::{Path, PathBuf};

use crate::commands::{lookup_sources, read_input, write_output};
use crate::errors::CliError;
use crate::println_pad;
use crate::utils::config::AppConfig;
use crate::utils::{print_status, sibling_with_suffix, Status};
use camino::{Utf8Path, Utf8PathBuf};
use colored::Colorize;
use ltk_archive::{ArchiveWriter, PackOptions};
use ltk_bin::PropertyTree;
use ltk_repath::{
    fix_shader_links, PathCorpus, PathFixer, PipelineOptions, ResolutionPipeline, ResolveMode,
    ResolveReport, ShaderTable, Staging,
};
use miette::Result;

/// Where the game keeps its shader definitions.
const SHADERS_BIN: &str = "data/shaders/shaders.bin";

pub struct FixArgs {
    pub input: String,
    pub sources: Vec<String>,
    pub output_dir: Option<String>,
    pub extract: bool,
    pub prefix: Option<String>,
    pub hashes: Option<String>,
    pub shader_hashes: Option<String>,
    pub shaders_bin: Option<String>,
    pub prefix_percent: Option<f64>,
    pub no_fallback: bool,
    pub pack: Option<String>,
}

pub fn fix_property_bin(args: FixArgs, config: &AppConfig) -> Result<()> {
    let input = PathBuf::from(&args.input);
    let mut tree = decode(&input)?;
    let sources = lookup_sources(&args.sources, config)?;
    let output_dir = args
        .output_dir
        .map(PathBuf::from)
        .unwrap_or_else(|| sibling_with_suffix(&input, "_fixed"));

    println_pad!(
        "{} {}",
        "🔧 Fixing references in:".bright_blue().bold(),
        input.display().to_string().bright_cyan().bold()
    );

    // Dropped at the end of this function, removing anything staged.
    let mut staging = Staging::new().map_err(CliError::from)?;
    let staged = staging.stage_sources(&sources).map_err(CliError::from)?;

    let mut corpus = PathCorpus::new();
    if !args.no_fallback {
        let hashes = args
            .hashes
            .map(Utf8PathBuf::from)
            .or_else(|| config.hashes_path.clone());
        if let Some(hashes) = hashes {
            load_corpus(&mut corpus, &hashes)?;
        }
        let merged = corpus.merge(staging.observed_paths());
        tracing::debug!("Corpus ready paths={} from_sources={}", corpus.len(), merged);
    }

    let mut rules = config.repath_rules();
    if let Some(prefix) = args.prefix {
        rules.prefix = prefix;
    }
    let options = PipelineOptions {
        mode: if args.extract {
            ResolveMode::Extract
        } else {
            ResolveMode::Locate
        },
        base_name_fallback: !args.no_fallback,
        prefix_fallback: !args.no_fallback,
        prefix_percent: args.prefix_percent.unwrap_or(config.prefix_percent),
    };

    let mut pipeline = ResolutionPipeline::new(options).with_fixer(PathFixer::new(rules));
    if !corpus.is_empty() {
        pipeline = pipeline.with_corpus(&corpus);
    }
    let (_, report) = pipeline.run(&mut tree, &staged, &output_dir);
    print_report(&report);

    let shader_listing = args
        .shader_hashes
        .map(Utf8PathBuf::from)
        .or_else(|| config.shader_hashes_path.clone());
    if let Some(listing) = shader_listing {
        fix_shaders(&mut tree, &listing, args.shaders_bin.as_deref(), &staged)?;
    }

    let file_name = input
        .file_name()
        .map(|n| Path::new(n).with_extension("bin"))
        .unwrap_or_else(|| PathBuf::from("fixed.bin"));
    let output_file = output_dir.join(file_name);
    let encoded = ltk_bin::to_bytes(&tree).map_err(|e| CliError::invalid_property_bin(&input, e))?;
    write_output(&output_file, &encoded)?;

    println_pad!(
        "{} {} {}",
        "✅ Wrote property bin:".bright_green().bold(),
        output_file.display().to_string().bright_white().bold(),
        format!(
            "({} resolved, {} unresolved)",
            report.resolved.len(),
            report.unresolved.len()
        )
        .dimmed()
    );

    if let Some(pack) = args.pack {
        let pack = PathBuf::from(pack);
        let summary = ArchiveWriter::from_directory(&output_dir, &PackOptions::default())
            .and_then(|writer| writer.write_to_file(&pack))
            .map_err(|e| CliError::archive_failed(&pack, e))?;
        println_pad!(
            "{} {} {}",
            "📦 Packed output:".bright_blue().bold(),
            pack.display().to_string().bright_white().bold(),
            format!("({} entries)", summary.entries).dimmed()
        );
    }

    Ok(())
}

/// Binary bins decode directly; `.json` inputs go through the document form.
fn decode(input: &Path) -> Result<PropertyTree> {
    let bytes = read_input(input)?;
    let is_document = input
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
    if is_document {
        let text = String::from_utf8_lossy(&bytes);
        return Ok(ltk_bin::text::from_json_str(&text)
            .map_err(|e| CliError::invalid_document(input, e))?);
    }
    Ok(ltk_bin::from_bytes(&bytes).map_err(|e| CliError::invalid_property_bin(input, e))?)
}

fn load_corpus(corpus: &mut PathCorpus, hashes: &Utf8Path) -> Result<()> {
    println_pad!(
        "{} {}",
        "📖 Loading path listing from:".bright_cyan(),
        hashes.as_str().bright_white()
    );
    let added = if hashes.is_dir() {
        corpus.add_from_dir(hashes)
    } else {
        corpus.add_from_file(hashes)
    };
    match added {
        Ok(added) => tracing::info!("Loaded path corpus paths={}", added),
        // The exact pass still works without a corpus.
        Err(err) => println_pad!(
            "{} {}",
            "   Warning: Failed to load path listing:".bright_yellow(),
            err.to_string().bright_red()
        ),
    }
    Ok(())
}

fn print_report(report: &ResolveReport) {
    for resolved in &report.resolved {
        if resolved.original == resolved.path {
            print_status(Status::Good, &resolved.path);
        } else {
            print_status(
                Status::Fixed,
                format!("{} -> {}", resolved.original, resolved.path),
            );
        }
    }
    for missing in &report.unresolved {
        print_status(Status::Missing, missing);
    }
    for omission in &report.omissions {
        println_pad!(
            "{} {} {}",
            "   Skipped source:".bright_yellow(),
            omission.source.display().to_string().bright_white(),
            format!("({})", omission.reason).dimmed()
        );
    }
}

fn fix_shaders(
    tree: &mut PropertyTree,
    listing: &Utf8Path,
    shaders_bin: Option<&str>,
    sources: &[PathBuf],
) -> Result<()> {
    let mut table = ShaderTable::from_file(listing).map_err(CliError::from)?;

    let bytes = match shaders_bin {
        Some(path) => read_input(Path::new(path))?,
        None => match ltk_archive::extract(&[SHADERS_BIN], sources).pop().flatten() {
            Some(bytes) => bytes,
            None => {
                tracing::warn!("Shader definitions not found in any source path={}", SHADERS_BIN);
                return Ok(());
            }
        },
    };
    let shaders =
        ltk_bin::from_bytes(&bytes).map_err(|e| CliError::invalid_property_bin(SHADERS_BIN, e))?;
    table.mark_existing(&shaders);

    let report = fix_shader_links(tree, &table).map_err(CliError::from)?;
    for (from, to) in &report.replaced {
        print_status(Status::Fixed, format!("{from} -> {to}"));
    }
    for missing in &report.unresolved {
        print_status(Status::Missing, missing);
    }
    Ok(())
}
