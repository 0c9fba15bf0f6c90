use camino::Utf8PathBuf;
use clap::builder::{styling::AnsiColor, Styles};
use clap::ColorChoice;
use clap::{CommandFactory, FromArgMatches, Parser, Subcommand};
use commands::{
    build_property_bin, dump_property_bin, extract_paths, fix_property_bin, pack_archive,
    BuildArgs, DumpArgs, ExtractArgs, FixArgs, PackArgs,
};
use miette::Result;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;
mod errors;
mod utils;

const DEFAULT_LOG_FILTER: &str = "league_repath=info,ltk_repath=info,ltk_archive=info,ltk_bin=warn";
const VERBOSE_LOG_FILTER: &str =
    "league_repath=debug,ltk_repath=debug,ltk_archive=debug,ltk_bin=debug";

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to a repath.toml configuration file
    #[arg(long, global = true)]
    config: Option<Utf8PathBuf>,

    /// Log debug output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Pack a folder into a WAD archive
    Pack {
        /// The folder to pack
        input_dir: String,

        /// The archive to write (defaults to <folder>.wad.client)
        #[arg(short, long)]
        output: Option<String>,

        /// Store every file uncompressed
        #[arg(long)]
        no_compress: bool,

        /// Zstd compression level
        #[arg(long, default_value_t = 3)]
        level: i32,
    },
    /// Extract paths from the first archive that contains them
    Extract {
        /// Archive-relative paths to extract
        #[arg(required = true)]
        paths: Vec<String>,

        /// Archives to search, in priority order
        #[arg(short, long = "source")]
        sources: Vec<String>,

        /// The directory to extract to
        #[arg(short, long, default_value = "extracted")]
        output_dir: String,
    },
    /// Print or write a property bin as a JSON document
    Dump {
        /// The property bin to read
        input: String,

        /// The JSON file to write (prints to stdout when omitted)
        #[arg(short, long)]
        output: Option<String>,
    },
    /// Encode a JSON document into a property bin
    Build {
        /// The JSON document to read
        input: String,

        /// The property bin to write (defaults to <input>.bin)
        #[arg(short, long)]
        output: Option<String>,
    },
    /// Resolve dangling asset references in a property bin
    Fix {
        /// The property bin (or JSON document) to fix
        input: String,

        /// Archives or loose folders to search, in priority order
        #[arg(short, long = "source")]
        sources: Vec<String>,

        /// The directory to write the fixed bin and extracted files to
        #[arg(short, long)]
        output_dir: Option<String>,

        /// Copy found files into the output directory under repathed names
        #[arg(short, long)]
        extract: bool,

        /// Prefix inserted into repathed output paths
        #[arg(long)]
        prefix: Option<String>,

        /// Path listing (file or folder) used when exact lookups miss
        #[arg(long)]
        hashes: Option<String>,

        /// Shader listing used to replace links to removed shaders
        #[arg(long)]
        shader_hashes: Option<String>,

        /// shaders.bin to check shader links against (read from the sources when omitted)
        #[arg(long)]
        shaders_bin: Option<String>,

        /// Share of the path used for prefix matching, in percent
        #[arg(long)]
        prefix_percent: Option<f64>,

        /// Only accept exact matches
        #[arg(long)]
        no_fallback: bool,

        /// Pack the output directory into this archive afterwards
        #[arg(long)]
        pack: Option<String>,
    },
}

fn parse_args() -> Args {
    // Configure colored/styled help output
    let styles = Styles::styled()
        .header(AnsiColor::Yellow.on_default().bold())
        .usage(AnsiColor::Green.on_default().bold())
        .literal(AnsiColor::Cyan.on_default())
        .placeholder(AnsiColor::Blue.on_default());

    let matches = Args::command()
        .styles(styles)
        .color(ColorChoice::Auto)
        .get_matches();

    Args::from_arg_matches(&matches).unwrap_or_else(|err| err.exit())
}

fn init_logging(verbose: bool) {
    let default_filter = if verbose {
        VERBOSE_LOG_FILTER
    } else {
        DEFAULT_LOG_FILTER
    };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| default_filter.into());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .init();
}

fn main() -> Result<()> {
    let args = parse_args();
    init_logging(args.verbose);
    let config = utils::config::load_config(args.config.as_deref());

    match args.command {
        Commands::Pack {
            input_dir,
            output,
            no_compress,
            level,
        } => pack_archive(PackArgs {
            input_dir,
            output,
            no_compress,
            level,
        }),
        Commands::Extract {
            paths,
            sources,
            output_dir,
        } => extract_paths(
            ExtractArgs {
                paths,
                sources,
                output_dir,
            },
            &config,
        ),
        Commands::Dump { input, output } => dump_property_bin(DumpArgs { input, output }),
        Commands::Build { input, output } => build_property_bin(BuildArgs { input, output }),
        Commands::Fix {
            input,
            sources,
            output_dir,
            extract,
            prefix,
            hashes,
            shader_hashes,
            shaders_bin,
            prefix_percent,
            no_fallback,
            pack,
        } => fix_property_bin(
            FixArgs {
                input,
                sources,
                output_dir,
                extract,
                prefix,
                hashes,
                shader_hashes,
                shaders_bin,
                prefix_percent,
                no_fallback,
                pack,
            },
            &config,
        ),
    }
}
