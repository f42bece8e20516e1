use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use ziplode::{
    fs_utils::{format_size, simple_cli_error, ziplode_cli_error, CliError},
    generate_file_with_parents, logging, plan_entries, read_archive_file, ArchiveConfig,
    MethodTagPolicy,
};

/// Build and inspect archive amplification demonstrators.
#[derive(Parser)]
#[command(version)]
struct Cli {
    /// Debug level logging (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Write a new archive
    Generate(GenerateArgs),
    /// List the entries of an archive and verify its directory
    Inspect {
        /// Archive to read
        archive: PathBuf,
        /// Also expand every payload and check its CRC
        #[arg(long)]
        deep: bool,
        /// Print the listing as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Args)]
struct GenerateArgs {
    /// Output archive path
    output: PathBuf,
    /// JSON file with an `ArchiveConfig`; flags below override it
    #[arg(long)]
    config: Option<PathBuf>,
    /// Nominal expanded size in MB
    #[arg(long)]
    target_mb: Option<u32>,
    /// Compression level hint (1-9)
    #[arg(long)]
    level: Option<u8>,
    /// Payload bytes per entry
    #[arg(long)]
    pattern_size: Option<u32>,
    /// Fill byte: a single ASCII character or a hex byte such as 0x41
    #[arg(long, value_parser = parse_pattern_char)]
    pattern_char: Option<u8>,
    /// Reserved
    #[arg(long)]
    nested: bool,
    /// Reserved
    #[arg(long)]
    nested_levels: Option<u32>,
    /// Compression method tag written to the headers
    #[arg(long, value_enum)]
    method_tag: Option<MethodTagArg>,
    /// Print the report as JSON
    #[arg(long)]
    json: bool,
    /// Disable the progress bar
    #[arg(long)]
    no_progress: bool,
}

#[derive(Clone, Copy, clap::ValueEnum)]
enum MethodTagArg {
    Stored,
    Legacy,
}

impl From<MethodTagArg> for MethodTagPolicy {
    fn from(arg: MethodTagArg) -> Self {
        match arg {
            MethodTagArg::Stored => MethodTagPolicy::Stored,
            MethodTagArg::Legacy => MethodTagPolicy::Legacy,
        }
    }
}

fn parse_pattern_char(s: &str) -> Result<u8, String> {
    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        return u8::from_str_radix(hex, 16).map_err(|e| format!("invalid hex byte '{s}': {e}"));
    }
    match s.as_bytes() {
        [b] if b.is_ascii() => Ok(*b),
        _ => Err(format!("expected one ASCII character or 0xNN, got '{s}'")),
    }
}

fn main() {
    let cli = Cli::parse();
    logging::init(cli.verbose);
    if let Err(e) = run(cli.command) {
        eprintln!("{e}");
        std::process::exit(e.code.max(1));
    }
}

fn run(command: Command) -> Result<(), CliError> {
    match command {
        Command::Generate(args) => generate(args),
        Command::Inspect {
            archive,
            deep,
            json,
        } => inspect(archive, deep, json),
    }
}

fn build_config(args: &GenerateArgs) -> Result<ArchiveConfig, CliError> {
    let mut config = match &args.config {
        Some(path) => ArchiveConfig::from_json_file(path)
            .map_err(|e| ziplode_cli_error("loading config", e))?,
        None => ArchiveConfig::default(),
    };
    if let Some(v) = args.target_mb {
        config.target_size_mb = v;
    }
    if let Some(v) = args.level {
        config.compression_level = v;
    }
    if let Some(v) = args.pattern_size {
        config.pattern_size = v;
    }
    if let Some(v) = args.pattern_char {
        config.pattern_char = v;
    }
    if args.nested {
        config.nested_compression = true;
    }
    if let Some(v) = args.nested_levels {
        config.nested_levels = v;
    }
    if let Some(v) = args.method_tag {
        config.method_tag = v.into();
    }
    Ok(config)
}

fn generate(args: GenerateArgs) -> Result<(), CliError> {
    let config = build_config(&args)?;

    let bar = if args.no_progress || args.json {
        ProgressBar::hidden()
    } else {
        let style = ProgressStyle::with_template("{bar:40} {pos}/{len} entries {msg}")
            .map_err(|e| simple_cli_error(&format!("progress style: {e}")))?;
        ProgressBar::new(plan_entries(&config).entry_count as u64).with_style(style)
    };

    let result = generate_file_with_parents(&args.output, &config, |p| {
        bar.set_position(p.done as u64);
        bar.set_message(format_size(p.bytes_written));
    });
    bar.finish_and_clear();
    let report = result.map_err(|e| ziplode_cli_error("generating archive", e))?;

    if args.json {
        let text = serde_json::to_string_pretty(&report)
            .map_err(|e| simple_cli_error(&format!("serializing report: {e}")))?;
        println!("{text}");
    } else {
        println!("{report}");
    }
    Ok(())
}

fn inspect(archive: PathBuf, deep: bool, json: bool) -> Result<(), CliError> {
    let listing =
        read_archive_file(&archive, deep).map_err(|e| ziplode_cli_error("reading archive", e))?;

    if json {
        let text = serde_json::to_string_pretty(&listing)
            .map_err(|e| simple_cli_error(&format!("serializing listing: {e}")))?;
        println!("{text}");
    } else {
        for entry in &listing.entries {
            println!(
                "{:>10}  {:>12}  {:>12}  {:08x}  m{}  {}",
                entry.offset,
                entry.compressed_size,
                entry.uncompressed_size,
                entry.crc32,
                entry.compression_method,
                entry.name
            );
        }
        println!(
            "{} entries, {} expanded, directory {} bytes at {}",
            listing.entries.len(),
            format_size(listing.uncompressed_total()),
            listing.central_dir_size,
            listing.central_dir_offset
        );
        for issue in &listing.issues {
            eprintln!("issue: {issue}");
        }
        for note in &listing.unverifiable {
            eprintln!("unverified: {note}");
        }
    }

    if listing.is_consistent() {
        Ok(())
    } else {
        Err(simple_cli_error(&format!(
            "{} inconsistencies found in '{}'",
            listing.issues.len(),
            archive.display()
        )))
    }
}
