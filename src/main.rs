use clap::{Parser, Subcommand};
use log::{LevelFilter, Log, Metadata, Record};
use pfdecode::perf::decode_all;
use pfdecode::prefetch::{decompress_record, DecodeOptions, DEFAULT_MAX_DECOMPRESSED_SIZE};
use pfdecode::Prefetch;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "pfdecode", about = "Decode compressed Windows prefetch files")]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Decode prefetch files and print their contents
    Info {
        #[arg(required = true, num_args = 1..)]
        input: Vec<PathBuf>,
        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
        /// Reject containers declaring a larger decompressed size (bytes)
        #[arg(long, default_value_t = DEFAULT_MAX_DECOMPRESSED_SIZE)]
        max_size: u32,
        /// Only accept MAM-compressed input
        #[arg(long)]
        compressed_only: bool,
    },
    /// Write the decompressed record of a prefetch file
    Decompress {
        input: PathBuf,
        #[arg(short, long)]
        output: PathBuf,
        #[arg(long, default_value_t = DEFAULT_MAX_DECOMPRESSED_SIZE)]
        max_size: u32,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    StderrLogger::install(cli.verbose)?;

    match cli.command {

        // ── Info ─────────────────────────────────────────────────────────────
        Commands::Info { input, json, max_size, compressed_only } => {
            let opts = DecodeOptions {
                max_decompressed_size: max_size,
                allow_uncompressed:    !compressed_only,
            };
            let mut failed = 0usize;
            let mut decoded = Vec::new();
            for (path, result) in input.iter().zip(decode_all(&input, &opts)) {
                match result {
                    Ok(pf) => decoded.push((path, pf)),
                    Err(e) => {
                        log::error!("{}: {}", path.display(), e);
                        failed += 1;
                    }
                }
            }

            if json {
                let values: Vec<_> = decoded
                    .iter()
                    .map(|(path, pf)| serde_json::json!({ "path": path, "prefetch": pf }))
                    .collect();
                println!("{}", serde_json::to_string_pretty(&values)?);
            } else {
                for (path, pf) in &decoded {
                    print_info(path, pf);
                }
            }

            if failed > 0 {
                return Err(format!("{failed} of {} file(s) failed to decode", input.len()).into());
            }
        }

        // ── Decompress ───────────────────────────────────────────────────────
        Commands::Decompress { input, output, max_size } => {
            let opts = DecodeOptions { max_decompressed_size: max_size, allow_uncompressed: true };
            let bytes = std::fs::read(&input)?;
            let (_, raw) = decompress_record(&bytes, &opts)?;
            std::fs::write(&output, &raw)?;
            println!("Decompressed {} → {} ({} B)", input.display(), output.display(), raw.len());
        }
    }

    Ok(())
}

// ── helpers ──────────────────────────────────────────────────────────────────

fn print_info(path: &Path, pf: &Prefetch) {
    let info = &pf.record.file_info;
    println!("── Prefetch ─────────────────────────────────────────────");
    println!("  Path           {}", path.display());
    match &pf.container {
        Some(c) => println!(
            "  Container      {} ({} B decompressed{})",
            hex::encode(c.magic),
            c.decompressed_size,
            c.checksum.map(|s| format!(", checksum {s:08x}")).unwrap_or_default()
        ),
        None => println!("  Container      none (uncompressed)"),
    }
    println!("  Version        {}", pf.version());
    println!("  Executable     {}", pf.executable_name());
    println!("  Hash           {:08X}", pf.prefetch_hash());
    println!("  Run count      {}", pf.run_count());
    let runs = pf.last_run_times();
    if runs.is_empty() {
        println!("  Last run       —");
    }
    for (i, t) in runs.iter().enumerate() {
        let label = if i == 0 { "Last run" } else { "" };
        println!("  {:<14} {}", label, t.to_rfc3339());
    }
    println!("  Metrics        {} @ {}", info.metrics_count, info.metrics_offset);
    println!("  Trace chains   {} @ {}", info.trace_chains_count, info.trace_chains_offset);
    println!("  Volumes ({}):", pf.volumes().len());
    for v in pf.volumes() {
        let created = v
            .creation_time()
            .map(|t| t.to_rfc3339())
            .unwrap_or_else(|| "—".into());
        println!("    {}  serial {:08X}  created {}", v.device_path, v.entry.serial_number, created);
        for dir in &v.directories {
            println!("      {}", dir);
        }
    }
    println!("  Files ({}):", pf.filenames().len());
    for name in pf.filenames() {
        println!("    {}", name);
    }
}

/// Writes log records to stderr.
struct StderrLogger;

static LOGGER: StderrLogger = StderrLogger;

impl StderrLogger {
    fn install(verbosity: u8) -> Result<(), log::SetLoggerError> {
        log::set_logger(&LOGGER)?;
        log::set_max_level(level_for(verbosity));
        Ok(())
    }
}

fn level_for(verbosity: u8) -> LevelFilter {
    match verbosity {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}

impl Log for StderrLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            eprintln!("[{:<5} {}] {}", record.level(), record.target(), record.args());
        }
    }

    fn flush(&self) {}
}
