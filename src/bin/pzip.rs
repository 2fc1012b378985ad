/// pzip – parallel chunked zstd compressor.
///
///   pzip -i file -o file.pz        → compress a file
///   pzip -d -i file.pz -o file     → decompress a file
///   cat file | pzip > file.pz      → compress stdin to stdout
///   pzip -l -i file.pz             → list frame info of an archive
use std::env;
use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::process::ExitCode;

use colored::*;

use pzip::{
    analyze_archive, bridge, CompressionProfile, Direction, PipelineConfig, PipelineReport,
    PzipError,
};

fn usage() {
    eprintln!("pzip - parallel chunked zstd compression");
    eprintln!();
    eprintln!("Usage: pzip [OPTIONS]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  -d, --decompress     Decompress mode");
    eprintln!("  -i, --input FILE     Read from FILE (default: stdin)");
    eprintln!("  -o, --output FILE    Write to FILE (default: stdout)");
    eprintln!("  -t, --threads N      Number of worker threads (default: all cores)");
    eprintln!("  -b, --chunk-size N   Bytes per chunk when compressing (default: 1048576)");
    eprintln!("      --level N        Explicit zstd level");
    eprintln!("      --fast           Fastest compression profile");
    eprintln!("      --best           Highest compression profile");
    eprintln!("      --config FILE    Load a JSON PipelineConfig; flags override it");
    eprintln!("  -l, --list           Print frame statistics of an archive");
    eprintln!("  -v, --verbose        Verbose logging");
    eprintln!("  -h, --help           Show this help");
    eprintln!("  -V, --version        Show version");
}

#[derive(Debug, Default)]
struct Opts {
    decompress: bool,
    list: bool,
    verbose: bool,
    input: Option<String>,
    output: Option<String>,
    threads: Option<usize>,
    chunk_size: Option<usize>,
    level: Option<i32>,
    profile: Option<CompressionProfile>,
    config_file: Option<String>,
}

enum Parsed {
    Run(Opts),
    Exit(ExitCode),
}

fn usage_error(message: String) -> Parsed {
    eprintln!("{} {}", "pzip:".red().bold(), message);
    eprintln!("pzip: run 'pzip --help' for usage");
    Parsed::Exit(ExitCode::from(2))
}

fn parse_args(args: &[String]) -> Parsed {
    let mut opts = Opts::default();

    let mut i = 0;
    while i < args.len() {
        let arg = args[i].as_str();
        // Flags that take a value.
        if matches!(
            arg,
            "-i" | "--input" | "-o" | "--output" | "-t" | "--threads" | "-b" | "--chunk-size"
                | "--level" | "--config"
        ) {
            i += 1;
            let Some(value) = args.get(i) else {
                return usage_error(format!("missing argument for {arg}"));
            };
            match arg {
                "-i" | "--input" => opts.input = Some(value.clone()),
                "-o" | "--output" => opts.output = Some(value.clone()),
                "--config" => opts.config_file = Some(value.clone()),
                "-t" | "--threads" => match value.parse::<usize>() {
                    Ok(n) => opts.threads = Some(n),
                    Err(_) => return usage_error(format!("invalid thread count '{value}'")),
                },
                "-b" | "--chunk-size" => match value.parse::<usize>() {
                    Ok(n) => opts.chunk_size = Some(n),
                    Err(_) => return usage_error(format!("invalid chunk size '{value}'")),
                },
                _ => match value.parse::<i32>() {
                    Ok(n) => opts.level = Some(n),
                    Err(_) => return usage_error(format!("invalid level '{value}'")),
                },
            }
            i += 1;
            continue;
        }

        match arg {
            "-d" | "--decompress" => opts.decompress = true,
            "-l" | "--list" => opts.list = true,
            "-v" | "--verbose" => opts.verbose = true,
            "--fast" => opts.profile = Some(CompressionProfile::Fast),
            "--best" => opts.profile = Some(CompressionProfile::HighCompression),
            "-h" | "--help" => {
                usage();
                return Parsed::Exit(ExitCode::SUCCESS);
            }
            "-V" | "--version" => {
                println!("pzip {}", pzip::VERSION);
                return Parsed::Exit(ExitCode::SUCCESS);
            }
            // Combined short flags like -dv.
            s if s.starts_with('-') && !s.starts_with("--") && s.len() > 2 => {
                for ch in s[1..].chars() {
                    match ch {
                        'd' => opts.decompress = true,
                        'l' => opts.list = true,
                        'v' => opts.verbose = true,
                        _ => return usage_error(format!("unknown flag '-{ch}'")),
                    }
                }
            }
            other => return usage_error(format!("unexpected argument '{other}'")),
        }
        i += 1;
    }

    Parsed::Run(opts)
}

/// Starts from the config file (or defaults) and applies the command-line overrides.
fn build_config(opts: &Opts) -> Result<PipelineConfig, PzipError> {
    let mut config = match &opts.config_file {
        Some(path) => PipelineConfig::from_json_str(&fs::read_to_string(path)?)?,
        None => PipelineConfig::default(),
    };
    if let Some(threads) = opts.threads {
        config = config.with_worker_count(threads);
    }
    if let Some(chunk_size) = opts.chunk_size {
        config = config.with_chunk_size(chunk_size);
    }
    if let Some(profile) = opts.profile {
        config = config.with_profile(profile);
    }
    if let Some(level) = opts.level {
        config = config.with_level(level);
    }
    Ok(config)
}

fn open_input(path: Option<&str>) -> Result<Box<dyn Read + Send>, PzipError> {
    Ok(match path {
        Some(path) => Box::new(BufReader::new(File::open(path)?)),
        None => Box::new(BufReader::new(io::stdin())),
    })
}

fn open_output(path: Option<&str>) -> Result<Box<dyn Write + Send>, PzipError> {
    Ok(match path {
        Some(path) => Box::new(BufWriter::new(File::create(path)?)),
        None => Box::new(BufWriter::new(io::stdout())),
    })
}

fn list(opts: &Opts) -> Result<(), PzipError> {
    let stats = analyze_archive(open_input(opts.input.as_deref())?)?;
    println!("{:>8} {:>14} {:>14} {:>12}", "frames", "payload", "total", "largest");
    println!(
        "{:>8} {:>14} {:>14} {:>12}",
        stats.frame_count, stats.payload_bytes, stats.total_bytes, stats.largest_frame
    );
    Ok(())
}

fn run(opts: &Opts) -> Result<PipelineReport, PzipError> {
    let config = build_config(opts)?;
    let direction = if opts.decompress {
        Direction::Decompress
    } else {
        Direction::Compress
    };
    let input = open_input(opts.input.as_deref())?;
    let output = open_output(opts.output.as_deref())?;
    bridge::process(direction, input, output, &config)
}

fn main() -> ExitCode {
    let args: Vec<String> = env::args().skip(1).collect();
    let opts = match parse_args(&args) {
        Parsed::Run(opts) => opts,
        Parsed::Exit(code) => return code,
    };

    if let Err(e) = pzip::utils::init_logging(opts.verbose, None) {
        eprintln!("{} could not start logging: {}", "pzip:".red().bold(), e);
    }

    let outcome = if opts.list {
        list(&opts).map(|_| None)
    } else {
        run(&opts).map(Some)
    };

    match outcome {
        Ok(Some(report)) => {
            eprintln!(
                "pzip: {} {} -> {} bytes, {} chunks, {} workers, elapsed {:.3}s",
                report.direction.verb(),
                report.bytes_read,
                report.bytes_written,
                report.chunks_written,
                report.workers,
                report.elapsed.as_secs_f64()
            );
            ExitCode::SUCCESS
        }
        Ok(None) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {}", "pzip:".red().bold(), e.root_cause());
            ExitCode::FAILURE
        }
    }
}
