//! fsstat - Main binary entry point

use fsstat::cli::args::{CliArgs, OutputFormat, parse_args};
use fsstat::cli::output::{format_json, format_text};
use fsstat::cli::prompt::prepare_output;
use fsstat::services::sink::sqlite::{self, SqliteSink, keys};
use fsstat::services::sink::{ParquetSink, RecordSink};
use fsstat::services::traverse::normalize_path;
use fsstat::{Error, ScanOptions};
use std::io;
use std::path::Path;
use std::process;
use std::time::{SystemTime, UNIX_EPOCH};

fn main() {
    // Logs go to stderr; RUST_LOG overrides the default level.
    // Example: RUST_LOG=debug fsstat /data
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Vec<String> = std::env::args().collect();

    let cli = match parse_args(&args) {
        Ok(a) => a,
        Err(e) => {
            eprintln!("Error: {e}");
            eprintln!("Use --help for usage information");
            process::exit(2);
        }
    };

    if cli.help {
        print_help();
        return;
    }
    if cli.version {
        print_version();
        return;
    }

    let opts = match cli.scan_options() {
        Ok(o) => o,
        Err(e) => {
            eprintln!("Error: {e}");
            process::exit(2);
        }
    };

    if let Err(e) = handle_scan(&cli, &opts) {
        eprintln!("Error: {e}");
        process::exit(exit_code(&e));
    }
}

fn exit_code(err: &Error) -> i32 {
    match err {
        Error::InvalidInput(_) | Error::Aborted => 2,
        Error::Io(_) | Error::Persistence(_) | Error::Sink(_) | Error::System(_) => 4,
    }
}

fn handle_scan(cli: &CliArgs, opts: &ScanOptions) -> fsstat::Result<()> {
    let root = normalize_path(&std::path::absolute(&cli.root)?);
    let output_path = Path::new(&cli.db);
    let format = cli.output_format();

    log::info!("Starting fsstat on {root}");
    log::info!("Output location: {} ({format:?})", cli.db);
    log::info!("Buffer size: {}", opts.buffer_size);
    log::info!("Skip policy: {:?}", opts.skip_policy);
    log::info!("Max concurrency: {}", opts.concurrency);
    log::info!("Async depth: {} ({})", opts.async_depth, opts.async_policy);

    prepare_output(output_path, cli.assume_yes, &mut io::stdin().lock(), &mut io::stdout())?;

    let sink: Box<dyn RecordSink> = match format {
        OutputFormat::Sqlite => {
            let sink = SqliteSink::create(output_path)?;
            sink.set_info(keys::ROOT, &root)?;
            let started = SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_secs())
                .unwrap_or_default();
            sink.set_info(keys::STARTED_AT, &started.to_string())?;
            Box::new(sink)
        }
        OutputFormat::Parquet => Box::new(ParquetSink::create(output_path)?),
    };

    let report = fsstat::scan(&root, opts, sink)?;

    let top = match (cli.top, format) {
        (Some(limit), OutputFormat::Sqlite) => sqlite::largest_directories(output_path, limit)?,
        (Some(_), OutputFormat::Parquet) => {
            log::warn!("--top is only available with SQLite output");
            Vec::new()
        }
        (None, _) => Vec::new(),
    };

    if cli.json {
        println!("{}", format_json(&report, &top));
    } else {
        print!("{}", format_text(&report, &top));
    }
    Ok(())
}

fn print_help() {
    println!("fsstat - Scan a directory tree and store per-entry statistics");
    println!();
    println!("USAGE:");
    println!("    fsstat [OPTIONS] [ROOT]");
    println!();
    println!("    ROOT defaults to the current directory.");
    println!();
    println!("OPTIONS:");
    println!("    --db <FILE>               Output file (default: fs_stats.db)");
    println!("    --format <TYPE>           sqlite or parquet (default: from the file extension)");
    println!("    --buffer <N>              Pipeline capacity and batch size (default: 256)");
    println!("    --concurrency <N>         Maximum concurrent traversal tasks (default: 128)");
    println!("    --async-depth <N>         Depth of parallel fan-out before in-task recursion (default: 5)");
    println!("    --strict-saturation       Also recurse in-task while every permit is taken");
    println!("    --save-all-files          Store every file, not only files above 200 MiB");
    println!("    --skip-above <BYTES>      Store only files up to BYTES instead");
    println!("    --interval <N>            Log progress every N records (default: 5000)");
    println!("    --basis <TYPE>            Size basis: logical (default) or physical");
    println!("    --count-dir-size          Add directory entry sizes to totals");
    println!("    --count-symlink-size      Add symlink target lengths to totals");
    println!("    --top <K>                 Print the K largest directories (SQLite output)");
    println!("    --json                    Emit machine-readable output");
    println!("    -y, --yes                 Overwrite an existing output file without asking");
    println!("    -h, --help                Show this help message");
    println!("    -v, --version             Show version information");
    println!();
    println!("EXAMPLES:");
    println!("    fsstat /home --db home.db --top 20");
    println!("    fsstat /data --db data.parquet --save-all-files -y");
    println!("    RUST_LOG=debug fsstat . --concurrency 8 --async-depth 2");
}

fn print_version() {
    const VERSION: &str = env!("CARGO_PKG_VERSION");
    const BUILD: &str = env!("FSSTAT_BUILD");

    println!("fsstat {VERSION}");
    println!("{BUILD}");

    #[cfg(debug_assertions)]
    println!("Profile: debug");
    #[cfg(not(debug_assertions))]
    println!("Profile: release");
}
