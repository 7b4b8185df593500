//! CLI argument parsing

use crate::services::pipeline::{DEFAULT_SKIP_FLOOR, SkipPolicy};
use crate::{AsyncPolicy, ScanOptions, SizeBasis};
use std::path::Path;

pub const DEFAULT_DB_PATH: &str = "fs_stats.db";

/// Storage backend for the scan output
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Sqlite,
    Parquet,
}

impl OutputFormat {
    #[must_use]
    pub fn from_label(label: &str) -> Option<Self> {
        match label.to_ascii_lowercase().as_str() {
            "sqlite" | "db" => Some(OutputFormat::Sqlite),
            "parquet" => Some(OutputFormat::Parquet),
            _ => None,
        }
    }

    /// Guess from the file extension; anything but `.parquet` is SQLite.
    #[must_use]
    pub fn infer(path: &str) -> Self {
        let is_parquet = Path::new(path)
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("parquet"));
        if is_parquet {
            OutputFormat::Parquet
        } else {
            OutputFormat::Sqlite
        }
    }
}

#[derive(Debug, Clone)]
pub struct CliArgs {
    pub root: String,
    pub db: String,
    pub format: Option<OutputFormat>,
    pub buffer_size: Option<usize>,
    pub concurrency: Option<usize>,
    pub async_depth: Option<usize>,
    pub strict_saturation: bool,
    pub assume_yes: bool,
    pub save_all_files: bool,
    pub skip_above: Option<u64>,
    pub logging_interval: Option<u64>,
    pub basis: String,
    pub count_dir_size: bool,
    pub count_symlink_size: bool,
    pub json: bool,
    pub top: Option<usize>,
    pub help: bool,
    pub version: bool,
}

impl Default for CliArgs {
    fn default() -> Self {
        Self {
            root: ".".to_string(),
            db: DEFAULT_DB_PATH.to_string(),
            format: None,
            buffer_size: None,
            concurrency: None,
            async_depth: None,
            strict_saturation: false,
            assume_yes: false,
            save_all_files: false,
            skip_above: None,
            logging_interval: None,
            basis: "logical".to_string(),
            count_dir_size: false,
            count_symlink_size: false,
            json: false,
            top: None,
            help: false,
            version: false,
        }
    }
}

impl CliArgs {
    /// Explicit `--format`, otherwise inferred from the output path.
    #[must_use]
    pub fn output_format(&self) -> OutputFormat {
        self.format.unwrap_or_else(|| OutputFormat::infer(&self.db))
    }

    /// Map the flags onto library options.
    pub fn scan_options(&self) -> Result<ScanOptions, String> {
        let defaults = ScanOptions::default();

        let size_basis = SizeBasis::from_label(&self.basis)
            .ok_or_else(|| format!("Invalid basis: {}. Use 'logical' or 'physical'", self.basis))?;

        let skip_policy = match (self.save_all_files, self.skip_above) {
            (true, Some(_)) => {
                return Err("--save-all-files and --skip-above cannot be combined".to_string());
            }
            (true, None) => SkipPolicy::KeepAll,
            (false, Some(ceiling)) => SkipPolicy::SkipAbove(ceiling),
            (false, None) => SkipPolicy::SkipAtOrBelow(DEFAULT_SKIP_FLOOR),
        };

        Ok(ScanOptions {
            concurrency: self.concurrency.unwrap_or(defaults.concurrency),
            buffer_size: self.buffer_size.unwrap_or(defaults.buffer_size),
            async_depth: self.async_depth.unwrap_or(defaults.async_depth),
            async_policy: if self.strict_saturation {
                AsyncPolicy::Saturation
            } else {
                AsyncPolicy::DepthBudget
            },
            skip_policy,
            logging_interval: self.logging_interval.unwrap_or(defaults.logging_interval),
            size_basis,
            count_directory_size: self.count_dir_size,
            count_symlink_size: self.count_symlink_size,
            ..defaults
        })
    }
}

/// Parse command line arguments (`args[0]` is the program name)
pub fn parse_args(args: &[String]) -> Result<CliArgs, String> {
    let mut cli = CliArgs::default();
    let mut root: Option<String> = None;
    let mut i = 1;

    while i < args.len() {
        let arg = args[i].as_str();
        match arg {
            "-h" | "--help" => cli.help = true,
            "-v" | "--version" => cli.version = true,
            "-y" | "--yes" => cli.assume_yes = true,
            "--strict-saturation" => cli.strict_saturation = true,
            "--save-all-files" => cli.save_all_files = true,
            "--count-dir-size" => cli.count_dir_size = true,
            "--count-symlink-size" => cli.count_symlink_size = true,
            "--json" => cli.json = true,
            "--db" => {
                cli.db = take_value(args, &mut i, "--db")?.to_string();
            }
            "--format" => {
                let label = take_value(args, &mut i, "--format")?;
                cli.format = Some(
                    OutputFormat::from_label(label)
                        .ok_or_else(|| format!("Invalid format: {label}. Use 'sqlite' or 'parquet'"))?,
                );
            }
            "--basis" => {
                cli.basis = take_value(args, &mut i, "--basis")?.to_string();
            }
            "--buffer" => {
                cli.buffer_size = Some(take_positive(args, &mut i, "--buffer")?);
            }
            "--concurrency" => {
                cli.concurrency = Some(take_positive(args, &mut i, "--concurrency")?);
            }
            "--async-depth" => {
                cli.async_depth = Some(take_number(args, &mut i, "--async-depth")?);
            }
            "--interval" => {
                cli.logging_interval = Some(take_positive(args, &mut i, "--interval")?);
            }
            "--skip-above" => {
                cli.skip_above = Some(take_number(args, &mut i, "--skip-above")?);
            }
            "--top" => {
                cli.top = Some(take_positive(args, &mut i, "--top")?);
            }
            _ if arg.starts_with('-') && arg != "-" => {
                return Err(format!("Unknown option: {arg}"));
            }
            _ => {
                if root.is_some() {
                    return Err("Too many arguments".to_string());
                }
                root = Some(arg.to_string());
            }
        }
        i += 1;
    }

    if let Some(root) = root {
        cli.root = root;
    }
    Ok(cli)
}

fn take_value<'a>(args: &'a [String], i: &mut usize, flag: &str) -> Result<&'a str, String> {
    *i += 1;
    args.get(*i)
        .map(String::as_str)
        .ok_or_else(|| format!("{flag} requires a value"))
}

fn take_number<T: std::str::FromStr>(args: &[String], i: &mut usize, flag: &str) -> Result<T, String> {
    take_value(args, i, flag)?
        .parse()
        .map_err(|_| format!("{flag} must be a number"))
}

fn take_positive<T>(args: &[String], i: &mut usize, flag: &str) -> Result<T, String>
where
    T: std::str::FromStr + PartialEq + Default,
{
    let value: T = take_number(args, i, flag)?;
    if value == T::default() {
        return Err(format!("{flag} must be at least 1"));
    }
    Ok(value)
}
