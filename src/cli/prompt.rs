//! Confirmation before replacing an existing output file

use crate::{Error, Result};
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};

/// Ask whether `path` may be overwritten. Enter, `y` or `Y` accept; `n` or
/// `N` decline; anything else asks again. End of input declines.
pub fn confirm_overwrite<R: BufRead, W: Write>(input: &mut R, output: &mut W) -> Result<bool> {
    loop {
        write!(output, "Do you want to overwrite it? ([y]/n): ")?;
        output.flush()?;

        let mut answer = String::new();
        if input.read_line(&mut answer)? == 0 {
            writeln!(output)?;
            return Ok(false);
        }

        match answer.trim_end_matches(['\r', '\n']) {
            "" | "y" | "Y" => return Ok(true),
            "n" | "N" => return Ok(false),
            other => {
                log::warn!("Invalid option: {other}");
            }
        }
    }
}

/// Remove `path` (and SQLite side files) after the user agreed, or fail with
/// `Error::Aborted`.
pub fn prepare_output<R: BufRead, W: Write>(
    path: &Path,
    assume_yes: bool,
    input: &mut R,
    output: &mut W,
) -> Result<()> {
    if !path.exists() {
        log::info!("Creating new output at {}", path.display());
        return Ok(());
    }

    log::warn!("Output {} is already present", path.display());
    if !assume_yes && !confirm_overwrite(input, output)? {
        return Err(Error::Aborted);
    }

    log::info!("Removing existing output at {}", path.display());
    std::fs::remove_file(path)?;
    for side in sqlite_side_files(path) {
        if side.exists() {
            std::fs::remove_file(&side)?;
        }
    }
    Ok(())
}

fn sqlite_side_files(path: &Path) -> [PathBuf; 2] {
    let with_suffix = |suffix: &str| {
        let mut name = path.as_os_str().to_owned();
        name.push(suffix);
        PathBuf::from(name)
    };
    [with_suffix("-wal"), with_suffix("-shm")]
}
