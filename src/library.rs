//! Locating and reading the Rec Room Library cache file.
//!
//! The game keeps the file under the Windows `LocalLow` known folder. Other
//! platforms have no default; the path must be given explicitly or entered
//! at the prompt.

use std::env;
use std::ffi::OsString;
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info, instrument};

/// Location of the Library file relative to `LocalLow`.
const LIBRARY_RELATIVE_PATH: [&str; 3] = ["Against Gravity", "Rec Room", "Library"];

/// Prompt shown when the Library file cannot be found.
pub const MISSING_LIBRARY_PROMPT: &str =
    "Unable to find your Library file! Please drag the file onto this window and press Enter:";

/// Errors raised while locating or reading the Library file.
#[derive(Debug, Error)]
pub enum LibraryError {
    /// No file exists at the path and no interactive input is available.
    #[error("library file not found: {path}")]
    NotFound {
        /// The path that was checked.
        path: PathBuf,
    },

    /// No candidate path could be determined and no interactive input is available.
    #[error("no library path given and no default location on this platform")]
    NoDefaultLocation,

    /// Input ended while prompting for a path.
    #[error("input closed before a library path was entered")]
    PromptClosed,

    /// IO error while prompting.
    #[error("IO error while prompting for the library path: {0}")]
    Prompt(#[source] std::io::Error),

    /// The file exists but could not be read.
    #[error("cannot read library file {path}: {source}")]
    Read {
        /// The file that could not be read.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },
}

/// Default Library location: `%USERPROFILE%\AppData\LocalLow\Against Gravity\Rec Room\Library`.
///
/// Returns `None` when not on Windows or when `USERPROFILE` is unset.
#[must_use]
pub fn default_library_path() -> Option<PathBuf> {
    if !cfg!(windows) {
        return None;
    }
    let profile = non_empty_env("USERPROFILE")?;
    Some(library_path_under_profile(Path::new(&profile)))
}

fn library_path_under_profile(profile: &Path) -> PathBuf {
    let mut path = profile.join("AppData").join("LocalLow");
    for segment in LIBRARY_RELATIVE_PATH {
        path.push(segment);
    }
    path
}

/// Reads an environment variable, treating an empty value as unset.
#[must_use]
pub fn non_empty_env(name: &str) -> Option<OsString> {
    let value = env::var_os(name)?;
    if value.is_empty() { None } else { Some(value) }
}

/// Strips one pair of surrounding double quotes, as added by drag-and-drop.
#[must_use]
pub fn strip_surrounding_quotes(input: &str) -> &str {
    if input.len() >= 2 && input.starts_with('"') && input.ends_with('"') {
        &input[1..input.len() - 1]
    } else {
        input
    }
}

/// Resolves an existing Library file, prompting for a path while the candidate is missing.
///
/// `prompt_io` is `None` when no interactive input is available; a missing
/// file is then an error. Otherwise the prompt is written to the writer and
/// one line is read per try. Empty lines print "No path provided!".
///
/// # Errors
///
/// Returns [`LibraryError`] when no file can be found and the prompt is
/// unavailable or closed.
#[instrument(skip(prompt_io))]
pub fn locate_library<R: BufRead, W: Write>(
    candidate: Option<PathBuf>,
    prompt_io: Option<(R, W)>,
) -> Result<PathBuf, LibraryError> {
    if let Some(path) = &candidate
        && path.is_file()
    {
        return Ok(path.clone());
    }

    let Some((mut input, mut output)) = prompt_io else {
        return Err(match candidate {
            Some(path) => LibraryError::NotFound { path },
            None => LibraryError::NoDefaultLocation,
        });
    };

    loop {
        writeln!(output, "{MISSING_LIBRARY_PROMPT}").map_err(LibraryError::Prompt)?;
        output.flush().map_err(LibraryError::Prompt)?;

        let mut line = String::new();
        let read = input.read_line(&mut line).map_err(LibraryError::Prompt)?;
        if read == 0 {
            return Err(LibraryError::PromptClosed);
        }

        let entered = strip_surrounding_quotes(line.trim());
        if entered.is_empty() {
            writeln!(output, "No path provided!").map_err(LibraryError::Prompt)?;
            continue;
        }

        let path = PathBuf::from(entered);
        if path.is_file() {
            return Ok(path);
        }
        debug!(path = %path.display(), "entered path is not a file");
    }
}

/// Reads the whole Library file.
///
/// # Errors
///
/// Returns [`LibraryError::Read`] on any IO failure.
pub fn read_library(path: &Path) -> Result<Vec<u8>, LibraryError> {
    let bytes = std::fs::read(path).map_err(|source| LibraryError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    info!(path = %path.display(), bytes = bytes.len(), "read library file");
    Ok(bytes)
}
