//! Configuration file loading and merging with CLI arguments.
//!
//! Precedence: explicit CLI value > config file > built-in default.

use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::{Context, Result, bail};
use clap::{ArgMatches, CommandFactory, FromArgMatches, parser::ValueSource};

use librarycache_core::{is_valid_renders_dir, library::non_empty_env};

use crate::cli::Args;

/// TOML-backed file configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileConfig {
    /// Library file location.
    pub library_path: Option<PathBuf>,
    /// Download directory.
    pub output_dir: Option<PathBuf>,
    /// Concurrent downloads (same range as CLI).
    pub concurrency: Option<u8>,
    /// Attempts per image (same range as CLI).
    pub max_attempts: Option<u8>,
    /// Delay between attempts in milliseconds.
    pub retry_delay_ms: Option<u64>,
    /// Link report path.
    pub report_path: Option<PathBuf>,
    /// Renders folder name.
    pub renders_dir: Option<String>,
    /// Whether to run the render classification pass.
    pub classify: Option<bool>,
    /// Default verbosity mode.
    pub verbosity: Option<VerbositySetting>,
}

impl FileConfig {
    /// Validates config values against CLI constraints.
    pub fn validate(&self) -> Result<()> {
        if let Some(concurrency) = self.concurrency
            && !(1..=100).contains(&concurrency)
        {
            bail!("Invalid config value for `concurrency`: {concurrency}. Expected range: 1..=100");
        }

        if let Some(max_attempts) = self.max_attempts
            && !(1..=10).contains(&max_attempts)
        {
            bail!("Invalid config value for `max_attempts`: {max_attempts}. Expected range: 1..=10");
        }

        if let Some(retry_delay_ms) = self.retry_delay_ms
            && retry_delay_ms > 60_000
        {
            bail!(
                "Invalid config value for `retry_delay_ms`: {retry_delay_ms}. Expected range: 0..=60000"
            );
        }

        if let Some(renders_dir) = &self.renders_dir
            && !is_valid_renders_dir(renders_dir)
        {
            bail!("Invalid config value for `renders_dir`: '{renders_dir}'. Expected a folder name");
        }

        Ok(())
    }
}

/// Supported config verbosity labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerbositySetting {
    Default,
    Verbose,
    Quiet,
    Debug,
}

/// Which arguments were given explicitly on the command line.
#[derive(Debug, Clone, Copy, Default)]
pub struct CliValueSources {
    pub library: bool,
    pub output_dir: bool,
    pub concurrency: bool,
    pub max_attempts: bool,
    pub retry_delay: bool,
    pub report: bool,
    pub renders_dir: bool,
    pub no_classify: bool,
    pub verbose: bool,
    pub quiet: bool,
}

/// Parses process arguments and records which ones came from the command line.
pub fn parse_cli_with_sources() -> (Args, CliValueSources) {
    let matches = Args::command().get_matches();
    let args = Args::from_arg_matches(&matches).unwrap_or_else(|err| err.exit());

    let sources = CliValueSources {
        library: is_commandline_value(&matches, "library"),
        output_dir: is_commandline_value(&matches, "output_dir"),
        concurrency: is_commandline_value(&matches, "concurrency"),
        max_attempts: is_commandline_value(&matches, "max_attempts"),
        retry_delay: is_commandline_value(&matches, "retry_delay"),
        report: is_commandline_value(&matches, "report"),
        renders_dir: is_commandline_value(&matches, "renders_dir"),
        no_classify: is_commandline_value(&matches, "no_classify"),
        verbose: is_commandline_value(&matches, "verbose"),
        quiet: is_commandline_value(&matches, "quiet"),
    };
    (args, sources)
}

fn is_commandline_value(matches: &ArgMatches, id: &str) -> bool {
    matches.value_source(id) == Some(ValueSource::CommandLine)
}

/// Fills every argument not given on the command line from the config file.
#[must_use]
pub fn apply_config_defaults(
    mut args: Args,
    sources: &CliValueSources,
    file_config: Option<&FileConfig>,
) -> Args {
    let Some(cfg) = file_config else {
        return args;
    };

    if !sources.library
        && let Some(library_path) = &cfg.library_path
    {
        args.library = Some(library_path.clone());
    }
    if !sources.output_dir
        && let Some(output_dir) = &cfg.output_dir
    {
        args.output_dir = output_dir.clone();
    }
    if !sources.concurrency
        && let Some(concurrency) = cfg.concurrency
    {
        args.concurrency = concurrency;
    }
    if !sources.max_attempts
        && let Some(max_attempts) = cfg.max_attempts
    {
        args.max_attempts = max_attempts;
    }
    if !sources.retry_delay
        && let Some(retry_delay_ms) = cfg.retry_delay_ms
    {
        args.retry_delay = retry_delay_ms;
    }
    if !sources.report
        && let Some(report_path) = &cfg.report_path
    {
        args.report = report_path.clone();
    }
    if !sources.renders_dir
        && let Some(renders_dir) = &cfg.renders_dir
    {
        args.renders_dir = renders_dir.clone();
    }
    if !sources.no_classify
        && let Some(classify) = cfg.classify
    {
        args.no_classify = !classify;
    }
    if !sources.verbose
        && !sources.quiet
        && let Some(verbosity) = cfg.verbosity
    {
        match verbosity {
            VerbositySetting::Default => {}
            VerbositySetting::Verbose => args.verbose = 1,
            VerbositySetting::Debug => args.verbose = 2,
            VerbositySetting::Quiet => args.quiet = true,
        }
    }

    args
}

/// Resolves default config path: `<config dir>/librarycache/config.toml`.
///
/// The config dir is `$XDG_CONFIG_HOME` when set, otherwise `$HOME/.config`.
#[must_use]
pub fn resolve_default_config_path() -> Option<PathBuf> {
    let config_dir = non_empty_env("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .or_else(|| non_empty_env("HOME").map(|home| PathBuf::from(home).join(".config")))?;
    Some(config_dir.join("librarycache").join("config.toml"))
}

/// Loads config from the default path if the file exists.
pub fn load_default_file_config() -> Result<Option<(PathBuf, FileConfig)>> {
    let Some(path) = resolve_default_config_path() else {
        return Ok(None);
    };
    if !path.exists() {
        return Ok(None);
    }
    let config = load_file_config(&path)?;
    Ok(Some((path, config)))
}

fn load_file_config(path: &Path) -> Result<FileConfig> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file '{}'", path.display()))?;
    parse_config_str(&raw)
        .with_context(|| format!("Failed to parse config file '{}'", path.display()))
}

fn parse_config_str(raw: &str) -> Result<FileConfig> {
    let mut cfg = FileConfig::default();
    for (line_index, raw_line) in raw.lines().enumerate() {
        let line_number = line_index + 1;
        let line = strip_inline_comment(raw_line).trim();
        if line.is_empty() {
            continue;
        }

        let Some((raw_key, raw_value)) = line.split_once('=') else {
            bail!("Invalid config syntax on line {line_number}: expected key = value");
        };

        let key = raw_key.trim();
        let context = || format!("Invalid `{key}` value on line {line_number}");
        let value = RawValue::parse(raw_value.trim()).with_context(context)?;

        match key {
            "library_path" => cfg.library_path = Some(value.path().with_context(context)?),
            "output_dir" => cfg.output_dir = Some(value.path().with_context(context)?),
            "report_path" => cfg.report_path = Some(value.path().with_context(context)?),
            "renders_dir" => cfg.renders_dir = Some(value.string().with_context(context)?),
            "concurrency" => cfg.concurrency = Some(value.integer().with_context(context)?),
            "max_attempts" => cfg.max_attempts = Some(value.integer().with_context(context)?),
            "retry_delay_ms" => cfg.retry_delay_ms = Some(value.integer().with_context(context)?),
            "classify" => cfg.classify = Some(value.boolean().with_context(context)?),
            "verbosity" => {
                let label = value.string().with_context(context)?;
                cfg.verbosity = Some(label.parse().with_context(context)?);
            }
            unknown => bail!("Unknown configuration key: '{unknown}' on line {line_number}"),
        }
    }
    cfg.validate()?;
    Ok(cfg)
}

/// Cuts a trailing `# comment`, ignoring `#` inside double quotes.
fn strip_inline_comment(line: &str) -> &str {
    let mut quoted = false;
    let end = line
        .char_indices()
        .find_map(|(index, ch)| {
            if ch == '"' {
                quoted = !quoted;
            }
            (ch == '#' && !quoted).then_some(index)
        })
        .unwrap_or(line.len());
    &line[..end]
}

/// Right-hand side of a `key = value` line.
#[derive(Debug, Clone, PartialEq, Eq)]
enum RawValue<'a> {
    Str(&'a str),
    Int(u64),
    Bool(bool),
}

impl<'a> RawValue<'a> {
    fn parse(token: &'a str) -> Result<Self> {
        if let Some(inner) = token
            .strip_prefix('"')
            .and_then(|rest| rest.strip_suffix('"'))
        {
            return Ok(Self::Str(inner));
        }
        if let Ok(flag) = token.parse::<bool>() {
            return Ok(Self::Bool(flag));
        }
        if let Ok(number) = token.parse::<u64>() {
            return Ok(Self::Int(number));
        }
        bail!("Expected a double-quoted string, a non-negative integer or true/false, got '{token}'")
    }

    fn string(self) -> Result<String> {
        match self {
            Self::Str(text) => Ok(text.to_string()),
            other => bail!("Expected double-quoted string, got {other:?}"),
        }
    }

    fn path(self) -> Result<PathBuf> {
        self.string().map(PathBuf::from)
    }

    fn integer<T: TryFrom<u64>>(self) -> Result<T> {
        match self {
            Self::Int(number) => T::try_from(number)
                .map_err(|_| anyhow::anyhow!("Integer value {number} is out of range")),
            other => bail!("Expected integer value, got {other:?}"),
        }
    }

    fn boolean(self) -> Result<bool> {
        match self {
            Self::Bool(flag) => Ok(flag),
            other => bail!("Expected 'true' or 'false', got {other:?}"),
        }
    }
}

impl FromStr for VerbositySetting {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self> {
        Ok(match value {
            "default" => Self::Default,
            "verbose" => Self::Verbose,
            "quiet" => Self::Quiet,
            "debug" => Self::Debug,
            _ => bail!("Expected one of: default, verbose, quiet, debug"),
        })
    }
}
