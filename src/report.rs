//! Plain-text report of the discovered links, grouped by file extension.

use std::collections::BTreeMap;
use std::io::Write;
use std::path::Path;

use tracing::{debug, instrument};
use url::Url;

/// Groups links by the lower-cased extension of their URL path (`.png`, `.jpg`, ...).
///
/// Groups are ordered by extension; links keep their input order inside a group.
/// Links whose path has no extension are grouped under the empty string.
#[must_use]
pub fn group_by_extension(links: &[String]) -> BTreeMap<String, Vec<&str>> {
    let mut groups: BTreeMap<String, Vec<&str>> = BTreeMap::new();
    for link in links {
        groups.entry(extension_of(link)).or_default().push(link);
    }
    groups
}

fn extension_of(link: &str) -> String {
    let path = Url::parse(link).map_or_else(|_| link.to_string(), |u| u.path().to_string());
    let name = path.rsplit('/').next().unwrap_or_default();
    match name.rfind('.') {
        Some(dot) if dot + 1 < name.len() => name[dot..].to_ascii_lowercase(),
        _ => String::new(),
    }
}

/// Writes the grouped report to any writer.
///
/// ```text
/// Extension: .jpg
/// https://img.rec.net/b.jpg
///
/// Extension: .png
/// https://img.rec.net/a.png
///
/// ```
///
/// # Errors
///
/// Returns any IO error from the writer.
pub fn write_report<W: Write>(mut writer: W, links: &[String]) -> std::io::Result<()> {
    for (extension, urls) in group_by_extension(links) {
        writeln!(writer, "Extension: {extension}")?;
        for url in urls {
            writeln!(writer, "{url}")?;
        }
        writeln!(writer)?;
    }
    writer.flush()
}

/// Writes the grouped report to `path`, replacing any existing file.
///
/// # Errors
///
/// Returns any IO error from creating or writing the file.
#[instrument(skip(path, links), fields(path = %path.display(), links = links.len()))]
pub fn write_report_file(path: &Path, links: &[String]) -> std::io::Result<()> {
    let file = std::fs::File::create(path)?;
    write_report(std::io::BufWriter::new(file), links)?;
    debug!("report written");
    Ok(())
}
