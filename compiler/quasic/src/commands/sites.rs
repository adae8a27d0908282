//! `quasi sites`: list the quote sites of a module.

use std::fmt::Write;
use std::path::Path;

use quasi_native::fingerprint::body_hash;

use super::CommandError;

/// One line per site: position, kind, quoter, body line count and the body
/// hash that names the site's native artifacts.
pub fn list_sites(path: &Path, source: &str) -> Result<String, CommandError> {
    let sites = quasi_rewrite::find_sites(source).map_err(|error| CommandError::Rewrite {
        path: path.to_owned(),
        error,
    })?;

    let mut out = String::new();
    let _ = writeln!(out, "Sites in '{}' ({}):", path.display(), sites.len());
    for site in &sites {
        let _ = writeln!(
            out,
            "  {}:{}  {:<5} ${:<12} {} line(s)  {}",
            site.line,
            site.col_offset + 1,
            site.kind.to_string(),
            site.quoter,
            site.body.lines().count().max(1),
            body_hash(&site.body),
        );
    }
    Ok(out)
}
