//! # Target Lists
//!
//! Loading of the page lists a batch iterates over: CSV files with a
//! `domain` column, or an ad-hoc comma-separated list. Targets without a
//! scheme get `https://` prefixed so the drivers always see absolute URLs.

use std::path::Path;

use anyhow::{Context, Result, bail};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct TargetRow {
    domain: String,
}

fn with_scheme(domain: &str) -> String {
    if domain.starts_with("http://") || domain.starts_with("https://") {
        domain.to_string()
    } else {
        format!("https://{domain}")
    }
}

/// Load targets from a CSV file with a `domain` column, keeping list order.
/// `limit` truncates the list (e.g. top-100 from a larger ranking).
pub fn load_csv(path: &Path, limit: Option<usize>) -> Result<Vec<String>> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("opening target list {}", path.display()))?;
    let mut targets = Vec::new();
    for row in reader.deserialize::<TargetRow>() {
        let row = row.with_context(|| format!("reading target list {}", path.display()))?;
        targets.push(with_scheme(row.domain.trim()));
        if let Some(limit) = limit {
            if targets.len() >= limit {
                break;
            }
        }
    }
    if targets.is_empty() {
        bail!("target list {} contains no domains", path.display());
    }
    Ok(targets)
}

/// Parse a comma-separated list of domains.
pub fn parse_list(list: &str) -> Result<Vec<String>> {
    let targets: Vec<String> = list
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(with_scheme)
        .collect();
    if targets.is_empty() {
        bail!("no targets given");
    }
    Ok(targets)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn parses_comma_list_and_prefixes_scheme() {
        let targets = parse_list("example.com, http://b.org ,c.net").expect("parse");
        assert_eq!(
            targets,
            vec!["https://example.com", "http://b.org", "https://c.net"]
        );
    }

    #[test]
    fn empty_list_is_an_error() {
        assert!(parse_list(" , ").is_err());
    }

    #[test]
    fn loads_csv_with_limit() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("closed_world.csv");
        let mut file = std::fs::File::create(&path).expect("create");
        writeln!(file, "rank,domain").expect("write");
        writeln!(file, "1,example.com").expect("write");
        writeln!(file, "2,www.b.org").expect("write");
        writeln!(file, "3,c.net").expect("write");
        drop(file);

        let targets = load_csv(&path, Some(2)).expect("load");
        assert_eq!(targets, vec!["https://example.com", "https://www.b.org"]);
    }
}
