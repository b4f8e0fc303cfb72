//! Domain and IP list loading
//!
//! Lists are plain text with one entry per line. Surrounding whitespace is
//! trimmed; blank lines and lines starting with `#` are skipped. A run never
//! starts with an empty pool, so a missing or empty file is an error.

use anyhow::{bail, Context, Result};
use phloem_core::PayloadPool;
use std::path::Path;

/// Parse list entries from file contents
pub fn parse_list(content: &str) -> Vec<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect()
}

/// Load a newline-separated list file
pub fn load_list<P: AsRef<Path>>(path: P) -> Result<Vec<String>> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read list file: {}", path.display()))?;

    let entries = parse_list(&content);
    if entries.is_empty() {
        bail!("List file contains no entries: {}", path.display());
    }

    tracing::info!("Loaded {} entries from {}", entries.len(), path.display());
    Ok(entries)
}

/// Load both lists into a payload pool
pub fn load_pool<P: AsRef<Path>, Q: AsRef<Path>>(domains: P, ips: Q) -> Result<PayloadPool> {
    let domains = load_list(domains)?;
    let ips = load_list(ips)?;
    Ok(PayloadPool::new(domains, ips)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_parse_list_skips_blank_and_comment_lines() {
        let content = "# domains\nexample.com\n\n  spaced.example  \r\n#skip\nlast.example";
        assert_eq!(parse_list(content), vec!["example.com", "spaced.example", "last.example"]);
    }

    #[test]
    fn test_load_list_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "10.0.0.1\n10.0.0.2").unwrap();

        assert_eq!(load_list(file.path()).unwrap(), vec!["10.0.0.1", "10.0.0.2"]);
    }

    #[test]
    fn test_empty_list_is_fatal() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "# nothing here\n\n").unwrap();

        let err = load_list(file.path()).unwrap_err();
        assert!(err.to_string().contains("no entries"));
    }

    #[test]
    fn test_missing_file_names_path() {
        let err = load_list("/nonexistent/phloem/domains.txt").unwrap_err();
        assert!(err.to_string().contains("/nonexistent/phloem/domains.txt"));
    }
}
