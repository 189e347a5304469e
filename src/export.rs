//! Report writer: saves a search result as a plain-text report.
//!
//! The report is buffered in memory first so an allocation failure is caught
//! as [`WriteError::ResourceExhausted`] before any file is touched. The file
//! is named `<sanitized term>-<type>-output.txt`.
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use log::info;

use crate::aggregate::AggregateResult;
use crate::error::WriteError;
use crate::report::write_buckets;

const TOOL_TITLE: &str = "KEYSCORE BREACH DATABASE SEARCH RESULTS";
const RULE: usize = 80;
/// Rough bytes per rendered record, used to size the report buffer up front.
const BYTES_PER_RECORD_HINT: usize = 256;

/// Keep ASCII/Unicode alphanumerics plus `-`, `_` and `.`.
pub fn sanitize(term: &str) -> String {
    term.chars()
        .filter(|c| c.is_alphanumeric() || matches!(c, '-' | '_' | '.'))
        .collect()
}

/// Both parts are sanitized; a free-form query type may contain separators.
pub fn output_filename(search_term: &str, search_type: &str) -> String {
    format!(
        "{}-{}-output.txt",
        sanitize(search_term),
        sanitize(search_type)
    )
}

/// `1536` -> `1.5 KB`. Sizes up to 1024 bytes stay in bytes.
pub fn human_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = 1024 * 1024;
    if bytes > MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes > KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} bytes", bytes)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedReport {
    pub path: PathBuf,
    pub records: usize,
    pub bytes: u64,
}

impl SavedReport {
    pub fn human_size(&self) -> String {
        human_size(self.bytes)
    }
}

/// Render the full report text: header, buckets, summary footer.
pub fn render_report(
    result: &AggregateResult,
    search_term: &str,
    search_type: &str,
    generated: DateTime<Local>,
) -> Result<(Vec<u8>, usize), WriteError> {
    let mut buf: Vec<u8> = Vec::new();
    buf.try_reserve(result.size().saturating_mul(BYTES_PER_RECORD_HINT) + 1024)
        .map_err(|_| WriteError::ResourceExhausted {
            records: result.size(),
        })?;
    let stamp = generated.format("%Y-%m-%d %H:%M:%S").to_string();
    let rule = "=".repeat(RULE);

    // Vec<u8> writes cannot fail short of allocation failure.
    let oom = |_: std::io::Error| WriteError::ResourceExhausted {
        records: result.size(),
    };
    writeln!(buf, "{rule}").map_err(oom)?;
    writeln!(buf, "{TOOL_TITLE}").map_err(oom)?;
    writeln!(buf, "{rule}").map_err(oom)?;
    writeln!(buf, "Search Term: {search_term}").map_err(oom)?;
    writeln!(buf, "Search Type: {search_type}").map_err(oom)?;
    writeln!(buf, "Generated: {stamp}").map_err(oom)?;
    writeln!(buf, "Total Results: {}", result.size()).map_err(oom)?;
    writeln!(buf, "Search Duration: {}ms", result.elapsed_ms).map_err(oom)?;
    writeln!(buf, "{rule}").map_err(oom)?;
    writeln!(buf).map_err(oom)?;

    if result.is_empty() {
        writeln!(buf, "No results found across any sources.").map_err(oom)?;
        return Ok((buf, 0));
    }

    let records = write_buckets(&mut buf, result).map_err(oom)?;
    writeln!(buf).map_err(oom)?;
    writeln!(buf, "{rule}").map_err(oom)?;
    writeln!(buf, "SEARCH SUMMARY").map_err(oom)?;
    writeln!(buf, "{rule}").map_err(oom)?;
    writeln!(buf, "Total Records: {records}").map_err(oom)?;
    writeln!(buf, "Databases with Results: {}", result.buckets().len()).map_err(oom)?;
    writeln!(buf, "Search Term: {search_term}").map_err(oom)?;
    writeln!(buf, "Search Type: {}", search_type.to_uppercase()).map_err(oom)?;
    writeln!(buf, "File Generated: {stamp}").map_err(oom)?;
    writeln!(buf, "{rule}").map_err(oom)?;
    Ok((buf, records))
}

/// Write the report for `result` into `dir` and report where it went.
pub fn save_results_txt<P: AsRef<Path>>(
    result: &AggregateResult,
    search_term: &str,
    search_type: &str,
    dir: P,
) -> Result<SavedReport, WriteError> {
    let path = dir.as_ref().join(output_filename(search_term, search_type));
    let (contents, records) = render_report(result, search_term, search_type, Local::now())?;
    fs::write(&path, &contents).map_err(|e| WriteError::from_io(&path, e))?;
    let bytes = fs::metadata(&path)
        .map(|m| m.len())
        .unwrap_or(contents.len() as u64);
    info!("wrote {} records to {}", records, path.display());
    Ok(SavedReport {
        path,
        records,
        bytes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::SearchQuery;
    use crate::record::{Record, SearchResult, SearchResultBucket};
    use tempfile::tempdir;

    fn sample() -> AggregateResult {
        let mut agg = AggregateResult::new();
        let records: Vec<Record> = vec![
            [("email", ""), ("password", "pw1")].into_iter().collect(),
            [("email", "N/A"), ("city", "Oslo")].into_iter().collect(),
        ];
        agg.merge(
            "leakcheck",
            SearchResult {
                buckets: vec![SearchResultBucket {
                    database: "combo".to_string(),
                    records,
                }],
                size: 2,
                took: 40,
            },
            &SearchQuery::single("user@site.com!", "email"),
        );
        agg
    }

    #[test]
    fn sanitize_keeps_alnum_dash_underscore_dot() {
        assert_eq!(sanitize("user@site.com!"), "usersite.com");
        assert_eq!(sanitize("a-b_c.d e/f\\g:h"), "a-b_c.defgh");
        assert_eq!(sanitize("*.target.com"), ".target.com");
    }

    #[test]
    fn filename_format() {
        assert_eq!(
            output_filename("user@site.com!", "email"),
            "usersite.com-email-output.txt"
        );
        assert_eq!(output_filename("x", "a/b"), "x-ab-output.txt");
        assert_eq!(output_filename("x", "../url"), "x-..url-output.txt");
    }

    #[test]
    fn path_like_search_type_stays_inside_output_dir() {
        let dir = tempdir().unwrap();
        let saved = save_results_txt(&sample(), "x", "a/b", dir.path()).unwrap();
        assert_eq!(saved.path, dir.path().join("x-ab-output.txt"));
        assert!(saved.path.exists());
        let text = std::fs::read_to_string(&saved.path).unwrap();
        assert!(text.contains("Search Type: A/B"));
    }

    #[test]
    fn human_sizes() {
        assert_eq!(human_size(512), "512 bytes");
        assert_eq!(human_size(1024), "1024 bytes");
        assert_eq!(human_size(1536), "1.5 KB");
        assert_eq!(human_size(3 * 1024 * 1024), "3.0 MB");
    }

    #[test]
    fn writes_header_buckets_and_footer() {
        let dir = tempdir().unwrap();
        let saved = save_results_txt(&sample(), "user@site.com!", "email", dir.path()).unwrap();
        assert_eq!(saved.path, dir.path().join("usersite.com-email-output.txt"));
        assert_eq!(saved.records, 2);
        let text = std::fs::read_to_string(&saved.path).unwrap();
        assert_eq!(saved.bytes, text.len() as u64);
        assert!(text.starts_with(&"=".repeat(80)));
        assert!(text.contains("Search Term: user@site.com!"));
        assert!(text.contains("Total Results: 2"));
        assert!(text.contains("Search Duration: 40ms"));
        assert!(text.contains("Database: leakcheck > combo"));
        assert!(text.contains("Email: user@site.com!"));
        assert!(text.contains("Databases with Results: 1"));
        assert!(text.contains("Search Type: EMAIL"));
        let header = text.find("Total Results").unwrap();
        let body = text.find("Database:").unwrap();
        let footer = text.find("SEARCH SUMMARY").unwrap();
        assert!(header < body && body < footer);
    }

    #[test]
    fn empty_result_writes_header_only() {
        let dir = tempdir().unwrap();
        let saved = save_results_txt(&AggregateResult::new(), "x", "url", dir.path()).unwrap();
        let text = std::fs::read_to_string(saved.path).unwrap();
        assert!(text.contains("No results found across any sources."));
        assert!(!text.contains("SEARCH SUMMARY"));
        assert_eq!(saved.records, 0);
    }

    #[test]
    fn missing_directory_is_a_filesystem_error() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("nope");
        let err = save_results_txt(&sample(), "x", "email", &missing).unwrap_err();
        assert!(matches!(err, WriteError::Filesystem { .. }));
    }

    #[test]
    fn report_text_is_deterministic_for_fixed_time() {
        let t = Local::now();
        let (a, _) = render_report(&sample(), "t", "email", t).unwrap();
        let (b, _) = render_report(&sample(), "t", "email", t).unwrap();
        assert_eq!(a, b);
    }
}
