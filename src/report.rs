//! Human-readable report rendering.
//!
//! Every renderer writes into a `std::io::Write` sink. The console and the
//! report file go through the same functions, so a record renders to the same
//! bytes wherever it ends up. Nothing here is colored; color is applied only to
//! status lines in the binary.
use std::io::{self, Write};

use log::debug;

use crate::aggregate::AggregateResult;
use crate::catalog::SourceCatalog;
use crate::count::{CountResult, RECORDS_PER_CREDIT, estimate_credits};
use crate::record::{Record, is_blank};

/// Fields naming the account, most specific first.
pub const IDENTITY_FIELDS: [&str; 6] = ["email", "login", "username", "user", "profile", "nick"];
pub const CREDENTIAL_FIELDS: [&str; 3] = ["password", "pass", "pwd"];
pub const LOCATION_FIELDS: [&str; 4] = ["url", "website", "site", "domain"];

const GROUPS: [&[&str]; 3] = [&IDENTITY_FIELDS, &CREDENTIAL_FIELDS, &LOCATION_FIELDS];

const RULE_WIDE: usize = 60;
const RULE_BUCKET: usize = 40;
const RULE_RECORD: usize = 30;

/// One line of a rendered record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayField<'a> {
    pub label: String,
    pub value: &'a str,
}

/// `first_name` -> `First Name`, `last-seen` -> `Last Seen`.
pub fn title_label(field: &str) -> String {
    field
        .replace(['_', '-'], " ")
        .split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first
                    .to_uppercase()
                    .chain(chars.flat_map(char::to_lowercase))
                    .collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

fn in_any_group(field: &str) -> bool {
    GROUPS
        .iter()
        .any(|g| g.iter().any(|name| field.eq_ignore_ascii_case(name)))
}

fn first_in_group<'a>(record: &'a Record, group: &[&str]) -> Option<DisplayField<'a>> {
    group.iter().find_map(|name| {
        record.get_meaningful(name).map(|value| DisplayField {
            label: title_label(name),
            value,
        })
    })
}

/// Pick the lines shown for a record: at most one identity, one credential
/// and one location field, then every other non-blank field in record order.
pub fn select_fields(record: &Record) -> Vec<DisplayField<'_>> {
    let mut out: Vec<DisplayField<'_>> = GROUPS
        .iter()
        .filter_map(|g| first_in_group(record, g))
        .collect();
    out.extend(
        record
            .iter()
            .filter(|(k, v)| !in_any_group(k) && !is_blank(v))
            .map(|(k, v)| DisplayField {
                label: title_label(k),
                value: v,
            }),
    );
    out
}

/// Write one record block. `ordinal` counts across the whole report,
/// `index` within its bucket.
pub fn write_record<W: Write>(
    out: &mut W,
    record: &Record,
    ordinal: usize,
    index: usize,
) -> io::Result<()> {
    writeln!(out, "  [{}] Record {}:", ordinal, index)?;
    for f in select_fields(record) {
        writeln!(out, "      {}: {}", f.label, f.value)?;
    }
    writeln!(out, "{}", "-".repeat(RULE_RECORD))
}

/// Write every bucket in insertion order. Returns the number of records
/// written.
pub fn write_buckets<W: Write>(out: &mut W, result: &AggregateResult) -> io::Result<usize> {
    let mut ordinal = 0;
    for bucket in result.buckets() {
        writeln!(out)?;
        writeln!(out, "Database: {}", bucket.key)?;
        writeln!(out, "Records found: {}", bucket.records.len())?;
        writeln!(out, "{}", "-".repeat(RULE_BUCKET))?;
        for (i, record) in bucket.records.iter().enumerate() {
            ordinal += 1;
            write_record(out, record, ordinal, i + 1)?;
            if ordinal % 1000 == 0 {
                debug!("rendered record {}/{}", ordinal, result.size());
            }
        }
    }
    Ok(ordinal)
}

/// Console view of a search: summary line, buckets, closing count.
pub fn write_results<W: Write>(out: &mut W, result: &AggregateResult) -> io::Result<()> {
    writeln!(out, "=== SEARCH RESULTS ===")?;
    writeln!(out, "Total results: {}", result.size())?;
    writeln!(out, "Search took: {}ms", result.elapsed_ms)?;
    writeln!(out, "{}", "-".repeat(RULE_WIDE))?;
    if result.is_empty() {
        writeln!(out, "No results found across any sources")?;
        return Ok(());
    }
    let shown = write_buckets(out, result)?;
    writeln!(out)?;
    writeln!(out, "Total records displayed: {}", shown)
}

pub fn render_results(result: &AggregateResult) -> String {
    let mut buf = Vec::new();
    // Writing into a Vec cannot fail.
    let _ = write_results(&mut buf, result);
    String::from_utf8_lossy(&buf).into_owned()
}

/// `25000` -> `25,000`.
pub fn group_thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

fn plural(n: u64, one: &str, many: &str) -> String {
    if n == 1 {
        format!("{} {}", n, one)
    } else {
        format!("{} {}", group_thousands(n), many)
    }
}

/// Count check report with per-source breakdown and credit estimate.
pub fn write_count_report<W: Write>(
    out: &mut W,
    counts: &CountResult,
    terms: &[String],
    search_type: &str,
) -> io::Result<()> {
    writeln!(out, "=== COUNT RESULTS ===")?;
    writeln!(out, "Search terms: {}", terms.join(", "))?;
    writeln!(out, "Search type: {}", search_type)?;
    writeln!(out, "{}", "-".repeat(50))?;
    writeln!(
        out,
        "Total records available: {}",
        group_thousands(counts.total())
    )?;
    if counts.took > 0 {
        writeln!(out, "Search took: {}ms", counts.took)?;
    }
    if counts.per_source().len() > 1 {
        writeln!(out)?;
        writeln!(out, "Breakdown by source:")?;
        for (source, n) in counts.per_source() {
            if *n > 0 {
                writeln!(out, "   [+] {}: {} records", source, group_thousands(*n))?;
            } else {
                writeln!(out, "   [-] {}: No records", source)?;
            }
        }
    }
    let Some(estimate) = estimate_credits(counts) else {
        writeln!(out, "No records found for this search")?;
        return Ok(());
    };
    writeln!(out)?;
    writeln!(out, "Estimated credits for full search:")?;
    writeln!(
        out,
        "   - Single page: {} (up to {} records per source)",
        plural(estimate.first_page, "credit", "credits"),
        group_thousands(RECORDS_PER_CREDIT)
    )?;
    if estimate.all_pages > estimate.first_page {
        for (source, pages) in estimate.per_source.iter().filter(|(_, p)| *p > 1) {
            writeln!(out, "   - {}: {}", source, plural(*pages, "page", "pages"))?;
        }
        writeln!(
            out,
            "   - All data: ~{} ({})",
            plural(estimate.all_pages, "credit", "credits"),
            plural(estimate.all_pages, "page", "pages")
        )?;
    }
    Ok(())
}

/// Static service information: credit rules, sources, query types.
pub fn write_api_info<W: Write>(out: &mut W, catalog: &SourceCatalog) -> io::Result<()> {
    writeln!(out, "=== KEYSCORE API INFORMATION ===")?;
    writeln!(out, "Credits:")?;
    writeln!(out, "   - Each search = 1 credit per source")?;
    writeln!(out, "   - Each count = 1 credit per source")?;
    writeln!(out, "   - Multi-page: credits = pages x sources")?;
    writeln!(out)?;
    writeln!(out, "Available sources ({}):", catalog.len())?;
    for (i, s) in catalog.sources().iter().enumerate() {
        writeln!(out, "   {}. {}", i + 1, s)?;
    }
    writeln!(out)?;
    writeln!(out, "Search types:")?;
    for (kind, what) in [
        ("url", "Domain/URL searches"),
        ("email", "Email address searches"),
        ("username", "Username searches"),
        ("password", "Password searches"),
        ("phone", "Phone number searches"),
        ("name", "Full name searches"),
    ] {
        writeln!(out, "   - {}: {}", kind, what)?;
    }
    writeln!(out)?;
    writeln!(out, "Multi-source searches (domain, email, username) query every source,")?;
    writeln!(out, "fill in the searched value where a source omits it, and prefix")?;
    writeln!(out, "database names with their source.")
}
