//! HTML report generation
//!
//! A single self-contained page: summary cards, a per-page overview table
//! and one section per page listing its issues, most severe first.

use crate::crawler::{CrawlReport, PageResult};
use crate::output::summary::ScanSummary;
use crate::severity::{self, summarize_by_severity, Severity};
use std::fmt::Write;

/// Context snippets longer than this are cut
const MAX_CONTEXT_CHARS: usize = 100;

const STYLE: &str = "body{font-family:system-ui,sans-serif;margin:2rem;color:#222}\
table{border-collapse:collapse;width:100%;margin-bottom:1.5rem}\
th,td{border:1px solid #ccc;padding:.4rem;text-align:left;vertical-align:top}\
.cards{display:flex;gap:1rem;margin-bottom:1.5rem}\
.card{border:1px solid #ccc;border-radius:6px;padding:.75rem 1.25rem}\
.card .value{font-size:1.6rem;font-weight:bold}\
.critical{color:#b00020}.major{color:#9a6700}.minor{color:#0550ae}.unknown{color:#555}\
code{font-size:.85em;word-break:break-all}";

/// Formats a scan report as a standalone HTML document
pub fn format_html_report(report: &CrawlReport) -> String {
    let summary = ScanSummary::from_report(report);
    let mut out = String::new();

    out.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n");
    let _ = writeln!(
        out,
        "<title>SiteAble Accessibility Report: {}</title>",
        escape_html(&summary.start_url)
    );
    let _ = writeln!(out, "<style>{}</style>\n</head>\n<body>", STYLE);

    out.push_str("<h1>SiteAble Accessibility Report</h1>\n");
    let _ = writeln!(
        out,
        "<p>Start URL: <a href=\"{0}\">{0}</a><br>Generated: {1}<br>Duration: {2:.2} seconds</p>",
        escape_html(&summary.start_url),
        chrono::Utc::now().format("%Y-%m-%d %H:%M:%S UTC"),
        summary.elapsed_seconds
    );
    if summary.cancelled {
        out.push_str("<p><strong>Scan cancelled; results are partial.</strong></p>\n");
    }

    write_cards(&mut out, &summary);
    write_overview(&mut out, report);

    out.push_str("<h2>Issue Details</h2>\n");
    for result in report.sorted_results() {
        if !result.issues.is_empty() {
            write_page_section(&mut out, result);
        }
    }

    out.push_str("</body>\n</html>\n");
    out
}

fn write_cards(out: &mut String, summary: &ScanSummary) {
    out.push_str("<div class=\"cards\">\n");
    card(out, "", "Pages Scanned", summary.total_pages);
    card(out, "", "Total Issues", summary.total_issues);
    for level in Severity::ALL {
        let count = summary.issues_by_severity.get(level);
        if level == Severity::Unknown && count == 0 {
            continue;
        }
        card(out, level.as_str(), &capitalize(level.as_str()), count);
    }
    out.push_str("</div>\n");
}

fn card(out: &mut String, class: &str, label: &str, value: u64) {
    let _ = writeln!(
        out,
        "<div class=\"card {}\"><h3>{}</h3><div class=\"value\">{}</div></div>",
        class, label, value
    );
}

fn write_overview(out: &mut String, report: &CrawlReport) {
    out.push_str("<h2>Pages Overview</h2>\n<table>\n");
    out.push_str(
        "<tr><th>Page</th><th>Status</th><th>Issues</th>\
         <th>Critical</th><th>Major</th><th>Minor</th></tr>\n",
    );
    for result in report.sorted_results() {
        let counts = summarize_by_severity(&result.issues);
        let _ = writeln!(
            out,
            "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>",
            page_link(result),
            result.fetch_status,
            result.issues.len(),
            counts.critical,
            counts.major,
            counts.minor
        );
    }
    out.push_str("</table>\n");
}

fn page_link(result: &PageResult) -> String {
    let url = escape_html(&result.url);
    if result.issues.is_empty() {
        url
    } else {
        format!("<a href=\"#{}\">{}</a>", anchor_id(&result.url), url)
    }
}

fn write_page_section(out: &mut String, result: &PageResult) {
    let _ = writeln!(
        out,
        "<section id=\"{}\">\n<h3>{} ({} issues)</h3>",
        anchor_id(&result.url),
        escape_html(&result.url),
        result.issues.len()
    );
    out.push_str("<table>\n<tr><th>Severity</th><th>Code</th><th>WCAG</th><th>Message</th><th>Context</th></tr>\n");
    for issue in severity::ranked(&result.issues) {
        let level = severity::severity_for(&issue.code);
        let wcag = severity::lookup(&issue.code)
            .map(|info| format!("{} {}", info.wcag, escape_html(info.wcag_name)))
            .unwrap_or_default();
        let _ = writeln!(
            out,
            "<tr><td class=\"{0}\">{0}</td><td>{1}</td><td>{2}</td><td>{3}</td><td><code>{4}</code></td></tr>",
            level,
            escape_html(&issue.code),
            wcag,
            escape_html(&issue.message),
            escape_html(&truncate(&issue.context, MAX_CONTEXT_CHARS))
        );
    }
    out.push_str("</table>\n</section>\n");
}

/// Escapes text for use in element content and quoted attributes
fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Fragment id derived from a URL; only ASCII alphanumerics survive
fn anchor_id(url: &str) -> String {
    let id: String = url
        .trim_start_matches("https://")
        .trim_start_matches("http://")
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '-' })
        .collect();
    format!("page-{}", id)
}

fn truncate(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
