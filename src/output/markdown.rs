//! Markdown report generation
//!
//! Produces a human-readable markdown report of a scan: run overview,
//! fetch status breakdown, severity and issue code tables, and the per-page
//! findings ordered most severe first.

use crate::crawler::CrawlReport;
use crate::output::summary::ScanSummary;
use crate::severity::{self, Severity};
use std::fmt::Write;

/// Pages listed in full before the report is truncated
const MAX_PAGES_LISTED: usize = 500;

/// Formats a scan report as markdown
pub fn format_markdown_report(report: &CrawlReport) -> String {
    let summary = ScanSummary::from_report(report);
    let mut md = String::new();

    md.push_str("# SiteAble Accessibility Report\n\n");

    md.push_str("## Scan Information\n\n");
    let _ = writeln!(md, "- **Start URL**: {}", summary.start_url);
    let _ = writeln!(md, "- **Duration**: {:.2} seconds", summary.elapsed_seconds);
    let _ = writeln!(md, "- **Pages Fetched**: {}", summary.pages_fetched);
    if summary.cancelled {
        md.push_str("- **Status**: cancelled (partial results)\n");
    } else {
        md.push_str("- **Status**: completed\n");
    }
    md.push('\n');

    md.push_str("## Overall Statistics\n\n");
    let _ = writeln!(md, "- **Total Pages**: {}", summary.total_pages);
    let _ = writeln!(md, "- **Total Issues**: {}", summary.total_issues);
    let _ = writeln!(md, "- **Pages With Issues**: {}", summary.pages_with_issues);
    let _ = writeln!(md, "- **Links Discovered**: {}", summary.links_discovered);
    let _ = writeln!(md, "- **Success Rate**: {:.2}%\n", summary.success_rate());

    md.push_str("## Fetch Status Breakdown\n\n");
    md.push_str("| Status | Count |\n");
    md.push_str("|--------|-------|\n");
    let _ = writeln!(md, "| OK | {} |", summary.pages_ok);
    let _ = writeln!(md, "| HTTP Error | {} |", summary.pages_http_error);
    let _ = writeln!(md, "| Timeout | {} |", summary.pages_timeout);
    let _ = writeln!(md, "| Network Error | {} |", summary.pages_network_error);
    let _ = writeln!(md, "| Blocked by robots.txt | {} |", summary.pages_robots_blocked);
    let _ = writeln!(md, "| Not HTML | {} |\n", summary.pages_not_html);

    if summary.total_issues > 0 {
        md.push_str("## Issues by Severity\n\n");
        md.push_str("| Severity | Count |\n");
        md.push_str("|----------|-------|\n");
        for level in Severity::ALL {
            let _ = writeln!(md, "| {} | {} |", level, summary.issues_by_severity.get(level));
        }
        md.push('\n');
    }

    if !summary.issues_by_code.is_empty() {
        md.push_str("## Issues by Code\n\n");
        md.push_str("| Code | Count |\n");
        md.push_str("|------|-------|\n");
        for (code, count) in summary.top_issue_codes() {
            let _ = writeln!(md, "| {} | {} |", escape_cell(code), count);
        }
        md.push('\n');
    }

    let pages = report.sorted_results();
    if !pages.is_empty() {
        md.push_str("## Pages\n\n");
        for result in pages.iter().take(MAX_PAGES_LISTED) {
            let _ = writeln!(md, "### {}\n", result.url);
            let _ = writeln!(md, "Status: `{}`\n", result.fetch_status);
            if result.issues.is_empty() {
                md.push_str("No issues found.\n\n");
                continue;
            }
            for issue in severity::ranked(&result.issues) {
                let _ = write!(
                    md,
                    "- [{}] **{}**: {}",
                    severity::severity_for(&issue.code),
                    issue.code,
                    issue.message
                );
                if let Some(info) = severity::lookup(&issue.code) {
                    let _ = write!(md, " (WCAG {})", info.wcag);
                }
                if !issue.context.is_empty() {
                    let _ = write!(md, " (`{}`)", issue.context.replace('`', "'"));
                }
                md.push('\n');
            }
            md.push('\n');
        }
        if pages.len() > MAX_PAGES_LISTED {
            let _ = writeln!(md, "... and {} more pages\n", pages.len() - MAX_PAGES_LISTED);
        }
    }

    md
}

fn escape_cell(value: &str) -> String {
    value.replace('|', "\\|")
}
