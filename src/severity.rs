//! Issue severity and WCAG reference data
//!
//! Analyzers only report a code. Reports look the code up here to rank
//! findings and to cite the WCAG success criterion they fall under. Codes
//! are matched case-insensitively with `-` and `_` treated alike, so
//! `img-missing-alt` and `IMG_MISSING_ALT` are the same code.

use crate::analyzer::Issue;
use serde::Serialize;
use std::fmt;

/// How badly an issue blocks access
///
/// Ordered from most to least severe, so sorting ascending puts critical
/// findings first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Blocks access outright
    Critical,
    /// Significant barrier
    Major,
    /// Usability issue with a workaround
    Minor,
    /// Code not in the reference table
    Unknown,
}

impl Severity {
    pub const ALL: [Severity; 4] = [
        Severity::Critical,
        Severity::Major,
        Severity::Minor,
        Severity::Unknown,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Critical => "critical",
            Severity::Major => "major",
            Severity::Minor => "minor",
            Severity::Unknown => "unknown",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reference data for one known issue code
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeverityInfo {
    pub severity: Severity,
    /// WCAG success criterion number, e.g. `1.1.1`
    pub wcag: &'static str,
    pub wcag_name: &'static str,
    pub impact: &'static str,
}

const fn info(
    severity: Severity,
    wcag: &'static str,
    wcag_name: &'static str,
    impact: &'static str,
) -> SeverityInfo {
    SeverityInfo {
        severity,
        wcag,
        wcag_name,
        impact,
    }
}

use Severity::{Critical, Major, Minor};

const KNOWN_CODES: &[(&str, SeverityInfo)] = &[
    ("IMG_MISSING_ALT", info(Critical, "1.1.1", "Non-text Content", "Screen reader users cannot understand image content")),
    ("LINK_IMG_MISSING_ALT", info(Critical, "1.1.1", "Non-text Content", "Screen reader users cannot understand link purpose")),
    ("FORM_CONTROL_NO_LABEL", info(Critical, "1.3.1", "Info and Relationships", "Screen reader users cannot identify form fields")),
    ("LINK_NO_TEXT", info(Critical, "2.4.4", "Link Purpose (In Context)", "Screen reader users cannot understand link destination")),
    ("BUTTON_NO_TEXT", info(Critical, "4.1.2", "Name, Role, Value", "Screen reader users cannot understand button purpose")),
    ("MISSING_LANG", info(Critical, "3.1.1", "Language of Page", "Screen readers may mispronounce content")),
    ("TABLE_NO_HEADERS", info(Critical, "1.3.1", "Info and Relationships", "Screen reader users cannot understand table structure")),
    ("ARIA_HIDDEN_FOCUSABLE", info(Critical, "4.1.2", "Name, Role, Value", "Keyboard users can focus invisible elements")),
    ("LOW_CONTRAST", info(Major, "1.4.3", "Contrast (Minimum)", "Users with low vision may not be able to read text")),
    ("VIDEO_NO_CAPTIONS", info(Major, "1.2.2", "Captions (Prerecorded)", "Deaf users cannot access video audio content")),
    ("AUDIO_NO_TRANSCRIPT", info(Major, "1.2.1", "Audio-only and Video-only", "Deaf users cannot access audio content")),
    ("INVALID_ARIA_ROLE", info(Major, "4.1.2", "Name, Role, Value", "Assistive technology may not interpret element correctly")),
    ("MISSING_MAIN", info(Major, "1.3.1", "Info and Relationships", "Screen reader users cannot easily navigate to main content")),
    ("AUTOPLAY_NO_CONTROLS", info(Major, "1.4.2", "Audio Control", "Users cannot stop unwanted audio")),
    ("HEADING_ORDER", info(Minor, "1.3.1", "Info and Relationships", "May confuse screen reader users navigating by headings")),
    ("INVALID_LANG", info(Minor, "3.1.1", "Language of Page", "Screen readers may not properly switch language")),
    ("NO_SKIP_LINK", info(Minor, "2.4.1", "Bypass Blocks", "Keyboard users must tab through all navigation")),
    ("BROKEN_SKIP_LINK", info(Minor, "2.4.1", "Bypass Blocks", "Skip link does not work as expected")),
    ("MULTIPLE_H1", info(Minor, "1.3.1", "Info and Relationships", "May confuse screen reader users about page structure")),
    ("TABLE_NO_CAPTION", info(Minor, "1.3.1", "Info and Relationships", "Screen reader users may not understand table purpose")),
    ("MISSING_TITLE", info(Minor, "2.4.2", "Page Titled", "Users may not identify page purpose in tabs/bookmarks")),
];

fn same_code(known: &str, code: &str) -> bool {
    known.len() == code.len()
        && known.bytes().zip(code.bytes()).all(|(k, c)| {
            let c = if c == b'-' { b'_' } else { c.to_ascii_uppercase() };
            k == c
        })
}

/// Looks up the reference data for an issue code
pub fn lookup(code: &str) -> Option<&'static SeverityInfo> {
    KNOWN_CODES
        .iter()
        .find(|(known, _)| same_code(known, code))
        .map(|(_, info)| info)
}

/// Severity of an issue code, [`Severity::Unknown`] when the code is not listed
pub fn severity_for(code: &str) -> Severity {
    lookup(code).map_or(Severity::Unknown, |info| info.severity)
}

/// Sorts issues most severe first, keeping analyzer order within a level
pub fn sort_by_severity(issues: &mut [Issue]) {
    issues.sort_by_key(|issue| severity_for(&issue.code));
}

/// Borrows issues most severe first without reordering the originals
pub fn ranked(issues: &[Issue]) -> Vec<&Issue> {
    let mut refs: Vec<&Issue> = issues.iter().collect();
    refs.sort_by_key(|issue| severity_for(&issue.code));
    refs
}

/// Issue counts per severity level
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SeverityCounts {
    pub critical: u64,
    pub major: u64,
    pub minor: u64,
    pub unknown: u64,
}

impl SeverityCounts {
    pub fn add(&mut self, severity: Severity) {
        *self.slot(severity) += 1;
    }

    pub fn get(&self, severity: Severity) -> u64 {
        match severity {
            Severity::Critical => self.critical,
            Severity::Major => self.major,
            Severity::Minor => self.minor,
            Severity::Unknown => self.unknown,
        }
    }

    pub fn total(&self) -> u64 {
        self.critical + self.major + self.minor + self.unknown
    }

    fn slot(&mut self, severity: Severity) -> &mut u64 {
        match severity {
            Severity::Critical => &mut self.critical,
            Severity::Major => &mut self.major,
            Severity::Minor => &mut self.minor,
            Severity::Unknown => &mut self.unknown,
        }
    }
}

/// Counts issues per severity level
pub fn summarize_by_severity<'a>(issues: impl IntoIterator<Item = &'a Issue>) -> SeverityCounts {
    let mut counts = SeverityCounts::default();
    for issue in issues {
        counts.add(severity_for(&issue.code));
    }
    counts
}
