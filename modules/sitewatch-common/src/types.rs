use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use chrono::Duration;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::SitewatchError;

// --- Setting keys ---

pub const SETTING_GOOGLE_API_KEY: &str = "google_api_key";
pub const SETTING_GOOGLE_CX: &str = "google_cx";

// --- Domain normalization ---

static RE_SCHEME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^https?://").expect("valid scheme regex"));

/// Canonical form of a user-entered domain: surrounding whitespace, scheme
/// prefixes and trailing slashes stripped until none remain, lower-cased.
/// Idempotent.
pub fn normalize_domain(input: &str) -> String {
    let mut domain = input;
    loop {
        let mut next = domain.trim();
        if let Some(m) = RE_SCHEME.find(next) {
            next = &next[m.end()..];
        }
        next = next.trim_end_matches('/').trim();
        if next.len() == domain.len() {
            break;
        }
        domain = next;
    }
    domain.to_lowercase()
}

// --- Site status ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SiteStatus {
    Active,
    Error,
}

impl SiteStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SiteStatus::Active => "active",
            SiteStatus::Error => "error",
        }
    }
}

impl fmt::Display for SiteStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SiteStatus {
    type Err = SitewatchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(SiteStatus::Active),
            "error" => Ok(SiteStatus::Error),
            other => Err(SitewatchError::Validation(format!("Unknown site status: {other}"))),
        }
    }
}

impl TryFrom<String> for SiteStatus {
    type Error = SitewatchError;

    fn try_from(value: String) -> Result<Self, SitewatchError> {
        value.parse()
    }
}

// --- Crawl interval ---

/// How often the scheduler refreshes a site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CrawlInterval {
    #[serde(rename = "12h")]
    TwelveHours,
    #[serde(rename = "1d")]
    #[default]
    Day,
    #[serde(rename = "1w")]
    Week,
}

impl CrawlInterval {
    pub const ALL: [CrawlInterval; 3] =
        [CrawlInterval::TwelveHours, CrawlInterval::Day, CrawlInterval::Week];

    /// Strict parse for user input.
    pub fn parse(code: &str) -> Option<Self> {
        match code.trim() {
            "12h" => Some(CrawlInterval::TwelveHours),
            "1d" => Some(CrawlInterval::Day),
            "1w" => Some(CrawlInterval::Week),
            _ => None,
        }
    }

    /// Lenient lookup for stored codes: anything unrecognized behaves as `1d`.
    pub fn from_code_or_default(code: &str) -> Self {
        Self::parse(code).unwrap_or_default()
    }

    pub fn code(&self) -> &'static str {
        match self {
            CrawlInterval::TwelveHours => "12h",
            CrawlInterval::Day => "1d",
            CrawlInterval::Week => "1w",
        }
    }

    pub fn duration(&self) -> Duration {
        match self {
            CrawlInterval::TwelveHours => Duration::hours(12),
            CrawlInterval::Day => Duration::hours(24),
            CrawlInterval::Week => Duration::hours(168),
        }
    }
}

impl fmt::Display for CrawlInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_strips_scheme_slashes_and_case() {
        assert_eq!(normalize_domain("HTTPS://Example.com/"), "example.com");
        assert_eq!(normalize_domain("http://a.com///"), "a.com");
        assert_eq!(normalize_domain("  Blog.Example.com/news/ "), "blog.example.com/news");
        assert_eq!(normalize_domain("example.com"), "example.com");
    }

    #[test]
    fn normalize_is_idempotent() {
        for input in [
            "HTTPS://Example.com/",
            "https://http://nested.io/",
            "http:///",
            "Shop.Example.COM/path/",
            "",
            "example.com /",
            "https:// Example.com",
            " http:// https://a.com/ / ",
            "/ /",
        ] {
            let once = normalize_domain(input);
            assert_eq!(normalize_domain(&once), once, "input: {input:?}");
        }
    }

    #[test]
    fn normalize_strips_whitespace_exposed_by_stripping() {
        assert_eq!(normalize_domain("example.com /"), "example.com");
        assert_eq!(normalize_domain("https:// Example.com"), "example.com");
        assert_eq!(normalize_domain(" http:// https://a.com/ / "), "a.com");
        assert_eq!(normalize_domain("/ /"), "");
    }

    #[test]
    fn normalize_leaves_non_http_schemes_alone() {
        assert_eq!(normalize_domain("ftp://files.example.com"), "ftp://files.example.com");
    }

    #[test]
    fn interval_durations() {
        assert_eq!(CrawlInterval::TwelveHours.duration(), Duration::hours(12));
        assert_eq!(CrawlInterval::Day.duration(), Duration::hours(24));
        assert_eq!(CrawlInterval::Week.duration(), Duration::hours(168));
    }

    #[test]
    fn unknown_interval_code_behaves_as_one_day() {
        assert_eq!(CrawlInterval::parse("5m"), None);
        assert_eq!(CrawlInterval::from_code_or_default("5m"), CrawlInterval::Day);
        assert_eq!(CrawlInterval::from_code_or_default("1w"), CrawlInterval::Week);
    }

    #[test]
    fn status_round_trips_through_text() {
        assert_eq!("active".parse::<SiteStatus>().unwrap(), SiteStatus::Active);
        assert_eq!(SiteStatus::try_from("error".to_string()).unwrap(), SiteStatus::Error);
        assert!("crawling".parse::<SiteStatus>().is_err());
    }

    #[test]
    fn unknown_status_text_is_a_validation_error() {
        let err: SitewatchError = SiteStatus::try_from("crawling".to_string()).unwrap_err();
        assert!(matches!(err, SitewatchError::Validation(_)));
    }
}
