use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

// --- Date range ---

/// How far back a site search reaches. Unknown codes fall back to one week.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DateRange {
    #[serde(rename = "1d")]
    Day,
    #[serde(rename = "1w")]
    #[default]
    Week,
    #[serde(rename = "2w")]
    TwoWeeks,
    #[serde(rename = "1m")]
    Month,
}

impl DateRange {
    pub fn from_code(code: &str) -> Self {
        match code.trim() {
            "1d" => DateRange::Day,
            "2w" => DateRange::TwoWeeks,
            "1m" => DateRange::Month,
            _ => DateRange::Week,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            DateRange::Day => "1d",
            DateRange::Week => "1w",
            DateRange::TwoWeeks => "2w",
            DateRange::Month => "1m",
        }
    }

    pub fn days(&self) -> i64 {
        match self {
            DateRange::Day => 1,
            DateRange::Week => 7,
            DateRange::TwoWeeks => 14,
            DateRange::Month => 30,
        }
    }

    /// `now - days`, formatted `YYYY-MM-DD` for the `after:` operator.
    pub fn cutoff_date(&self, now: DateTime<Utc>) -> String {
        (now - Duration::days(self.days()))
            .format("%Y-%m-%d")
            .to_string()
    }
}

impl std::fmt::Display for DateRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

/// Query restricting results to one domain and to pages indexed after `cutoff`.
pub fn site_query(domain: &str, cutoff: &str) -> String {
    format!("site:{domain} after:{cutoff}")
}

// --- Results ---

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchItem {
    pub title: String,
    pub link: String,
}

/// One decoded page of provider output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchPage {
    /// `returned` is the raw item count before link-less items were dropped;
    /// paging uses it to tell a full page from the last one.
    Items {
        items: Vec<SearchItem>,
        returned: usize,
    },
    Empty,
    ProviderError(String),
}

impl SearchPage {
    /// Decode a Custom Search response body. Never fails: anything that is not
    /// a recognizable result page becomes `ProviderError`.
    pub fn from_body(body: &str) -> Self {
        let value: Value = match serde_json::from_str(body) {
            Ok(v) => v,
            Err(e) => return SearchPage::ProviderError(format!("Malformed search response: {e}")),
        };
        Self::from_value(&value)
    }

    pub fn from_value(value: &Value) -> Self {
        let Some(obj) = value.as_object() else {
            return SearchPage::ProviderError("Unexpected search response shape".to_string());
        };

        if let Some(error) = obj.get("error") {
            let message = error
                .get("message")
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| error.to_string());
            return SearchPage::ProviderError(message);
        }

        let raw_items = match obj.get("items") {
            None | Some(Value::Null) => return SearchPage::Empty,
            Some(Value::Array(items)) => items,
            Some(_) => {
                return SearchPage::ProviderError(
                    "Unexpected search response shape: `items` is not a list".to_string(),
                )
            }
        };

        if raw_items.is_empty() {
            return SearchPage::Empty;
        }

        let items = raw_items
            .iter()
            .filter_map(|item| {
                let link = item.get("link").and_then(Value::as_str)?.trim();
                if link.is_empty() {
                    return None;
                }
                let title = item
                    .get("title")
                    .and_then(Value::as_str)
                    .unwrap_or_default();
                Some(SearchItem {
                    title: title.to_string(),
                    link: link.to_string(),
                })
            })
            .collect();

        SearchPage::Items {
            items,
            returned: raw_items.len(),
        }
    }
}

// --- Credentials ---

/// API key plus programmable search engine id (`cx`).
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    api_key: String,
    engine_id: String,
}

impl Credentials {
    /// Build credentials, treating absent or blank values as unconfigured.
    pub fn resolve(api_key: Option<&str>, engine_id: Option<&str>) -> Option<Self> {
        let api_key = api_key.map(str::trim).filter(|v| !v.is_empty())?;
        let engine_id = engine_id.map(str::trim).filter(|v| !v.is_empty())?;
        Some(Self {
            api_key: api_key.to_string(),
            engine_id: engine_id.to_string(),
        })
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    pub fn engine_id(&self) -> &str {
        &self.engine_id
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("api_key", &"<redacted>")
            .field("engine_id", &self.engine_id)
            .finish()
    }
}
