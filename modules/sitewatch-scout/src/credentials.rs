use anyhow::Result;

use customsearch_client::Credentials;
use sitewatch_common::{AppConfig, SETTING_GOOGLE_API_KEY, SETTING_GOOGLE_CX};

use crate::traits::CrawlStore;

/// Environment fallbacks for the search credentials.
#[derive(Debug, Clone, Default)]
pub struct CredentialDefaults {
    pub api_key: Option<String>,
    pub engine_id: Option<String>,
}

impl CredentialDefaults {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            api_key: config.google_api_key.clone(),
            engine_id: config.google_cx.clone(),
        }
    }
}

/// Resolve each credential from its stored setting, falling back to the
/// environment default. Blank values count as unset. `None` means at least
/// one of the two is missing.
pub async fn resolve_credentials(
    store: &dyn CrawlStore,
    defaults: &CredentialDefaults,
) -> Result<Option<Credentials>> {
    let api_key = pick(store.setting(SETTING_GOOGLE_API_KEY).await?, defaults.api_key.as_deref());
    let engine_id = pick(store.setting(SETTING_GOOGLE_CX).await?, defaults.engine_id.as_deref());
    Ok(Credentials::resolve(api_key.as_deref(), engine_id.as_deref()))
}

fn pick(stored: Option<String>, fallback: Option<&str>) -> Option<String> {
    stored
        .filter(|v| !v.trim().is_empty())
        .or_else(|| fallback.map(str::to_string))
}
