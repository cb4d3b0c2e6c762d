//! Caller-supplied provider keys.
//!
//! Keys arrive as one header per provider and are only ever attached to the
//! outbound call for that provider. They are never logged.

use std::collections::HashMap;
use std::fmt;

use axum::http::HeaderMap;

use crate::providers::registry::ProviderId;

#[derive(Clone, Default)]
pub struct ProviderKeys(HashMap<ProviderId, String>);

impl ProviderKeys {
    pub fn new() -> Self {
        Self::default()
    }

    /// Collect keys from the per-provider headers (`X-Groq-Key`, ...).
    ///
    /// Blank values and values that are not valid header text count as absent.
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let keys = ProviderId::ALL
            .into_iter()
            .filter_map(|id| {
                let value = headers.get(id.key_header())?.to_str().ok()?.trim();
                (!value.is_empty()).then(|| (id, value.to_string()))
            })
            .collect();
        Self(keys)
    }

    pub fn get(&self, id: ProviderId) -> Option<&str> {
        self.0.get(&id).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

impl fmt::Debug for ProviderKeys {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut providers: Vec<&str> = self.0.keys().map(ProviderId::as_str).collect();
        providers.sort_unstable();
        f.debug_struct("ProviderKeys")
            .field("providers", &providers)
            .finish()
    }
}

impl<K: Into<String>> FromIterator<(ProviderId, K)> for ProviderKeys {
    fn from_iter<I: IntoIterator<Item = (ProviderId, K)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(id, k)| (id, k.into())).collect())
    }
}
