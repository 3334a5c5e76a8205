use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque identifier assigned to a tab by the host browser.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct TabId(pub u64);

impl fmt::Display for TabId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for TabId {
    fn from(raw: u64) -> Self {
        TabId(raw)
    }
}

/// A single open tab as known to the engine.
///
/// `host` is derived from `url` by the engine when the record is ingested;
/// host adapters may leave it empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TabRecord {
    pub id: TabId,

    pub title: String,

    pub url: String,

    /// Lowercased URL authority, empty when the URL is not http(s).
    #[serde(default)]
    pub host: String,
}

impl TabRecord {
    pub fn new(id: TabId, title: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
            url: url.into(),
            host: String::new(),
        }
    }
}

/// Discrete tab lifecycle notifications delivered by the host.
///
/// Events may reference tabs the engine has not recorded yet; consumers must
/// tolerate that rather than error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TabEvent {
    /// A new tab was opened.
    Created { tab: TabRecord },

    /// An existing tab changed its title and/or navigated to a new URL.
    Updated {
        id: TabId,
        #[serde(skip_serializing_if = "Option::is_none")]
        title: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        url: Option<String>,
    },

    /// A tab was closed.
    Removed { id: TabId },

    /// The host swapped a tab's identity while preserving its metadata.
    Replaced { old_id: TabId, new_id: TabId },
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn event_feed_uses_tagged_representation() {
        let event = TabEvent::Updated {
            id: TabId(7),
            title: Some("Updated title".to_string()),
            url: None,
        };

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "updated");
        assert_eq!(json["id"], 7);
        assert!(json.get("url").is_none());
    }

    #[test]
    fn record_host_defaults_to_empty() {
        let record: TabRecord =
            serde_json::from_str(r#"{"id":1,"title":"t","url":"https://a.example/x"}"#).unwrap();
        assert_eq!(record.host, "");
    }
}
