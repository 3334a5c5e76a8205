use crate::MIN_TOKEN_LEN;
use once_cell::sync::Lazy;
use std::collections::HashSet;
use url::Url;

/// Words carrying no intent signal: articles, conjunctions, common
/// interrogatives, and the comparison words that dominate search-style
/// titles.
static STOP_WORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        // articles
        "a", "an", "the",
        // conjunctions
        "and", "but", "for", "nor", "or", "so", "yet",
        // interrogatives
        "how", "what", "when", "where", "which", "who", "whom", "whose", "why",
        // comparison words
        "best", "top", "versus", "vs",
    ]
    .into_iter()
    .collect()
});

/// Split free text into lowercase intent tokens.
///
/// Underscore and hyphen runs separate words; every other character outside
/// `[a-z0-9]` is treated as a separator. Tokens shorter than two characters
/// and stop words are dropped.
pub fn tokenize(text: &str) -> Vec<String> {
    let lowered = text.to_lowercase();
    let cleaned: String = lowered
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { ' ' })
        .collect();

    cleaned
        .split_whitespace()
        .filter(|token| token.len() >= MIN_TOKEN_LEN && !STOP_WORDS.contains(token))
        .map(str::to_string)
        .collect()
}

/// Lowercased authority of an `http`/`https` URL. Any other scheme (or an
/// unparseable URL) yields `None`.
pub fn page_host(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return None;
    }
    parsed.host_str().map(str::to_ascii_lowercase)
}

/// Coarse same-site key: the last two DNS labels of a host.
pub fn registrable_domain(host: &str) -> String {
    let labels: Vec<&str> = host.split('.').filter(|label| !label.is_empty()).collect();
    match labels.len() {
        0 => String::new(),
        1 => labels[0].to_string(),
        n => labels[n - 2..].join("."),
    }
}

/// The textual signals extracted from one tab, shared between vectorization
/// and labeling so both see the same tokens.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageSignals {
    /// Lowercased URL authority, when the URL was http(s).
    pub host: Option<String>,

    pub title_tokens: Vec<String>,

    pub path_tokens: Vec<String>,
}

impl PageSignals {
    pub fn extract(title: &str, url: &str) -> Self {
        let title_tokens = tokenize(title);

        let Some(parsed) = Url::parse(url)
            .ok()
            .filter(|u| matches!(u.scheme(), "http" | "https"))
        else {
            return Self {
                host: None,
                title_tokens,
                path_tokens: Vec::new(),
            };
        };

        Self {
            host: parsed.host_str().map(str::to_ascii_lowercase),
            title_tokens,
            path_tokens: tokenize(parsed.path()),
        }
    }

    /// All textual tokens, title first, then path.
    pub fn tokens(&self) -> impl Iterator<Item = &str> {
        self.title_tokens
            .iter()
            .chain(self.path_tokens.iter())
            .map(String::as_str)
    }
}
