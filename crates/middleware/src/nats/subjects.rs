use std::sync::Arc;

use dashmap::DashMap;

/// Replace characters NATS treats specially in a subject token.
///
/// `.` separates tokens and `*`/`>` are wildcards; symbols like `BTC/USDT`
/// also carry `/` which some consumers dislike. Everything outside
/// `[A-Za-z0-9_-]` becomes `_`.
pub fn sanitize_subject_token(token: &str) -> String {
    token
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Subject formatting for canonical market events.
///
/// Subjects are `{prefix}.{exchange}.{kind}.{symbol}`. Formatted subjects are
/// cached so the publish path allocates once per (exchange, kind, symbol).
pub struct SubjectBuilder {
    /// Pre-computed base prefix: "{prefix}."
    base_prefix: Arc<str>,
    /// Pre-computed wildcard subject
    wildcard: Arc<str>,
    /// Cache of "exchange.kind.symbol" -> full subject
    cache: DashMap<String, Arc<str>>,
}

impl SubjectBuilder {
    pub fn new(prefix: impl Into<String>) -> Self {
        let prefix = prefix.into();
        Self {
            base_prefix: format!("{}.", prefix).into(),
            wildcard: format!("{}.>", prefix).into(),
            cache: DashMap::new(),
        }
    }

    /// Build subject for one event stream: {prefix}.{exchange}.{kind}.{symbol}
    #[inline]
    pub fn event(&self, exchange: &str, kind: &str, symbol: &str) -> Arc<str> {
        let key = format!(
            "{}.{}.{}",
            sanitize_subject_token(exchange),
            kind,
            sanitize_subject_token(symbol)
        );
        if let Some(cached) = self.cache.get(&key) {
            return Arc::clone(cached.value());
        }

        let subject: Arc<str> = format!("{}{}", self.base_prefix, key).into();
        self.cache.insert(key, Arc::clone(&subject));
        subject
    }

    /// Wildcard subject for everything under the prefix: {prefix}.>
    #[inline]
    pub fn all(&self) -> &str {
        &self.wildcard
    }
}
