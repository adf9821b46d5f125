//! Deterministic cache key generation.
//!
//! Two key forms:
//!
//! - [`params_key`] — a pure function over named parameters. Keys are
//!   sorted and `None` values dropped, so parameter order and
//!   omitted-vs-explicitly-absent never change the key.
//! - [`scoped_key`] — embeds `scope:model:user:hash` so cache entries are
//!   isolated per user. Two different user ids (or one set vs. unset) can
//!   never collide on the same key, even for identical content.
//!
//! Hashes use `DefaultHasher` (SipHash) — deterministic within a process
//! lifetime, which is all an in-memory cache needs. A shared backend would
//! want a cross-process-stable hash instead.

use std::collections::BTreeMap;
use std::hash::{DefaultHasher, Hash, Hasher};

/// Build a deterministic key from named parameters.
///
/// Parameters with `None` values are dropped, remaining ones are sorted
/// by name and serialized as compact JSON.
pub fn params_key<'a, I>(params: I) -> String
where
    I: IntoIterator<Item = (&'a str, Option<serde_json::Value>)>,
{
    let sorted: BTreeMap<&str, serde_json::Value> = params
        .into_iter()
        .filter_map(|(name, value)| value.map(|v| (name, v)))
        .collect();

    sorted
        .iter()
        .map(|(name, value)| format!("{name}={value}"))
        .collect::<Vec<_>>()
        .join("&")
}

/// Hash content strings into a stable-within-process u64.
pub fn content_hash<'a, I>(parts: I) -> u64
where
    I: IntoIterator<Item = &'a str>,
{
    let mut hasher = DefaultHasher::new();
    for part in parts {
        part.hash(&mut hasher);
        // Separator so ["ab", "c"] and ["a", "bc"] hash differently.
        0xffu8.hash(&mut hasher);
    }
    hasher.finish()
}

/// Build a user-scoped cache key: `scope:model:user:contenthash`.
///
/// `scope` is typically the capability, `user` defaults to "anonymous"
/// when no user id is set. The user segment is structural — content
/// identical across users still yields distinct keys.
pub fn scoped_key(scope: &str, model: &str, user_id: Option<&str>, content: &[&str]) -> String {
    format!(
        "{scope}:{model}:{}:{:016x}",
        user_id.unwrap_or("anonymous"),
        content_hash(content.iter().copied())
    )
}
