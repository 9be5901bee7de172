//! Route classification.
//!
//! Every intercepted request is mapped to exactly one [`RoutePolicy`] by an
//! ordered list of substring rules, evaluated first-match-wins. Matching is a
//! plain `contains` on the URL path: `/admin/` matches `/x/admin/y` as well as
//! `/admin/programs`. Nested paths are covered by this on purpose, and the
//! occasional coincidental match is accepted along with it.
//!
//! Author: kelexine (<https://github.com/kelexine>)

use crate::config::CacheConfig;
use axum::http::Method;
use serde::{Deserialize, Serialize};
use std::fmt;

/// What the router does with a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoutePolicy {
    /// API traffic. Always live; a failed fetch becomes a synthetic JSON 503.
    NeverCache,
    /// Frequently edited content. Always live; failures propagate unchanged.
    AlwaysFresh,
    /// Static shell and assets. Served from the cache when present (GET only).
    CacheFirst,
}

impl RoutePolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            RoutePolicy::NeverCache => "never_cache",
            RoutePolicy::AlwaysFresh => "always_fresh",
            RoutePolicy::CacheFirst => "cache_first",
        }
    }
}

impl fmt::Display for RoutePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single (pattern, policy) pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteRule {
    pub pattern: String,
    pub policy: RoutePolicy,
}

impl RouteRule {
    pub fn new(pattern: impl Into<String>, policy: RoutePolicy) -> Self {
        Self {
            pattern: pattern.into(),
            policy,
        }
    }

    pub fn matches(&self, path: &str) -> bool {
        path.contains(self.pattern.as_str())
    }
}

/// Ordered rule list with a [`RoutePolicy::CacheFirst`] fallback.
#[derive(Debug, Clone)]
pub struct RouteClassifier {
    api_prefix: String,
    rules: Vec<RouteRule>,
}

impl RouteClassifier {
    /// The API rule comes first, then one `AlwaysFresh` rule per allowlist entry.
    pub fn new<I, S>(api_prefix: impl Into<String>, fresh_routes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let api_prefix = api_prefix.into();
        let mut rules = vec![RouteRule::new(api_prefix.clone(), RoutePolicy::NeverCache)];
        rules.extend(
            fresh_routes
                .into_iter()
                .map(|pattern| RouteRule::new(pattern, RoutePolicy::AlwaysFresh)),
        );

        Self { api_prefix, rules }
    }

    pub fn from_config(config: &CacheConfig) -> Self {
        Self::new(config.api_prefix.clone(), config.fresh_routes.iter().cloned())
    }

    /// Classify a request. The method does not influence the policy; the
    /// router restricts `CacheFirst` to GET when it executes it.
    pub fn classify(&self, _method: &Method, path: &str) -> RoutePolicy {
        self.rules
            .iter()
            .find(|rule| rule.matches(path))
            .map(|rule| rule.policy)
            .unwrap_or(RoutePolicy::CacheFirst)
    }

    /// True when `path` falls under the API prefix.
    pub fn is_api_path(&self, path: &str) -> bool {
        path.contains(self.api_prefix.as_str())
    }

    pub fn rules(&self) -> &[RouteRule] {
        &self.rules
    }
}

impl Default for RouteClassifier {
    fn default() -> Self {
        Self::from_config(&CacheConfig::default())
    }
}
