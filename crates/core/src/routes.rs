//! Route classification tables.
//!
//! Maps a request path to its cache policy: how long a read may be cached,
//! which tags a cached read is filed under, and which tags a mutation purges.
//!
//! ### Matching
//! - Rules are checked in order; the first match wins, so specific prefixes
//!   come before broader ones.
//! - Only the path component is matched. Callers pass `Url::path()` of the
//!   resolved request, so query and origin never take part.
//!
//! Tags encode cross-entity dependencies. Reports are computed from time
//! entries, payments and users, so mutations on those routes purge `reports`.

use std::time::Duration;

/// How a rule matches a path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathMatch {
    /// Path must equal the pattern.
    Exact(&'static str),
    /// Path must start with the pattern.
    Prefix(&'static str),
}

impl PathMatch {
    pub fn matches(&self, path: &str) -> bool {
        match self {
            PathMatch::Exact(p) => path == *p,
            PathMatch::Prefix(p) => path.starts_with(p),
        }
    }
}

/// Default lifetime for cacheable reads.
const LONG: u64 = 45_000;
/// Lifetime for identity-scoped reads that go stale quickly.
const SHORT: u64 = 15_000;

/// Default cache lifetime per route, in milliseconds.
pub const TTL_RULES: &[(PathMatch, u64)] = &[
    (PathMatch::Exact("/api/auth/me"), SHORT),
    (PathMatch::Prefix("/api/dashboard/"), LONG),
    (PathMatch::Prefix("/api/tasks"), LONG),
    (PathMatch::Prefix("/api/time-entries/hours-report"), LONG),
    (PathMatch::Prefix("/api/projects/status-counts"), LONG),
    (PathMatch::Prefix("/api/projects"), LONG),
    (PathMatch::Prefix("/api/reports/projects-finance-overview"), LONG),
    (PathMatch::Prefix("/api/reports/me"), SHORT),
    (PathMatch::Prefix("/api/reports/"), LONG),
    (PathMatch::Prefix("/api/payments"), LONG),
    (PathMatch::Prefix("/api/customer-payments"), LONG),
    (PathMatch::Prefix("/api/bonus-and-penalties"), LONG),
    (PathMatch::Prefix("/api/expenses"), LONG),
    (PathMatch::Prefix("/api/users"), LONG),
];

/// Tags a cached read is filed under.
pub const READ_TAG_RULES: &[(PathMatch, &[&str])] = &[
    (PathMatch::Prefix("/api/auth/me"), &["auth", "reports"]),
    (PathMatch::Prefix("/api/dashboard/"), &["dashboard"]),
    (PathMatch::Prefix("/api/time-entries"), &["hours", "dashboard", "reports", "time-entries"]),
    (PathMatch::Prefix("/api/projects"), &["projects", "reports", "dashboard"]),
    (PathMatch::Prefix("/api/reports/"), &["reports", "dashboard", "finance", "hours"]),
    (PathMatch::Prefix("/api/payments"), &["payments", "finance", "reports"]),
    (PathMatch::Prefix("/api/customer-payments"), &["customer-payments", "finance", "reports"]),
    (PathMatch::Prefix("/api/bonus-and-penalties"), &["bonuses", "finance", "reports"]),
    (PathMatch::Prefix("/api/expenses"), &["expenses", "finance", "reports"]),
    (PathMatch::Prefix("/api/users"), &["users", "reports", "finance"]),
];

/// Tags a successful mutation purges.
pub const INVALIDATION_RULES: &[(PathMatch, &[&str])] = &[
    (PathMatch::Prefix("/api/projects"), &["projects", "reports", "dashboard", "finance"]),
    (PathMatch::Prefix("/api/time-entries"), &["hours", "dashboard", "reports", "time-entries"]),
    (PathMatch::Prefix("/api/payments"), &["payments", "finance", "reports"]),
    (PathMatch::Prefix("/api/customer-payments"), &["customer-payments", "finance", "reports"]),
    (PathMatch::Prefix("/api/bonus-and-penalties"), &["bonuses", "finance", "reports"]),
    (PathMatch::Prefix("/api/expenses"), &["expenses", "finance", "reports"]),
    (PathMatch::Prefix("/api/users"), &["users", "reports", "finance", "dashboard"]),
    (PathMatch::Prefix("/api/tasks"), &["tasks", "dashboard"]),
    (
        PathMatch::Prefix("/api/auth/"),
        &["auth", "reports", "dashboard", "hours", "projects", "finance", "users"],
    ),
];

/// Every domain tag; invalidating these empties all tagged entries.
pub const ALL_TAGS: &[&str] = &[
    "auth",
    "dashboard",
    "hours",
    "projects",
    "finance",
    "reports",
    "payments",
    "users",
    "expenses",
    "bonuses",
    "tasks",
    "time-entries",
];

fn first_match<T: Copy>(rules: &[(PathMatch, T)], path: &str) -> Option<T> {
    if path.is_empty() {
        return None;
    }
    rules.iter().find(|(m, _)| m.matches(path)).map(|(_, v)| *v)
}

/// Default cache lifetime for a path. Zero means "do not cache".
pub fn cache_lifetime_for(path: &str) -> Duration {
    Duration::from_millis(first_match(TTL_RULES, path).unwrap_or(0))
}

/// Tags a cached read of `path` is filed under.
pub fn read_tags_for(path: &str) -> &'static [&'static str] {
    first_match(READ_TAG_RULES, path).unwrap_or(&[])
}

/// Tags purged after a successful mutation against `path`.
pub fn invalidation_tags_for(path: &str) -> &'static [&'static str] {
    first_match(INVALIDATION_RULES, path).unwrap_or(&[])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ttl_ms(path: &str) -> u128 {
        cache_lifetime_for(path).as_millis()
    }

    #[test]
    fn test_ttl_auth_me_is_exact() {
        assert_eq!(ttl_ms("/api/auth/me"), 15_000);
        assert_eq!(ttl_ms("/api/auth/me/extra"), 0);
        assert_eq!(ttl_ms("/api/auth/login"), 0);
    }

    #[test]
    fn test_ttl_long_lived_routes() {
        for path in [
            "/api/dashboard/today",
            "/api/dashboard/open-entries",
            "/api/tasks",
            "/api/tasks/id",
            "/api/time-entries/hours-report",
            "/api/projects",
            "/api/projects/status-counts",
            "/api/projects/id",
            "/api/reports/projects-finance-overview",
            "/api/reports/payroll",
            "/api/payments",
            "/api/customer-payments",
            "/api/bonus-and-penalties",
            "/api/expenses",
            "/api/users",
        ] {
            assert_eq!(ttl_ms(path), 45_000, "ttl for {path}");
        }
    }

    #[test]
    fn test_ttl_reports_me_is_short() {
        assert_eq!(ttl_ms("/api/reports/me"), 15_000);
        assert_eq!(ttl_ms("/api/reports/me/summary"), 15_000);
    }

    #[test]
    fn test_ttl_uncached_routes() {
        assert_eq!(ttl_ms(""), 0);
        assert_eq!(ttl_ms("/api/time-entries"), 0);
        assert_eq!(ttl_ms("/api/time-entries/my-open"), 0);
        assert_eq!(ttl_ms("/api/dashboard"), 0);
        assert_eq!(ttl_ms("/api/reports"), 0);
        assert_eq!(ttl_ms("/api/customers"), 0);
        assert_eq!(ttl_ms("/health"), 0);
    }

    #[test]
    fn test_read_tags() {
        assert_eq!(read_tags_for("/api/auth/me"), &["auth", "reports"]);
        assert_eq!(read_tags_for("/api/dashboard/today"), &["dashboard"]);
        assert_eq!(read_tags_for("/api/time-entries/hours-report"), &["hours", "dashboard", "reports", "time-entries"]);
        assert_eq!(read_tags_for("/api/projects/status-counts"), &["projects", "reports", "dashboard"]);
        assert_eq!(read_tags_for("/api/reports/me"), &["reports", "dashboard", "finance", "hours"]);
        assert_eq!(read_tags_for("/api/payments"), &["payments", "finance", "reports"]);
        assert_eq!(read_tags_for("/api/customer-payments"), &["customer-payments", "finance", "reports"]);
        assert_eq!(read_tags_for("/api/bonus-and-penalties"), &["bonuses", "finance", "reports"]);
        assert_eq!(read_tags_for("/api/expenses"), &["expenses", "finance", "reports"]);
        assert_eq!(read_tags_for("/api/users"), &["users", "reports", "finance"]);
    }

    #[test]
    fn test_read_tags_missing() {
        assert!(read_tags_for("").is_empty());
        assert!(read_tags_for("/api/tasks").is_empty());
        assert!(read_tags_for("/api/customers").is_empty());
        assert!(read_tags_for("/api/auth/login").is_empty());
    }

    #[test]
    fn test_invalidation_tags() {
        assert_eq!(invalidation_tags_for("/api/projects/id"), &["projects", "reports", "dashboard", "finance"]);
        assert_eq!(
            invalidation_tags_for("/api/time-entries/check-in"),
            &["hours", "dashboard", "reports", "time-entries"]
        );
        assert_eq!(invalidation_tags_for("/api/payments"), &["payments", "finance", "reports"]);
        assert_eq!(invalidation_tags_for("/api/customer-payments"), &["customer-payments", "finance", "reports"]);
        assert_eq!(invalidation_tags_for("/api/bonus-and-penalties"), &["bonuses", "finance", "reports"]);
        assert_eq!(invalidation_tags_for("/api/expenses/id"), &["expenses", "finance", "reports"]);
        assert_eq!(invalidation_tags_for("/api/users/id"), &["users", "reports", "finance", "dashboard"]);
        assert_eq!(invalidation_tags_for("/api/tasks"), &["tasks", "dashboard"]);
        assert_eq!(
            invalidation_tags_for("/api/auth/login"),
            &["auth", "reports", "dashboard", "hours", "projects", "finance", "users"]
        );
    }

    #[test]
    fn test_invalidation_tags_missing() {
        assert!(invalidation_tags_for("").is_empty());
        assert!(invalidation_tags_for("/api/customers").is_empty());
        assert!(invalidation_tags_for("/api/dashboard/today").is_empty());
        assert!(invalidation_tags_for("/api/reports/me").is_empty());
    }

    #[test]
    fn test_every_cached_read_has_tags() {
        for (rule, ttl) in TTL_RULES {
            let path = match rule {
                PathMatch::Exact(p) | PathMatch::Prefix(p) => *p,
            };
            // Task reads are cached untagged and only ever expire.
            if *ttl > 0 && path != "/api/tasks" {
                assert!(!read_tags_for(path).is_empty(), "cached route {path} has no read tags");
            }
        }
    }

    #[test]
    fn test_mutations_reach_dependent_reads() {
        // A write on the entity must purge at least one tag of every read it feeds.
        let cases = [
            ("/api/time-entries/check-out", "/api/time-entries/hours-report"),
            ("/api/time-entries/check-out", "/api/dashboard/today"),
            ("/api/time-entries/check-out", "/api/reports/me"),
            ("/api/projects", "/api/projects/status-counts"),
            ("/api/projects", "/api/reports/projects-finance-overview"),
            ("/api/payments", "/api/reports/payroll"),
            ("/api/users/id", "/api/dashboard/today"),
            ("/api/auth/login", "/api/auth/me"),
        ];
        for (write, read) in cases {
            let purged = invalidation_tags_for(write);
            let filed = read_tags_for(read);
            assert!(filed.iter().any(|t| purged.contains(t)), "{write} does not purge {read}");
        }
    }

    #[test]
    fn test_tag_sets_are_from_known_domain() {
        let known = |t: &&str| ALL_TAGS.contains(t) || *t == "customer-payments";
        for (_, tags) in READ_TAG_RULES.iter().chain(INVALIDATION_RULES) {
            assert!(tags.iter().all(|t| known(t)), "unknown tag in {tags:?}");
        }
    }
}
