//! Remote question-set fetching.
//!
//! Question papers live in a published spreadsheet, one tab per mock test,
//! exported as CSV. This collaborator owns the network fetch and an explicit
//! TTL cache keyed by tab `gid`; the core only ever sees the validated bank.

use chrono::{DateTime, Duration, Utc};
use reqwest::Client;
use std::collections::HashMap;

use exam_core::Clock;

use crate::error::FetchError;
use crate::ingest::{self, IngestReport, RawRow};

/// Published-sheet CSV export URL; `{gid}` selects the tab.
pub const PUBLISHED_BASE_URL: &str = "https://docs.google.com/spreadsheets/d/e/2PACX-1vQtG0QdIu8N1BPgVHeYDArIRCwvMU7NmN_YUM3_UUwU2FkmMYhJTtDxoS2Lk7kX6LNJHnLlAdgLSWPx/pub?gid={gid}&single=true&output=csv";

/// Known test papers and their sheet tabs.
pub const MOCK_TEST_GIDS: &[(&str, &str)] = &[
    ("diagnostic", "160639837"),
    ("mock1", "848132391"),
    ("mock2", "610172732"),
    ("mock3", "1133755197"),
    ("mock4", "690484996"),
    ("mock5", "1484362111"),
];

/// Looks up the sheet tab for a test name.
#[must_use]
pub fn gid_for(test_name: &str) -> Option<&'static str> {
    MOCK_TEST_GIDS
        .iter()
        .find(|(name, _)| *name == test_name)
        .map(|(_, gid)| *gid)
}

//
// ─── CLIENT ───────────────────────────────────────────────────────────────────

/// Thin HTTP client for the published sheet.
#[derive(Debug, Clone)]
pub struct SheetClient {
    client: Client,
    base_url: String,
}

impl Default for SheetClient {
    fn default() -> Self {
        Self::new(PUBLISHED_BASE_URL)
    }
}

impl SheetClient {
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into(),
        }
    }

    /// Downloads the CSV payload for one tab.
    ///
    /// # Errors
    ///
    /// Returns `FetchError::HttpStatus` for a non-success response and
    /// `FetchError::Http` for transport failures.
    pub async fn fetch_csv(&self, gid: &str) -> Result<String, FetchError> {
        let url = self.base_url.replace("{gid}", gid);
        let response = self.client.get(&url).send().await?;
        if !response.status().is_success() {
            return Err(FetchError::HttpStatus(response.status()));
        }
        Ok(response.text().await?)
    }

    /// Downloads and parses one tab into raw rows.
    ///
    /// # Errors
    ///
    /// Propagates fetch and CSV parse failures.
    pub async fn fetch_rows(&self, gid: &str) -> Result<Vec<RawRow>, FetchError> {
        let payload = self.fetch_csv(gid).await?;
        Ok(ingest::rows_from_csv(&payload)?)
    }
}

//
// ─── CACHE ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
struct CacheEntry {
    fetched_at: DateTime<Utc>,
    rows: Vec<RawRow>,
}

/// TTL cache of fetched row sets, keyed by sheet tab.
///
/// The fetch-or-reuse decision is explicit: callers ask for a fresh entry
/// and fetch on a miss, so stale data never flows silently.
#[derive(Debug, Clone)]
pub struct SheetCache {
    ttl: Duration,
    entries: HashMap<String, CacheEntry>,
}

impl SheetCache {
    /// Default time-to-live for a cached paper.
    pub const DEFAULT_TTL_SECS: i64 = 600;

    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: HashMap::new(),
        }
    }

    /// Cached rows for the tab, if present and within the TTL.
    #[must_use]
    pub fn fresh(&self, gid: &str, now: DateTime<Utc>) -> Option<&[RawRow]> {
        self.entries
            .get(gid)
            .filter(|entry| now - entry.fetched_at < self.ttl)
            .map(|entry| entry.rows.as_slice())
    }

    pub fn store(&mut self, gid: &str, rows: Vec<RawRow>, now: DateTime<Utc>) {
        self.entries.insert(
            gid.to_string(),
            CacheEntry {
                fetched_at: now,
                rows,
            },
        );
    }

    /// Drops every cached entry, forcing the next load to fetch.
    pub fn invalidate_all(&mut self) {
        self.entries.clear();
    }
}

impl Default for SheetCache {
    fn default() -> Self {
        Self::new(Duration::seconds(Self::DEFAULT_TTL_SECS))
    }
}

//
// ─── LOADER ───────────────────────────────────────────────────────────────────

/// Fetches, caches and normalizes question papers.
pub struct QuestionBankLoader {
    client: SheetClient,
    cache: SheetCache,
    clock: Clock,
}

impl QuestionBankLoader {
    #[must_use]
    pub fn new(client: SheetClient, cache: SheetCache, clock: Clock) -> Self {
        Self {
            client,
            cache,
            clock,
        }
    }

    /// Loads the bank for a tab, reusing the cache when fresh.
    ///
    /// # Errors
    ///
    /// Propagates fetch and CSV parse failures; validation failures of
    /// individual rows are reported inside the `IngestReport`, not here.
    pub async fn load_bank(&mut self, gid: &str) -> Result<IngestReport, FetchError> {
        let now = self.clock.now();
        if let Some(rows) = self.cache.fresh(gid, now) {
            return Ok(ingest::build_bank(rows));
        }

        let rows = self.client.fetch_rows(gid).await?;
        let report = ingest::build_bank(&rows);
        self.cache.store(gid, rows, now);
        Ok(report)
    }
}

//
// ─── TESTS ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use exam_core::time::fixed_now;

    fn sample_rows() -> Vec<RawRow> {
        vec![[("QNo".to_string(), "1".to_string())].into()]
    }

    #[test]
    fn gid_lookup_knows_the_catalog() {
        assert_eq!(gid_for("diagnostic"), Some("160639837"));
        assert_eq!(gid_for("mock3"), Some("1133755197"));
        assert_eq!(gid_for("mock99"), None);
    }

    #[test]
    fn cache_serves_entries_within_ttl() {
        let mut cache = SheetCache::new(Duration::seconds(600));
        let t0 = fixed_now();
        cache.store("g1", sample_rows(), t0);

        assert!(cache.fresh("g1", t0 + Duration::seconds(599)).is_some());
        assert!(cache.fresh("g1", t0 + Duration::seconds(600)).is_none());
        assert!(cache.fresh("other", t0).is_none());
    }

    #[tokio::test]
    async fn loader_reuses_fresh_cache_without_touching_the_network() {
        // base_url that cannot resolve: a cache hit must short-circuit the fetch
        let client = SheetClient::new("http://127.0.0.1:0/{gid}");
        let mut cache = SheetCache::default();

        let rows = vec![[
            ("QNo".to_string(), "1".to_string()),
            ("Question".to_string(), "What is 2+2?".to_string()),
            ("Option A".to_string(), "3".to_string()),
            ("Option B".to_string(), "4".to_string()),
            ("Option C".to_string(), "5".to_string()),
            ("Option D".to_string(), "22".to_string()),
            ("Answer".to_string(), "B".to_string()),
            ("Subject".to_string(), "Maths".to_string()),
            ("Topic".to_string(), "Arithmetic".to_string()),
            ("Subtopic".to_string(), "Addition".to_string()),
            ("Difficulty".to_string(), "Easy".to_string()),
            ("Blooms".to_string(), "Remember".to_string()),
        ]
        .into()];
        cache.store("g1", rows, fixed_now());

        let mut loader =
            QuestionBankLoader::new(client, cache, exam_core::time::fixed_clock());
        let report = loader.load_bank("g1").await.unwrap();
        assert_eq!(report.questions.len(), 1);
        assert_eq!(report.questions[0].subject(), "Maths");

        // an unknown tab misses the cache and surfaces the transport error
        assert!(loader.load_bank("g2").await.is_err());
    }

    #[test]
    fn invalidate_forces_refetch() {
        let mut cache = SheetCache::default();
        let t0 = fixed_now();
        cache.store("g1", sample_rows(), t0);
        cache.invalidate_all();
        assert!(cache.fresh("g1", t0).is_none());
    }
}
