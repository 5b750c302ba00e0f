//! Cache-busting query stamps

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use url::Url;

/// Query key carrying the stamp
pub const STAMP_KEY: &str = "t";

/// Hands out strictly increasing millisecond timestamps.
///
/// Two calls within the same millisecond still get distinct stamps.
#[derive(Debug, Default)]
pub struct CacheBuster {
    last: AtomicU64,
}

impl CacheBuster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_stamp(&self) -> u64 {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);
        let mut prev = self.last.load(Ordering::Relaxed);
        loop {
            let candidate = now.max(prev + 1);
            match self
                .last
                .compare_exchange(prev, candidate, Ordering::SeqCst, Ordering::Relaxed)
            {
                Ok(_) => return candidate,
                Err(actual) => prev = actual,
            }
        }
    }

    /// `url` with its query replaced by a fresh stamp
    pub fn bust(&self, url: &Url) -> Url {
        with_stamp(url, self.next_stamp())
    }
}

/// Strip any existing query and append `t=<stamp>`
pub fn with_stamp(url: &Url, stamp: u64) -> Url {
    let mut busted = url.clone();
    busted.set_query(Some(&format!("{STAMP_KEY}={stamp}")));
    busted
}

/// Stamp carried by a busted URL, if any
pub fn stamp_of(url: &Url) -> Option<u64> {
    url.query_pairs()
        .find(|(k, _)| k == STAMP_KEY)
        .and_then(|(_, v)| v.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stamps_strictly_increase() {
        let buster = CacheBuster::new();
        let mut prev = buster.next_stamp();
        for _ in 0..1000 {
            let next = buster.next_stamp();
            assert!(next > prev);
            prev = next;
        }
    }

    #[test]
    fn test_existing_query_replaced() {
        let url = Url::parse("http://localhost:5000/maps/flood?t=1&layer=a#top").unwrap();
        let busted = with_stamp(&url, 42);
        assert_eq!(busted.as_str(), "http://localhost:5000/maps/flood?t=42#top");
        assert_eq!(stamp_of(&busted), Some(42));
    }

    #[test]
    fn test_bust_changes_each_time() {
        let buster = CacheBuster::new();
        let url = Url::parse("http://localhost:5000/api/report").unwrap();
        let a = buster.bust(&url);
        let b = buster.bust(&a);
        assert_ne!(a, b);
        assert_eq!(a.path(), "/api/report");
        assert!(stamp_of(&b) > stamp_of(&a));
    }
}
