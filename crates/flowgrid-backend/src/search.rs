//! Cursor paging over plain searches.
//!
//! Two cursor shapes travel in a listing's `after_key`:
//!
//! ```text
//!   {"startFrom": N}                      from/size window, N + size <= cutoff
//!   {"pit": "<id>", "search_after": [..]} point-in-time snapshot, unbounded
//! ```
//!
//! A listing starts with `startFrom`. When the first page reports more
//! matches than the cutoff, that page is re-read inside a point-in-time
//! snapshot and the rest of the listing follows `search_after`, so the whole
//! result set is walked in one consistent order. A listing that outgrows the
//! window after its first page fails with `WindowExhausted` once the window
//! runs out; it is never cut short.

use std::time::Duration;

use serde_json::{Map, Value, json};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use flowgrid_core::AfterKey;
use flowgrid_store::{DocumentStore, Hit, SearchRequest};

use crate::error::{BackendError, BackendResult};
use crate::guard::guarded;

pub const START_FROM: &str = "startFrom";
pub const PIT: &str = "pit";
pub const SEARCH_AFTER: &str = "search_after";

/// Decoded `after_key` of a search listing.
#[derive(Debug, Clone, PartialEq)]
pub enum Cursor {
    StartFrom(usize),
    Pit { id: String, search_after: Vec<Value> },
}

impl Default for Cursor {
    fn default() -> Self {
        Cursor::StartFrom(0)
    }
}

impl Cursor {
    /// `startFrom` accepts a number or a numeric string.
    pub fn from_after_key(key: Option<&AfterKey>) -> BackendResult<Self> {
        let Some(key) = key else {
            return Ok(Cursor::default());
        };
        if let Some(value) = key.get(START_FROM) {
            return parse_start_from(value).map(Cursor::StartFrom);
        }
        if let Some(pit) = key.get(PIT) {
            let id = pit
                .as_str()
                .filter(|id| !id.is_empty())
                .ok_or_else(|| BackendError::InvalidCursor(format!("bad {PIT} value {pit}")))?;
            let search_after = match key.get(SEARCH_AFTER) {
                Some(Value::Array(values)) => values.clone(),
                _ => {
                    return Err(BackendError::InvalidCursor(format!(
                        "{PIT} cursor without {SEARCH_AFTER}"
                    )));
                }
            };
            return Ok(Cursor::Pit {
                id: id.to_string(),
                search_after,
            });
        }
        if key.is_empty() {
            return Ok(Cursor::default());
        }
        Err(BackendError::InvalidCursor(format!(
            "unrecognised keys {:?}",
            key.keys().collect::<Vec<_>>()
        )))
    }

    pub fn to_after_key(&self) -> AfterKey {
        let mut key = Map::new();
        match self {
            Cursor::StartFrom(n) => {
                key.insert(START_FROM.into(), json!(n));
            }
            Cursor::Pit { id, search_after } => {
                key.insert(PIT.into(), json!(id));
                key.insert(SEARCH_AFTER.into(), Value::Array(search_after.clone()));
            }
        }
        key
    }
}

fn parse_start_from(value: &Value) -> BackendResult<usize> {
    let parsed = match value {
        Value::Number(n) => n.as_u64().and_then(|n| usize::try_from(n).ok()),
        Value::String(s) => s.trim().parse::<usize>().ok(),
        _ => None,
    };
    parsed.ok_or_else(|| {
        let shown = match value {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        BackendError::BadStartFrom(shown)
    })
}

fn ascending(field: &str) -> Value {
    let mut sort = Map::new();
    sort.insert(field.to_string(), json!("asc"));
    Value::Object(sort)
}

/// One page of hits.
#[derive(Debug, Clone, Default)]
pub struct SearchPage {
    pub hits: Vec<Hit>,
    pub next: Option<Cursor>,
    pub total_hits: i64,
}

/// Limits for one paged search.
#[derive(Debug, Clone)]
pub struct PageLimits {
    pub size: usize,
    /// Largest `from + size` the store serves without a point-in-time.
    pub cutoff: usize,
    pub keep_alive: String,
    pub timeout: Duration,
}

pub struct SearchPager<'a, S: ?Sized> {
    store: &'a S,
    index: &'a str,
    query: &'a Value,
    time_field: &'a str,
    limits: PageLimits,
}

impl<'a, S: DocumentStore + ?Sized> SearchPager<'a, S> {
    pub fn new(
        store: &'a S,
        index: &'a str,
        query: &'a Value,
        time_field: &'a str,
        mut limits: PageLimits,
    ) -> Self {
        limits.size = limits.size.clamp(1, limits.cutoff.max(1));
        Self {
            store,
            index,
            query,
            time_field,
            limits,
        }
    }

    pub async fn page(&self, cursor: &Cursor, cancel: &CancellationToken) -> BackendResult<SearchPage> {
        match cursor {
            Cursor::StartFrom(from) => self.window_page(*from, cancel).await,
            Cursor::Pit { id, search_after } => {
                let after = (!search_after.is_empty()).then_some(search_after.as_slice());
                self.pit_page(id, after, cancel).await
            }
        }
    }

    /// Walk every page starting at `cursor`, checking for cancellation
    /// before each one. A walk from the start that outgrows the offset
    /// window is restarted once, which moves it onto a point in time.
    pub async fn all(&self, cursor: Cursor, cancel: &CancellationToken) -> BackendResult<Vec<Hit>> {
        let from_start = cursor == Cursor::default();
        match self.walk(cursor.clone(), cancel).await {
            Err(BackendError::WindowExhausted { .. }) if from_start => {
                debug!(index = %self.index, "restarting listing on a point in time");
                self.walk(cursor, cancel).await
            }
            walked => walked,
        }
    }

    async fn walk(&self, cursor: Cursor, cancel: &CancellationToken) -> BackendResult<Vec<Hit>> {
        let mut hits = Vec::new();
        let mut cursor = cursor;
        loop {
            if cancel.is_cancelled() {
                return Err(BackendError::Cancelled);
            }
            let page = self.page(&cursor, cancel).await?;
            hits.extend(page.hits);
            match page.next {
                Some(next) => cursor = next,
                None => return Ok(hits),
            }
        }
    }

    async fn window_page(&self, from: usize, cancel: &CancellationToken) -> BackendResult<SearchPage> {
        let (size, cutoff) = (self.limits.size, self.limits.cutoff);
        if from >= cutoff {
            return Err(BackendError::InvalidCursor(format!(
                "{START_FROM} {from} is outside the {cutoff} document window"
            )));
        }
        let size = size.min(cutoff - from);

        let request = SearchRequest::new(self.query.clone())
            .size(size)
            .from(from)
            .sort(ascending(self.time_field))
            .track_total_hits(true);
        debug!(index = %self.index, from, size, "search page");
        let response = guarded(
            cancel,
            self.limits.timeout,
            "search",
            self.index,
            self.store.search(self.index, &request),
        )
        .await?;
        if response.timed_out {
            return Err(BackendError::TimedOut {
                index: self.index.to_string(),
            });
        }

        let total_hits = response.total_hits();
        if from == 0 && total_hits > cutoff as i64 {
            debug!(index = %self.index, total_hits, cutoff, "switching to point-in-time paging");
            let id = guarded(
                cancel,
                self.limits.timeout,
                "open point in time",
                self.index,
                self.store.open_point_in_time(self.index, &self.limits.keep_alive),
            )
            .await?;
            return self.pit_page(&id, None, cancel).await;
        }

        let hits = response.hits.hits;
        let read = from + hits.len();
        let next = if hits.len() < size {
            None
        } else if read >= cutoff {
            if total_hits > read as i64 {
                warn!(index = %self.index, cutoff, total_hits, "result window exhausted");
                return Err(BackendError::WindowExhausted {
                    index: self.index.to_string(),
                    cutoff,
                });
            }
            None
        } else {
            Some(Cursor::StartFrom(from + hits.len()))
        };
        Ok(SearchPage {
            hits,
            next,
            total_hits,
        })
    }

    async fn pit_page(
        &self,
        id: &str,
        search_after: Option<&[Value]>,
        cancel: &CancellationToken,
    ) -> BackendResult<SearchPage> {
        let size = self.limits.size;
        let mut request = SearchRequest::new(self.query.clone())
            .size(size)
            .sort(ascending(self.time_field))
            .sort(json!({"_shard_doc": "asc"}))
            .pit(id, self.limits.keep_alive.clone())
            .track_total_hits(true);
        if let Some(after) = search_after {
            request = request.search_after(after.to_vec());
        }
        debug!(index = %self.index, size, resumed = search_after.is_some(), "point-in-time page");
        let response = guarded(
            cancel,
            self.limits.timeout,
            "search",
            self.index,
            self.store.search(self.index, &request),
        )
        .await?;
        if response.timed_out {
            return Err(BackendError::TimedOut {
                index: self.index.to_string(),
            });
        }

        let total_hits = response.total_hits();
        let id = response.pit_id.clone().unwrap_or_else(|| id.to_string());
        let hits = response.hits.hits;
        if hits.len() < size {
            self.close(&id, cancel).await;
            return Ok(SearchPage {
                hits,
                next: None,
                total_hits,
            });
        }

        let search_after = hits
            .last()
            .and_then(|h| h.sort.clone())
            .ok_or_else(|| BackendError::InvalidCursor("hit without sort values".into()))?;
        Ok(SearchPage {
            hits,
            next: Some(Cursor::Pit { id, search_after }),
            total_hits,
        })
    }

    /// Point-in-time snapshots expire on their own; a failed close is
    /// only logged.
    async fn close(&self, id: &str, cancel: &CancellationToken) {
        let closed = guarded(
            cancel,
            self.limits.timeout,
            "close point in time",
            self.index,
            self.store.close_point_in_time(id),
        )
        .await;
        if let Err(e) = closed {
            warn!(index = %self.index, error = %e, "failed to close point in time");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::ScriptedStore;

    fn key(v: Value) -> AfterKey {
        v.as_object().unwrap().clone()
    }

    fn limits(size: usize, cutoff: usize) -> PageLimits {
        PageLimits {
            size,
            cutoff,
            keep_alive: "5m".into(),
            timeout: Duration::from_secs(1),
        }
    }

    fn hits(n: usize, total: usize, offset: usize) -> Value {
        let hits: Vec<Value> = (0..n)
            .map(|i| {
                let pos = offset + i;
                json!({"_id": format!("d{pos}"), "_source": {"end_time": pos}, "sort": [pos, pos]})
            })
            .collect();
        json!({"hits": {"total": {"value": total}, "hits": hits}})
    }

    #[test]
    fn cursor_parsing() {
        assert_eq!(Cursor::from_after_key(None).unwrap(), Cursor::StartFrom(0));
        assert_eq!(
            Cursor::from_after_key(Some(&key(json!({"startFrom": 20})))).unwrap(),
            Cursor::StartFrom(20)
        );
        assert_eq!(
            Cursor::from_after_key(Some(&key(json!({"startFrom": "40"})))).unwrap(),
            Cursor::StartFrom(40)
        );
        let pit = Cursor::from_after_key(Some(&key(json!({"pit": "p1", "search_after": [5, 1]}))));
        assert_eq!(
            pit.unwrap(),
            Cursor::Pit {
                id: "p1".into(),
                search_after: vec![json!(5), json!(1)]
            }
        );
    }

    #[test]
    fn bad_start_from_is_reported_verbatim() {
        let err = Cursor::from_after_key(Some(&key(json!({"startFrom": "abc"})))).unwrap_err();
        assert_eq!(err.to_string(), "Could not parse startFrom (abc) as an integer");
        let err = Cursor::from_after_key(Some(&key(json!({"startFrom": -3})))).unwrap_err();
        assert!(matches!(err, BackendError::BadStartFrom(_)));
    }

    #[test]
    fn cursor_round_trips_through_after_key() {
        let c = Cursor::Pit {
            id: "p".into(),
            search_after: vec![json!(1)],
        };
        assert_eq!(Cursor::from_after_key(Some(&c.to_after_key())).unwrap(), c);
        assert_eq!(Cursor::StartFrom(7).to_after_key()["startFrom"], 7);
    }

    #[tokio::test]
    async fn full_window_page_advances_start_from() {
        let store = ScriptedStore::new();
        store.push(hits(2, 5, 0));
        let q = json!({"match_all": {}});
        let pager = SearchPager::new(&store, "flows.c1.*", &q, "end_time", limits(2, 100));
        let page = pager.page(&Cursor::StartFrom(0), &CancellationToken::new()).await.unwrap();
        assert_eq!(page.hits.len(), 2);
        assert_eq!(page.next, Some(Cursor::StartFrom(2)));
        let (_, req) = &store.requests()[0];
        assert_eq!(req.from, Some(0));
        assert_eq!(req.sort, vec![json!({"end_time": "asc"})]);
    }

    #[tokio::test]
    async fn short_page_has_no_cursor() {
        let store = ScriptedStore::new();
        store.push(hits(1, 3, 2));
        let q = json!({"match_all": {}});
        let pager = SearchPager::new(&store, "flows.c1.*", &q, "end_time", limits(2, 100));
        let page = pager.page(&Cursor::StartFrom(2), &CancellationToken::new()).await.unwrap();
        assert!(page.next.is_none());
    }

    #[tokio::test]
    async fn large_result_sets_move_to_point_in_time() {
        let store = ScriptedStore::new();
        store.push(hits(2, 11, 0));
        store.push(hits(2, 11, 0));
        let q = json!({"match_all": {}});
        let pager = SearchPager::new(&store, "flows.c1.*", &q, "end_time", limits(2, 10));
        let page = pager.page(&Cursor::StartFrom(0), &CancellationToken::new()).await.unwrap();
        assert_eq!(
            page.next,
            Some(Cursor::Pit {
                id: "pit-0".into(),
                search_after: vec![json!(1), json!(1)]
            })
        );
        assert_eq!(
            store.calls(),
            vec!["search flows.c1.*", "open_pit flows.c1.*", "search flows.c1.*"]
        );
        let (_, req) = &store.requests()[1];
        assert_eq!(req.pit.as_ref().unwrap().id, "pit-0");
        assert_eq!(req.from, None);
        assert_eq!(req.sort[1], json!({"_shard_doc": "asc"}));
    }

    #[tokio::test]
    async fn last_point_in_time_page_closes_the_snapshot() {
        let store = ScriptedStore::new();
        store.push(hits(1, 11, 10));
        let q = json!({"match_all": {}});
        let pager = SearchPager::new(&store, "flows.c1.*", &q, "end_time", limits(2, 10));
        let cursor = Cursor::Pit {
            id: "p9".into(),
            search_after: vec![json!(9), json!(9)],
        };
        let page = pager.page(&cursor, &CancellationToken::new()).await.unwrap();
        assert!(page.next.is_none());
        assert_eq!(store.calls(), vec!["search flows.c1.*", "close_pit p9"]);
        let (_, req) = &store.requests()[0];
        assert_eq!(req.search_after, Some(vec![json!(9), json!(9)]));
    }

    #[tokio::test]
    async fn window_filled_exactly_ends_the_listing() {
        let store = ScriptedStore::new();
        store.push(hits(2, 4, 2));
        let q = json!({"match_all": {}});
        let pager = SearchPager::new(&store, "flows.c1.*", &q, "end_time", limits(2, 4));
        let page = pager.page(&Cursor::StartFrom(2), &CancellationToken::new()).await.unwrap();
        assert_eq!(page.hits.len(), 2);
        assert!(page.next.is_none());
    }

    #[tokio::test]
    async fn growth_past_the_window_is_an_error_not_a_short_listing() {
        let store = ScriptedStore::new();
        store.push(hits(2, 6, 2));
        let q = json!({"match_all": {}});
        let pager = SearchPager::new(&store, "flows.c1.*", &q, "end_time", limits(2, 4));
        let err = pager
            .page(&Cursor::StartFrom(2), &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, BackendError::WindowExhausted { cutoff: 4, .. }));
        assert_eq!(
            err.to_string(),
            "flows.c1.* grew past the 4 document window while paging; restart the listing"
        );
    }

    #[tokio::test]
    async fn walk_restarts_on_a_point_in_time_when_the_window_runs_out() {
        let store = ScriptedStore::new();
        // Offsets: 3 matches at first, 6 by the second page.
        store.push(hits(2, 3, 0));
        store.push(hits(2, 6, 2));
        // Restart: the first page now sees 6 and moves to a snapshot.
        store.push(hits(2, 6, 0));
        store.push(hits(2, 6, 0));
        store.push(hits(2, 6, 2));
        store.push(hits(2, 6, 4));
        store.push(hits(0, 6, 6));
        let q = json!({"match_all": {}});
        let pager = SearchPager::new(&store, "flows.c1.*", &q, "end_time", limits(2, 4));
        let all = pager.all(Cursor::default(), &CancellationToken::new()).await.unwrap();
        let ids: Vec<String> = all.into_iter().map(|h| h.id).collect();
        assert_eq!(ids, vec!["d0", "d1", "d2", "d3", "d4", "d5"]);
        assert!(store.calls().contains(&"open_pit flows.c1.*".to_string()));
    }

    #[tokio::test]
    async fn resumed_walk_reports_window_exhaustion() {
        let store = ScriptedStore::new();
        store.push(hits(2, 6, 2));
        let q = json!({"match_all": {}});
        let pager = SearchPager::new(&store, "flows.c1.*", &q, "end_time", limits(2, 4));
        let err = pager
            .all(Cursor::StartFrom(2), &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, BackendError::WindowExhausted { .. }));
        assert_eq!(store.calls(), vec!["search flows.c1.*"]);
    }

    #[tokio::test]
    async fn start_from_beyond_window_is_rejected() {
        let store = ScriptedStore::new();
        let q = json!({"match_all": {}});
        let pager = SearchPager::new(&store, "flows.c1.*", &q, "end_time", limits(2, 10));
        let err = pager
            .page(&Cursor::StartFrom(10), &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, BackendError::InvalidCursor(_)));
        assert!(store.calls().is_empty());
    }
}
