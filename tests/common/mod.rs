#![allow(dead_code)]

use crypto_chatter::{
    Comment, CsvStore, HarvestOptions, ItemKind, PageError, PageRequest, PageSource, Record, SentimentScorer,
    Submission, TableKey, TableStore, YearMonth,
};
use serde_json::{json, Value};
use std::cell::{Cell, RefCell};
use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Midnight UTC of 2020-01-01.
pub const JAN_2020: i64 = 1_577_836_800;
/// Midnight UTC of 2021-03-01, 2021-03-02 and 2021-03-03.
pub const D1: i64 = 1_614_556_800;
pub const D2: i64 = D1 + 86_400;
pub const D3: i64 = D2 + 86_400;

/// Fresh scratch directory that outlives the test (kept for post-mortem inspection).
pub fn scratch_root() -> PathBuf {
    tempfile::tempdir().unwrap().into_path()
}

/// Options for offline runs: no delays, no progress bars, one community.
pub fn fast_opts(root: &Path) -> HarvestOptions {
    HarvestOptions::default()
        .with_data_root(root)
        .with_communities(["ethereum"])
        .with_start_year(2020)
        .with_delays(Duration::ZERO, Duration::ZERO)
        .with_progress(false)
}

/// One scripted page response: a list of JSON items, or a transient failure.
#[derive(Clone, Debug)]
pub enum Page {
    Items(Vec<Value>),
    Fail,
}

/// Page source replaying scripted responses per item kind. Once a kind's script is
/// used up it answers with empty pages. Every request is recorded.
#[derive(Default)]
pub struct ScriptedSource {
    pages: RefCell<HashMap<ItemKind, VecDeque<Page>>>,
    pub requests: RefCell<Vec<PageRequest>>,
}

impl ScriptedSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_pages(self, kind: ItemKind, pages: Vec<Page>) -> Self {
        self.pages.borrow_mut().entry(kind).or_default().extend(pages);
        self
    }

    pub fn request_count(&self) -> usize {
        self.requests.borrow().len()
    }

    pub fn requests_for(&self, kind: ItemKind) -> Vec<PageRequest> {
        self.requests.borrow().iter().filter(|r| r.kind == kind).cloned().collect()
    }

    pub fn cursors(&self) -> Vec<i64> {
        self.requests.borrow().iter().map(|r| r.before).collect()
    }
}

impl PageSource for ScriptedSource {
    fn fetch_page<T: Record>(&self, req: &PageRequest) -> Result<Vec<T>, PageError> {
        self.requests.borrow_mut().push(req.clone());
        let next = self.pages.borrow_mut().get_mut(&req.kind).and_then(|q| q.pop_front());
        match next {
            None => Ok(Vec::new()),
            Some(Page::Fail) => Err(PageError::Status(503)),
            Some(Page::Items(values)) => values
                .into_iter()
                .map(|v| serde_json::from_value(v).map_err(|e| PageError::Decode(e.to_string())))
                .collect(),
        }
    }
}

/// Page source that never answers successfully.
#[derive(Default)]
pub struct DeadSource {
    pub calls: Cell<usize>,
}

impl PageSource for DeadSource {
    fn fetch_page<T: Record>(&self, _req: &PageRequest) -> Result<Vec<T>, PageError> {
        self.calls.set(self.calls.get() + 1);
        Err(PageError::Decode("connection reset".into()))
    }
}

/// Deterministic keyword scorer: +0.5 per "good", -0.5 per "bad", clamped.
#[derive(Default)]
pub struct KeywordScorer {
    pub calls: Cell<usize>,
}

impl SentimentScorer for KeywordScorer {
    fn score(&self, text: &str) -> f64 {
        self.calls.set(self.calls.get() + 1);
        let lower = text.to_lowercase();
        let good = lower.matches("good").count() as f64;
        let bad = lower.matches("bad").count() as f64;
        (0.5 * good - 0.5 * bad).clamp(-1.0, 1.0)
    }
}

pub fn submission_json(id: &str, created_utc: i64) -> Value {
    json!({
        "id": id, "title": format!("post {id}"), "selftext": "", "upvote_ratio": 0.9,
        "score": 10, "num_comments": 3, "created_utc": created_utc,
        "subreddit": "ethereum", "author": "alice"
    })
}

pub fn comment_json(id: &str, created_utc: i64) -> Value {
    json!({
        "id": id, "body": format!("reply {id}"), "created_utc": created_utc,
        "controversiality": 0, "score": 2, "subreddit": "ethereum", "author": "bob"
    })
}

/// `n` submissions with distinct ids, created one second apart ending at `newest`.
pub fn submission_page(prefix: &str, n: usize, newest: i64) -> Vec<Value> {
    (0..n).map(|i| submission_json(&format!("{prefix}{i}"), newest - i as i64)).collect()
}

pub fn submission(id: &str, created_utc: i64, title: &str, upvote_ratio: Option<f64>, score: i64) -> Submission {
    Submission {
        id: id.to_string(),
        selftext: None,
        title: Some(title.to_string()),
        upvote_ratio,
        score: Some(score),
        num_comments: Some(0),
        created_utc,
    }
}

pub fn comment(id: &str, created_utc: i64, body: &str, controversiality: i64, score: i64) -> Comment {
    Comment {
        id: id.to_string(),
        body: Some(body.to_string()),
        created_utc,
        controversiality: Some(controversiality),
        score: Some(score),
    }
}

/// Write an archive table directly, bypassing the fetcher.
pub fn put_archive<T: Record>(store: &CsvStore, community: &str, ym: YearMonth, rows: &[T]) {
    store.write(&TableKey::archive(community, ym, T::KIND), rows).unwrap();
}

pub fn read_bytes(path: &Path) -> Vec<u8> {
    std::fs::read(path).unwrap()
}
