//! Per-day statistics over one monthly archive, cached as a sibling summary table.

use crate::date::{day_format, day_of, YearMonth};
use crate::records::{ItemKind, Record};
use crate::sentiment::SentimentScorer;
use crate::store::{Columns, TableKey, TableStore};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use time::Date;

/// Aggregates for one calendar day of one archive. Means skip missing values and
/// are `None` when a day has no value for that metric.
#[derive(Clone, Debug, PartialEq)]
pub struct DailySummary {
    pub day: Date,
    pub count: u64,
    pub average_score: Option<f64>,
    /// Upvote ratio for submissions, controversiality for comments.
    pub average_extra: Option<f64>,
    pub average_sentiment: Option<f64>,
}

#[derive(Default)]
struct DayAcc {
    count: u64,
    score: Mean,
    extra: Mean,
    sentiment: Mean,
}

#[derive(Default)]
struct Mean {
    sum: f64,
    n: u64,
}

impl Mean {
    fn add(&mut self, v: Option<f64>) {
        if let Some(v) = v.filter(|v| !v.is_nan()) {
            self.sum += v;
            self.n += 1;
        }
    }
    fn value(&self) -> Option<f64> {
        (self.n > 0).then(|| self.sum / self.n as f64)
    }
}

/// Group records by creation day (UTC) and average their metrics. One row per
/// distinct day, ascending.
pub fn summarize_records<T: Record, C: SentimentScorer>(items: &[T], scorer: &C) -> Vec<DailySummary> {
    let mut days: BTreeMap<Date, DayAcc> = BTreeMap::new();
    for item in items {
        let acc = days.entry(day_of(item.created_utc())).or_default();
        acc.count += 1;
        acc.score.add(item.score());
        acc.extra.add(item.extra_metric());
        acc.sentiment.add(Some(scorer.score(&item.sentiment_text())));
    }
    days.into_iter()
        .map(|(day, acc)| DailySummary {
            day,
            count: acc.count,
            average_score: acc.score.value(),
            average_extra: acc.extra.value(),
            average_sentiment: acc.sentiment.value(),
        })
        .collect()
}

// -------- on-disk row shapes (column names carry the kind) --------

#[derive(Serialize, Deserialize)]
struct SubmissionDayRow {
    #[serde(with = "day_format")]
    day: Date,
    submissions_count: u64,
    submissions_average_score: Option<f64>,
    submissions_average_upvote_ratio: Option<f64>,
    submissions_average_sentiment: Option<f64>,
}

#[derive(Serialize, Deserialize)]
struct CommentDayRow {
    #[serde(with = "day_format")]
    day: Date,
    comments_count: u64,
    comments_average_score: Option<f64>,
    comments_average_controversiality: Option<f64>,
    comments_average_sentiment: Option<f64>,
}

impl Columns for SubmissionDayRow {
    const COLUMNS: &'static [&'static str] = &[
        "day",
        "submissions_count",
        "submissions_average_score",
        "submissions_average_upvote_ratio",
        "submissions_average_sentiment",
    ];
}

impl Columns for CommentDayRow {
    const COLUMNS: &'static [&'static str] = &[
        "day",
        "comments_count",
        "comments_average_score",
        "comments_average_controversiality",
        "comments_average_sentiment",
    ];
}

impl From<&DailySummary> for SubmissionDayRow {
    fn from(s: &DailySummary) -> Self {
        Self {
            day: s.day,
            submissions_count: s.count,
            submissions_average_score: s.average_score,
            submissions_average_upvote_ratio: s.average_extra,
            submissions_average_sentiment: s.average_sentiment,
        }
    }
}

impl From<SubmissionDayRow> for DailySummary {
    fn from(r: SubmissionDayRow) -> Self {
        Self {
            day: r.day,
            count: r.submissions_count,
            average_score: r.submissions_average_score,
            average_extra: r.submissions_average_upvote_ratio,
            average_sentiment: r.submissions_average_sentiment,
        }
    }
}

impl From<&DailySummary> for CommentDayRow {
    fn from(s: &DailySummary) -> Self {
        Self {
            day: s.day,
            comments_count: s.count,
            comments_average_score: s.average_score,
            comments_average_controversiality: s.average_extra,
            comments_average_sentiment: s.average_sentiment,
        }
    }
}

impl From<CommentDayRow> for DailySummary {
    fn from(r: CommentDayRow) -> Self {
        Self {
            day: r.day,
            count: r.comments_count,
            average_score: r.comments_average_score,
            average_extra: r.comments_average_controversiality,
            average_sentiment: r.comments_average_sentiment,
        }
    }
}

fn write_summaries<S: TableStore>(store: &S, key: &TableKey, kind: ItemKind, rows: &[DailySummary]) -> Result<()> {
    match kind {
        ItemKind::Submission => store.write(key, &rows.iter().map(SubmissionDayRow::from).collect::<Vec<_>>()),
        ItemKind::Comment => store.write(key, &rows.iter().map(CommentDayRow::from).collect::<Vec<_>>()),
    }
}

fn read_summaries<S: TableStore>(store: &S, key: &TableKey, kind: ItemKind) -> Result<Vec<DailySummary>> {
    Ok(match kind {
        ItemKind::Submission => store.read::<SubmissionDayRow>(key)?.into_iter().map(Into::into).collect(),
        ItemKind::Comment => store.read::<CommentDayRow>(key)?.into_iter().map(Into::into).collect(),
    })
}

/// Cache-aware daily summarizer. The scorer and the store are injected.
pub struct Summarizer<C, S> {
    scorer: C,
    store: S,
}

impl<C: SentimentScorer, S: TableStore> Summarizer<C, S> {
    pub fn new(scorer: C, store: S) -> Self {
        Self { scorer, store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Summary of the `(community, ym, T::KIND)` archive. An existing summary table
    /// is returned as is; otherwise the archive is read, scored, grouped and cached.
    /// A missing or unreadable archive is an error.
    pub fn summarize<T: Record>(&self, community: &str, ym: YearMonth) -> Result<Vec<DailySummary>> {
        let key = TableKey::summary(community, ym, T::KIND);
        if self.store.exists(&key) {
            return read_summaries(&self.store, &key, T::KIND)
                .with_context(|| format!("reading cached {} summary for {} - {}", T::KIND, community, ym));
        }

        let items: Vec<T> = self
            .store
            .read(&TableKey::archive(community, ym, T::KIND))
            .with_context(|| format!("reading {} archive for {} - {}", T::KIND, community, ym))?;
        let rows = summarize_records(&items, &self.scorer);

        write_summaries(&self.store, &key, T::KIND, &rows)
            .with_context(|| format!("writing {} summary for {} - {}", T::KIND, community, ym))?;
        tracing::info!("Saved {} summary for {} - {}. It has {} rows", T::KIND, community, ym, rows.len());
        Ok(rows)
    }
}
