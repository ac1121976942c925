//! Full-history daily series per community: summaries of every archive of both
//! kinds, concatenated per kind and inner-joined on day.

use crate::date::{day_format, YearMonth};
use crate::progress::maybe_count_progress;
use crate::records::{Comment, Record, Submission};
use crate::sentiment::SentimentScorer;
use crate::store::{Columns, TableKey, TableStore};
use crate::summary::{DailySummary, Summarizer};
use ahash::AHashMap;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use time::Date;

/// One joined day of `overall_summary.csv`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OverallRow {
    #[serde(with = "day_format")]
    pub day: Date,
    pub submissions_count: u64,
    pub submissions_average_score: Option<f64>,
    pub submissions_average_upvote_ratio: Option<f64>,
    pub submissions_average_sentiment: Option<f64>,
    pub comments_count: u64,
    pub comments_average_score: Option<f64>,
    pub comments_average_controversiality: Option<f64>,
    pub comments_average_sentiment: Option<f64>,
}

impl Columns for OverallRow {
    const COLUMNS: &'static [&'static str] = &[
        "day",
        "submissions_count",
        "submissions_average_score",
        "submissions_average_upvote_ratio",
        "submissions_average_sentiment",
        "comments_count",
        "comments_average_score",
        "comments_average_controversiality",
        "comments_average_sentiment",
    ];
}

impl OverallRow {
    fn joined(s: &DailySummary, c: &DailySummary) -> Self {
        Self {
            day: s.day,
            submissions_count: s.count,
            submissions_average_score: s.average_score,
            submissions_average_upvote_ratio: s.average_extra,
            submissions_average_sentiment: s.average_sentiment,
            comments_count: c.count,
            comments_average_score: c.average_score,
            comments_average_controversiality: c.average_extra,
            comments_average_sentiment: c.average_sentiment,
        }
    }
}

/// Inner join on day. Days present on one side only are dropped; a day repeated
/// on both sides yields every pairing. Output follows the submission order.
pub fn join_on_day(submissions: &[DailySummary], comments: &[DailySummary]) -> Vec<OverallRow> {
    let mut by_day: AHashMap<Date, Vec<&DailySummary>> = AHashMap::new();
    for c in comments {
        by_day.entry(c.day).or_default().push(c);
    }
    let mut out = Vec::new();
    for s in submissions {
        if let Some(matches) = by_day.get(&s.day) {
            out.extend(matches.iter().map(|c| OverallRow::joined(s, c)));
        }
    }
    out
}

/// Outcome of `Rollup::rollup_all`.
#[derive(Debug, Default)]
pub struct RollupReport {
    pub communities: usize,
    pub rows: usize,
    pub failed: Vec<(String, String)>,
}

pub struct Rollup<C, S> {
    summarizer: Summarizer<C, S>,
    progress: bool,
}

impl<C: SentimentScorer, S: TableStore> Rollup<C, S> {
    pub fn new(summarizer: Summarizer<C, S>) -> Self {
        Self { summarizer, progress: false }
    }

    pub fn progress(mut self, yes: bool) -> Self {
        self.progress = yes;
        self
    }

    fn summarize_all<T: Record>(&self, community: &str) -> Result<Vec<DailySummary>> {
        let months: Vec<YearMonth> = self.summarizer.store().list_archives(community, T::KIND)?;
        tracing::info!("Found {} {} archives for {}", months.len(), T::KIND, community);

        let label = format!("Summarize {community} {}s", T::KIND);
        let pb = maybe_count_progress(self.progress, months.len() as u64, &label);
        let mut all = Vec::new();
        for ym in months {
            all.extend(self.summarizer.summarize::<T>(community, ym)?);
            if let Some(pb) = &pb { pb.inc(1); }
        }
        if let Some(pb) = pb { pb.finish_with_message(format!("{label}: done")); }
        Ok(all)
    }

    /// Recompute and overwrite `<community>/overall_summary.csv`. Never cache-gated.
    pub fn rollup(&self, community: &str) -> Result<Vec<OverallRow>> {
        let submissions = self.summarize_all::<Submission>(community)?;
        let comments = self.summarize_all::<Comment>(community)?;
        let rows = join_on_day(&submissions, &comments);

        self.summarizer
            .store()
            .write(&TableKey::overall(community), &rows)
            .with_context(|| format!("writing overall summary for {community}"))?;
        tracing::info!("Saved overall summary for {}. It has {} rows", community, rows.len());
        Ok(rows)
    }

    /// Roll up every community directory under the store. A community whose
    /// archives cannot be summarized is logged and reported, the rest still run.
    pub fn rollup_all(&self) -> Result<RollupReport> {
        let mut report = RollupReport::default();
        for community in self.summarizer.store().communities()? {
            match self.rollup(&community) {
                Ok(rows) => {
                    report.communities += 1;
                    report.rows += rows.len();
                }
                Err(e) => {
                    tracing::error!("Rollup failed for {}: {:#}", community, e);
                    report.failed.push((community, format!("{e:#}")));
                }
            }
        }
        Ok(report)
    }
}
