#[path = "common/mod.rs"]
mod common;

use common::*;
use crypto_chatter::{
    summarize_records, Comment, CsvStore, ItemKind, Record, Submission, Summarizer, TableKey, TableStore, YearMonth,
};
use time::macros::date;

const MAR: YearMonth = YearMonth { year: 2021, month: 3 };

#[test]
fn groups_by_day_and_averages() {
    let scorer = KeywordScorer::default();
    let items = vec![
        submission("a", D1 + 10, "good news", Some(0.75), 10),
        submission("b", D1 + 20, "bad news", Some(0.25), 20),
        submission("c", D2 + 30, "good good", None, 5),
    ];
    let rows = summarize_records(&items, &scorer);

    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].day, date!(2021 - 03 - 01));
    assert_eq!(rows[0].count, 2);
    assert_eq!(rows[0].average_score, Some(15.0));
    assert_eq!(rows[0].average_extra, Some(0.5));
    assert_eq!(rows[0].average_sentiment, Some(0.0));

    assert_eq!(rows[1].day, date!(2021 - 03 - 02));
    assert_eq!(rows[1].count, 1);
    assert_eq!(rows[1].average_extra, None);
    assert_eq!(rows[1].average_sentiment, Some(1.0));
    assert_eq!(scorer.calls.get(), 3);
}

#[test]
fn comment_metric_is_controversiality() {
    let scorer = KeywordScorer::default();
    let items = vec![comment("a", D3, "good", 1, 4), comment("b", D3 + 5, "meh", 0, 2)];
    let rows = summarize_records(&items, &scorer);
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].average_extra, Some(0.5));
    assert_eq!(rows[0].average_score, Some(3.0));
    assert_eq!(rows[0].average_sentiment, Some(0.25));
}

#[test]
fn scored_text_treats_missing_fields_as_empty() {
    let mut s = submission("a", D1, "Title", None, 0);
    s.selftext = Some("body".into());
    assert_eq!(s.sentiment_text(), "Title - body");
    s.title = None;
    s.selftext = None;
    assert_eq!(s.sentiment_text(), " - ");

    let c = Comment { id: "c".into(), body: None, created_utc: D1, controversiality: None, score: None };
    assert_eq!(c.sentiment_text(), "");
}

/// The second call reads the cached summary: same rows, no rescoring.
#[test]
fn summary_is_cached_and_deterministic() {
    let root = scratch_root();
    let store = CsvStore::new(&root);
    put_archive(
        &store,
        "ethereum",
        MAR,
        &[
            submission("a", D1 + 1, "good", Some(0.75), 3),
            submission("b", D1 + 2, "so bad, really bad", Some(0.1), 7),
            submission("c", D3 + 3, "meh", Some(1.0 / 3.0), 1),
        ],
    );

    let scorer = KeywordScorer::default();
    let summarizer = Summarizer::new(&scorer, &store);

    let first = summarizer.summarize::<Submission>("ethereum", MAR).unwrap();
    assert_eq!(scorer.calls.get(), 3);
    assert!(store.exists(&TableKey::summary("ethereum", MAR, ItemKind::Submission)));

    let second = summarizer.summarize::<Submission>("ethereum", MAR).unwrap();
    assert_eq!(scorer.calls.get(), 3, "cached summary must not be rescored");
    assert_eq!(first, second);
}

#[test]
fn summary_file_layout_and_columns() {
    let root = scratch_root();
    let store = CsvStore::new(&root);
    put_archive(&store, "ethereum", MAR, &[comment("a", D2, "hi", 0, 1)]);

    let summarizer = Summarizer::new(KeywordScorer::default(), &store);
    summarizer.summarize::<Comment>("ethereum", MAR).unwrap();

    let path = root.join("ethereum").join("comment").join("summary").join("summary_2021_3.csv");
    let text = std::fs::read_to_string(&path).unwrap();
    let mut lines = text.lines();
    assert_eq!(
        lines.next(),
        Some("day,comments_count,comments_average_score,comments_average_controversiality,comments_average_sentiment")
    );
    assert!(lines.next().unwrap().starts_with("2021-03-02,1,"));
}

/// An existing summary is trusted even if the archive changed afterwards.
#[test]
fn existing_summary_wins_over_archive() {
    let root = scratch_root();
    let store = CsvStore::new(&root);
    put_archive(&store, "ethereum", MAR, &[comment("a", D2, "hi", 0, 1)]);
    let summarizer = Summarizer::new(KeywordScorer::default(), &store);
    summarizer.summarize::<Comment>("ethereum", MAR).unwrap();

    put_archive(&store, "ethereum", MAR, &[comment("a", D2, "hi", 0, 1), comment("b", D3, "yo", 1, 1)]);
    let rows = summarizer.summarize::<Comment>("ethereum", MAR).unwrap();
    assert_eq!(rows.len(), 1);
}

#[test]
fn empty_archive_gives_empty_summary() {
    let root = scratch_root();
    let store = CsvStore::new(&root);
    put_archive::<Submission>(&store, "ethereum", MAR, &[]);

    let summarizer = Summarizer::new(KeywordScorer::default(), &store);
    assert!(summarizer.summarize::<Submission>("ethereum", MAR).unwrap().is_empty());
    assert!(summarizer.summarize::<Submission>("ethereum", MAR).unwrap().is_empty());

    let path = root.join("ethereum").join("submission").join("summary").join("summary_2021_3.csv");
    assert_eq!(
        std::fs::read_to_string(&path).unwrap(),
        "day,submissions_count,submissions_average_score,submissions_average_upvote_ratio,submissions_average_sentiment\n"
    );
}

#[test]
fn missing_archive_is_an_error() {
    let root = scratch_root();
    let store = CsvStore::new(&root);
    let summarizer = Summarizer::new(KeywordScorer::default(), &store);
    let err = summarizer.summarize::<Comment>("ethereum", MAR).unwrap_err();
    assert!(format!("{err:#}").contains("comment archive"));
    assert!(!store.exists(&TableKey::summary("ethereum", MAR, ItemKind::Comment)));
}
