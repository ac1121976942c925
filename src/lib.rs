mod config;
mod date;
mod records;
mod util;
mod progress;

mod fetch;
mod pushshift;
mod store;
mod extract;

mod sentiment;
mod summary;
mod rollup;

pub use crate::config::{HarvestOptions, DEFAULT_COMMUNITIES};
pub use crate::date::{day_of, iter_year_months, month_window, TimeWindow, YearMonth};
pub use crate::records::{Comment, ItemKind, Record, Submission};

// Ingestion side: state machine, page sources, archives, orchestrator.
pub use crate::fetch::{transition, FetchError, FetchPolicy, FetchState, Fetcher, PageError, PageOutcome, PageRequest, PageSource};
pub use crate::pushshift::PushshiftClient;
pub use crate::store::{dedupe_by_id, ArchiveStore, Columns, CsvStore, TableKey, TableStore};
pub use crate::extract::{ExtractReport, Harvester};

// Preprocessing side: scoring, per-archive summaries, per-community rollup.
pub use crate::sentiment::{SentimentScorer, VaderScorer};
pub use crate::summary::{summarize_records, DailySummary, Summarizer};
pub use crate::rollup::{join_on_day, OverallRow, Rollup, RollupReport};

// Expose tracing setup so binaries can import from crate root.
pub use crate::util::init_tracing_once;
