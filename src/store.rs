//! Durable tables keyed by (community, month, kind).
//!
//! Presence of a table is the only completion signal: an existing file is trusted
//! as done whatever it contains, including zero rows. Writes go through a temp file
//! and an atomic rename so a half-written table is never visible under its key.

use crate::date::YearMonth;
use crate::records::{ItemKind, Record};
use crate::util::{create_with_backoff, remove_with_backoff, replace_file_atomic_backoff};
use ahash::AHashMap;
use anyhow::{Context, Result};
use regex::Regex;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use walkdir::WalkDir;

const SUMMARY_DIR: &str = "summary";
const OVERALL_FILE: &str = "overall_summary.csv";

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum TableKey {
    /// Raw records for one month of one kind.
    Archive { community: String, ym: YearMonth, kind: ItemKind },
    /// Daily summary derived from the archive with the same coordinates.
    Summary { community: String, ym: YearMonth, kind: ItemKind },
    /// Joined full-history daily series for a community.
    Overall { community: String },
}

impl TableKey {
    pub fn archive(community: impl Into<String>, ym: YearMonth, kind: ItemKind) -> Self {
        TableKey::Archive { community: community.into(), ym, kind }
    }

    pub fn summary(community: impl Into<String>, ym: YearMonth, kind: ItemKind) -> Self {
        TableKey::Summary { community: community.into(), ym, kind }
    }

    pub fn overall(community: impl Into<String>) -> Self {
        TableKey::Overall { community: community.into() }
    }
}

/// Row type with a fixed column list. The header is written even for a table with
/// no rows, so an empty table is still a well-formed one.
pub trait Columns {
    const COLUMNS: &'static [&'static str];
}

/// Key-value durability interface over whole tables.
pub trait TableStore {
    fn exists(&self, key: &TableKey) -> bool;
    fn write<T: Serialize + Columns>(&self, key: &TableKey, rows: &[T]) -> Result<()>;
    fn read<T: DeserializeOwned>(&self, key: &TableKey) -> Result<Vec<T>>;
    /// Months with an archive for `(community, kind)`, ascending.
    fn list_archives(&self, community: &str, kind: ItemKind) -> Result<Vec<YearMonth>>;
    /// Communities with anything stored, ascending.
    fn communities(&self) -> Result<Vec<String>>;
}

impl<S: TableStore + ?Sized> TableStore for &S {
    fn exists(&self, key: &TableKey) -> bool { (**self).exists(key) }
    fn write<T: Serialize + Columns>(&self, key: &TableKey, rows: &[T]) -> Result<()> {
        (**self).write(key, rows)
    }
    fn read<T: DeserializeOwned>(&self, key: &TableKey) -> Result<Vec<T>> { (**self).read(key) }
    fn list_archives(&self, community: &str, kind: ItemKind) -> Result<Vec<YearMonth>> {
        (**self).list_archives(community, kind)
    }
    fn communities(&self) -> Result<Vec<String>> { (**self).communities() }
}

/// CSV tables under a root directory:
///
/// ```text
/// <root>/<community>/<kind>/<year>_<month>.csv
/// <root>/<community>/<kind>/summary/summary_<year>_<month>.csv
/// <root>/<community>/overall_summary.csv
/// ```
#[derive(Clone, Debug)]
pub struct CsvStore {
    root: PathBuf,
}

fn archive_name_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(\d{4})_(\d{1,2})\.csv$").expect("archive name pattern is valid"))
}

fn month_file_name(ym: YearMonth) -> String {
    format!("{}_{}.csv", ym.year, ym.month)
}

impl CsvStore {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self { root: root.as_ref().to_path_buf() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn kind_dir(&self, community: &str, kind: ItemKind) -> PathBuf {
        self.root.join(community).join(kind.dir_name())
    }

    pub fn path(&self, key: &TableKey) -> PathBuf {
        match key {
            TableKey::Archive { community, ym, kind } => self.kind_dir(community, *kind).join(month_file_name(*ym)),
            TableKey::Summary { community, ym, kind } => self
                .kind_dir(community, *kind)
                .join(SUMMARY_DIR)
                .join(format!("summary_{}", month_file_name(*ym))),
            TableKey::Overall { community } => self.root.join(community).join(OVERALL_FILE),
        }
    }
}

impl TableStore for CsvStore {
    fn exists(&self, key: &TableKey) -> bool {
        let path = self.path(key);
        let found = path.is_file();
        if found {
            tracing::debug!("{} already exists", path.display());
        }
        found
    }

    fn write<T: Serialize + Columns>(&self, key: &TableKey, rows: &[T]) -> Result<()> {
        let dest = self.path(key);
        let dir = dest.parent().context("table path has no parent directory")?;
        fs::create_dir_all(dir).with_context(|| format!("create {}", dir.display()))?;

        let file_name = dest.file_name().and_then(|s| s.to_str()).unwrap_or("table.csv");
        let tmp = dir.join(format!(".{file_name}.tmp"));

        let res = (|| -> Result<()> {
            let f = create_with_backoff(&tmp, 16, 50).with_context(|| format!("create {}", tmp.display()))?;
            let mut w = csv::Writer::from_writer(BufWriter::new(f));
            // serde emits the header with the first row only
            if rows.is_empty() {
                w.write_record(T::COLUMNS).with_context(|| format!("write header into {}", tmp.display()))?;
            }
            for row in rows {
                w.serialize(row).with_context(|| format!("serialize row into {}", tmp.display()))?;
            }
            w.flush().with_context(|| format!("flush {}", tmp.display()))?;
            Ok(())
        })();
        if let Err(e) = res {
            let _ = remove_with_backoff(&tmp, 4, 50);
            return Err(e);
        }
        replace_file_atomic_backoff(&tmp, &dest)
    }

    fn read<T: DeserializeOwned>(&self, key: &TableKey) -> Result<Vec<T>> {
        let path = self.path(key);
        let mut r = csv::Reader::from_path(&path).with_context(|| format!("open {}", path.display()))?;
        let rows = r
            .deserialize()
            .collect::<Result<Vec<T>, csv::Error>>()
            .with_context(|| format!("parse {}", path.display()))?;
        Ok(rows)
    }

    fn list_archives(&self, community: &str, kind: ItemKind) -> Result<Vec<YearMonth>> {
        let dir = self.kind_dir(community, kind);
        if !dir.exists() {
            return Ok(Vec::new());
        }
        let re = archive_name_re();
        let mut months = Vec::new();
        for entry in WalkDir::new(&dir).min_depth(1).max_depth(1) {
            let ent = entry.with_context(|| format!("list {}", dir.display()))?;
            if !ent.file_type().is_file() {
                continue;
            }
            let Some(name) = ent.file_name().to_str() else { continue };
            if let Some(caps) = re.captures(name) {
                let (Ok(year), Ok(month)) = (caps[1].parse::<u16>(), caps[2].parse::<u8>()) else { continue };
                if (1..=12).contains(&month) && year > 0 {
                    months.push(YearMonth { year, month });
                }
            }
        }
        months.sort();
        Ok(months)
    }

    fn communities(&self) -> Result<Vec<String>> {
        if !self.root.exists() {
            return Ok(Vec::new());
        }
        let mut out = Vec::new();
        for entry in WalkDir::new(&self.root).min_depth(1).max_depth(1) {
            let ent = entry.with_context(|| format!("list {}", self.root.display()))?;
            if ent.file_type().is_dir() {
                if let Some(name) = ent.file_name().to_str() {
                    out.push(name.to_string());
                }
            }
        }
        out.sort();
        Ok(out)
    }
}

/// Collapse duplicate ids: the last occurrence wins but keeps the position of
/// the first one.
pub fn dedupe_by_id<T: Record>(items: Vec<T>) -> Vec<T> {
    let mut index: AHashMap<String, usize> = AHashMap::with_capacity(items.len());
    let mut out: Vec<T> = Vec::with_capacity(items.len());
    for item in items {
        match index.get(item.id()) {
            Some(&i) => out[i] = item,
            None => {
                index.insert(item.id().to_string(), out.len());
                out.push(item);
            }
        }
    }
    out
}

/// Monthly raw-record archives on top of a `TableStore`.
pub struct ArchiveStore<S> {
    tables: S,
}

impl<S: TableStore> ArchiveStore<S> {
    pub fn new(tables: S) -> Self {
        Self { tables }
    }

    pub fn tables(&self) -> &S {
        &self.tables
    }

    /// Idempotency gate, checked before any network activity.
    pub fn exists(&self, community: &str, ym: YearMonth, kind: ItemKind) -> bool {
        self.tables.exists(&TableKey::archive(community, ym, kind))
    }

    /// Dedupe by id and persist. Returns the number of rows written.
    pub fn write<T: Record>(&self, community: &str, ym: YearMonth, items: Vec<T>) -> Result<usize> {
        let rows = dedupe_by_id(items);
        self.tables.write(&TableKey::archive(community, ym, T::KIND), &rows)?;
        Ok(rows.len())
    }

    /// `write`, with failures logged instead of returned. The month then simply
    /// stays uncached and is fetched again on the next run.
    pub fn save<T: Record>(&self, community: &str, ym: YearMonth, items: Vec<T>) -> bool {
        match self.write(community, ym, items) {
            Ok(n) => {
                tracing::info!("{} {}s saved for {} - {}", n, T::KIND, community, ym);
                true
            }
            Err(e) => {
                tracing::error!("Failed to save {}s for {} - {}: {:#}", T::KIND, community, ym, e);
                false
            }
        }
    }

    pub fn read<T: Record>(&self, community: &str, ym: YearMonth) -> Result<Vec<T>> {
        self.tables.read(&TableKey::archive(community, ym, T::KIND))
    }
}
