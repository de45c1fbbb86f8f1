//! Flat-file persistence layer.
//!
//! RULE: Only store.rs talks to the filesystem.
//! The generator hands it lines to shard; the report core asks it
//! for a loaded Dataset. Loading is all-or-nothing: a missing column
//! or one unparseable value fails the whole load.

use crate::{
    dataset::{datetime_format, parse_flag, Dataset, TransactionLine, COLUMNS},
    error::{GroceryError, GroceryResult},
    partition,
};
use csv::StringRecord;
use std::{
    fs,
    path::{Path, PathBuf},
    str::FromStr,
};

pub struct ShardStore {
    dir: PathBuf,
    prefix: String,
}

impl ShardStore {
    pub fn new(dir: impl Into<PathBuf>, prefix: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            prefix: prefix.into(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// `<dir>/<prefix>_<n>.csv`, n one-based.
    pub fn shard_path(&self, n: usize) -> PathBuf {
        self.dir.join(format!("{}_{}.csv", self.prefix, n))
    }

    // ── Write ──────────────────────────────────────────────────

    /// Split `lines` into `k` contiguous shards and write each one.
    /// Shards left in the directory by an earlier run with more than `k`
    /// files are removed, so a later load sees only this run.
    /// Returns the written paths in shard order.
    pub fn write_shards(&self, lines: &[TransactionLine], k: usize) -> GroceryResult<Vec<PathBuf>> {
        if k == 0 {
            return Err(GroceryError::invalid_config("files_to_split", "must be > 0"));
        }
        fs::create_dir_all(&self.dir)?;
        log::info!("store: splitting {} lines into {k} files", lines.len());

        let mut paths = Vec::with_capacity(k);
        for (i, shard) in partition::split(lines, k).into_iter().enumerate() {
            let path = self.shard_path(i + 1);
            write_file(&path, shard)?;
            log::info!("store: saved {} ({} rows)", path.display(), shard.len());
            paths.push(path);
        }
        for (index, stale) in self.indexed_shards()? {
            if index > k {
                fs::remove_file(&stale)?;
                log::info!("store: removed stale {}", stale.display());
            }
        }
        Ok(paths)
    }

    // ── Read ───────────────────────────────────────────────────

    /// Shard files in the directory, ordered by shard number.
    pub fn discover(&self) -> GroceryResult<Vec<PathBuf>> {
        Ok(self.indexed_shards()?.into_iter().map(|(_, p)| p).collect())
    }

    fn indexed_shards(&self) -> GroceryResult<Vec<(usize, PathBuf)>> {
        let head = format!("{}_", self.prefix);
        let mut found: Vec<(usize, PathBuf)> = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            let index = name
                .strip_prefix(&head)
                .and_then(|rest| rest.strip_suffix(".csv"))
                .and_then(|n| n.parse::<usize>().ok());
            if let Some(index) = index {
                found.push((index, path));
            }
        }
        found.sort();
        Ok(found)
    }

    /// Load and concatenate every shard into one Dataset.
    pub fn load(&self) -> GroceryResult<Dataset> {
        let files = self.discover()?;
        if files.is_empty() {
            return Err(GroceryError::NoShards {
                dir: self.dir.display().to_string(),
            });
        }
        let mut lines = Vec::new();
        for path in &files {
            let before = lines.len();
            lines.extend(read_file(path)?);
            log::debug!("store: loaded {} ({} rows)", path.display(), lines.len() - before);
        }
        log::info!("store: loaded {} lines from {} files", lines.len(), files.len());
        Dataset::new(lines)
    }
}

pub fn write_file(path: &Path, lines: &[TransactionLine]) -> GroceryResult<()> {
    let mut writer = csv::Writer::from_path(path)?;
    if lines.is_empty() {
        // serde only emits the header alongside the first record.
        writer.write_record(COLUMNS)?;
    }
    for line in lines {
        writer.serialize(line)?;
    }
    writer.flush()?;
    Ok(())
}

/// Column positions resolved from a shard's header row.
struct ColumnIndex([usize; COLUMNS.len()]);

impl ColumnIndex {
    fn resolve(headers: &StringRecord, file: &str) -> GroceryResult<Self> {
        let mut idx = [0usize; COLUMNS.len()];
        for (slot, column) in COLUMNS.iter().enumerate() {
            idx[slot] = headers
                .iter()
                .position(|h| h.trim() == *column)
                .ok_or_else(|| GroceryError::MissingColumn {
                    file: file.to_string(),
                    column: column.to_string(),
                })?;
        }
        Ok(Self(idx))
    }
}

struct RowReader<'a> {
    file: &'a str,
    row: u64,
    record: &'a StringRecord,
    columns: &'a ColumnIndex,
}

impl RowReader<'_> {
    fn text(&self, slot: usize) -> &str {
        self.record.get(self.columns.0[slot]).unwrap_or("")
    }

    fn invalid(&self, slot: usize) -> GroceryError {
        GroceryError::InvalidField {
            file: self.file.to_string(),
            row: self.row,
            column: COLUMNS[slot].to_string(),
            value: self.text(slot).to_string(),
        }
    }

    fn number<T: FromStr>(&self, slot: usize) -> GroceryResult<T> {
        self.text(slot).trim().parse().map_err(|_| self.invalid(slot))
    }

    fn line(&self) -> GroceryResult<TransactionLine> {
        let raw_ts = self.text(2);
        let transaction_datetime =
            datetime_format::parse(raw_ts).ok_or_else(|| GroceryError::InvalidTimestamp {
                file: self.file.to_string(),
                row: self.row,
                value: raw_ts.to_string(),
            })?;
        let loyalty_member = parse_flag(self.text(11)).ok_or_else(|| self.invalid(11))?;

        Ok(TransactionLine {
            transaction_id: self.text(0).to_string(),
            customer_id: self.text(1).to_string(),
            transaction_datetime,
            store_location: self.text(3).to_string(),
            product_id: self.text(4).to_string(),
            product_name: self.text(5).to_string(),
            product_category: self.text(6).to_string(),
            quantity: self.number(7)?,
            unit_price: self.number(8)?,
            total_price: self.number(9)?,
            payment_method: self.text(10).to_string(),
            loyalty_member,
            discount_applied: self.number(12)?,
        })
    }
}

pub fn read_file(path: &Path) -> GroceryResult<Vec<TransactionLine>> {
    let file = path.display().to_string();
    let mut reader = csv::Reader::from_path(path)?;
    let columns = ColumnIndex::resolve(reader.headers()?, &file)?;

    let mut lines = Vec::new();
    for (i, record) in reader.records().enumerate() {
        let record = record?;
        let row = RowReader {
            file: &file,
            // 1-based, counting the header as row 1.
            row: i as u64 + 2,
            record: &record,
            columns: &columns,
        };
        lines.push(row.line()?);
    }
    Ok(lines)
}
