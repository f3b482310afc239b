use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ReportError;
use crate::plot;
use crate::report::sink::{Level, LogSink, TracingSink};
use crate::report::stream::{EpochStream, RESERVED_KEYS};
use crate::report::timespan::format_timespan;
use crate::value::aggregate;

/// One finalized cell of the epoch table.
///
/// Caller keys always finalize to `Float`; the reserved `time` and
/// `total_count` keys finalize to `Duration` and `Count`.  The untagged serde
/// representation keeps the persisted blob the plain
/// `epoch -> stream -> key -> value` nesting checkpoints already use.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FinalizedValue {
    Duration(Duration),
    Count(u64),
    Float(f64),
}

impl FinalizedValue {
    /// Numeric view used by ranking and plotting; durations collapse to
    /// seconds.
    pub fn as_f64(&self) -> f64 {
        match self {
            FinalizedValue::Float(v) => *v,
            FinalizedValue::Count(n) => *n as f64,
            FinalizedValue::Duration(d) => d.as_secs_f64(),
        }
    }

    pub fn as_count(&self) -> Option<u64> {
        match self {
            FinalizedValue::Count(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_duration(&self) -> Option<Duration> {
        match self {
            FinalizedValue::Duration(d) => Some(*d),
            _ => None,
        }
    }
}

/// Finalized stats of one stream within one epoch: key to reduced value.
pub type StreamStats = BTreeMap<String, FinalizedValue>;

/// The whole finalized table: epoch to stream to key to value.
pub type EpochTable = BTreeMap<usize, BTreeMap<String, StreamStats>>;

/// Ranking direction for [`Reporter::sort_epochs_and_values`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortMode {
    /// Lower is better (losses).
    Min,
    /// Higher is better (accuracies).
    Max,
}

/// Opaque snapshot of a reporter, exchanged with the checkpointing
/// collaborator.  No semantic validation happens on restore; the blob is
/// trusted to come from a prior `export_state`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReporterState {
    pub epoch: usize,
    pub stats: EpochTable,
}

impl ReporterState {
    /// Serializes the snapshot to a pretty-printed JSON file.
    pub fn save_json(&self, path: &Path) -> Result<(), ReportError> {
        let file = std::fs::File::create(path)?;
        let writer = std::io::BufWriter::new(file);
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }

    /// Deserializes a snapshot from a JSON file previously written by
    /// `save_json`.
    pub fn load_json(path: &Path) -> Result<ReporterState, ReportError> {
        let file = std::fs::File::open(path)?;
        let reader = std::io::BufReader::new(file);
        Ok(serde_json::from_reader(reader)?)
    }
}

/// Session-scoped owner of the epoch table.
///
/// Opens an [`EpochStream`] per (stream, epoch) observation, carries the
/// iteration counter forward between epochs, finalizes each stream's raw
/// series into one scalar per key, and answers historical queries over the
/// finalized table.
///
/// ```no_run
/// use epoch_tally::{Reporter, ReportError};
///
/// let mut reporter = Reporter::new();
/// reporter.set_epoch(1);
/// reporter.observe("train", None, |stream| -> Result<(), ReportError> {
///     for _batch in 0..100 {
///         stream.register([("loss", Some(0.2.into()))], None, false)?;
///     }
///     Ok(())
/// })?;
/// # Ok::<(), ReportError>(())
/// ```
pub struct Reporter {
    epoch: usize,
    stats: EpochTable,
    /// Latest finalized epoch; kept explicit so epoch-defaulting queries
    /// never scan the table and fail cleanly while it is empty.
    latest: Option<usize>,
    sink: Arc<dyn LogSink>,
}

impl Default for Reporter {
    fn default() -> Self {
        Reporter::new()
    }
}

impl Reporter {
    pub fn new() -> Self {
        Reporter::with_sink(Arc::new(TracingSink))
    }

    /// Builds a reporter emitting through the given sink instead of the
    /// default tracing-backed one.
    pub fn with_sink(sink: Arc<dyn LogSink>) -> Self {
        Reporter {
            epoch: 0,
            stats: EpochTable::new(),
            latest: None,
            sink,
        }
    }

    pub fn epoch(&self) -> usize {
        self.epoch
    }

    pub fn set_epoch(&mut self, epoch: usize) {
        self.epoch = epoch;
    }

    /// Latest finalized epoch, if any stream has been finished yet.
    pub fn latest_epoch(&self) -> Option<usize> {
        self.latest
    }

    /// Opens an observation session for `stream_name`.
    ///
    /// The new stream's iteration counter continues from the previous
    /// epoch's finalized `total_count` for the same stream name.  Missing
    /// history is survivable: the counter reseeds at 0 with a warning
    /// (unless the previous epoch is epoch 0, where absence is expected).
    /// Any stale finalized entry for this (epoch, stream) pair is evicted
    /// first.
    pub fn start_epoch(&mut self, stream_name: &str, epoch: Option<usize>) -> EpochStream {
        if let Some(e) = epoch {
            self.epoch = e;
        }

        let prior = self.epoch.checked_sub(1);
        let carried = prior
            .and_then(|p| self.stats.get(&p))
            .and_then(|streams| streams.get(stream_name))
            .and_then(|stats| stats.get("total_count"))
            .and_then(FinalizedValue::as_count);
        let initial_total_count = match carried {
            Some(n) => n,
            None => {
                if prior != Some(0) {
                    self.sink.emit(
                        Level::WARN,
                        &format!(
                            "stats of the previous epoch ({}) don't exist for `{stream_name}`; \
                             restarting the iteration count at 0",
                            prior.map_or_else(|| "-1".to_string(), |p| p.to_string()),
                        ),
                    );
                }
                0
            }
        };

        // Defensive reset: a leftover entry for this pair means an earlier
        // run of this epoch was interrupted or is being redone.
        if let Some(streams) = self.stats.get_mut(&self.epoch) {
            streams.remove(stream_name);
            if streams.is_empty() {
                self.stats.remove(&self.epoch);
            }
        }
        self.latest = self.stats.keys().next_back().copied();

        EpochStream::new(
            stream_name.to_string(),
            self.epoch,
            initial_total_count,
            Arc::clone(&self.sink),
        )
    }

    /// Reduces every series of `stream` into one scalar and absorbs the
    /// result into the epoch table, together with the elapsed wall-clock
    /// `time` and the final `total_count`.
    ///
    /// Fails without touching the table when the reporter's epoch moved
    /// while the stream was being observed.
    pub fn finish_epoch(&mut self, stream: &mut EpochStream) -> Result<(), ReportError> {
        if self.epoch != stream.epoch() {
            return Err(ReportError::EpochMismatch {
                reporter: self.epoch,
                stream: stream.epoch(),
            });
        }

        let mut finalized = StreamStats::new();
        for (key, series) in stream.stats() {
            finalized.insert(key.clone(), FinalizedValue::Float(aggregate(series)?));
        }
        finalized.insert("time".to_string(), FinalizedValue::Duration(stream.elapsed()));
        finalized.insert(
            "total_count".to_string(),
            FinalizedValue::Count(stream.total_count()),
        );

        self.stats
            .entry(self.epoch)
            .or_default()
            .insert(stream.stream_name().to_string(), finalized);
        self.latest = self.stats.keys().next_back().copied();
        stream.finish();
        Ok(())
    }

    /// Scoped observation: opens a stream, runs `f`, and always finalizes,
    /// error path included.  A body error takes precedence over a finalize
    /// error; neither is swallowed.
    pub fn observe<T, E, F>(
        &mut self,
        stream_name: &str,
        epoch: Option<usize>,
        f: F,
    ) -> Result<T, E>
    where
        F: FnOnce(&mut EpochStream) -> Result<T, E>,
        E: From<ReportError>,
    {
        let mut stream = self.start_epoch(stream_name, epoch);
        let result = f(&mut stream);
        let finished = self.finish_epoch(&mut stream);
        match result {
            Ok(value) => {
                finished?;
                Ok(value)
            }
            Err(e) => Err(e),
        }
    }

    /// Ranks every epoch holding `(stream, key)` by value.
    ///
    /// `Min` sorts ascending, `Max` descending; ties keep epoch order (the
    /// sort is stable over the epoch-ascending table).
    pub fn sort_epochs_and_values(
        &self,
        stream: &str,
        key: &str,
        mode: SortMode,
    ) -> Vec<(usize, f64)> {
        let mut values: Vec<(usize, f64)> = self
            .stats
            .iter()
            .filter_map(|(e, streams)| {
                streams
                    .get(stream)
                    .and_then(|stats| stats.get(key))
                    .map(|v| (*e, v.as_f64()))
            })
            .collect();

        match mode {
            SortMode::Min => {
                values.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(Ordering::Equal))
            }
            SortMode::Max => {
                values.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal))
            }
        }
        values
    }

    /// The best epoch for `(stream, key)` under `mode`, with its value.
    /// `None` when no epoch recorded the pair.
    pub fn best_epoch(&self, stream: &str, key: &str, mode: SortMode) -> Option<(usize, f64)> {
        self.sort_epochs_and_values(stream, key, mode).into_iter().next()
    }

    /// Whether `(stream, key)` was finalized in `epoch` (latest when `None`).
    pub fn has(&self, stream: &str, key: &str, epoch: Option<usize>) -> bool {
        let Some(epoch) = epoch.or(self.latest) else {
            return false;
        };
        self.stats
            .get(&epoch)
            .and_then(|streams| streams.get(stream))
            .is_some_and(|stats| stats.contains_key(key))
    }

    fn resolve_epoch(&self, epoch: Option<usize>) -> Result<usize, ReportError> {
        epoch.or(self.latest).ok_or(ReportError::NoFinishedEpochs)
    }

    /// Finalized value for `(stream, key)` at `epoch` (latest when `None`).
    pub fn value(
        &self,
        stream: &str,
        key: &str,
        epoch: Option<usize>,
    ) -> Result<FinalizedValue, ReportError> {
        let epoch = self.resolve_epoch(epoch)?;
        self.stats
            .get(&epoch)
            .and_then(|streams| streams.get(stream))
            .and_then(|stats| stats.get(key))
            .copied()
            .ok_or_else(|| ReportError::StatNotFound {
                epoch,
                stream: stream.to_string(),
                key: key.to_string(),
            })
    }

    /// Stream names finalized in `epoch` (latest when `None`).
    pub fn stream_names(&self, epoch: Option<usize>) -> Result<Vec<String>, ReportError> {
        let epoch = self.resolve_epoch(epoch)?;
        Ok(self
            .stats
            .get(&epoch)
            .map(|streams| streams.keys().cloned().collect())
            .unwrap_or_default())
    }

    /// Caller-registered keys of `stream` at `epoch`, reserved keys
    /// excluded.
    pub fn stat_keys(
        &self,
        stream: &str,
        epoch: Option<usize>,
    ) -> Result<Vec<String>, ReportError> {
        let epoch = self.resolve_epoch(epoch)?;
        let stats = self
            .stats
            .get(&epoch)
            .and_then(|streams| streams.get(stream))
            .ok_or_else(|| ReportError::StreamNotFound {
                epoch,
                stream: stream.to_string(),
            })?;
        Ok(stats
            .keys()
            .filter(|k| !RESERVED_KEYS.contains(&k.as_str()))
            .cloned()
            .collect())
    }

    /// Every `(stream, key)` pair at `epoch`, reserved keys included.
    pub fn all_keys(&self, epoch: Option<usize>) -> Result<Vec<(String, String)>, ReportError> {
        let epoch = self.resolve_epoch(epoch)?;
        Ok(self
            .stats
            .get(&epoch)
            .map(|streams| {
                streams
                    .iter()
                    .flat_map(|(stream, stats)| {
                        stats.keys().map(move |k| (stream.clone(), k.clone()))
                    })
                    .collect()
            })
            .unwrap_or_default())
    }

    /// Emits one summary line for `epoch` (latest when `None`):
    /// `"{epoch}epoch results: [train] loss=0.123, time=2 minutes and
    /// 3 seconds, total_count=5, [eval] ..."`.
    pub fn log_summary(&self, level: Level, epoch: Option<usize>) -> Result<(), ReportError> {
        let epoch = self.resolve_epoch(epoch)?;

        let mut message = String::new();
        if let Some(streams) = self.stats.get(&epoch) {
            for (stream, stats) in streams {
                let mut part = String::new();
                for (key, v) in stats {
                    if !part.is_empty() {
                        part.push_str(", ");
                    }
                    match v {
                        FinalizedValue::Float(x) => part.push_str(&format!("{key}={x:.3}")),
                        FinalizedValue::Duration(d) => {
                            part.push_str(&format!("{key}={}", format_timespan(*d)))
                        }
                        FinalizedValue::Count(n) => part.push_str(&format!("{key}={n}")),
                    }
                }
                if !part.is_empty() {
                    if message.is_empty() {
                        message.push_str(&format!("{epoch}epoch results: "));
                    } else {
                        message.push_str(", ");
                    }
                    message.push_str(&format!("[{stream}] {part}"));
                }
            }
        }
        self.sink.emit(level, &message);
        Ok(())
    }

    /// Snapshot for the checkpointing collaborator.
    pub fn export_state(&self) -> ReporterState {
        ReporterState {
            epoch: self.epoch,
            stats: self.stats.clone(),
        }
    }

    /// Restores a snapshot produced by `export_state`; the latest-epoch
    /// pointer is rebuilt from the restored table.
    pub fn restore_state(&mut self, state: ReporterState) {
        self.epoch = state.epoch;
        self.stats = state.stats;
        self.latest = self.stats.keys().next_back().copied();
    }

    /// Writes one line chart per non-reserved key under `out_dir`
    /// (`<out_dir>/<key>.png`), comparing the key across every stream that
    /// recorded it.  The x-axis runs over epochs `1..=latest`; absent cells
    /// break the line.
    pub fn save_plots(&self, out_dir: &Path) -> Result<(), ReportError> {
        let latest = self.latest.ok_or(ReportError::NoFinishedEpochs)?;
        std::fs::create_dir_all(out_dir)?;

        let mut keys = BTreeSet::new();
        for stream in self.stream_names(None)? {
            keys.extend(self.stat_keys(&stream, None)?);
        }

        for key in keys {
            let series = plot::series_for_key(self, &key)?;
            let chart = plot::render_line_chart(&series, latest);
            chart.save(out_dir.join(format!("{key}.png")))?;
        }
        Ok(())
    }
}
