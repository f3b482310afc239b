use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::error::ReportError;
use crate::report::sink::{Level, LogSink};
use crate::value::{aggregate, to_reported_value, ReportedValue, Sample};

/// Keys the reporter writes into every finalized stream itself; callers may
/// not register under them.
pub(crate) const RESERVED_KEYS: [&str; 2] = ["time", "total_count"];

/// Append-only accumulator for one (stream, epoch) observation session.
///
/// Created by [`Reporter::start_epoch`](crate::report::reporter::Reporter::start_epoch)
/// with the iteration counter carried over from the previous epoch, mutated
/// once per iteration by `register`, and handed back to
/// [`Reporter::finish_epoch`](crate::report::reporter::Reporter::finish_epoch)
/// which reduces every series and marks the stream finished.  After that,
/// every mutation fails with [`ReportError::StreamFinished`].
pub struct EpochStream {
    stream_name: String,
    epoch: usize,
    start: Instant,
    total_count: u64,
    stats: BTreeMap<String, Vec<ReportedValue>>,
    finished: bool,
    sink: Arc<dyn LogSink>,
}

impl EpochStream {
    pub(crate) fn new(
        stream_name: String,
        epoch: usize,
        initial_total_count: u64,
        sink: Arc<dyn LogSink>,
    ) -> Self {
        EpochStream {
            stream_name,
            epoch,
            start: Instant::now(),
            total_count: initial_total_count,
            stats: BTreeMap::new(),
            finished: false,
            sink,
        }
    }

    pub fn stream_name(&self) -> &str {
        &self.stream_name
    }

    pub fn epoch(&self) -> usize {
        self.epoch
    }

    /// Number of iterations observed across all epochs of this stream.
    ///
    /// Readable mid-stream; the training loop feeds this to schedules that
    /// depend on the global step (e.g. gradient-noise annealing).
    pub fn total_count(&self) -> u64 {
        self.total_count
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Records one iteration's statistics.
    ///
    /// One call models one iteration: the counter advances by 1 (unless
    /// `skip_count_increment`) regardless of how many keys are supplied, so a
    /// zero-key call still counts a forward-less step.  A `None` value skips
    /// its key for this call; series of different keys may therefore have
    /// different lengths.
    ///
    /// # Arguments
    /// - `stats`  — `(key, value)` pairs for this iteration
    /// - `weight` — optional batch weight applied to every value in `stats`
    /// - `skip_count_increment` — record values without consuming an
    ///   iteration (the learning-rate-logging path registers once per
    ///   accumulation boundary this way)
    pub fn register<K, I>(
        &mut self,
        stats: I,
        weight: Option<Sample>,
        skip_count_increment: bool,
    ) -> Result<(), ReportError>
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Option<Sample>)>,
    {
        if self.finished {
            return Err(ReportError::StreamFinished);
        }
        if !skip_count_increment {
            self.total_count += 1;
        }

        let weight = weight.map(Sample::resolve).transpose()?;

        for (key, v) in stats {
            let key = key.into();
            if RESERVED_KEYS.contains(&key.as_str()) {
                return Err(ReportError::ReservedKey(key));
            }
            // A None value means this iteration produced no sample for the key.
            let Some(v) = v else {
                continue;
            };
            let reported = to_reported_value(v, weight.map(Sample::Scalar))?;
            self.stats.entry(key).or_default().push(reported);
        }
        Ok(())
    }

    /// Advances the iteration counter without recording any stat.
    pub fn register_empty(&mut self) -> Result<(), ReportError> {
        self.register(std::iter::empty::<(String, Option<Sample>)>(), None, false)
    }

    /// Emits one progress line aggregating the last `latest_n` entries of
    /// every key (all entries when `None`):
    /// `"<epoch>epoch:<stream>:<start>-<end>batch: k1=v1, k2=v2"`.
    ///
    /// Observability only; no state changes.  Fails once the stream is
    /// finished.
    pub fn log_progress(
        &self,
        level: Level,
        latest_n: Option<usize>,
    ) -> Result<(), ReportError> {
        if self.finished {
            return Err(ReportError::StreamFinished);
        }

        let mut message = String::new();
        for (key, series) in &self.stats {
            let n = latest_n.unwrap_or(series.len()).min(series.len());
            let window = &series[series.len() - n..];
            if message.is_empty() {
                message.push_str(&format!(
                    "{}epoch:{}:{}-{}batch: ",
                    self.epoch,
                    self.stream_name,
                    series.len() - n + 1,
                    series.len(),
                ));
            } else {
                message.push_str(", ");
            }
            let v = aggregate(window)?;
            message.push_str(&format!("{key}={v:.3}"));
        }
        self.sink.emit(level, &message);
        Ok(())
    }

    /// Wall-clock time since the stream was opened.
    pub(crate) fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    pub(crate) fn stats(&self) -> &BTreeMap<String, Vec<ReportedValue>> {
        &self.stats
    }

    /// One-shot transition; only `finish_epoch` drives this.
    pub(crate) fn finish(&mut self) {
        self.finished = true;
    }
}
