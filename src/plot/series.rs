use crate::error::ReportError;
use crate::report::reporter::Reporter;

/// Collects the epoch-indexed series of `key` for every stream that recorded
/// it at the latest epoch.
///
/// The x-axis runs over epochs `1..=latest` (epoch 0 is a warm-up slot and
/// never plotted); an epoch where the (stream, key) cell is absent yields
/// NaN, which the chart renders as a gap in the line.
pub fn series_for_key(
    reporter: &Reporter,
    key: &str,
) -> Result<Vec<(String, Vec<f64>)>, ReportError> {
    let latest = reporter
        .latest_epoch()
        .ok_or(ReportError::NoFinishedEpochs)?;

    let mut out = Vec::new();
    for stream in reporter.stream_names(None)? {
        if !reporter.stat_keys(&stream, None)?.iter().any(|k| k == key) {
            continue;
        }
        let ys = (1..=latest)
            .map(|e| {
                reporter
                    .value(&stream, key, Some(e))
                    .map(|v| v.as_f64())
                    .unwrap_or(f64::NAN)
            })
            .collect();
        out.push((stream, ys));
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn finish_with_loss(reporter: &mut Reporter, stream: &str, epoch: usize, loss: f64) {
        let mut s = reporter.start_epoch(stream, Some(epoch));
        s.register([("loss", Some(loss.into()))], None, false).unwrap();
        reporter.finish_epoch(&mut s).unwrap();
    }

    #[test]
    fn absent_epochs_become_nan_gaps() {
        let mut reporter = Reporter::new();
        finish_with_loss(&mut reporter, "train", 1, 0.5);
        finish_with_loss(&mut reporter, "train", 3, 0.3);

        let series = series_for_key(&reporter, "loss").unwrap();
        assert_eq!(series.len(), 1);
        let (stream, ys) = &series[0];
        assert_eq!(stream, "train");
        assert_eq!(ys.len(), 3);
        assert_eq!(ys[0], 0.5);
        assert!(ys[1].is_nan());
        assert_eq!(ys[2], 0.3);
    }

    #[test]
    fn only_streams_holding_the_key_participate() {
        let mut reporter = Reporter::new();
        finish_with_loss(&mut reporter, "train", 1, 0.5);
        let mut s = reporter.start_epoch("eval", Some(1));
        s.register([("acc", Some(0.9.into()))], None, false).unwrap();
        reporter.finish_epoch(&mut s).unwrap();

        let series = series_for_key(&reporter, "acc").unwrap();
        assert_eq!(series.len(), 1);
        assert_eq!(series[0].0, "eval");
    }
}
