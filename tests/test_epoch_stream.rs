#[cfg(test)]
mod epoch_stream_tests {
    use std::sync::{Arc, Mutex};

    use epoch_tally::{EpochStream, Level, LogSink, ReportError, Reporter, Sample};

    struct CaptureSink {
        lines: Mutex<Vec<(Level, String)>>,
    }

    impl CaptureSink {
        fn new() -> Arc<Self> {
            Arc::new(CaptureSink {
                lines: Mutex::new(Vec::new()),
            })
        }

        fn lines(&self) -> Vec<(Level, String)> {
            self.lines.lock().unwrap().clone()
        }
    }

    impl LogSink for CaptureSink {
        fn emit(&self, level: Level, message: &str) {
            self.lines.lock().unwrap().push((level, message.to_string()));
        }
    }

    fn make_stream(reporter: &mut Reporter) -> EpochStream {
        reporter.start_epoch("train", Some(1))
    }

    #[test]
    fn one_call_counts_one_iteration() {
        let mut reporter = Reporter::new();
        let mut stream = make_stream(&mut reporter);

        stream
            .register([("loss", Some(0.4.into()))], None, false)
            .unwrap();
        stream
            .register(
                [("loss", Some(0.2.into())), ("acc", Some(0.9.into()))],
                None,
                false,
            )
            .unwrap();
        assert_eq!(stream.total_count(), 2);
    }

    #[test]
    fn zero_key_call_still_advances_the_counter() {
        let mut reporter = Reporter::new();
        let mut stream = make_stream(&mut reporter);

        stream.register_empty().unwrap();
        stream.register_empty().unwrap();
        assert_eq!(stream.total_count(), 2);
    }

    #[test]
    fn skip_count_increment_leaves_the_counter() {
        let mut reporter = Reporter::new();
        let mut stream = make_stream(&mut reporter);

        stream
            .register([("lr_0", Some(0.001.into()))], None, true)
            .unwrap();
        assert_eq!(stream.total_count(), 0);
    }

    #[test]
    fn none_value_skips_the_key_but_counts_the_call() {
        let mut reporter = Reporter::new();
        let mut stream = make_stream(&mut reporter);

        stream
            .register([("loss", None::<Sample>)], None, false)
            .unwrap();
        assert_eq!(stream.total_count(), 1);

        reporter.finish_epoch(&mut stream).unwrap();
        assert!(!reporter.has("train", "loss", Some(1)));
    }

    #[test]
    fn reserved_keys_are_rejected() {
        let mut reporter = Reporter::new();
        let mut stream = make_stream(&mut reporter);

        for reserved in ["time", "total_count"] {
            let err = stream
                .register([(reserved, Some(1.0.into()))], None, false)
                .unwrap_err();
            assert!(matches!(err, ReportError::ReservedKey(k) if k == reserved));
        }
    }

    #[test]
    fn register_fails_after_finish() {
        let mut reporter = Reporter::new();
        let mut stream = make_stream(&mut reporter);
        reporter.finish_epoch(&mut stream).unwrap();

        assert!(stream.is_finished());
        let err = stream
            .register([("loss", Some(0.4.into()))], None, false)
            .unwrap_err();
        assert!(matches!(err, ReportError::StreamFinished));
    }

    #[test]
    fn log_progress_fails_after_finish() {
        let mut reporter = Reporter::new();
        let mut stream = make_stream(&mut reporter);
        reporter.finish_epoch(&mut stream).unwrap();

        let err = stream.log_progress(Level::INFO, None).unwrap_err();
        assert!(matches!(err, ReportError::StreamFinished));
    }

    #[test]
    fn log_progress_formats_the_full_window() {
        let sink = CaptureSink::new();
        let mut reporter = Reporter::with_sink(sink.clone());
        let mut stream = reporter.start_epoch("train", Some(1));
        for v in [0.1, 0.2, 0.3, 0.4, 0.5] {
            stream
                .register([("loss", Some(v.into()))], None, false)
                .unwrap();
        }

        stream.log_progress(Level::INFO, None).unwrap();

        let lines = sink.lines();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].0, Level::INFO);
        assert_eq!(lines[0].1, "1epoch:train:1-5batch: loss=0.300");
    }

    #[test]
    fn log_progress_aggregates_only_the_latest_window() {
        let sink = CaptureSink::new();
        let mut reporter = Reporter::with_sink(sink.clone());
        let mut stream = reporter.start_epoch("train", Some(1));
        for v in [0.1, 0.2, 0.3, 0.4, 0.5] {
            stream
                .register([("loss", Some(v.into()))], None, false)
                .unwrap();
        }

        stream.log_progress(Level::INFO, Some(2)).unwrap();

        let lines = sink.lines();
        assert_eq!(lines[0].1, "1epoch:train:4-5batch: loss=0.450");
    }

    #[test]
    fn batch_weight_applies_to_every_key_of_the_call() {
        let mut reporter = Reporter::new();
        let mut stream = make_stream(&mut reporter);

        // Two batches of different sizes; the weighted mean must favor the
        // larger batch.
        stream
            .register([("loss", Some(1.0.into()))], Some(1.0.into()), false)
            .unwrap();
        stream
            .register([("loss", Some(2.0.into()))], Some(3.0.into()), false)
            .unwrap();
        reporter.finish_epoch(&mut stream).unwrap();

        let loss = reporter.value("train", "loss", Some(1)).unwrap().as_f64();
        assert!((loss - 1.75).abs() < 1e-12);
    }
}
