#[cfg(test)]
mod plot_tests {
    use epoch_tally::{ReportError, Reporter};

    fn finish_epoch_with(
        reporter: &mut Reporter,
        stream: &str,
        epoch: usize,
        stats: &[(&str, f64)],
    ) {
        let mut s = reporter.start_epoch(stream, Some(epoch));
        let pairs: Vec<(&str, Option<epoch_tally::Sample>)> = stats
            .iter()
            .map(|(k, v)| (*k, Some((*v).into())))
            .collect();
        s.register(pairs, None, false).unwrap();
        reporter.finish_epoch(&mut s).unwrap();
    }

    #[test]
    fn one_png_per_non_reserved_key() {
        let mut reporter = Reporter::new();
        finish_epoch_with(&mut reporter, "train", 1, &[("loss", 0.5), ("acc", 0.8)]);
        finish_epoch_with(&mut reporter, "eval", 1, &[("loss", 0.6)]);
        finish_epoch_with(&mut reporter, "train", 2, &[("loss", 0.4), ("acc", 0.9)]);
        finish_epoch_with(&mut reporter, "eval", 2, &[("loss", 0.5)]);

        let dir = tempfile::tempdir().unwrap();
        reporter.save_plots(dir.path()).unwrap();

        assert!(dir.path().join("loss.png").is_file());
        assert!(dir.path().join("acc.png").is_file());
        // Reserved summary fields are never plotted.
        assert!(!dir.path().join("time.png").exists());
        assert!(!dir.path().join("total_count.png").exists());
    }

    #[test]
    fn plots_decode_as_non_empty_images() {
        let mut reporter = Reporter::new();
        finish_epoch_with(&mut reporter, "train", 1, &[("loss", 0.5)]);
        finish_epoch_with(&mut reporter, "train", 2, &[("loss", 0.3)]);

        let dir = tempfile::tempdir().unwrap();
        reporter.save_plots(dir.path()).unwrap();

        let img = image::open(dir.path().join("loss.png")).unwrap();
        assert!(img.width() > 0 && img.height() > 0);
    }

    #[test]
    fn save_plots_on_an_empty_reporter_fails_explicitly() {
        let reporter = Reporter::new();
        let dir = tempfile::tempdir().unwrap();
        let err = reporter.save_plots(dir.path()).unwrap_err();
        assert!(matches!(err, ReportError::NoFinishedEpochs));
    }

    #[test]
    fn output_directory_is_created_on_demand() {
        let mut reporter = Reporter::new();
        finish_epoch_with(&mut reporter, "train", 1, &[("loss", 0.5)]);

        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("plots").join("run-1");
        reporter.save_plots(&nested).unwrap();
        assert!(nested.join("loss.png").is_file());
    }
}
