use indicatif::{ProgressBar, ProgressStyle};

const TEMPLATE: &str = "{prefix:>12.cyan} {pos}/{len} [{wide_bar:.cyan/blue}] {percent}% ({per_sec}, {eta})";

/// One bar per phase. It advances only on jobs that produced output.
pub struct PhaseProgress {
    bar: ProgressBar,
}

impl PhaseProgress {
    pub fn new(prefix: impl Into<String>, len: usize, visible: bool) -> Self {
        let bar = if visible {
            ProgressBar::new(len as u64)
        } else {
            ProgressBar::hidden()
        };
        bar.set_length(len as u64);
        bar.set_style(
            ProgressStyle::default_bar()
                .template(TEMPLATE)
                .unwrap_or_else(|_| ProgressStyle::default_bar()),
        );
        bar.set_prefix(prefix.into());
        Self { bar }
    }

    pub fn inc(&self) {
        self.bar.inc(1);
    }

    pub fn position(&self) -> u64 {
        self.bar.position()
    }

    pub fn finish(&self) {
        self.bar.finish();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hidden_bar_still_counts() {
        let progress = PhaseProgress::new("batch 1", 3, false);
        progress.inc();
        progress.inc();
        assert_eq!(progress.position(), 2);
    }
}
