use indicatif::{ProgressBar, ProgressDrawTarget, ProgressState, ProgressStyle};

/// Progress bar for a fixed number of trials, drawn on stderr.
pub struct TrialProgress {
    pb: ProgressBar,
}

impl TrialProgress {
    pub fn new(total: usize, message: &str) -> Self {
        let pb = ProgressBar::with_draw_target(Some(total as u64), ProgressDrawTarget::stderr())
            .with_style(Self::bar_style())
            .with_message(message.to_string());
        Self { pb }
    }

    /// A bar that never draws, for quiet runs.
    pub fn hidden(total: usize) -> Self {
        Self {
            pb: ProgressBar::with_draw_target(Some(total as u64), ProgressDrawTarget::hidden()),
        }
    }

    pub fn inc(&self) {
        self.pb.inc(1);
    }

    pub fn println(&self, msg: impl AsRef<str>) {
        self.pb.println(format!("  {}", msg.as_ref()));
    }

    pub fn position(&self) -> u64 {
        self.pb.position()
    }

    pub fn finish(&self, msg: &str) {
        if let Some(len) = self.pb.length() {
            self.pb.set_position(len);
        }
        self.pb.finish_with_message(msg.to_string());
    }

    pub fn is_finished(&self) -> bool {
        self.pb.is_finished()
    }

    fn bar_style() -> ProgressStyle {
        ProgressStyle::with_template("{msg:<20} [{bar:40.cyan/blue}] {pos}/{len} ({eta})")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .with_key(
                "eta",
                |state: &ProgressState, w: &mut dyn std::fmt::Write| {
                    let _ = write!(w, "{:.1}s", state.eta().as_secs_f64());
                },
            )
            .progress_chars("##-")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tracks_increments_and_finishes_at_length() {
        let progress = TrialProgress::hidden(10);
        progress.inc();
        progress.inc();
        assert_eq!(progress.position(), 2);
        assert!(!progress.is_finished());

        progress.finish("done");
        assert_eq!(progress.position(), 10);
        assert!(progress.is_finished());
    }
}
