use indicatif::{ProgressBar, ProgressStyle};
use vlock::bulk::{Phase, Progress, ProgressSink};

/// Percentage bar fed by bulk progress updates.
pub struct Bar {
    bar: ProgressBar,
}

impl Bar {
    pub fn new(description: &str) -> Self {
        let bar = ProgressBar::new(100);
        if let Ok(style) = ProgressStyle::default_bar().template("{msg:<32} [{bar:40.cyan/blue}] {pos:>3}% ({elapsed})") {
            bar.set_style(style.progress_chars("●○ "));
        }

        bar.set_message(description.to_owned());
        Self { bar }
    }

    /// A spinner for single-item work whose length is unknown.
    pub fn spinner(description: &str) -> Self {
        let bar = ProgressBar::new_spinner();
        bar.set_message(description.to_owned());
        bar.enable_steady_tick(std::time::Duration::from_millis(120));
        Self { bar }
    }

    pub fn finish(&self) {
        self.bar.finish_with_message("Done");
    }
}

impl ProgressSink for Bar {
    fn report(&mut self, progress: &Progress) {
        self.bar.set_position(progress.percentage.round() as u64);

        let message = match (&progress.current_file, progress.phase) {
            (_, Phase::Complete) => "Done".to_owned(),
            (Some(file), _) => format!("{}/{} {file}", progress.current, progress.total),
            (None, phase) => phase.to_string().replace('_', " "),
        };
        self.bar.set_message(message);
    }
}

impl Drop for Bar {
    fn drop(&mut self) {
        if !self.bar.is_finished() {
            self.bar.finish_and_clear();
        }
    }
}
