use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

use super::styling::{bright_green, bright_yellow};

/// Spinner shown while a one-shot fetch is in flight
pub struct FetchProgress {
    pb: ProgressBar,
}

impl FetchProgress {
    pub fn start(what: &str) -> Self {
        let pb = ProgressBar::new_spinner();
        pb.set_draw_target(ProgressDrawTarget::stderr());
        if let Ok(style) = ProgressStyle::default_spinner().template("  {msg} {spinner}") {
            pb.set_style(style);
        }
        pb.set_message(bright_yellow(format!("Fetching {what}")).to_string());
        pb.enable_steady_tick(std::time::Duration::from_millis(100));
        Self { pb }
    }

    pub fn finish(self, what: &str) {
        self.pb
            .finish_with_message(bright_green(format!("Fetched {what} ✓")).to_string());
        eprintln!();
    }

    pub fn abandon(self) {
        self.pb.finish_and_clear();
    }
}
