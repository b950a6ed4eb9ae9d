use indicatif::{ProgressBar, ProgressDrawTarget, ProgressState, ProgressStyle};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use structkit::engine::progress::{Progress, ProgressCallback};
use tracing::warn;

const SPINNER_TICK_MS: u64 = 80;

fn spinner_style() -> ProgressStyle {
    ProgressStyle::with_template("{spinner:.green} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
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

/// Applies one progress event to the bar.
///
/// Phases show a spinner with the phase name and counted tasks switch to a bar. Status
/// updates replace the message of whatever is showing.
fn render(pb: &ProgressBar, progress: Progress) {
    match progress {
        Progress::PhaseStart { name } => {
            pb.reset();
            pb.set_length(0);
            pb.set_style(spinner_style());
            pb.enable_steady_tick(Duration::from_millis(SPINNER_TICK_MS));
            pb.set_message(name);
        }
        Progress::PhaseFinish => {
            pb.disable_steady_tick();
            pb.finish_with_message("✓ Done");
        }
        Progress::TaskStart { total_steps } => {
            pb.disable_steady_tick();
            pb.reset();
            pb.set_length(total_steps);
            pb.set_position(0);
            pb.set_style(bar_style());
        }
        Progress::TaskIncrement => pb.inc(1),
        Progress::TaskFinish => {
            let length = pb.length().unwrap_or(0);
            if pb.position() < length {
                pb.set_position(length);
            }
            pb.finish();
        }
        Progress::StatusUpdate { text } => pb.set_message(text),
        Progress::Message(msg) => {
            if pb.is_finished() {
                pb.set_message(msg);
            } else {
                pb.println(format!("  {}", msg));
            }
        }
    }
}

/// Renders core progress events on stderr through a shared bar.
#[derive(Clone)]
pub struct CliProgressHandler {
    pb: Arc<Mutex<ProgressBar>>,
}

impl CliProgressHandler {
    pub fn new() -> Self {
        Self::with_target(ProgressDrawTarget::stderr())
    }

    /// A handler that draws nothing, for `-q`.
    pub fn hidden() -> Self {
        Self::with_target(ProgressDrawTarget::hidden())
    }

    fn with_target(target: ProgressDrawTarget) -> Self {
        let pb = ProgressBar::new(0)
            .with_style(spinner_style())
            .with_message("Initializing...");
        pb.set_draw_target(target);
        pb.finish_and_clear();

        Self {
            pb: Arc::new(Mutex::new(pb)),
        }
    }

    pub fn get_callback(&self) -> ProgressCallback<'static> {
        let pb = Arc::clone(&self.pb);

        Box::new(move |progress: Progress| {
            let Ok(guard) = pb.lock() else {
                warn!("Progress bar mutex was poisoned. Cannot update progress.");
                return;
            };
            render(&guard, progress);
        })
    }
}

impl Default for CliProgressHandler {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    fn hidden_bar() -> ProgressBar {
        ProgressBar::with_draw_target(Some(0), ProgressDrawTarget::hidden())
    }

    #[test]
    fn handler_initializes_in_a_clean_state() {
        let handler = CliProgressHandler::hidden();
        let pb = handler.pb.lock().unwrap();
        assert_eq!(pb.length(), Some(0));
        assert!(pb.is_finished());
    }

    #[test]
    fn tasks_fill_the_bar() {
        let pb = hidden_bar();
        render(&pb, Progress::PhaseStart { name: "Pairwise displacements" });
        assert_eq!(pb.message(), "Pairwise displacements");
        assert!(!pb.is_finished());

        render(&pb, Progress::TaskStart { total_steps: 9 });
        render(&pb, Progress::TaskIncrement);
        assert_eq!(pb.length(), Some(9));
        assert_eq!(pb.position(), 1);

        render(&pb, Progress::TaskFinish);
        assert!(pb.is_finished());
        assert_eq!(pb.position(), 9);

        render(&pb, Progress::PhaseFinish);
        assert_eq!(pb.message(), "✓ Done");
    }

    #[test]
    fn status_updates_replace_the_message() {
        let pb = hidden_bar();
        render(&pb, Progress::PhaseStart { name: "Fitting" });
        render(
            &pb,
            Progress::StatusUpdate {
                text: "Iteration 3".to_string(),
            },
        );
        assert_eq!(pb.message(), "Iteration 3");
    }

    #[test]
    fn callback_is_thread_safe() {
        let handler = CliProgressHandler::hidden();
        let callback = handler.get_callback();

        thread::spawn(move || {
            callback(Progress::PhaseStart { name: "Pivot search" });
            callback(Progress::StatusUpdate {
                text: "Round 1: f = 0.5".to_string(),
            });
            callback(Progress::PhaseFinish);
        })
        .join()
        .unwrap();

        let pb = handler.pb.lock().unwrap();
        assert!(pb.is_finished());
        assert_eq!(pb.message(), "✓ Done");
    }
}
