use crate::ui::progress_message::ProgressMessage;
use crate::ui::theme;
use crate::ui::Icons;
use indicatif::{HumanDuration, ProgressBar, ProgressStyle};
use owo_colors::OwoColorize;
use std::thread;
use std::time::Duration;

/// Renders batch progress from a channel of [`ProgressMessage`]s.
pub struct ProgressManager {
    bar: ProgressBar,
    handle: thread::JoinHandle<()>,
}

impl ProgressManager {
    /// Spawn the rendering thread. The bar stays hidden when stderr is not a
    /// terminal or `hidden` is set.
    pub fn new(hidden: bool) -> (Self, crossbeam::channel::Sender<ProgressMessage>) {
        let (tx, rx) = crossbeam::channel::unbounded::<ProgressMessage>();

        let bar = if hidden || !console::Term::stderr().is_term() {
            ProgressBar::hidden()
        } else {
            let bar = ProgressBar::new(0).with_message("Expanding statements");
            if let Ok(style) = ProgressStyle::with_template("{spinner} [{bar:30}] {pos}/{len} {msg}") {
                bar.set_style(style.progress_chars("=> "));
            }
            bar
        };

        let bar_clone = bar.clone();
        let handle = thread::spawn(move || {
            for msg in rx {
                match msg {
                    ProgressMessage::Started { total } => {
                        bar_clone.set_length(total as u64);
                        bar_clone.enable_steady_tick(Duration::from_millis(100));
                    }
                    ProgressMessage::Expanded { statement_id } => {
                        bar_clone.inc(1);
                        bar_clone.set_message(statement_id);
                    }
                    ProgressMessage::Skipped { statement_id, reason } => {
                        bar_clone.inc(1);
                        bar_clone.println(format!("{} {} skipped: {}", Icons::SKIP, statement_id, reason));
                    }
                    ProgressMessage::Finished => {
                        bar_clone.finish_with_message("Done");
                    }
                    ProgressMessage::Error(e) => {
                        bar_clone.abandon_with_message(format!("Failed: {}", e));
                    }
                }
            }
        });

        (Self { bar, handle }, tx)
    }

    /// Wait until every sender is dropped and the last message is drawn
    pub fn join(self) -> ProgressBar {
        self.handle.join().ok();
        self.bar
    }

    pub fn finish_with_summary(self, duration: Duration, expanded: usize, skipped: usize) {
        let bar = self.join();
        bar.finish_and_clear();
        eprintln!(
            "{} {}",
            Icons::CHECK.style(theme().success.clone()),
            format!("Complete in {}", HumanDuration(duration)).style(theme().success.clone())
        );
        eprintln!(
            "  {} {}  {} {}",
            Icons::FILE.style(theme().info.clone()),
            expanded,
            Icons::SKIP.style(theme().info.clone()),
            skipped
        );
    }
}
