use std::io::IsTerminal;

use anstyle::AnsiColor::*;
use anstyle::Effects;
use anstyle::Style;
use indicatif::{ProgressBar, ProgressStyle};

use fromgit::{Event, EventCode, EventSink};

const INFO: Style = Cyan.on_default().effects(Effects::BOLD);
const WARN: Style = Yellow.on_default().effects(Effects::BOLD);
const GOOD: Style = Green.on_default().effects(Effects::BOLD);

/// Shows a spinner while fetching and prints events above it.
pub struct Reporter {
    bar: ProgressBar,
    styled: bool,
}

fn make_progress_spinner(prefix: String) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.enable_steady_tick(std::time::Duration::from_millis(120));
    if let Ok(style) =
        ProgressStyle::with_template("{prefix:.cyan.bold/blue.bold} {msg:.cyan/blue} {spinner}")
    {
        pb.set_style(style.tick_chars("⣾⣽⣻⢿⡿⣟⣯⣷"));
    }
    pb.set_prefix(prefix);
    pb
}

impl Reporter {
    pub fn new(src: &str) -> Self {
        Self {
            bar: make_progress_spinner(src.to_string()),
            styled: std::io::stderr().is_terminal(),
        }
    }

    pub fn finish(&self) {
        self.bar.finish_and_clear();
    }

    fn print(&self, style: Style, tag: &str, event: &Event) {
        let line = if self.styled {
            format!("{}{tag}{} {}", style.render(), style.render_reset(), event.message)
        } else {
            format!("{tag} {}", event.message)
        };
        // The bar is hidden when stderr is not a terminal, so print around it ourselves
        self.bar.suspend(|| eprintln!("{line}"));
    }
}

impl EventSink for Reporter {
    fn on_info(&self, event: &Event) {
        match event.code {
            EventCode::Downloading | EventCode::Extracting => {
                self.bar.set_message(event.message.clone());
                self.print(INFO, ">", event);
            }
            EventCode::Success => self.print(GOOD, ">", event),
            _ => self.print(INFO, ">", event),
        }
    }

    fn on_warn(&self, event: &Event) {
        self.print(WARN, "!", event);
    }
}
