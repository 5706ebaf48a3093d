use std::fmt::Display;
use std::io::IsTerminal;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use console::{colors_enabled, style};
use indicatif::{ProgressBar, ProgressStyle};

static VERBOSE: AtomicBool = AtomicBool::new(false);

pub fn brand_accent<D: Display>(value: D) -> console::StyledObject<D> {
    style(value).cyan()
}

pub fn brand_fg<D: Display>(value: D) -> console::StyledObject<D> {
    style(value)
}

pub fn brand_muted<D: Display>(value: D) -> console::StyledObject<D> {
    style(value).dim()
}

pub fn brand_success<D: Display>(value: D) -> console::StyledObject<D> {
    style(value).green()
}

pub fn brand_warning<D: Display>(value: D) -> console::StyledObject<D> {
    style(value).yellow()
}

pub fn brand_error<D: Display>(value: D) -> console::StyledObject<D> {
    style(value).red()
}

pub fn set_verbose(verbose: bool) {
    VERBOSE.store(verbose, Ordering::Relaxed);
}

pub fn is_verbose() -> bool {
    VERBOSE.load(Ordering::Relaxed)
}

pub fn section(title: &str) {
    println!();
    println!("{}", brand_accent(title).bold());
}

pub fn step(message: &str) {
    println!("{} {}", brand_accent("•").bold(), brand_fg(message));
}

pub fn success(message: &str) {
    println!("{} {}", brand_success("✓").bold(), brand_fg(message));
}

pub fn warning(message: &str) {
    println!("{} {}", brand_warning("!").bold(), brand_fg(message));
}

pub fn error(message: &str) {
    println!("{} {}", brand_error("✗").bold(), brand_fg(message));
}

pub fn error_stderr(message: &str) {
    eprintln!("{} {}", brand_error("✗").bold(), brand_fg(message));
}

pub fn muted(message: &str) {
    println!("{}", brand_muted(message));
}

pub fn emphasized(value: &str) -> String {
    if std::io::stdout().is_terminal() && colors_enabled() {
        // Use italic on/off (3/23) instead of a full reset so surrounding styles
        // (like dim hints) stay active after emphasized text.
        format!("\x1b[3m{}\x1b[23m", value)
    } else {
        format!("'{}'", value)
    }
}

/// Run `work` behind a spinner on stderr. Without a terminal (or in verbose
/// mode, where log lines would tear the spinner) the work just runs.
pub fn with_spinner<T, F, S>(message: S, work: F) -> T
where
    F: FnOnce() -> T,
    S: Into<String>,
{
    if is_verbose() || !std::io::stderr().is_terminal() {
        return work();
    }

    let spinner = ProgressBar::new_spinner();
    if let Ok(spinner_style) = ProgressStyle::with_template("{spinner:.cyan} {msg}") {
        spinner.set_style(spinner_style);
    }
    spinner.set_message(message.into());
    spinner.enable_steady_tick(Duration::from_millis(80));

    let result = work();
    spinner.finish_and_clear();
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbose_round_trip() {
        set_verbose(false);
        assert!(!is_verbose());

        set_verbose(true);
        assert!(is_verbose());
    }

    #[test]
    fn emphasized_falls_back_to_quoted_text_in_non_tty_context() {
        assert_eq!(emphasized("rootCA.pem"), "'rootCA.pem'");
    }

    #[test]
    fn with_spinner_runs_work_in_non_tty_context() {
        let value = with_spinner("Generating key...", || 42usize);
        assert_eq!(value, 42);
    }
}
