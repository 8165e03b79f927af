use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use dialoguer::{Input, Password, Select, theme::ColorfulTheme};
use indicatif::{ProgressBar, ProgressStyle};

use crate::error::{Error, Result};

/// What the login flow needs from a terminal.
pub trait Console {
    /// Show `message` as the step in progress.
    fn announce_start(&self, message: &str);
    /// Replace the in-progress marker with a success marker.
    fn announce_success(&self, message: &str);
    /// Replace the in-progress marker with a failure marker.
    fn announce_failure(&self, message: &str);
    fn prompt_text(&self, prompt: &str) -> Result<String>;
    fn prompt_secret(&self, prompt: &str) -> Result<String>;
    /// Index into `items` of the user's choice.
    fn prompt_choice(&self, prompt: &str, items: &[String]) -> Result<usize>;
}

/// Interactive console: spinners on stderr, prompts via dialoguer.
pub struct TerminalConsole {
    theme: ColorfulTheme,
    spinner: Mutex<Option<ProgressBar>>,
}

impl Default for TerminalConsole {
    fn default() -> Self {
        Self {
            theme: ColorfulTheme::default(),
            spinner: Mutex::new(None),
        }
    }
}

impl TerminalConsole {
    pub fn new() -> Self {
        Self::default()
    }

    fn take_spinner(&self) -> Option<ProgressBar> {
        self.spinner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }

    // A spinner must not redraw over an interactive prompt.
    fn pause_spinner(&self) {
        if let Some(bar) = self.take_spinner() {
            bar.finish_and_clear();
        }
    }

    fn finish(&self, template: &str, glyph: &'static str, message: &str) {
        let bar = self.take_spinner().unwrap_or_else(ProgressBar::new_spinner);
        let style = ProgressStyle::with_template(template)
            .unwrap_or_else(|_| ProgressStyle::default_spinner());
        bar.set_style(style);
        bar.set_prefix(glyph);
        bar.finish_with_message(message.to_string());
    }
}

fn prompt_error(e: dialoguer::Error) -> Error {
    Error::Prompt(e.to_string())
}

impl Console for TerminalConsole {
    fn announce_start(&self, message: &str) {
        let bar = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.green} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner());
        bar.set_style(style);
        bar.set_message(message.to_string());
        bar.enable_steady_tick(Duration::from_millis(80));

        let previous = self
            .spinner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(bar);
        if let Some(previous) = previous {
            previous.finish_and_clear();
        }
    }

    fn announce_success(&self, message: &str) {
        self.finish("{prefix:.green} {msg}", "✔", message);
    }

    fn announce_failure(&self, message: &str) {
        self.finish("{prefix:.red} {msg}", "✖", message);
    }

    fn prompt_text(&self, prompt: &str) -> Result<String> {
        self.pause_spinner();
        Input::<String>::with_theme(&self.theme)
            .with_prompt(prompt)
            .interact_text()
            .map_err(prompt_error)
    }

    fn prompt_secret(&self, prompt: &str) -> Result<String> {
        self.pause_spinner();
        Password::with_theme(&self.theme)
            .with_prompt(prompt)
            .interact()
            .map_err(prompt_error)
    }

    fn prompt_choice(&self, prompt: &str, items: &[String]) -> Result<usize> {
        self.pause_spinner();
        Select::with_theme(&self.theme)
            .with_prompt(prompt)
            .items(items)
            .default(0)
            .interact()
            .map_err(prompt_error)
    }
}
