//! Output helpers: JSON payloads and a small human-layout builder.

use console::style;
use serde::Serialize;

use crate::error::{Result, SnapError};

pub fn emit_json<T: Serialize>(value: &T) -> Result<()> {
    let payload = serde_json::to_string_pretty(value)
        .map_err(|err| SnapError::Config(format!("serialize output: {err}")))?;
    println!("{payload}");
    Ok(())
}

/// Line-oriented builder for human-readable command output.
pub struct HumanLayout {
    lines: Vec<String>,
    key_width: usize,
}

impl HumanLayout {
    #[must_use]
    pub fn new() -> Self {
        Self {
            lines: Vec::new(),
            key_width: 14,
        }
    }

    pub fn title(&mut self, text: &str) -> &mut Self {
        self.lines.push(style(text).bold().to_string());
        self.lines.push(String::new());
        self
    }

    pub fn section(&mut self, text: &str) -> &mut Self {
        self.lines.push(style(text).bold().to_string());
        self.lines.push("-".repeat(text.len().max(3)));
        self
    }

    pub fn kv(&mut self, key: &str, value: &str) -> &mut Self {
        // Pad before styling; ANSI escapes must not count toward the width.
        let padded = format!("{key:<width$}", width = self.key_width);
        self.lines.push(format!("{} {value}", style(padded).dim()));
        self
    }

    pub fn bullet(&mut self, text: &str) -> &mut Self {
        self.lines.push(format!("- {text}"));
        self
    }

    pub fn blank(&mut self) -> &mut Self {
        self.lines.push(String::new());
        self
    }

    pub fn push_line(&mut self, line: impl Into<String>) -> &mut Self {
        self.lines.push(line.into());
        self
    }

    #[must_use]
    pub fn build(self) -> String {
        self.lines.join("\n")
    }

    pub fn print(self) {
        println!("{}", self.build());
    }
}

impl Default for HumanLayout {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kv_columns_align_when_colors_are_enabled() {
        let was_enabled = console::colors_enabled();
        console::set_colors_enabled(true);

        let mut layout = HumanLayout::new();
        layout.kv("Store", "/tmp/store").kv("Cache records", "3");
        let text = layout.build();

        console::set_colors_enabled(was_enabled);

        let lines: Vec<String> = text
            .lines()
            .map(|line| console::strip_ansi_codes(line).into_owned())
            .collect();
        assert_eq!(lines[0].find("/tmp/store"), Some(15));
        assert_eq!(lines[1].find('3'), Some(15));
    }
}
