//! Colour for the `check` report

use std::{fmt::Display, sync::LazyLock};

use owo_colors::{OwoColorize, Style};

/// Whether stdout can show colour. Checked once per run.
static COLOR: LazyLock<bool> =
    LazyLock::new(|| supports_color::on(supports_color::Stream::Stdout).is_some());

/// How a value in the report should read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    /// Nothing needs attention.
    Clean,
    /// Something needs review.
    Attention,
    /// Background explanation.
    Note,
}

impl Tone {
    /// `Clean` for zero, `Attention` otherwise.
    pub const fn for_count(count: usize) -> Self {
        if count == 0 { Self::Clean } else { Self::Attention }
    }

    fn style(self) -> Style {
        match self {
            Self::Clean => Style::new().green(),
            Self::Attention => Style::new().yellow(),
            Self::Note => Style::new().dimmed(),
        }
    }

    /// Renders `value`, coloured when stdout supports it.
    pub fn paint(self, value: impl Display) -> String {
        if *COLOR {
            value.style(self.style()).to_string()
        } else {
            value.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_pick_their_tone() {
        assert_eq!(Tone::for_count(0), Tone::Clean);
        assert_eq!(Tone::for_count(3), Tone::Attention);
    }

    #[test]
    fn painted_text_keeps_its_content() {
        let painted = Tone::Attention.paint(12);
        assert!(painted.contains("12"));
    }
}
