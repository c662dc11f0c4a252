use yansi::{Color, Style};

/// Record type names
pub(crate) fn type_name() -> Style {
    Style::new().fg(Color::Rgb(137, 180, 250)).bold()
}

/// Record field names
pub(crate) fn field_name() -> Style {
    Style::new().fg(Color::Rgb(148, 226, 213))
}

/// Keys of keyed collections
pub(crate) fn key() -> Style {
    Style::new().fg(Color::Rgb(166, 227, 161))
}

/// Scalar values
pub(crate) fn scalar() -> Style {
    Style::new().fg(Color::Rgb(249, 226, 175))
}

/// Braces, brackets and elisions
pub(crate) fn punctuation() -> Style {
    Style::new().dim()
}

/// The invalid sentinel
pub(crate) fn invalid() -> Style {
    Style::new().fg(Color::Rgb(243, 139, 168)).italic()
}
