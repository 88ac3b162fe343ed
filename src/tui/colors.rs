// Color palette for the viewer chrome
use ratatui::style::Color;

/// Errors and failed copies
pub const ACCENT_PRIMARY: Color = Color::Rgb(235, 111, 146);
/// Successful copies and the progress gauge
pub const ACCENT_SECONDARY: Color = Color::Rgb(156, 207, 216);
/// Titles and key hints
pub const ACCENT_HIGHLIGHT: Color = Color::Rgb(246, 193, 119);
/// Warnings such as skipped images
pub const ACCENT_WARNING: Color = Color::Rgb(234, 154, 151);

pub const TEXT_PRIMARY: Color = Color::Rgb(224, 222, 244);
pub const TEXT_SECONDARY: Color = Color::Rgb(144, 140, 170);

pub const BG_DARK: Color = Color::Rgb(25, 23, 36);
pub const BORDER_COLOR: Color = Color::Rgb(82, 79, 103);
