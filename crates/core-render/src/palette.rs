//! Terminal colors for palette tokens and grid chrome.

use core_model::ColorToken;
use crossterm::style::Color;

pub const WEEKEND_BG: Color = Color::Rgb {
    r: 38,
    g: 38,
    b: 46,
};
pub const SELECTED_BG: Color = Color::Rgb {
    r: 70,
    g: 90,
    b: 140,
};
pub const LABEL_FG: Color = Color::Rgb {
    r: 148,
    g: 163,
    b: 184,
};

/// 24-bit color for a palette token.
pub fn terminal_color(token: ColorToken) -> Color {
    let (r, g, b) = match token {
        ColorToken::Red => (239, 68, 68),
        ColorToken::Orange => (249, 115, 22),
        ColorToken::Amber => (245, 158, 11),
        ColorToken::Green => (34, 197, 94),
        ColorToken::Emerald => (16, 185, 129),
        ColorToken::Teal => (20, 184, 166),
        ColorToken::Cyan => (6, 182, 212),
        ColorToken::Blue => (59, 130, 246),
        ColorToken::Indigo => (99, 102, 241),
        ColorToken::Purple => (168, 85, 247),
        ColorToken::Pink => (236, 72, 153),
        ColorToken::Slate => (100, 116, 139),
        ColorToken::Black => (0, 0, 0),
        ColorToken::Gray => (156, 163, 175),
    };
    Color::Rgb { r, g, b }
}
