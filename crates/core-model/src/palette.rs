use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::ModelError;

/// Closed set of category colors. `Gray` is the neutral fallback used for
/// events whose category is missing; it is not offered in [`ColorToken::PALETTE`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorToken {
    Red,
    Orange,
    Amber,
    Green,
    Emerald,
    Teal,
    Cyan,
    #[default]
    Blue,
    Indigo,
    Purple,
    Pink,
    Slate,
    Black,
    Gray,
}

impl ColorToken {
    /// Selectable category colors, in picker order.
    pub const PALETTE: [ColorToken; 13] = [
        ColorToken::Red,
        ColorToken::Orange,
        ColorToken::Amber,
        ColorToken::Green,
        ColorToken::Emerald,
        ColorToken::Teal,
        ColorToken::Cyan,
        ColorToken::Blue,
        ColorToken::Indigo,
        ColorToken::Purple,
        ColorToken::Pink,
        ColorToken::Slate,
        ColorToken::Black,
    ];

    pub const FALLBACK: ColorToken = ColorToken::Gray;

    pub fn as_str(self) -> &'static str {
        match self {
            ColorToken::Red => "red",
            ColorToken::Orange => "orange",
            ColorToken::Amber => "amber",
            ColorToken::Green => "green",
            ColorToken::Emerald => "emerald",
            ColorToken::Teal => "teal",
            ColorToken::Cyan => "cyan",
            ColorToken::Blue => "blue",
            ColorToken::Indigo => "indigo",
            ColorToken::Purple => "purple",
            ColorToken::Pink => "pink",
            ColorToken::Slate => "slate",
            ColorToken::Black => "black",
            ColorToken::Gray => "gray",
        }
    }

    /// Next selectable color, wrapping around. The fallback cycles into the
    /// first palette entry.
    pub fn next(self) -> ColorToken {
        let idx = Self::PALETTE.iter().position(|c| *c == self);
        match idx {
            Some(i) => Self::PALETTE[(i + 1) % Self::PALETTE.len()],
            None => Self::PALETTE[0],
        }
    }
}

impl fmt::Display for ColorToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ColorToken {
    type Err = ModelError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let normalized = raw.trim().to_ascii_lowercase();
        Self::PALETTE
            .into_iter()
            .chain(std::iter::once(Self::FALLBACK))
            .find(|c| c.as_str() == normalized)
            .ok_or_else(|| ModelError::UnknownColor(raw.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_accepts_every_token_case_insensitively() {
        for c in ColorToken::PALETTE {
            assert_eq!(c.as_str().to_uppercase().parse::<ColorToken>().unwrap(), c);
        }
        assert_eq!("gray".parse::<ColorToken>().unwrap(), ColorToken::FALLBACK);
        assert!(matches!(
            "bg-red-500".parse::<ColorToken>(),
            Err(ModelError::UnknownColor(_))
        ));
    }

    #[test]
    fn next_cycles_through_palette_only() {
        assert_eq!(ColorToken::Red.next(), ColorToken::Orange);
        assert_eq!(ColorToken::Black.next(), ColorToken::Red);
        assert_eq!(ColorToken::Gray.next(), ColorToken::Red);
        assert!(!ColorToken::PALETTE.contains(&ColorToken::FALLBACK));
    }
}
