//! Display colors and the fixed palettes markers and masks draw from.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// 8-bit RGBA color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

/// Helper to parse a single hex digit.
fn hex_val(c: u8) -> Option<u8> {
    match c {
        b'0'..=b'9' => Some(c - b'0'),
        b'a'..=b'f' => Some(c - b'a' + 10),
        b'A'..=b'F' => Some(c - b'A' + 10),
        _ => None,
    }
}

impl Color {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Same color with a different alpha.
    pub const fn with_alpha(self, a: u8) -> Self {
        Self { a, ..self }
    }

    /// Parse a hex color string: `#RGB`, `#RGBA`, `#RRGGBB`, `#RRGGBBAA`.
    /// The leading `#` is optional.
    pub fn from_hex(hex: &str) -> Option<Self> {
        let hex = hex.strip_prefix('#').unwrap_or(hex);
        let bytes = hex.as_bytes();

        let short = |i: usize| hex_val(bytes[i]).map(|v| v * 17);
        let long = |i: usize| Some(hex_val(bytes[i])? << 4 | hex_val(bytes[i + 1])?);

        match bytes.len() {
            3 => Some(Self::rgb(short(0)?, short(1)?, short(2)?)),
            4 => Some(Self::rgba(short(0)?, short(1)?, short(2)?, short(3)?)),
            6 => Some(Self::rgb(long(0)?, long(2)?, long(4)?)),
            8 => Some(Self::rgba(long(0)?, long(2)?, long(4)?, long(6)?)),
            _ => None,
        }
    }

    /// Emit as `#RRGGBB`, or `#RRGGBBAA` when not opaque.
    pub fn to_hex(&self) -> String {
        if self.a == 255 {
            format!("#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
        } else {
            format!("#{:02X}{:02X}{:02X}{:02X}", self.r, self.g, self.b, self.a)
        }
    }
}

impl Serialize for Color {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Color {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Color::from_hex(&s).ok_or_else(|| serde::de::Error::custom(format!("bad color `{s}`")))
    }
}

/// Asset-marker colors, assigned round-robin in this order.
pub const MARKER_PALETTE: [Color; 6] = [
    Color::rgb(0xEF, 0x44, 0x44),
    Color::rgb(0x3B, 0x82, 0xF6),
    Color::rgb(0x10, 0xB9, 0x81),
    Color::rgb(0xF5, 0x9E, 0x0B),
    Color::rgb(0x8B, 0x5C, 0xF6),
    Color::rgb(0xEC, 0x48, 0x99),
];

/// Segmentation-mask colors, indexed by mask position.
pub const MASK_PALETTE: [Color; 6] = [
    Color::rgb(0xFF, 0x63, 0x47),
    Color::rgb(0x1E, 0x90, 0xFF),
    Color::rgb(0x32, 0xCD, 0x32),
    Color::rgb(0xFF, 0xD7, 0x00),
    Color::rgb(0xBA, 0x55, 0xD3),
    Color::rgb(0x00, 0xCE, 0xD1),
];

/// Color for the mask at `index`.
pub fn mask_color(index: usize) -> Color {
    MASK_PALETTE[index % MASK_PALETTE.len()]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_forms() {
        assert_eq!(Color::from_hex("#fff"), Some(Color::rgb(255, 255, 255)));
        assert_eq!(Color::from_hex("0008"), Some(Color::rgba(0, 0, 0, 0x88)));
        assert_eq!(Color::from_hex("#3B82F6"), Some(MARKER_PALETTE[1]));
        assert_eq!(
            Color::from_hex("#3b82f680"),
            Some(MARKER_PALETTE[1].with_alpha(0x80))
        );
        assert_eq!(Color::from_hex("#12"), None);
        assert_eq!(Color::from_hex("#zzz"), None);
    }

    #[test]
    fn hex_roundtrip() {
        for c in MARKER_PALETTE.iter().chain(MASK_PALETTE.iter()) {
            assert_eq!(Color::from_hex(&c.to_hex()), Some(*c));
        }
        let translucent = Color::rgba(1, 2, 3, 4);
        assert_eq!(translucent.to_hex(), "#01020304");
    }

    #[test]
    fn mask_color_wraps() {
        assert_eq!(mask_color(0), mask_color(6));
        assert_ne!(mask_color(0), mask_color(1));
    }
}
