//! Theme loading: btop-style `theme[key]="value"` and hex → ratatui Color.

use crate::generator::PALETTE_SIZE;
use crate::tile::ColorPair;
use ratatui::style::Color;
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;

/// Share of the shape colour kept in a tile background; the rest is the board background.
const TILE_BG_MIX: f32 = 0.3;

/// One Dark tile palette and UI colours loaded from a theme file.
#[derive(Debug, Clone)]
pub struct Theme {
    /// Tile shape colours: green, yellow, red, blue, magenta, cyan.
    pub shapes: [Color; PALETTE_SIZE],
    /// Board background.
    pub bg: Color,
    /// Lane dividers / border.
    pub div_line: Color,
    /// Text (score, time).
    pub main_fg: Color,
    /// Highlight / titles.
    pub title: Color,
    /// Secondary text (hints, rankings).
    pub inactive_fg: Color,
}

#[derive(Debug, Error)]
pub enum ThemeError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid hex: {0}")]
    InvalidHex(String),
}

impl Default for Theme {
    fn default() -> Self {
        Self::onedark_default()
    }
}

const fn rgb(hex: u32) -> Color {
    Color::Rgb((hex >> 16) as u8, (hex >> 8) as u8, hex as u8)
}

const ONEDARK_SHAPES: [Color; PALETTE_SIZE] = [
    rgb(0x98C379), // green
    rgb(0xE5C07B), // yellow
    rgb(0xE06C75), // red
    rgb(0x61AFEF), // blue
    rgb(0xC678DD), // magenta
    rgb(0x56B6C2), // cyan
];

const HIGH_CONTRAST_SHAPES: [Color; PALETTE_SIZE] = [
    rgb(0x00FF00),
    rgb(0xFFFF00),
    rgb(0xFF0000),
    rgb(0x0088FF),
    rgb(0xFF00FF),
    rgb(0x00FFFF),
];

// Avoids red/green pairs.
const COLORBLIND_SHAPES: [Color; PALETTE_SIZE] = [
    rgb(0x0077BB),
    rgb(0xEE7733),
    rgb(0x009988),
    rgb(0xCC3311),
    rgb(0xEE3377),
    rgb(0xBBBB00),
];

impl Theme {
    pub fn onedark_default() -> Self {
        Self {
            shapes: ONEDARK_SHAPES,
            bg: rgb(0x31353F),
            div_line: rgb(0x3F444F),
            main_fg: rgb(0xABB2BF),
            title: rgb(0xE5C07B),
            inactive_fg: rgb(0x5C6370),
        }
    }

    /// Load theme from a btop-style file: `theme[key]="value"` or `theme[key]='value'`.
    /// Falls back to One Dark defaults if path is None or the file is missing.
    pub fn load(path: Option<&Path>, palette: crate::Palette) -> Result<Self, ThemeError> {
        let path = match path {
            Some(p) if p.exists() => p,
            _ => return Ok(Self::default_for_palette(palette)),
        };
        let s = std::fs::read_to_string(path)?;
        let map = parse_theme_file(&s);
        let mut theme = Self::from_map(&map);
        theme.apply_palette(palette);
        Ok(theme)
    }

    fn default_for_palette(palette: crate::Palette) -> Self {
        let mut t = Self::onedark_default();
        t.apply_palette(palette);
        t
    }

    pub fn apply_palette(&mut self, palette: crate::Palette) {
        match palette {
            crate::Palette::Normal => {}
            crate::Palette::HighContrast => self.shapes = HIGH_CONTRAST_SHAPES,
            crate::Palette::Colorblind => self.shapes = COLORBLIND_SHAPES,
        }
    }

    fn from_map(map: &HashMap<String, String>) -> Self {
        let get = |key: &str| {
            map.get(key)
                .and_then(|v| parse_hex(v.trim_matches('"').trim_matches('\'').trim()).ok())
        };
        let d = Self::onedark_default();
        Self {
            shapes: [
                get("mem_box").or_else(|| get("cpu_start")).unwrap_or(d.shapes[0]),
                get("title").or_else(|| get("cpu_mid")).unwrap_or(d.shapes[1]),
                get("cpu_end").or_else(|| get("temp_end")).unwrap_or(d.shapes[2]),
                get("cpu_box").unwrap_or(d.shapes[3]),
                get("net_box").unwrap_or(d.shapes[4]),
                get("hi_fg").or_else(|| get("proc_misc")).unwrap_or(d.shapes[5]),
            ],
            bg: get("meter_bg").unwrap_or(d.bg),
            div_line: get("div_line").unwrap_or(d.div_line),
            main_fg: get("main_fg").unwrap_or(d.main_fg),
            title: get("title").unwrap_or(d.title),
            inactive_fg: get("inactive_fg").unwrap_or(d.inactive_fg),
        }
    }

    /// The six tile colour pairs: each shape colour over a dimmed tint of itself.
    pub fn tile_palette(&self) -> [ColorPair; PALETTE_SIZE] {
        std::array::from_fn(|i| ColorPair {
            shape: self.shapes[i],
            background: mix(self.shapes[i], self.bg, TILE_BG_MIX),
        })
    }
}

/// `amount` of `fg` over `bg`. Non-RGB colours come back as `bg`.
fn mix(fg: Color, bg: Color, amount: f32) -> Color {
    match (fg, bg) {
        (Color::Rgb(r1, g1, b1), Color::Rgb(r2, g2, b2)) => {
            let blend = |a: u8, b: u8| (a as f32 * amount + b as f32 * (1.0 - amount)).round() as u8;
            Color::Rgb(blend(r1, r2), blend(g1, g2), blend(b1, b2))
        }
        _ => bg,
    }
}

/// Parse btop-style theme file into key -> value map.
fn parse_theme_file(s: &str) -> HashMap<String, String> {
    let mut map = HashMap::new();
    for line in s.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if let Some(stripped) = line.strip_prefix("theme[") {
            if let Some(end) = stripped.find(']') {
                let key = stripped[..end].trim();
                let rest = stripped[end + 1..].trim();
                if let Some(eq) = rest.find('=') {
                    let value = rest[eq + 1..]
                        .trim()
                        .trim_matches('"')
                        .trim_matches('\'')
                        .to_string();
                    if !value.is_empty() {
                        map.insert(key.to_string(), value);
                    }
                }
            }
        }
    }
    map
}

/// Parse hex colour "#RRGGBB" or "#RGB" into ratatui Color.
pub fn parse_hex(s: &str) -> Result<Color, ThemeError> {
    let s = s.trim().trim_start_matches('#');
    let invalid = || ThemeError::InvalidHex(s.to_string());
    let channel = |range: std::ops::Range<usize>| {
        s.get(range)
            .and_then(|h| u8::from_str_radix(h, 16).ok())
            .ok_or_else(invalid)
    };
    let (r, g, b) = match s.len() {
        6 => (channel(0..2)?, channel(2..4)?, channel(4..6)?),
        3 => (channel(0..1)? * 17, channel(1..2)? * 17, channel(2..3)? * 17),
        _ => return Err(invalid()),
    };
    Ok(Color::Rgb(r, g, b))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hex_6() {
        let c = parse_hex("#98C379").unwrap();
        assert!(matches!(c, Color::Rgb(0x98, 0xC3, 0x79)));
    }

    #[test]
    fn test_parse_hex_3() {
        let c = parse_hex("#FFF").unwrap();
        assert!(matches!(c, Color::Rgb(255, 255, 255)));
    }

    #[test]
    fn test_parse_hex_rejects_garbage() {
        assert!(parse_hex("#12345").is_err());
        assert!(parse_hex("#GGHHII").is_err());
    }

    #[test]
    fn test_parse_theme_line() {
        let map = parse_theme_file(r##"theme[meter_bg]="#31353F""##);
        assert_eq!(map.get("meter_bg"), Some(&"#31353F".to_string()));
    }

    #[test]
    fn theme_file_overrides_shape_colours() {
        let map = parse_theme_file("theme[cpu_box]=\"#010203\"\ntheme[main_fg]='#FFF'");
        let t = Theme::from_map(&map);
        assert_eq!(t.shapes[3], Color::Rgb(1, 2, 3));
        assert_eq!(t.main_fg, Color::Rgb(255, 255, 255));
        assert_eq!(t.shapes[0], ONEDARK_SHAPES[0]);
    }

    #[test]
    fn tile_palette_has_distinct_shape_colours() {
        for palette in [
            crate::Palette::Normal,
            crate::Palette::HighContrast,
            crate::Palette::Colorblind,
        ] {
            let pairs = Theme::default_for_palette(palette).tile_palette();
            for (i, a) in pairs.iter().enumerate() {
                for b in &pairs[i + 1..] {
                    assert_ne!(a.shape, b.shape);
                }
            }
        }
    }

    #[test]
    fn tile_background_sits_between_shape_and_board() {
        let t = Theme::onedark_default();
        let bg = t.tile_palette()[0].background;
        assert_ne!(bg, t.shapes[0]);
        assert_ne!(bg, t.bg);
    }
}
