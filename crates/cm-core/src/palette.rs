//! The fixed shade palette and the intensity bounds shared by every caller.

use serde::Serialize;

pub const MIN_INTENSITY: u8 = 0;
pub const MAX_INTENSITY: u8 = 100;
pub const INTENSITY_STEP: u8 = 5;
pub const DEFAULT_INTENSITY: u8 = 50;

/// A named hair shade offered to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PaletteColor {
    /// Wire name sent verbatim as the payload `color` field.
    pub name: &'static str,
    pub hex: &'static str,
    pub description: &'static str,
}

/// All shades, in display order. The first entry is the default selection.
pub const PALETTE: &[PaletteColor] = &[
    PaletteColor {
        name: "Midnight Espresso",
        hex: "#2C1B2F",
        description: "Deep neutral for dramatic contrast.",
    },
    PaletteColor {
        name: "Copper Bloom",
        hex: "#A15C3E",
        description: "Warm copper with orange highlights.",
    },
    PaletteColor {
        name: "Rosewood Fade",
        hex: "#7E3C3C",
        description: "Raspberry burgundy for rich tones.",
    },
    PaletteColor {
        name: "Saffron Glaze",
        hex: "#D9902D",
        description: "Bright copper that keeps its warmth.",
    },
    PaletteColor {
        name: "Sunlit Amber",
        hex: "#F4B55E",
        description: "Soft metallic honey gold.",
    },
    PaletteColor {
        name: "Forest Veil",
        hex: "#375A40",
        description: "Muted forest green for an edgy balance.",
    },
    PaletteColor {
        name: "Lilac Mist",
        hex: "#A78EBB",
        description: "Powdery lavender for playful looks.",
    },
    PaletteColor {
        name: "Soft Slate",
        hex: "#54616F",
        description: "Cool ash that neutralises warmth.",
    },
    PaletteColor {
        name: "Blush Garnet",
        hex: "#94425E",
        description: "Deep rosy red for bold finishes.",
    },
    PaletteColor {
        name: "Champagne Frost",
        hex: "#BFAF99",
        description: "Pale beige with cool reflections.",
    },
];

/// Default selection for a fresh try-on flow.
pub fn default_color() -> PaletteColor {
    PALETTE[0]
}

/// Exact (case-sensitive) lookup by shade name.
pub fn find_palette_color(name: &str) -> Option<PaletteColor> {
    PALETTE.iter().copied().find(|c| c.name == name)
}
