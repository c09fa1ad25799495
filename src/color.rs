use std::fmt;

use serde::{Deserialize, Serialize};

/// A packed RGB565 color: `rrrr rggg gggb bbbb`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "Components", into = "Components")]
pub struct Color(pub u16);

/// Unpacked color components, as written in configuration files.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Components {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

#[derive(Debug, PartialEq, Eq)]
pub struct ComponentOutOfRange {
    pub name: &'static str,
    pub value: u8,
    pub max: u8,
}

impl Color {
    pub const RED_MAX: u8 = 0x1f;
    pub const GREEN_MAX: u8 = 0x3f;
    pub const BLUE_MAX: u8 = 0x1f;

    pub const BLACK: Color = Color::new(0, 0, 0);
    pub const WHITE: Color = Color::new(Self::RED_MAX, Self::GREEN_MAX, Self::BLUE_MAX);
    pub const RED: Color = Color::new(Self::RED_MAX, 0, 0);
    pub const GREEN: Color = Color::new(0, Self::GREEN_MAX, 0);
    pub const BLUE: Color = Color::new(0, 0, Self::BLUE_MAX);

    /// Packs the components, masking each one to its bit width so an oversized
    /// component cannot spill into its neighbour.
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        let r = (r & Self::RED_MAX) as u16;
        let g = (g & Self::GREEN_MAX) as u16;
        let b = (b & Self::BLUE_MAX) as u16;
        Self((r << 11) | (g << 5) | b)
    }

    pub const fn unpack(self) -> (u8, u8, u8) {
        let r = (self.0 >> 11) as u8 & Self::RED_MAX;
        let g = (self.0 >> 5) as u8 & Self::GREEN_MAX;
        let b = self.0 as u8 & Self::BLUE_MAX;
        (r, g, b)
    }

    /// Expands to `0x00RRGGBB`, replicating the high bits into the low ones so
    /// that full intensity maps to `0xff`.
    pub const fn to_xrgb8888(self) -> u32 {
        let (r, g, b) = self.unpack();
        let r = ((r << 3) | (r >> 2)) as u32;
        let g = ((g << 2) | (g >> 4)) as u32;
        let b = ((b << 3) | (b >> 2)) as u32;
        (r << 16) | (g << 8) | b
    }
}

impl From<Color> for Components {
    fn from(color: Color) -> Self {
        let (r, g, b) = color.unpack();
        Self { r, g, b }
    }
}

impl TryFrom<Components> for Color {
    type Error = ComponentOutOfRange;

    fn try_from(Components { r, g, b }: Components) -> Result<Self, Self::Error> {
        for (name, value, max) in [
            ("r", r, Self::RED_MAX),
            ("g", g, Self::GREEN_MAX),
            ("b", b, Self::BLUE_MAX),
        ] {
            if value > max {
                return Err(ComponentOutOfRange { name, value, max });
            }
        }
        Ok(Self::new(r, g, b))
    }
}

impl fmt::Display for ComponentOutOfRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "color component `{}` is {} but must be at most {}",
            self.name, self.value, self.max
        )
    }
}
