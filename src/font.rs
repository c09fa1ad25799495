use font8x8::{UnicodeFonts, BASIC_FONTS};

use crate::static_assert;

pub const GLYPH_WIDTH: usize = 8;
pub const GLYPH_HEIGHT: usize = 16;

const SOURCE_HEIGHT: usize = 8;
const ROW_REPEAT: usize = GLYPH_HEIGHT / SOURCE_HEIGHT;

const _: () = static_assert(ROW_REPEAT * SOURCE_HEIGHT == GLYPH_HEIGHT);

const FALLBACK: char = '?';

/// One 8x16 monochrome cell. Bit `n` of a row is column `n`, so the least
/// significant bit is the leftmost pixel.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Glyph(pub [u8; GLYPH_HEIGHT]);

impl Glyph {
    pub fn lookup(character: char) -> Self {
        let rows = BASIC_FONTS
            .get(character)
            .or_else(|| BASIC_FONTS.get(FALLBACK))
            .unwrap_or([0; SOURCE_HEIGHT]);
        let mut glyph = [0; GLYPH_HEIGHT];
        for (index, row) in glyph.iter_mut().enumerate() {
            *row = rows[index / ROW_REPEAT];
        }
        Self(glyph)
    }

    pub fn is_set(&self, column: usize, row: usize) -> bool {
        column < GLYPH_WIDTH && row < GLYPH_HEIGHT && self.0[row] & (1 << column) != 0
    }

    /// Offsets of every set pixel, row by row.
    pub fn set_pixels(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        (0..GLYPH_HEIGHT).flat_map(move |row| {
            (0..GLYPH_WIDTH)
                .filter(move |&column| self.is_set(column, row))
                .map(move |column| (column, row))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn space_is_blank() {
        assert_eq!(Glyph::lookup(' ').set_pixels().count(), 0);
    }

    #[test]
    fn rows_are_doubled_from_the_basic_font() {
        let source = BASIC_FONTS.get('A').unwrap();
        let glyph = Glyph::lookup('A');
        for (row, &bits) in source.iter().enumerate() {
            assert_eq!(glyph.0[2 * row], bits);
            assert_eq!(glyph.0[2 * row + 1], bits);
        }
    }

    #[test]
    fn unknown_characters_fall_back_to_question_mark() {
        assert_eq!(Glyph::lookup('\u{2603}'), Glyph::lookup('?'));
    }

    #[test]
    fn least_significant_bit_is_leftmost() {
        let mut rows = [0; GLYPH_HEIGHT];
        rows[3] = 0b0000_0001;
        let glyph = Glyph(rows);
        assert!(glyph.is_set(0, 3));
        assert!(!glyph.is_set(7, 3));
        assert_eq!(glyph.set_pixels().collect::<Vec<_>>(), vec![(0, 3)]);
    }
}
