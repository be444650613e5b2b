//! Sparse bitmap of initialized ticks
//!
//! Ticks are divided by the spacing ("compressed") and packed 256 per word:
//! the word index is `compressed >> 8` and the bit is `compressed & 0xff`.
//! Only non-zero words are stored, so the nearest initialized tick across
//! empty stretches of the price range is an ordered-map lookup instead of a
//! word-by-word scan.

use amm::bit_math::{least_significant_bit, most_significant_bit};
use std::collections::BTreeMap;
use types::{DexError, DexResult, U256};

#[derive(Debug, Clone, Default)]
pub struct TickBitmap {
    words: BTreeMap<i16, U256>,
}

fn position(compressed: i32) -> (i16, u8) {
    ((compressed >> 8) as i16, (compressed & 0xff) as u8)
}

fn compress(tick: i32, tick_spacing: i32) -> i32 {
    tick.div_euclid(tick_spacing)
}

impl TickBitmap {
    /// Toggle the initialized flag of `tick`
    pub fn flip_tick(&mut self, tick: i32, tick_spacing: i32) -> DexResult<()> {
        if tick % tick_spacing != 0 {
            return Err(DexError::TickMisaligned {
                tick,
                spacing: tick_spacing,
            });
        }
        let (word_pos, bit_pos) = position(tick / tick_spacing);
        let word = self.word(word_pos) ^ (U256::one() << bit_pos as usize);
        if word.is_zero() {
            self.words.remove(&word_pos);
        } else {
            self.words.insert(word_pos, word);
        }
        Ok(())
    }

    pub fn is_initialized(&self, tick: i32, tick_spacing: i32) -> bool {
        if tick % tick_spacing != 0 {
            return false;
        }
        let (word_pos, bit_pos) = position(tick / tick_spacing);
        self.word(word_pos).bit(bit_pos as usize)
    }

    /// Nearest initialized tick within the word of `tick`
    ///
    /// With `lte` the search covers `tick` itself and everything below it in
    /// the same word; otherwise it starts strictly above `tick`. When no bit is
    /// set the word boundary is returned with `false`.
    pub fn next_initialized_tick_within_one_word(
        &self,
        tick: i32,
        tick_spacing: i32,
        lte: bool,
    ) -> DexResult<(i32, bool)> {
        let compressed = compress(tick, tick_spacing);

        if lte {
            let (word_pos, bit_pos) = position(compressed);
            let bit = U256::one() << bit_pos as usize;
            let mask = (bit - U256::one()) + bit;
            let masked = self.word(word_pos) & mask;
            if masked.is_zero() {
                Ok(((compressed - bit_pos as i32) * tick_spacing, false))
            } else {
                let msb = most_significant_bit(masked)?;
                Ok(((compressed - (bit_pos as i32 - msb as i32)) * tick_spacing, true))
            }
        } else {
            let (word_pos, bit_pos) = position(compressed + 1);
            let mask = !((U256::one() << bit_pos as usize) - U256::one());
            let masked = self.word(word_pos) & mask;
            if masked.is_zero() {
                Ok(((compressed + 1 + (255 - bit_pos as i32)) * tick_spacing, false))
            } else {
                let lsb = least_significant_bit(masked)?;
                Ok(((compressed + 1 + (lsb as i32 - bit_pos as i32)) * tick_spacing, true))
            }
        }
    }

    /// Nearest initialized tick in the swap direction, across any number of words
    ///
    /// Same inclusivity as [`TickBitmap::next_initialized_tick_within_one_word`].
    /// `None` means no initialized tick exists on that side.
    pub fn next_initialized_tick(&self, tick: i32, tick_spacing: i32, lte: bool) -> DexResult<Option<i32>> {
        let (next, initialized) = self.next_initialized_tick_within_one_word(tick, tick_spacing, lte)?;
        if initialized {
            return Ok(Some(next));
        }

        let compressed = compress(tick, tick_spacing);
        if lte {
            let (word_pos, _) = position(compressed);
            match self.words.range(..word_pos).next_back() {
                Some((&word_pos, &word)) => {
                    let bit = most_significant_bit(word)?;
                    Ok(Some(((word_pos as i32) * 256 + bit as i32) * tick_spacing))
                }
                None => Ok(None),
            }
        } else {
            let (word_pos, _) = position(compressed + 1);
            let Some(start) = word_pos.checked_add(1) else {
                return Ok(None);
            };
            match self.words.range(start..).next() {
                Some((&word_pos, &word)) => {
                    let bit = least_significant_bit(word)?;
                    Ok(Some(((word_pos as i32) * 256 + bit as i32) * tick_spacing))
                }
                None => Ok(None),
            }
        }
    }

    /// Number of non-empty words
    pub fn word_count(&self) -> usize {
        self.words.len()
    }

    fn word(&self, word_pos: i16) -> U256 {
        self.words.get(&word_pos).copied().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bitmap(ticks: &[i32]) -> TickBitmap {
        let mut bitmap = TickBitmap::default();
        for &tick in ticks {
            bitmap.flip_tick(tick, 1).unwrap();
        }
        bitmap
    }

    // the fixture used by the reference bitmap tests
    const TICKS: [i32; 7] = [-200, -55, -4, 70, 78, 84, 139];

    #[test]
    fn test_flip_tick() {
        let mut bitmap = TickBitmap::default();
        assert!(!bitmap.is_initialized(1, 1));
        bitmap.flip_tick(1, 1).unwrap();
        assert!(bitmap.is_initialized(1, 1));
        bitmap.flip_tick(1, 1).unwrap();
        assert!(!bitmap.is_initialized(1, 1));
        assert_eq!(bitmap.word_count(), 0);

        bitmap.flip_tick(-230, 10).unwrap();
        assert!(bitmap.is_initialized(-230, 10));
        assert!(!bitmap.is_initialized(-231, 10));
        assert_eq!(
            bitmap.flip_tick(5, 10),
            Err(DexError::TickMisaligned { tick: 5, spacing: 10 })
        );
    }

    #[test]
    fn test_search_up_within_word() {
        let bitmap = bitmap(&TICKS);
        assert_eq!(bitmap.next_initialized_tick_within_one_word(78, 1, false).unwrap(), (84, true));
        assert_eq!(bitmap.next_initialized_tick_within_one_word(77, 1, false).unwrap(), (78, true));
        assert_eq!(bitmap.next_initialized_tick_within_one_word(-56, 1, false).unwrap(), (-55, true));
        assert_eq!(bitmap.next_initialized_tick_within_one_word(255, 1, false).unwrap(), (511, false));
        assert_eq!(bitmap.next_initialized_tick_within_one_word(-257, 1, false).unwrap(), (-200, true));
        assert_eq!(bitmap.next_initialized_tick_within_one_word(383, 1, false).unwrap(), (511, false));
    }

    #[test]
    fn test_search_down_within_word() {
        let bitmap = bitmap(&TICKS);
        assert_eq!(bitmap.next_initialized_tick_within_one_word(78, 1, true).unwrap(), (78, true));
        assert_eq!(bitmap.next_initialized_tick_within_one_word(79, 1, true).unwrap(), (78, true));
        assert_eq!(bitmap.next_initialized_tick_within_one_word(258, 1, true).unwrap(), (256, false));
        assert_eq!(bitmap.next_initialized_tick_within_one_word(-55, 1, true).unwrap(), (-55, true));
        assert_eq!(bitmap.next_initialized_tick_within_one_word(-257, 1, true).unwrap(), (-512, false));
        assert_eq!(bitmap.next_initialized_tick_within_one_word(1023, 1, true).unwrap(), (768, false));
    }

    #[test]
    fn test_search_across_words() {
        let bitmap = bitmap(&TICKS);
        assert_eq!(bitmap.next_initialized_tick(255, 1, false).unwrap(), None);
        assert_eq!(bitmap.next_initialized_tick(-1_000, 1, false).unwrap(), Some(-200));
        assert_eq!(bitmap.next_initialized_tick(1_000, 1, true).unwrap(), Some(139));
        assert_eq!(bitmap.next_initialized_tick(-201, 1, true).unwrap(), None);

        let mut sparse = TickBitmap::default();
        sparse.flip_tick(-887_220, 60).unwrap();
        sparse.flip_tick(887_220, 60).unwrap();
        assert_eq!(sparse.next_initialized_tick(0, 60, false).unwrap(), Some(887_220));
        assert_eq!(sparse.next_initialized_tick(0, 60, true).unwrap(), Some(-887_220));
        assert_eq!(sparse.next_initialized_tick(887_220, 60, false).unwrap(), None);
    }

    #[test]
    fn test_negative_ticks_round_toward_negative_infinity() {
        let mut bitmap = TickBitmap::default();
        bitmap.flip_tick(-60, 60).unwrap();
        // -1 compresses to -1, i.e. the same slot as -60
        assert_eq!(bitmap.next_initialized_tick_within_one_word(-1, 60, true).unwrap(), (-60, true));
        assert_eq!(bitmap.next_initialized_tick(-61, 60, false).unwrap(), Some(-60));
    }
}
