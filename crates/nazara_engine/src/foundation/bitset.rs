//! Dynamic-length bit vector with block-wise boolean algebra
//!
//! Bits are stored in an ordered sequence of fixed-width blocks using a
//! little-endian layout: bit 0 is the least significant bit of block 0.
//!
//! The bitset tracks a logical bit count that does not have to be a multiple of
//! the block width. Every mutating operation clears the bits of the last block
//! that lie beyond the logical size, so block-wise comparisons and population
//! counts never see stale high bits.
//!
//! Bitsets of different lengths compare as if the shorter one was padded with
//! zero blocks: `"0011"` equals `"00000011"`.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::ops::{
    BitAnd, BitAndAssign, BitOr, BitOrAssign, BitXor, BitXorAssign, Not,
};
use std::str::FromStr;

use thiserror::Error;

/// Unsigned integer type usable as bitset storage
pub trait Block:
    Copy
    + Eq
    + Ord
    + Hash
    + fmt::Debug
    + BitAnd<Output = Self>
    + BitOr<Output = Self>
    + BitXor<Output = Self>
    + Not<Output = Self>
    + BitAndAssign
    + BitOrAssign
    + 'static
{
    /// Number of bits held by one block
    const BITS: usize;
    /// Block with every bit cleared
    const ZERO: Self;
    /// Block with every bit set
    const FULL: Self;

    /// Population count
    fn count_bits(self) -> u32;

    /// Index of the lowest set bit (`BITS` for a zero block)
    fn lowest_bit(self) -> u32;

    /// Block with only bit `index` set
    fn single_bit(index: usize) -> Self;

    /// Block with the `bits` lowest bits set
    fn low_mask(bits: usize) -> Self;

    /// Logical right shift
    fn shift_right(self, amount: usize) -> Self;

    /// Widening conversion
    fn to_u64(self) -> u64;
}

macro_rules! impl_block {
    ($($ty:ty),*) => {
        $(
            impl Block for $ty {
                const BITS: usize = <$ty>::BITS as usize;
                const ZERO: Self = 0;
                const FULL: Self = <$ty>::MAX;

                fn count_bits(self) -> u32 {
                    self.count_ones()
                }

                fn lowest_bit(self) -> u32 {
                    self.trailing_zeros()
                }

                fn single_bit(index: usize) -> Self {
                    (1 as $ty) << index
                }

                fn low_mask(bits: usize) -> Self {
                    if bits >= <Self as Block>::BITS {
                        Self::FULL
                    } else {
                        ((1 as $ty) << bits) - 1
                    }
                }

                fn shift_right(self, amount: usize) -> Self {
                    self >> amount
                }

                fn to_u64(self) -> u64 {
                    u64::from(self)
                }
            }
        )*
    };
}

impl_block!(u8, u16, u32, u64);

/// Error returned when parsing a bitset from a string of `0`/`1` characters
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BitsetParseError {
    /// A character other than `0` or `1` was found
    #[error("unexpected character {character:?} at position {position} (expected '0' or '1')")]
    UnexpectedChar {
        /// Offending character
        character: char,
        /// Position of the character in the input
        position: usize,
    },
}

/// Dynamic-length bit vector
#[derive(Clone, Debug)]
pub struct Bitset<B: Block = u64> {
    blocks: Vec<B>,
    bit_count: usize,
}

impl<B: Block> Default for Bitset<B> {
    fn default() -> Self {
        Self::new()
    }
}

impl<B: Block> Bitset<B> {
    /// Create an empty bitset
    pub fn new() -> Self {
        Self {
            blocks: Vec::new(),
            bit_count: 0,
        }
    }

    /// Create a bitset holding `bit_count` bits, all set to `value`
    pub fn with_size(bit_count: usize, value: bool) -> Self {
        let fill = if value { B::FULL } else { B::ZERO };
        let mut bitset = Self {
            blocks: vec![fill; Self::compute_block_count(bit_count)],
            bit_count,
        };
        bitset.reset_extra_bits();
        bitset
    }

    /// Remove every bit, leaving an empty bitset
    pub fn clear(&mut self) {
        self.bit_count = 0;
        self.blocks.clear();
    }

    /// Number of set bits
    pub fn count(&self) -> usize {
        self.blocks.iter().map(|block| block.count_bits() as usize).sum()
    }

    /// Invert every bit
    pub fn flip(&mut self) {
        for block in &mut self.blocks {
            *block = !*block;
        }
        self.reset_extra_bits();
    }

    /// Index of the lowest set bit, `None` when no bit is set
    pub fn find_first(&self) -> Option<usize> {
        self.find_first_from(0)
    }

    /// Index of the lowest set bit strictly above `bit`, `None` when there is none
    ///
    /// # Panics
    /// Panics if `bit` is out of range.
    pub fn find_next(&self, bit: usize) -> Option<usize> {
        assert!(bit < self.bit_count, "bit index {bit} out of range ({})", self.bit_count);

        let bit = bit + 1;
        if bit >= self.bit_count {
            return None;
        }

        let block_index = Self::block_index(bit);
        let block = self.blocks[block_index].shift_right(Self::bit_index(bit));

        if block == B::ZERO {
            self.find_first_from(block_index + 1)
        } else {
            Some(block.lowest_bit() as usize + bit)
        }
    }

    /// Get a storage block
    ///
    /// # Panics
    /// Panics if `index` is out of range.
    pub fn block(&self, index: usize) -> B {
        assert!(index < self.blocks.len(), "block index {index} out of range ({})", self.blocks.len());
        self.blocks[index]
    }

    /// Number of storage blocks
    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    /// Number of bits the bitset can hold without reallocating
    pub fn capacity(&self) -> usize {
        self.blocks.capacity() * B::BITS
    }

    /// Logical number of bits
    pub fn size(&self) -> usize {
        self.bit_count
    }

    /// Is the bitset empty (zero bits long)?
    pub fn is_empty(&self) -> bool {
        self.bit_count == 0
    }

    /// Store `a & b` into this bitset
    pub fn perform_and(&mut self, a: &Self, b: &Self) {
        let shared = a.blocks.len().min(b.blocks.len());
        let mut blocks = vec![B::ZERO; a.blocks.len().max(b.blocks.len())];

        // x & 0 == 0, the blocks past the shorter operand stay cleared
        for (i, block) in blocks.iter_mut().take(shared).enumerate() {
            *block = a.blocks[i] & b.blocks[i];
        }

        self.blocks = blocks;
        self.bit_count = a.bit_count.max(b.bit_count);
        self.reset_extra_bits();
    }

    /// Store `a | b` into this bitset
    pub fn perform_or(&mut self, a: &Self, b: &Self) {
        self.perform_widening(a, b, |x, y| x | y);
    }

    /// Store `a ^ b` into this bitset
    pub fn perform_xor(&mut self, a: &Self, b: &Self) {
        self.perform_widening(a, b, |x, y| x ^ y);
    }

    /// Store `!a` into this bitset
    pub fn perform_not(&mut self, a: &Self) {
        self.blocks = a.blocks.iter().map(|block| !*block).collect();
        self.bit_count = a.bit_count;
        self.reset_extra_bits();
    }

    /// Do both bitsets have at least one set bit in common?
    ///
    /// Only the blocks present in both bitsets are tested.
    pub fn intersects(&self, other: &Self) -> bool {
        self.blocks
            .iter()
            .zip(&other.blocks)
            .any(|(a, b)| (*a & *b) != B::ZERO)
    }

    /// Reserve storage for at least `bit_count` bits
    pub fn reserve(&mut self, bit_count: usize) {
        let wanted = Self::compute_block_count(bit_count);
        self.blocks.reserve(wanted.saturating_sub(self.blocks.len()));
    }

    /// Change the logical size, initialising new bits to `value`
    pub fn resize(&mut self, bit_count: usize, value: bool) {
        let used_in_last = Self::bit_index(self.bit_count);
        if value && bit_count > self.bit_count && used_in_last > 0 {
            // The unused tail of the current last block becomes part of the set
            if let Some(last) = self.blocks.last_mut() {
                *last |= !B::low_mask(used_in_last);
            }
        }

        let fill = if value { B::FULL } else { B::ZERO };
        self.blocks.resize(Self::compute_block_count(bit_count), fill);
        self.bit_count = bit_count;
        self.reset_extra_bits();
    }

    /// Clear every bit
    pub fn reset_all(&mut self) {
        self.set_all(false);
    }

    /// Clear one bit
    ///
    /// # Panics
    /// Panics if `bit` is out of range.
    pub fn reset(&mut self, bit: usize) {
        self.set(bit, false);
    }

    /// Set every bit to `value`
    pub fn set_all(&mut self, value: bool) {
        let fill = if value { B::FULL } else { B::ZERO };
        self.blocks.iter_mut().for_each(|block| *block = fill);
        if value {
            self.reset_extra_bits();
        }
    }

    /// Set one bit to `value`
    ///
    /// # Panics
    /// Panics if `bit` is out of range.
    pub fn set(&mut self, bit: usize, value: bool) {
        assert!(bit < self.bit_count, "bit index {bit} out of range ({})", self.bit_count);

        let mask = B::single_bit(Self::bit_index(bit));
        let block = &mut self.blocks[Self::block_index(bit)];
        if value {
            *block |= mask;
        } else {
            *block &= !mask;
        }
    }

    /// Overwrite a storage block
    ///
    /// # Panics
    /// Panics if `index` is out of range.
    pub fn set_block(&mut self, index: usize, block: B) {
        assert!(index < self.blocks.len(), "block index {index} out of range ({})", self.blocks.len());

        self.blocks[index] = block;
        if index == self.blocks.len() - 1 {
            self.reset_extra_bits();
        }
    }

    /// Read one bit
    ///
    /// # Panics
    /// Panics if `bit` is out of range.
    pub fn test(&self, bit: usize) -> bool {
        assert!(bit < self.bit_count, "bit index {bit} out of range ({})", self.bit_count);

        (self.blocks[Self::block_index(bit)] & B::single_bit(Self::bit_index(bit))) != B::ZERO
    }

    /// Are all bits set? (true for an empty bitset)
    pub fn test_all(&self) -> bool {
        let last_mask = self.last_block_mask();
        let last = self.blocks.len().saturating_sub(1);

        self.blocks.iter().enumerate().all(|(i, block)| {
            let expected = if i == last && last_mask != B::ZERO { last_mask } else { B::FULL };
            *block == expected
        })
    }

    /// Is at least one bit set?
    pub fn test_any(&self) -> bool {
        self.blocks.iter().any(|block| *block != B::ZERO)
    }

    /// Is no bit set?
    pub fn test_none(&self) -> bool {
        !self.test_any()
    }

    /// Pack the bits into an integer
    ///
    /// # Panics
    /// Panics if the bitset holds more than 64 bits.
    pub fn to_integer(&self) -> u64 {
        assert!(self.bit_count <= 64, "bit count {} does not fit in 64 bits", self.bit_count);

        self.blocks
            .iter()
            .enumerate()
            .fold(0u64, |value, (i, block)| value | (block.to_u64() << (i * B::BITS)))
    }

    /// Clear a bit if it is in range, do nothing otherwise
    pub fn unbounded_reset(&mut self, bit: usize) {
        self.unbounded_set(bit, false);
    }

    /// Set a bit, growing the bitset when setting past the end
    ///
    /// Clearing a bit past the end is a no-op and does not grow the bitset.
    pub fn unbounded_set(&mut self, bit: usize, value: bool) {
        if bit < self.bit_count {
            self.set(bit, value);
        } else if value {
            self.resize(bit + 1, false);
            self.set(bit, true);
        }
    }

    /// Read a bit, out-of-range bits read as `false`
    pub fn unbounded_test(&self, bit: usize) -> bool {
        bit < self.bit_count && self.test(bit)
    }

    /// Iterate over the indices of set bits in ascending order
    pub fn iter_ones(&self) -> Ones<'_, B> {
        Ones {
            bitset: self,
            next: self.find_first(),
        }
    }

    fn perform_widening(&mut self, a: &Self, b: &Self, op: impl Fn(B, B) -> B) {
        let (greater, lesser) = if a.blocks.len() > b.blocks.len() { (a, b) } else { (b, a) };

        let mut blocks = Vec::with_capacity(greater.blocks.len());
        for i in 0..greater.blocks.len() {
            // x | 0 == x and x ^ 0 == x
            let block = match lesser.blocks.get(i) {
                Some(other) => op(greater.blocks[i], *other),
                None => greater.blocks[i],
            };
            blocks.push(block);
        }

        self.blocks = blocks;
        self.bit_count = a.bit_count.max(b.bit_count);
        self.reset_extra_bits();
    }

    fn find_first_from(&self, block_index: usize) -> Option<usize> {
        self.blocks
            .iter()
            .enumerate()
            .skip(block_index)
            .find(|(_, block)| **block != B::ZERO)
            .map(|(i, block)| block.lowest_bit() as usize + i * B::BITS)
    }

    fn last_block_mask(&self) -> B {
        B::low_mask(Self::bit_index(self.bit_count))
    }

    fn reset_extra_bits(&mut self) {
        let mask = self.last_block_mask();
        if mask != B::ZERO {
            if let Some(last) = self.blocks.last_mut() {
                *last &= mask;
            }
        }
    }

    /// Number of significant blocks (trailing zero blocks stripped)
    fn significant_len(&self) -> usize {
        self.blocks
            .iter()
            .rposition(|block| *block != B::ZERO)
            .map_or(0, |i| i + 1)
    }

    fn compute_block_count(bit_count: usize) -> usize {
        bit_count.div_ceil(B::BITS)
    }

    fn bit_index(bit: usize) -> usize {
        bit % B::BITS
    }

    fn block_index(bit: usize) -> usize {
        bit / B::BITS
    }
}

/// Iterator over set bit indices, see [`Bitset::iter_ones`]
pub struct Ones<'a, B: Block> {
    bitset: &'a Bitset<B>,
    next: Option<usize>,
}

impl<B: Block> Iterator for Ones<'_, B> {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        let current = self.next?;
        self.next = self.bitset.find_next(current);
        Some(current)
    }
}

impl<B: Block> PartialEq for Bitset<B> {
    fn eq(&self, other: &Self) -> bool {
        let len = self.blocks.len().max(other.blocks.len());
        (0..len).all(|i| {
            self.blocks.get(i).copied().unwrap_or(B::ZERO) == other.blocks.get(i).copied().unwrap_or(B::ZERO)
        })
    }
}

impl<B: Block> Eq for Bitset<B> {}

impl<B: Block> Hash for Bitset<B> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        // Zero high blocks do not take part in equality, so they must not be hashed either
        self.blocks[..self.significant_len()].hash(state);
    }
}

impl<B: Block> PartialOrd for Bitset<B> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<B: Block> Ord for Bitset<B> {
    fn cmp(&self, other: &Self) -> Ordering {
        let len = self.blocks.len().max(other.blocks.len());

        // Most significant block first
        for i in (0..len).rev() {
            let lhs = self.blocks.get(i).copied().unwrap_or(B::ZERO);
            let rhs = other.blocks.get(i).copied().unwrap_or(B::ZERO);
            match lhs.cmp(&rhs) {
                Ordering::Equal => continue,
                ordering => return ordering,
            }
        }

        Ordering::Equal
    }
}

impl<B: Block> fmt::Display for Bitset<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for bit in (0..self.bit_count).rev() {
            f.write_str(if self.test(bit) { "1" } else { "0" })?;
        }
        Ok(())
    }
}

impl<B: Block> FromStr for Bitset<B> {
    type Err = BitsetParseError;

    /// Parse a string of `0`/`1`, most significant bit first
    fn from_str(bits: &str) -> Result<Self, Self::Err> {
        let bit_count = bits.chars().count();
        let mut bitset = Self::with_size(bit_count, false);

        for (position, character) in bits.chars().enumerate() {
            match character {
                '1' => bitset.set(bit_count - position - 1, true),
                '0' => {}
                _ => return Err(BitsetParseError::UnexpectedChar { character, position }),
            }
        }

        Ok(bitset)
    }
}

impl<B: Block> BitAnd for &Bitset<B> {
    type Output = Bitset<B>;

    fn bitand(self, rhs: Self) -> Bitset<B> {
        let mut result = Bitset::new();
        result.perform_and(self, rhs);
        result
    }
}

impl<B: Block> BitOr for &Bitset<B> {
    type Output = Bitset<B>;

    fn bitor(self, rhs: Self) -> Bitset<B> {
        let mut result = Bitset::new();
        result.perform_or(self, rhs);
        result
    }
}

impl<B: Block> BitXor for &Bitset<B> {
    type Output = Bitset<B>;

    fn bitxor(self, rhs: Self) -> Bitset<B> {
        let mut result = Bitset::new();
        result.perform_xor(self, rhs);
        result
    }
}

impl<B: Block> Not for &Bitset<B> {
    type Output = Bitset<B>;

    fn not(self) -> Bitset<B> {
        let mut result = Bitset::new();
        result.perform_not(self);
        result
    }
}

impl<B: Block> BitAndAssign<&Bitset<B>> for Bitset<B> {
    fn bitand_assign(&mut self, rhs: &Bitset<B>) {
        *self = &*self & rhs;
    }
}

impl<B: Block> BitOrAssign<&Bitset<B>> for Bitset<B> {
    fn bitor_assign(&mut self, rhs: &Bitset<B>) {
        *self = &*self | rhs;
    }
}

impl<B: Block> BitXorAssign<&Bitset<B>> for Bitset<B> {
    fn bitxor_assign(&mut self, rhs: &Bitset<B>) {
        *self = &*self ^ rhs;
    }
}
