// Copyright 2021 Michael Rodler
// This file is part of abimutator.
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published
// by the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Deduplication helpers for the deterministic mutation stages and block length selection for
//! havoc, following the classic afl-fuzz heuristics.
//!
//! The `could_be_*` functions answer whether a candidate value (`new`) is already produced by an
//! earlier deterministic stage when applied to `old`, in which case executing it again is wasted
//! time. All values are the little endian integer read of `blen` bytes of the buffer.

use rand::Rng;

/// largest delta tried by the arithmetic stages
pub const ARITH_MAX: u32 = 35;

/// upper bound of the small havoc block tier
pub const HAVOC_BLK_SMALL: u32 = 32;
/// upper bound of the medium havoc block tier
pub const HAVOC_BLK_MEDIUM: u32 = 128;
/// number of havoc block size tiers to choose from
const HAVOC_BLK_TIERS: u32 = 2;

/// log2 of the effector map granularity (one effector entry per 8 buffer bytes)
pub const EFF_MAP_SCALE2: usize = 3;

pub const INTERESTING_8: [i8; 9] = [-128, -1, 0, 1, 16, 32, 64, 100, 127];

pub const INTERESTING_16: [i16; 19] = [
    -128, -1, 0, 1, 16, 32, 64, 100, 127, // INTERESTING_8
    -32768, -129, 128, 255, 256, 512, 1000, 1024, 4096, 32767,
];

pub const INTERESTING_32: [i32; 27] = [
    -128,
    -1,
    0,
    1,
    16,
    32,
    64,
    100,
    127, // INTERESTING_8
    -32768,
    -129,
    128,
    255,
    256,
    512,
    1000,
    1024,
    4096,
    32767, // INTERESTING_16
    -2147483648,
    -100663046,
    -32769,
    32768,
    65535,
    65536,
    100663045,
    2147483647,
];

#[inline]
pub fn swap16(x: u16) -> u16 {
    x.rotate_left(8)
}

#[inline]
pub fn swap32(x: u32) -> u32 {
    (x << 24) | (x >> 24) | ((x << 8) & 0x00FF_0000) | ((x >> 8) & 0x0000_FF00)
}

/// Whether `xor_val = old ^ new` is the result of one of the walking bit flips: 1, 2 or 4
/// consecutive bits anywhere, or 8, 16 or 32 consecutive bits at a byte boundary. Zero is
/// accepted as well, since it means nothing changes.
pub fn could_be_bitflip(xor_val: u32) -> bool {
    if xor_val == 0 {
        return true;
    }
    let sh = xor_val.trailing_zeros();
    let pattern = xor_val >> sh;

    if pattern == 0b1 || pattern == 0b11 || pattern == 0b1111 {
        return true;
    }
    if sh & 7 != 0 {
        return false;
    }
    pattern == 0xff || pattern == 0xffff || pattern == 0xffff_ffff
}

/// `a` and `b` are at most [`ARITH_MAX`] apart modulo the word size given by `mask`
#[inline]
fn within_arith(a: u32, b: u32, mask: u32) -> bool {
    (a.wrapping_sub(b) & mask) <= ARITH_MAX || (b.wrapping_sub(a) & mask) <= ARITH_MAX
}

/// Whether `new` is reachable from `old` by adding or subtracting at most [`ARITH_MAX`] to a
/// single byte, a single 16-bit word (either byte order) or, for `blen == 4`, the whole 32-bit
/// value (either byte order). Only the low `blen` bytes are mutated, so any difference above them
/// is unreachable.
pub fn could_be_arith(old_val: u32, new_val: u32, blen: u8) -> bool {
    debug_assert!(blen <= 4);
    if old_val == new_val {
        return true;
    }
    if blen < 4 {
        let window = (1u32 << (8 * u32::from(blen))) - 1;
        if (old_val ^ new_val) & !window != 0 {
            return false;
        }
    }

    let mut diffs = 0;
    let (mut ov, mut nv) = (0u8, 0u8);
    for i in 0..u32::from(blen) {
        let a = (old_val >> (8 * i)) as u8;
        let b = (new_val >> (8 * i)) as u8;
        if a != b {
            diffs += 1;
            ov = a;
            nv = b;
        }
    }
    if diffs == 1 && within_arith(ov.into(), nv.into(), 0xff) {
        return true;
    }
    if blen == 1 {
        return false;
    }

    let mut diffs = 0;
    let (mut ov, mut nv) = (0u16, 0u16);
    for i in 0..u32::from(blen / 2) {
        let a = (old_val >> (16 * i)) as u16;
        let b = (new_val >> (16 * i)) as u16;
        if a != b {
            diffs += 1;
            ov = a;
            nv = b;
        }
    }
    if diffs == 1
        && (within_arith(ov.into(), nv.into(), 0xffff)
            || within_arith(swap16(ov).into(), swap16(nv).into(), 0xffff))
    {
        return true;
    }

    if blen == 4
        && (within_arith(old_val, new_val, u32::MAX)
            || within_arith(swap32(old_val), swap32(new_val), u32::MAX))
    {
        return true;
    }

    false
}

/// Whether `new` is reachable from `old` by overwriting one byte with an [`INTERESTING_8`]
/// value, or a 16-bit word with an [`INTERESTING_16`] value in either byte order, or the whole
/// value with an [`INTERESTING_32`] value. The 16-bit check runs for `blen == 4` and, with
/// `check_le` set, for `blen == 2`; the 32-bit check requires `check_le`.
pub fn could_be_interest(old_val: u32, new_val: u32, blen: u8, check_le: bool) -> bool {
    debug_assert!(blen <= 4);
    if old_val == new_val {
        return true;
    }

    for i in 0..u32::from(blen) {
        let shift = i * 8;
        for v in INTERESTING_8.iter() {
            let tval = (old_val & !(0xff << shift)) | (u32::from(*v as u8) << shift);
            if new_val == tval {
                return true;
            }
        }
    }

    if blen == 2 && !check_le {
        return false;
    }

    for i in 0..u32::from(blen.saturating_sub(1)) {
        let shift = i * 8;
        for v in INTERESTING_16.iter() {
            let v = *v as u16;
            let cleared = old_val & !(0xffff << shift);
            if new_val == cleared | (u32::from(v) << shift)
                || new_val == cleared | (u32::from(swap16(v)) << shift)
            {
                return true;
            }
        }
    }

    if blen == 4 && check_le {
        return INTERESTING_32.iter().any(|v| new_val == *v as u32);
    }

    false
}

/// Pick a block length in `1..=limit` for havoc block operations (clone, overwrite, delete).
///
/// One of two tiers is chosen uniformly: `1..=HAVOC_BLK_SMALL` or
/// `HAVOC_BLK_SMALL..=HAVOC_BLK_MEDIUM`. A tier whose lower bound does not fit below `limit`
/// falls back to a lower bound of 1; the upper bound is capped at `limit`. A `limit` of 0 is
/// treated as 1.
pub fn choose_block_len<R: Rng + ?Sized>(rng: &mut R, limit: u32) -> u32 {
    let limit = std::cmp::max(limit, 1);
    let (mut min_value, max_value) = match rng.gen_range(0..HAVOC_BLK_TIERS) {
        0 => (1, HAVOC_BLK_SMALL),
        _ => (HAVOC_BLK_SMALL, HAVOC_BLK_MEDIUM),
    };
    if min_value >= limit {
        min_value = 1;
    }
    min_value + rng.gen_range(0..=(std::cmp::min(max_value, limit) - min_value))
}

/// effector map index of buffer position `p`
#[inline]
pub fn eff_a_pos(p: usize) -> usize {
    p >> EFF_MAP_SCALE2
}

#[inline]
pub fn eff_rem(x: usize) -> usize {
    x & ((1 << EFF_MAP_SCALE2) - 1)
}

/// number of effector map entries needed for a buffer of length `l`
#[inline]
pub fn eff_a_len(l: usize) -> usize {
    eff_a_pos(l) + usize::from(eff_rem(l) != 0)
}
