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

//! Head/tail ABI encoding of scalars, arrays and two dimensional arrays.
//!
//! Every parameter is turned into a [`Shape`], which knows how to encode itself and whether the
//! resulting block is inlined into the tuple head or placed in the tail behind an offset word.

use crate::error::Result;
use crate::types::{ArgValue, TypeDescriptor, ValueCell};
use crate::utils::u256_word;
use crate::EVM_WORD_SIZE;

/// An encoded parameter block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Encoded {
    /// block goes to the tail of the enclosing tuple; the head only gets an offset word
    pub in_tail: bool,
    pub bytes: Vec<u8>,
}

impl Encoded {
    /// number of bytes this block occupies in the head of the enclosing tuple
    #[inline]
    pub fn head_size(&self) -> usize {
        if self.in_tail {
            EVM_WORD_SIZE
        } else {
            self.bytes.len()
        }
    }
}

pub trait AbiEncode {
    fn encode(&self) -> Result<Encoded>;
}

/// A parameter value viewed through the layout flags of its declared type.
#[derive(Debug, Clone, Copy)]
pub enum Shape<'a> {
    Scalar {
        cell: &'a ValueCell,
        in_tail: bool,
    },
    Array {
        cells: &'a [ValueCell],
        dynamic_len: bool,
        dynamic_elems: bool,
        in_tail: bool,
    },
    Matrix {
        rows: &'a [Vec<ValueCell>],
        dynamic_outer: bool,
        dynamic_inner: bool,
        dynamic_elems: bool,
        in_tail: bool,
    },
}

impl<'a> Shape<'a> {
    /// Pair a value with its declared type. Fails with `DimensionMismatch` if the value shape
    /// does not match the declared dimensions and with `CellMismatch` if a cell was built for a
    /// different element type. Placement and offsets follow the declared type only.
    pub fn new(ty: &TypeDescriptor, value: &'a ArgValue) -> Result<Shape<'a>> {
        ty.check_value(value)?;
        let in_tail = ty.needs_offset();
        Ok(match value {
            ArgValue::Scalar(cell) => Shape::Scalar { cell, in_tail },
            ArgValue::Array(cells) => Shape::Array {
                cells,
                dynamic_len: ty.is_dynamic_array,
                dynamic_elems: ty.is_dynamic,
                in_tail,
            },
            ArgValue::Matrix(rows) => Shape::Matrix {
                rows,
                dynamic_outer: ty.is_dynamic_array,
                dynamic_inner: ty.is_sub_dynamic_array,
                dynamic_elems: ty.is_dynamic,
                in_tail,
            },
        })
    }
}

impl<'a> AbiEncode for Shape<'a> {
    fn encode(&self) -> Result<Encoded> {
        match *self {
            Shape::Scalar { cell, in_tail } => Ok(Encoded {
                in_tail,
                bytes: encode_single(cell)?,
            }),
            Shape::Array {
                cells,
                dynamic_len,
                dynamic_elems,
                in_tail,
            } => Ok(Encoded {
                in_tail,
                bytes: encode_array(cells, dynamic_len, dynamic_elems)?,
            }),
            Shape::Matrix {
                rows,
                dynamic_outer,
                dynamic_inner,
                dynamic_elems,
                in_tail,
            } => Ok(Encoded {
                in_tail,
                bytes: encode_2d_array(rows, dynamic_outer, dynamic_inner, dynamic_elems)?,
            }),
        }
    }
}

/// Join a count word, one offset word per block and the blocks themselves. Offsets are relative
/// to the first offset word.
fn with_offsets(blocks: Vec<Vec<u8>>) -> Vec<u8> {
    let count = blocks.len();
    let tail_len: usize = blocks.iter().map(Vec::len).sum();
    let mut ret = Vec::with_capacity(EVM_WORD_SIZE * (1 + count) + tail_len);
    ret.extend_from_slice(&u256_word(count));
    let mut offset = EVM_WORD_SIZE * count;
    for block in blocks.iter() {
        ret.extend_from_slice(&u256_word(offset));
        offset += block.len();
    }
    for block in blocks.into_iter() {
        ret.extend(block);
    }
    ret
}

/// Count word followed by the inlined blocks.
fn with_count(blocks: Vec<Vec<u8>>) -> Vec<u8> {
    let mut ret = u256_word(blocks.len()).to_vec();
    for block in blocks.into_iter() {
        ret.extend(block);
    }
    ret
}

/// `header ++ payload` for dynamic values, `payload` otherwise.
pub fn encode_single(cell: &ValueCell) -> Result<Vec<u8>> {
    let payload = cell.payload()?;
    if cell.is_dynamic {
        let mut ret = Vec::with_capacity(EVM_WORD_SIZE + payload.len());
        ret.extend_from_slice(&cell.header());
        ret.extend(payload);
        Ok(ret)
    } else {
        Ok(payload)
    }
}

/// Encode `T[k]` (plain concatenation) or `T[]` (count word, then offsets if `dynamic_elems`,
/// then the elements).
pub fn encode_array(
    cells: &[ValueCell],
    dynamic_len: bool,
    dynamic_elems: bool,
) -> Result<Vec<u8>> {
    let blocks = cells
        .iter()
        .map(encode_single)
        .collect::<Result<Vec<Vec<u8>>>>()?;
    if !dynamic_len {
        return Ok(blocks.concat());
    }
    if dynamic_elems {
        Ok(with_offsets(blocks))
    } else {
        Ok(with_count(blocks))
    }
}

/// Two dimensional variant of [`encode_array`]; every row is encoded with `dynamic_inner` and the
/// rows are joined according to `dynamic_outer`.
pub fn encode_2d_array(
    rows: &[Vec<ValueCell>],
    dynamic_outer: bool,
    dynamic_inner: bool,
    dynamic_elems: bool,
) -> Result<Vec<u8>> {
    let blocks = rows
        .iter()
        .map(|row| encode_array(row, dynamic_inner, dynamic_elems))
        .collect::<Result<Vec<Vec<u8>>>>()?;
    if !dynamic_outer {
        Ok(blocks.concat())
    } else if dynamic_inner {
        Ok(with_offsets(blocks))
    } else {
        Ok(with_count(blocks))
    }
}

/// Encode a parameter tuple: static blocks are inlined into the head, dynamic blocks are appended
/// to the tail and referenced from the head by their offset from the start of the tuple.
pub fn encode_tuple(params: &[(&TypeDescriptor, &ArgValue)]) -> Result<Vec<u8>> {
    let encoded = params
        .iter()
        .map(|(ty, value)| Shape::new(ty, value)?.encode())
        .collect::<Result<Vec<Encoded>>>()?;

    let head_size: usize = encoded.iter().map(Encoded::head_size).sum();
    let tail_size: usize = encoded
        .iter()
        .filter(|e| e.in_tail)
        .map(|e| e.bytes.len())
        .sum();

    let mut head = Vec::with_capacity(head_size + tail_size);
    let mut tail = Vec::with_capacity(tail_size);
    for block in encoded.into_iter() {
        if block.in_tail {
            head.extend_from_slice(&u256_word(head_size + tail.len()));
            tail.extend(block.bytes);
        } else {
            head.extend(block.bytes);
        }
    }
    head.extend(tail);
    Ok(head)
}
