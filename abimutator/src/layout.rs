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

//! Flat fixed-stride view of the fuzzer buffer.
//!
//! The byte level mutators work on a flat buffer in which every leaf value occupies exactly one
//! 32 byte word: parameters follow each other in declaration order, functions in document order,
//! arrays row by row. Unbounded dimensions use the counts from [`LayoutConfig`]. This is not an
//! ABI decoder; the absorbed values are ABI encoded afterwards.

use crate::abi::{AbiModel, FunctionSignature};
use crate::config::LayoutConfig;
use crate::error::{AbiError, Result};
use crate::types::{ArgValue, TypeDescriptor};
use crate::EVM_WORD_SIZE;

/// Values for every parameter of every function of a model, in model order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct TestCase {
    pub args: Vec<Vec<ArgValue>>,
}

/// Number of leaf slots a parameter takes in the flat buffer.
pub fn slot_count(ty: &TypeDescriptor, layout: &LayoutConfig) -> Result<usize> {
    match ty.dimensions.as_slice() {
        [] => Ok(1),
        [size] => Ok(layout.array_len(*size)),
        [outer, inner] => {
            let (rows, cols) = layout.matrix_dims(*outer, *inner);
            rows.checked_mul(cols).ok_or_else(|| AbiError::LayoutOverflow {
                name: ty.raw_name.clone(),
            })
        }
        _ => unreachable!("type descriptors have at most two dimensions"),
    }
}

/// Sequential reader over the flat buffer; every read consumes one word.
struct WordCursor<'a> {
    buffer: &'a [u8],
    offset: usize,
}

impl<'a> WordCursor<'a> {
    fn new(buffer: &'a [u8]) -> Self {
        WordCursor { buffer, offset: 0 }
    }

    fn next_word(&mut self) -> Result<Vec<u8>> {
        let end = self.offset + EVM_WORD_SIZE;
        let word = self
            .buffer
            .get(self.offset..end)
            .ok_or(AbiError::BufferUnderrun {
                offset: self.offset,
                len: self.buffer.len(),
            })?;
        self.offset = end;
        Ok(word.to_vec())
    }

    fn next_words(&mut self, n: usize) -> Result<Vec<Vec<u8>>> {
        (0..n).map(|_| self.next_word()).collect()
    }
}

fn absorb_param(
    ty: &TypeDescriptor,
    cursor: &mut WordCursor,
    layout: &LayoutConfig,
) -> Result<ArgValue> {
    match ty.dimensions.as_slice() {
        [] => ty.attach_scalar(cursor.next_word()?),
        [size] => ty.attach_array(cursor.next_words(layout.array_len(*size))?),
        [outer, inner] => {
            let (rows, cols) = layout.matrix_dims(*outer, *inner);
            let rows = (0..rows)
                .map(|_| cursor.next_words(cols))
                .collect::<Result<Vec<_>>>()?;
            ty.attach_matrix(rows)
        }
        _ => unreachable!("type descriptors have at most two dimensions"),
    }
}

impl FunctionSignature {
    /// Number of leaf slots all parameters of this function take in the flat buffer.
    pub fn slot_count(&self, layout: &LayoutConfig) -> Result<usize> {
        self.params.iter().try_fold(0usize, |total, p| {
            total
                .checked_add(slot_count(p, layout)?)
                .ok_or_else(|| self.overflow())
        })
    }

    fn overflow(&self) -> AbiError {
        AbiError::LayoutOverflow {
            name: self.signature(),
        }
    }
}

impl AbiModel {
    /// Length in bytes of the flat buffer for this model; `LayoutOverflow` if the layout does not
    /// fit into `usize`.
    pub fn testcase_len(&self) -> Result<usize> {
        self.functions().iter().try_fold(0usize, |total, f| {
            f.slot_count(self.layout())?
                .checked_mul(EVM_WORD_SIZE)
                .and_then(|len| total.checked_add(len))
                .ok_or_else(|| f.overflow())
        })
    }

    /// The all-zero seed buffer.
    pub fn default_testcase(&self) -> Result<Vec<u8>> {
        Ok(vec![0u8; self.testcase_len()?])
    }

    /// Split a mutated flat buffer into per-parameter values. Trailing bytes beyond
    /// [`AbiModel::testcase_len`] are ignored; a shorter buffer is a `BufferUnderrun`.
    pub fn absorb_mutated_buffer(&self, buffer: &[u8]) -> Result<TestCase> {
        self.testcase_len()?;
        let mut cursor = WordCursor::new(buffer);
        let args = self
            .functions()
            .iter()
            .map(|f| {
                f.params
                    .iter()
                    .map(|p| absorb_param(p, &mut cursor, self.layout()))
                    .collect::<Result<Vec<ArgValue>>>()
            })
            .collect::<Result<Vec<Vec<ArgValue>>>>()?;
        tracing::trace!(
            consumed = cursor.offset,
            len = buffer.len(),
            "absorbed mutated buffer"
        );
        Ok(TestCase { args })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::*;

    fn numbered_buffer(words: usize) -> Vec<u8> {
        let mut buf = vec![0u8; words * EVM_WORD_SIZE];
        for (i, chunk) in buf.chunks_mut(EVM_WORD_SIZE).enumerate() {
            chunk[31] = i as u8;
        }
        buf
    }

    fn last_byte(v: &ArgValue) -> Vec<u8> {
        match v {
            ArgValue::Scalar(c) => vec![c.bytes[31]],
            ArgValue::Array(cells) => cells.iter().map(|c| c.bytes[31]).collect(),
            ArgValue::Matrix(rows) => rows.iter().flatten().map(|c| c.bytes[31]).collect(),
        }
    }

    #[test]
    fn slot_counts() {
        let layout = LayoutConfig::default();
        let count = |t: &str| slot_count(&TypeDescriptor::classify(t), &layout).unwrap();
        assert_eq!(count("uint256"), 1);
        assert_eq!(count("string"), 1);
        assert_eq!(count("uint256[3]"), 3);
        assert_eq!(count("uint256[]"), 5);
        assert_eq!(count("uint256[2][3]"), 6);
        assert_eq!(count("uint256[][3]"), 15);
        assert_eq!(count("uint256[][]"), 25);
    }

    #[test]
    fn default_testcase_length() {
        let model = AbiModel::parse(SHAPES_ABI).unwrap();
        // ctor: uint8 + string[2]; f: uint256[] + bytes[][2]; g: bool[2][2] + address
        assert_eq!(model.testcase_len().unwrap(), (1 + 2 + 5 + 10 + 4 + 1) * 32);
        let tc = model.default_testcase().unwrap();
        assert_eq!(tc.len(), model.testcase_len().unwrap());
        assert!(tc.iter().all(|b| *b == 0));
    }

    #[test]
    fn absorb_walks_words_in_order() {
        let model = AbiModel::parse(SHAPES_ABI).unwrap();
        let buf = numbered_buffer(23);
        let tc = model.absorb_mutated_buffer(&buf).unwrap();
        assert_eq!(tc.args.len(), 3);
        assert_eq!(last_byte(&tc.args[0][0]), vec![0]);
        assert_eq!(last_byte(&tc.args[0][1]), vec![1, 2]);
        assert_eq!(last_byte(&tc.args[1][0]), vec![3, 4, 5, 6, 7]);
        assert_eq!(last_byte(&tc.args[1][1]), (8..18).collect::<Vec<u8>>());
        assert_eq!(last_byte(&tc.args[2][0]), vec![18, 19, 20, 21]);
        assert_eq!(last_byte(&tc.args[2][1]), vec![22]);

        match &tc.args[1][1] {
            ArgValue::Matrix(rows) => {
                assert_eq!(rows.len(), 5);
                assert!(rows.iter().all(|r| r.len() == 2));
                assert!(rows[0][0].is_dynamic && !rows[0][0].pad_left);
            }
            other => panic!("expected matrix, got {:?}", other),
        }
    }

    #[test]
    fn absorb_rejects_short_buffers() {
        let model = AbiModel::parse(SHAPES_ABI).unwrap();
        let mut buf = model.default_testcase().unwrap();
        buf.pop();
        assert_eq!(
            model.absorb_mutated_buffer(&buf),
            Err(AbiError::BufferUnderrun {
                offset: 22 * 32,
                len: 23 * 32 - 1
            })
        );
        assert!(matches!(
            model.absorb_mutated_buffer(&[]),
            Err(AbiError::BufferUnderrun { offset: 0, len: 0 })
        ));
    }

    #[test]
    fn absorb_ignores_trailing_bytes() {
        let model = AbiModel::parse(SET_ABI).unwrap();
        let mut buf = numbered_buffer(1);
        buf.extend_from_slice(&[0xff; 40]);
        let tc = model.absorb_mutated_buffer(&buf).unwrap();
        assert_eq!(tc.args, vec![vec![ArgValue::Scalar(
            model.functions()[0].params[0].cell(vec![0u8; 32])
        )]]);
    }

    #[test]
    fn custom_layout() {
        let layout = LayoutConfig {
            default_array_len: 1,
            default_matrix_dims: (2, 1),
        };
        let model = AbiModel::parse(SHAPES_ABI).unwrap().with_layout(layout);
        assert_eq!(model.testcase_len().unwrap(), (1 + 2 + 1 + 4 + 4 + 1) * 32);
        let tc = model
            .absorb_mutated_buffer(&model.default_testcase().unwrap())
            .unwrap();
        match &tc.args[1][0] {
            ArgValue::Array(cells) => assert_eq!(cells.len(), 1),
            other => panic!("expected array, got {:?}", other),
        }
    }

    #[test]
    fn oversized_layouts_are_rejected() {
        let layout = LayoutConfig::default();
        let huge = TypeDescriptor::classify("uint256[4294967296][4294967296]");
        assert_eq!(
            slot_count(&huge, &layout),
            Err(AbiError::LayoutOverflow {
                name: "uint256[4294967296][4294967296]".to_string()
            })
        );

        let abi = r#"[{"type": "function", "name": "f", "inputs": [{"type": "uint256[4294967296][4294967296]"}]}]"#;
        assert!(matches!(
            AbiModel::parse(abi),
            Err(AbiError::LayoutOverflow { .. })
        ));

        // fits as a slot count, but not once multiplied by the word size
        let wide = LayoutConfig {
            default_array_len: usize::MAX / 2,
            default_matrix_dims: (1, 1),
        };
        let model = AbiModel::parse(SET_ABI).unwrap();
        let model = AbiModel::new(vec![
            FunctionSignature::new("g".to_string(), vec![TypeDescriptor::classify("uint8[]")]),
            model.functions()[0].clone(),
        ])
        .with_layout(wide);
        assert_eq!(
            model.testcase_len(),
            Err(AbiError::LayoutOverflow {
                name: "g(uint8[])".to_string()
            })
        );
        assert!(model.default_testcase().is_err());
        assert!(matches!(
            model.absorb_mutated_buffer(&[0u8; 64]),
            Err(AbiError::LayoutOverflow { .. })
        ));
    }
}
