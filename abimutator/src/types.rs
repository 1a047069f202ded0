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

//! ABI type classification and the raw value cells attached to classified types.

use smallvec::SmallVec;

use crate::error::{AbiError, Result};
use crate::EVM_WORD_SIZE;

/// shorthand types and the explicit width they stand for
const FULLNAME_EXPANSIONS: [(&str, &str); 4] = [
    ("int", "int256"),
    ("uint", "uint256"),
    ("fixed", "fixed128x128"),
    ("ufixed", "ufixed128x128"),
];

/// types that are stored in a wider integer word
const STORAGE_EXPANSIONS: [(&str, &str); 2] = [("address", "uint160"), ("bool", "uint8")];

/// declared array dimensions; never more than two entries
pub type Dimensions = SmallVec<[usize; 2]>;

/// Replace the element type of `name` according to `table`, keeping any array suffix as is.
fn expand_element_type(name: &str, table: &[(&str, &str)]) -> String {
    let (element, suffix) = match name.find('[') {
        Some(i) => name.split_at(i),
        None => (name, ""),
    };
    for (short, full) in table.iter() {
        if element == *short {
            return format!("{}{}", full, suffix);
        }
    }
    name.to_string()
}

/// `uint[2]` becomes `uint256[2]`, `fixed` becomes `fixed128x128`; everything else is unchanged.
pub fn to_full_name(name: &str) -> String {
    expand_element_type(name, &FULLNAME_EXPANSIONS)
}

/// Like [`to_full_name`] but additionally maps `address` and `bool` to their storage integer.
pub fn to_storage_name(name: &str) -> String {
    expand_element_type(&to_full_name(name), &STORAGE_EXPANSIONS)
}

/// Parse a single bracket group of digits; empty content is an unbounded (0) dimension.
fn parse_bracket(s: &str) -> Option<(usize, &str)> {
    let s = s.strip_prefix('[')?;
    let end = s.find(']')?;
    let digits = &s[..end];
    if !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let size = if digits.is_empty() {
        0
    } else {
        digits.parse().ok()?
    };
    Some((size, &s[end + 1..]))
}

/// Extract the array dimensions of a type name.
///
/// The two dimensional form `T[a][b]` is tried first, then `T[a]`. The element type must be a
/// lowercase identifier optionally followed by digits (and the `x` of fixed point types). Any name
/// that does not match either form completely is a scalar.
pub fn extract_dimensions(name: &str) -> Dimensions {
    let mut dims = Dimensions::new();
    let open = match name.find('[') {
        Some(i) => i,
        None => return dims,
    };
    let element = &name[..open];
    let well_formed = element
        .bytes()
        .next()
        .map_or(false, |b| b.is_ascii_lowercase())
        && element
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit());
    if !well_formed {
        return dims;
    }

    let rest = &name[open..];
    if let Some((a, rest)) = parse_bracket(rest) {
        if rest.is_empty() {
            dims.push(a);
        } else if let Some((b, rest)) = parse_bracket(rest) {
            if rest.is_empty() {
                dims.push(a);
                dims.push(b);
            }
        }
    }
    dims
}

/// Classification of one ABI parameter type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TypeDescriptor {
    /// type token as written in the interface, e.g. `uint[][3]`
    pub raw_name: String,
    /// shorthand widths expanded; used for selectors
    pub canonical_name: String,
    /// canonical name with `address`/`bool` replaced by their storage integer
    pub storage_name: String,
    /// 0, 1 or 2 entries, 0 meaning unbounded
    pub dimensions: Dimensions,
    /// left zero padding for numbers, right padding for `bytes`/`string`
    pub pad_left: bool,
    /// the element type is variable length (`string` or `bytes`)
    pub is_dynamic: bool,
    /// the outer dimension is unbounded
    pub is_dynamic_array: bool,
    /// the inner dimension is unbounded
    pub is_sub_dynamic_array: bool,
}

impl TypeDescriptor {
    pub fn classify(raw_name: &str) -> TypeDescriptor {
        let canonical_name = to_full_name(raw_name);
        let storage_name = to_storage_name(raw_name);
        let dimensions = extract_dimensions(raw_name);
        let pad_left =
            !(canonical_name.starts_with("bytes") || canonical_name.starts_with("string"));

        let (is_dynamic, is_dynamic_array, is_sub_dynamic_array) = match dimensions.len() {
            0 => (
                canonical_name == "string" || canonical_name == "bytes",
                false,
                false,
            ),
            n => (
                canonical_name.starts_with("string[") || canonical_name.starts_with("bytes["),
                dimensions[0] == 0,
                n == 2 && dimensions[1] == 0,
            ),
        };

        tracing::trace!(
            raw_name,
            canonical = %canonical_name,
            dims = ?dimensions,
            is_dynamic,
            "classified ABI type"
        );

        TypeDescriptor {
            raw_name: raw_name.to_string(),
            canonical_name,
            storage_name,
            dimensions,
            pad_left,
            is_dynamic,
            is_dynamic_array,
            is_sub_dynamic_array,
        }
    }

    /// Whether the encoded parameter lives in the tail of a tuple and is referenced by offset.
    #[inline]
    pub fn needs_offset(&self) -> bool {
        self.is_dynamic || self.is_dynamic_array || self.is_sub_dynamic_array
    }

    #[inline]
    pub fn dimension_count(&self) -> usize {
        self.dimensions.len()
    }

    /// Wrap raw bytes in a cell carrying this type's padding and dynamic flags.
    pub fn cell(&self, bytes: Vec<u8>) -> ValueCell {
        ValueCell::new(bytes, self.pad_left, self.is_dynamic)
    }

    fn check_dimension(&self, actual: usize) -> Result<()> {
        if self.dimension_count() != actual {
            return Err(AbiError::DimensionMismatch {
                type_name: self.raw_name.clone(),
                expected: self.dimension_count(),
                actual,
            });
        }
        Ok(())
    }

    pub fn attach_scalar(&self, value: Vec<u8>) -> Result<ArgValue> {
        self.check_dimension(0)?;
        Ok(ArgValue::Scalar(self.cell(value)))
    }

    pub fn attach_array(&self, values: Vec<Vec<u8>>) -> Result<ArgValue> {
        self.check_dimension(1)?;
        Ok(ArgValue::Array(
            values.into_iter().map(|v| self.cell(v)).collect(),
        ))
    }

    pub fn attach_matrix(&self, rows: Vec<Vec<Vec<u8>>>) -> Result<ArgValue> {
        self.check_dimension(2)?;
        Ok(ArgValue::Matrix(
            rows.into_iter()
                .map(|row| row.into_iter().map(|v| self.cell(v)).collect())
                .collect(),
        ))
    }

    /// Check that `value` has the shape declared by this type and that every cell carries this
    /// type's padding and dynamic flags.
    pub fn check_value(&self, value: &ArgValue) -> Result<()> {
        self.check_dimension(value.dimension_count())?;
        let foreign = match value {
            ArgValue::Scalar(cell) => self.foreign_cell(std::iter::once(cell)),
            ArgValue::Array(cells) => self.foreign_cell(cells.iter()),
            ArgValue::Matrix(rows) => self.foreign_cell(rows.iter().flatten()),
        };
        match foreign {
            Some(cell) => Err(AbiError::CellMismatch {
                type_name: self.raw_name.clone(),
                pad_left: cell.pad_left,
                is_dynamic: cell.is_dynamic,
            }),
            None => Ok(()),
        }
    }

    fn foreign_cell<'a, I>(&self, mut cells: I) -> Option<&'a ValueCell>
    where
        I: Iterator<Item = &'a ValueCell>,
    {
        cells.find(|c| c.pad_left != self.pad_left || c.is_dynamic != self.is_dynamic)
    }

    /// The reference [`ethabi::ParamType`] for the canonical name. Fixed point types are not
    /// supported by ethabi and yield an error.
    pub fn param_type(&self) -> std::result::Result<ethabi::ParamType, ethabi::Error> {
        ethabi::param_type::Reader::read(&self.canonical_name)
    }
}

/// One raw leaf value together with the layout flags of its type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ValueCell {
    pub bytes: Vec<u8>,
    pub pad_left: bool,
    pub is_dynamic: bool,
}

impl ValueCell {
    pub fn new(bytes: Vec<u8>, pad_left: bool, is_dynamic: bool) -> ValueCell {
        ValueCell {
            bytes,
            pad_left,
            is_dynamic,
        }
    }

    /// Length word of a dynamic value: `bytes.len()` as big endian 256 bit integer.
    pub fn header(&self) -> [u8; EVM_WORD_SIZE] {
        crate::u256_word(self.bytes.len())
    }

    /// The value zero padded to a positive multiple of 32 bytes.
    pub fn payload(&self) -> Result<Vec<u8>> {
        let len = self.bytes.len();
        let final_size = if len > EVM_WORD_SIZE {
            if !self.is_dynamic {
                return Err(AbiError::InvalidStaticSize { len });
            }
            (len + EVM_WORD_SIZE - 1) / EVM_WORD_SIZE * EVM_WORD_SIZE
        } else {
            EVM_WORD_SIZE
        };

        let mut ret = Vec::with_capacity(final_size);
        if self.pad_left {
            ret.resize(final_size - len, 0);
            ret.extend_from_slice(&self.bytes);
        } else {
            ret.extend_from_slice(&self.bytes);
            ret.resize(final_size, 0);
        }
        Ok(ret)
    }
}

/// Values attached to one parameter; the variant must match the parameter's dimension count.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ArgValue {
    Scalar(ValueCell),
    Array(Vec<ValueCell>),
    Matrix(Vec<Vec<ValueCell>>),
}

impl ArgValue {
    pub fn dimension_count(&self) -> usize {
        match self {
            ArgValue::Scalar(_) => 0,
            ArgValue::Array(_) => 1,
            ArgValue::Matrix(_) => 2,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shorthand_expansion() {
        assert_eq!(to_full_name("int"), "int256");
        assert_eq!(to_full_name("uint[3]"), "uint256[3]");
        assert_eq!(to_full_name("ufixed[][2]"), "ufixed128x128[][2]");
        assert_eq!(to_full_name("uint8"), "uint8");
        assert_eq!(to_full_name("integer"), "integer");
        assert_eq!(to_storage_name("address[]"), "uint160[]");
        assert_eq!(to_storage_name("bool"), "uint8");
        assert_eq!(to_storage_name("uint"), "uint256");
        assert_eq!(to_storage_name("bytes32"), "bytes32");
    }

    #[test]
    fn dimension_extraction() {
        assert!(extract_dimensions("uint256").is_empty());
        assert_eq!(extract_dimensions("uint256[]").as_slice(), &[0]);
        assert_eq!(extract_dimensions("bytes32[7]").as_slice(), &[7]);
        assert_eq!(extract_dimensions("uint[][3]").as_slice(), &[0, 3]);
        assert_eq!(extract_dimensions("string[2][]").as_slice(), &[2, 0]);
        assert_eq!(extract_dimensions("fixed128x128[4]").as_slice(), &[4]);
        // malformed names are scalars
        assert!(extract_dimensions("uint256[").is_empty());
        assert!(extract_dimensions("uint256]3[").is_empty());
        assert!(extract_dimensions("uint256[3").is_empty());
        assert!(extract_dimensions("uint256[a]").is_empty());
        assert!(extract_dimensions("uint256[1][2][3]").is_empty());
        assert!(extract_dimensions("[3]").is_empty());
        assert!(extract_dimensions("Uint[3]").is_empty());
    }

    #[test]
    fn classify_fixed_uint_array() {
        let td = TypeDescriptor::classify("uint[3]");
        assert_eq!(td.canonical_name, "uint256[3]");
        assert_eq!(td.storage_name, "uint256[3]");
        assert_eq!(td.dimensions.as_slice(), &[3]);
        assert!(!td.is_dynamic);
        assert!(!td.is_dynamic_array);
        assert!(!td.is_sub_dynamic_array);
        assert!(td.pad_left);
    }

    #[test]
    fn classify_string_array() {
        let td = TypeDescriptor::classify("string[]");
        assert!(td.is_dynamic);
        assert!(td.is_dynamic_array);
        assert_eq!(td.dimensions.as_slice(), &[0]);
        assert!(!td.pad_left);
        assert!(td.needs_offset());
    }

    #[test]
    fn classify_scalars() {
        let s = TypeDescriptor::classify("string");
        assert!(s.is_dynamic && !s.pad_left && s.dimensions.is_empty());
        let b = TypeDescriptor::classify("bytes");
        assert!(b.is_dynamic && !b.pad_left);
        let b32 = TypeDescriptor::classify("bytes32");
        assert!(!b32.is_dynamic && !b32.pad_left && !b32.needs_offset());
        let a = TypeDescriptor::classify("address");
        assert_eq!(a.storage_name, "uint160");
        assert!(a.pad_left && !a.needs_offset());
    }

    #[test]
    fn classify_matrix() {
        let td = TypeDescriptor::classify("bool[2][]");
        assert_eq!(td.canonical_name, "bool[2][]");
        assert_eq!(td.storage_name, "uint8[2][]");
        assert!(!td.is_dynamic);
        assert!(!td.is_dynamic_array);
        assert!(td.is_sub_dynamic_array);

        let td = TypeDescriptor::classify("bytes[][]");
        assert!(td.is_dynamic && td.is_dynamic_array && td.is_sub_dynamic_array);
    }

    #[test]
    fn attach_checks_dimension() {
        let td = TypeDescriptor::classify("uint256[2]");
        assert!(td.attach_array(vec![vec![1], vec![2]]).is_ok());
        assert_eq!(
            td.attach_scalar(vec![1]),
            Err(AbiError::DimensionMismatch {
                type_name: "uint256[2]".to_string(),
                expected: 1,
                actual: 0
            })
        );
        assert!(td.attach_matrix(vec![vec![vec![1]]]).is_err());
        assert_eq!(td.dimension_count(), 1);
    }

    #[test]
    fn check_value_rejects_foreign_cells() {
        let uint = TypeDescriptor::classify("uint256");
        let string = TypeDescriptor::classify("string");
        let text = string.attach_scalar(b"hi".to_vec()).unwrap();
        assert!(string.check_value(&text).is_ok());
        assert_eq!(
            uint.check_value(&text),
            Err(AbiError::CellMismatch {
                type_name: "uint256".to_string(),
                pad_left: false,
                is_dynamic: true
            })
        );

        let strings = TypeDescriptor::classify("string[]");
        let mixed = ArgValue::Array(vec![string.cell(b"a".to_vec()), uint.cell(vec![1])]);
        assert!(matches!(
            strings.check_value(&mixed),
            Err(AbiError::CellMismatch { .. })
        ));

        let matrix = TypeDescriptor::classify("bytes32[2][2]");
        let rows = ArgValue::Matrix(vec![vec![matrix.cell(vec![1])], vec![uint.cell(vec![2])]]);
        assert!(matches!(
            matrix.check_value(&rows),
            Err(AbiError::CellMismatch { .. })
        ));
    }

    #[test]
    fn payload_padding() {
        let left = ValueCell::new(vec![0xab, 0xcd], true, false);
        let p = left.payload().unwrap();
        assert_eq!(p.len(), 32);
        assert_eq!(&p[30..], &[0xab, 0xcd]);
        assert!(p[..30].iter().all(|b| *b == 0));

        let right = ValueCell::new(b"hi".to_vec(), false, true);
        let p = right.payload().unwrap();
        assert_eq!(p.len(), 32);
        assert_eq!(&p[..2], b"hi");
        assert!(p[2..].iter().all(|b| *b == 0));

        let empty = ValueCell::new(vec![], false, true);
        assert_eq!(empty.payload().unwrap(), vec![0u8; 32]);
    }

    #[test]
    fn payload_of_long_dynamic_values() {
        let v: Vec<u8> = (1..=33).collect();
        let cell = ValueCell::new(v.clone(), false, true);
        let p = cell.payload().unwrap();
        assert_eq!(p.len(), 64);
        assert_eq!(&p[..33], v.as_slice());

        let cell = ValueCell::new(v.clone(), true, true);
        let p = cell.payload().unwrap();
        assert_eq!(p.len(), 64);
        assert_eq!(&p[31..], v.as_slice());

        let exact = ValueCell::new(vec![7u8; 64], false, true);
        assert_eq!(exact.payload().unwrap().len(), 64);

        let mut h = [0u8; 32];
        h[31] = 33;
        assert_eq!(cell.header(), h);
    }

    #[test]
    fn static_values_must_fit_a_word() {
        let cell = ValueCell::new(vec![1u8; 33], true, false);
        assert_eq!(cell.payload(), Err(AbiError::InvalidStaticSize { len: 33 }));
    }
}
