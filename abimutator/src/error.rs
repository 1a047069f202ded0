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

//! Error kinds raised by the ABI model, the encoder and the buffer absorption.

use thiserror::Error;

/// Failure while building the ABI model or turning values into call data.
///
/// All of these are raised at the point of detection; nothing is retried and no partial output
/// is returned.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AbiError {
    /// the interface JSON is malformed or an entry lacks a required field
    #[error("failed to parse contract interface: {0}")]
    InterfaceParse(String),

    /// the attached value shape does not match the declared array dimensions
    #[error("value of dimension {actual} attached to `{type_name}` (declared dimension {expected})")]
    DimensionMismatch {
        type_name: String,
        expected: usize,
        actual: usize,
    },

    /// a value cell carries the padding or dynamic flags of a different element type
    #[error("value cell (pad_left: {pad_left}, dynamic: {is_dynamic}) attached to `{type_name}`")]
    CellMismatch {
        type_name: String,
        pad_left: bool,
        is_dynamic: bool,
    },

    /// a function was given a different number of arguments than it declares
    #[error("{function} takes {expected} arguments but {actual} were supplied")]
    ArgumentCount {
        function: String,
        expected: usize,
        actual: usize,
    },

    /// a static value is longer than one EVM word
    #[error("static value of {len} bytes exceeds the 32 byte word size")]
    InvalidStaticSize { len: usize },

    /// the fuzzer buffer is too short for the flat argument layout
    #[error("buffer underrun: reading 32 bytes at offset {offset} of a {len} byte buffer")]
    BufferUnderrun { offset: usize, len: usize },

    /// the flat buffer layout of a parameter or function does not fit into `usize` bytes
    #[error("flat buffer layout of `{name}` overflows the address space")]
    LayoutOverflow { name: String },
}

impl From<serde_json::Error> for AbiError {
    fn from(e: serde_json::Error) -> Self {
        AbiError::InterfaceParse(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, AbiError>;
