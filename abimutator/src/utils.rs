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

use sha3::Digest;
use std::convert::TryInto;

use crate::abi::AbiModel;
use crate::U256;
use crate::EVM_WORD_SIZE;

/// Big endian 256 bit word holding `n`; used for length, count and offset words.
#[inline]
pub fn u256_word(n: usize) -> [u8; EVM_WORD_SIZE] {
    let mut word = [0u8; EVM_WORD_SIZE];
    U256::from(n as u64).to_big_endian(&mut word);
    word
}

/// Compute keccak256 over `name(type1,type2,...)` and copy the leading bytes into `result`.
fn fill_signature<S: AsRef<str>>(name: &str, types: &[S], result: &mut [u8]) {
    let types = types
        .iter()
        .map(|t| t.as_ref())
        .collect::<Vec<&str>>()
        .join(",");

    let data: Vec<u8> = From::from(format!("{}({})", name, types).as_str());

    result.copy_from_slice(&sha3::Keccak256::digest(&data)[..result.len()])
}

/// The 4-byte function selector for `name` with the given canonical parameter type names.
pub fn selector<S: AsRef<str>>(name: &str, types: &[S]) -> [u8; 4] {
    let mut result = [0u8; 4];
    fill_signature(name, types, &mut result);
    result
}

/// Same as [`selector`] but returned as `u32` for easier comparison.
pub fn short_signature<S: AsRef<str>>(name: &str, types: &[S]) -> u32 {
    u32::from_be_bytes(selector(name, types))
}

/// if possible extract first four bytes as u32
#[inline]
pub fn sig_from_input(input: &[u8]) -> Option<u32> {
    input
        .get(0..4)
        .and_then(|s| s.try_into().ok())
        .map(u32::from_be_bytes)
}

#[inline]
pub fn splitted_hex_string<const AFTER: usize>(input_bytes: &[u8]) -> String {
    let mut s = String::with_capacity(input_bytes.len() * 2 + 2 + input_bytes.len() / AFTER);
    for chunk in input_bytes.chunks(AFTER) {
        s.push_str(&hex::encode(chunk));
        s.push(' ');
    }

    s
}

pub fn format_tokens(tokens: &[ethabi::Token], sep: &str) -> String {
    let mut resstr = String::new();
    for token in tokens {
        use ethabi::Token::*;
        let tstring = match token {
            FixedBytes(b) => {
                format!("bytes{}(0x{})", b.len(), token)
            }
            Bytes(b) => {
                format!("bytes[{}](0x{})", b.len(), token)
            }
            String(s) => {
                format!("string[{}]({:?})", s.len(), s)
            }
            FixedArray(v) => {
                let s = format_tokens(v, sep);
                format!("array{}({})", v.len(), s)
            }
            Array(v) => {
                let s = format_tokens(v, sep);
                format!("array[{}]({})", v.len(), s)
            }
            Tuple(v) => {
                let s = format_tokens(v, sep);
                format!("tuple{}({})", v.len(), s)
            }
            _ => {
                let mut s = format!("{:?}", token);
                s.make_ascii_lowercase();
                s
            }
        };
        resstr.push_str(&tstring);
        resstr.push_str(sep);
    }
    resstr
}

/// Render call data for humans: the function it dispatches to and the arguments decoded with
/// ethabi. Arguments that do not decode (or use types ethabi does not know) are dumped as hex
/// words instead.
pub fn format_call_data(input: &[u8], model: Option<&AbiModel>) -> String {
    let sig = match sig_from_input(input) {
        Some(sig) => sig,
        None => return format!("  input: {}\n", splitted_hex_string::<32>(input)),
    };
    let args = &input[4..];
    let hex_input = splitted_hex_string::<32>(args);

    let func = match model.and_then(|m| m.function_for_selector(sig)) {
        Some(f) => f,
        None => return format!("  sig: {:#x} (unknown)\n  input: {}\n", sig, hex_input),
    };

    let decoded = func
        .param_types()
        .ok()
        .and_then(|types| ethabi::decode(&types, args).ok());
    let token_string = match decoded {
        Some(tokens) => format!("{{ {} }}", format_tokens(&tokens, ", ")),
        None => format!("{} [failed to decode]", hex_input),
    };
    format!(
        "  func: {} ({:#x})\n  input: {}\n",
        func.signature(),
        sig,
        token_string
    )
}
