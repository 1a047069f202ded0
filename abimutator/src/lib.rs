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

//! ABI type model, call data encoding and mutation heuristics for fuzzing smart contracts.
//!
//! The fuzzer mutates a flat buffer of 32-byte words. [`AbiModel::absorb_mutated_buffer`] maps
//! such a buffer onto the parameters of every function of the target interface and the
//! `encode_*` functions turn the resulting [`TestCase`] into valid call data.

/// version string
pub const VERSION: &str = env!("CARGO_PKG_VERSION", "0-dev");

extern crate anyhow;
extern crate ethabi;
extern crate ethereum_types;
extern crate rand;
extern crate rand_pcg;
extern crate serde;
extern crate sha3;

pub use ethereum_types::{H160, U256};

pub mod abi;
pub mod config;
mod encoder;
mod error;
pub mod heuristics;
mod layout;
mod types;
mod utils;

pub mod test_helpers;

pub use abi::{AbiModel, FunctionSignature};
pub use config::LayoutConfig;
pub use encoder::*;
pub use error::{AbiError, Result};
pub use heuristics::*;
pub use layout::{slot_count, TestCase};
pub use types::*;
pub use utils::*;

pub const EVM_WORD_SIZE: usize = 32;

/// random number generator used for all randomized decisions
pub type RngI = rand_pcg::Pcg64Mcg;

/// A deterministically seeded [`RngI`]. Every randomized operation takes the generator
/// explicitly, so a fixed seed makes a whole run reproducible.
pub fn new_rng(seed: u64) -> RngI {
    rand::SeedableRng::seed_from_u64(seed)
}
