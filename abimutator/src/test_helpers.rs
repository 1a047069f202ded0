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

//! Interface fixtures shared by the unit tests and the benchmarks.

use std::io::Write;
use tempfile::{NamedTempFile, TempPath};

/// Write `abi` to a temporary file; the file is removed when the returned path is dropped.
pub fn abi_file(abi: &str) -> std::io::Result<TempPath> {
    let mut file = NamedTempFile::new()?;
    writeln!(file, "{}", abi)?;
    Ok(file.into_temp_path())
}

pub const SET_ABI: &str = r#"[{"type": "function", "name": "set", "inputs": [{"name": "x", "type": "uint256"}]}]"#;

pub const TOKEN_ABI: &str = "
[
  {
    \"inputs\": [
      {
        \"internalType\": \"string\",
        \"name\": \"symbol\",
        \"type\": \"string\"
      },
      {
        \"internalType\": \"uint8\",
        \"name\": \"decimals\",
        \"type\": \"uint8\"
      }
    ],
    \"stateMutability\": \"nonpayable\",
    \"type\": \"constructor\"
  },
  {
    \"inputs\": [
      {
        \"internalType\": \"address\",
        \"name\": \"to\",
        \"type\": \"address\"
      },
      {
        \"internalType\": \"uint256\",
        \"name\": \"value\",
        \"type\": \"uint256\"
      }
    ],
    \"name\": \"transfer\",
    \"outputs\": [
      {
        \"internalType\": \"bool\",
        \"name\": \"\",
        \"type\": \"bool\"
      }
    ],
    \"stateMutability\": \"nonpayable\",
    \"type\": \"function\"
  },
  {
    \"inputs\": [
      {
        \"internalType\": \"address\",
        \"name\": \"spender\",
        \"type\": \"address\"
      },
      {
        \"internalType\": \"uint256\",
        \"name\": \"value\",
        \"type\": \"uint256\"
      }
    ],
    \"name\": \"approve\",
    \"outputs\": [
      {
        \"internalType\": \"bool\",
        \"name\": \"\",
        \"type\": \"bool\"
      }
    ],
    \"stateMutability\": \"nonpayable\",
    \"type\": \"function\"
  },
  {
    \"inputs\": [
      {
        \"internalType\": \"address\",
        \"name\": \"owner\",
        \"type\": \"address\"
      }
    ],
    \"name\": \"balanceOf\",
    \"outputs\": [
      {
        \"internalType\": \"uint256\",
        \"name\": \"\",
        \"type\": \"uint256\"
      }
    ],
    \"stateMutability\": \"view\",
    \"type\": \"function\"
  }
]
";

pub const CROWDSALE_ABI: &str = "
[
  {
    \"inputs\": [],
    \"stateMutability\": \"nonpayable\",
    \"type\": \"constructor\"
  },
  {
    \"inputs\": [],
    \"name\": \"echidna_alwaystrue\",
    \"outputs\": [
      {
        \"internalType\": \"bool\",
        \"name\": \"\",
        \"type\": \"bool\"
      }
    ],
    \"stateMutability\": \"nonpayable\",
    \"type\": \"function\"
  },
  {
    \"inputs\": [],
    \"name\": \"invest\",
    \"outputs\": [],
    \"stateMutability\": \"payable\",
    \"type\": \"function\"
  },
  {
    \"inputs\": [],
    \"name\": \"refund\",
    \"outputs\": [],
    \"stateMutability\": \"nonpayable\",
    \"type\": \"function\"
  },
  {
    \"inputs\": [
      {
        \"internalType\": \"address payable\",
        \"name\": \"newOwner\",
        \"type\": \"address\"
      }
    ],
    \"name\": \"setOwner\",
    \"outputs\": [],
    \"stateMutability\": \"nonpayable\",
    \"type\": \"function\"
  },
  {
    \"inputs\": [
      {
        \"internalType\": \"uint256\",
        \"name\": \"newPhase\",
        \"type\": \"uint256\"
      }
    ],
    \"name\": \"setPhase\",
    \"outputs\": [],
    \"stateMutability\": \"nonpayable\",
    \"type\": \"function\"
  },
  {
    \"inputs\": [],
    \"name\": \"withdraw\",
    \"outputs\": [],
    \"stateMutability\": \"nonpayable\",
    \"type\": \"function\"
  },
  {
    \"type\": \"fallback\"
  }
]
";

/// one parameter of every array shape
pub const SHAPES_ABI: &str = r#"
[
  {"type": "constructor", "inputs": [{"name": "a", "type": "uint8"}, {"name": "b", "type": "string[2]"}]},
  {"type": "function", "name": "f", "inputs": [{"name": "xs", "type": "uint256[]"}, {"name": "ys", "type": "bytes[][2]"}]},
  {"type": "function", "name": "g", "inputs": [{"name": "m", "type": "bool[2][2]"}, {"name": "to", "type": "address"}]},
  {"type": "receive", "stateMutability": "payable"}
]
"#;
