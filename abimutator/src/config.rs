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

//! Layout configuration for the flat fuzzer buffer.
//!
//! Unbounded array dimensions have no length in the type, so the flat buffer layout uses a fixed
//! element count for them. The defaults can be changed through the environment
//! (`AM_DEFAULT_ARRAY_LEN=3`, `AM_DEFAULT_MATRIX_DIMS=2x4`) or a YAML file:
//!
//! ```yaml
//! default_array_len: 3
//! default_matrix_dims: [2, 4]
//! ```

use anyhow::{anyhow, Context};
use serde::{Deserialize, Serialize};

pub const DEFAULT_ARRAY_LEN: usize = 5;
pub const DEFAULT_MATRIX_DIMS: (usize, usize) = (5, 5);

pub const ENV_DEFAULT_ARRAY_LEN: &str = "AM_DEFAULT_ARRAY_LEN";
pub const ENV_DEFAULT_MATRIX_DIMS: &str = "AM_DEFAULT_MATRIX_DIMS";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    /// element count used for `T[]`
    pub default_array_len: usize,
    /// (outer, inner) counts used for unbounded dimensions of `T[a][b]`
    pub default_matrix_dims: (usize, usize),
}

impl Default for LayoutConfig {
    fn default() -> Self {
        LayoutConfig {
            default_array_len: DEFAULT_ARRAY_LEN,
            default_matrix_dims: DEFAULT_MATRIX_DIMS,
        }
    }
}

fn parse_matrix_dims(val: &str) -> anyhow::Result<(usize, usize)> {
    let (outer, inner) = val
        .trim()
        .split_once(&['x', 'X'][..])
        .ok_or_else(|| anyhow!("expected `<outer>x<inner>`, got `{}`", val))?;
    Ok((outer.trim().parse()?, inner.trim().parse()?))
}

impl LayoutConfig {
    /// Number of slots used for a one dimensional array declared with `size`.
    #[inline]
    pub fn array_len(&self, size: usize) -> usize {
        if size == 0 {
            self.default_array_len
        } else {
            size
        }
    }

    /// Number of (rows, columns) used for a two dimensional array declared as `[outer][inner]`.
    #[inline]
    pub fn matrix_dims(&self, outer: usize, inner: usize) -> (usize, usize) {
        let rows = if outer == 0 {
            self.default_matrix_dims.0
        } else {
            outer
        };
        let cols = if inner == 0 {
            self.default_matrix_dims.1
        } else {
            inner
        };
        (rows, cols)
    }

    /// Start from the defaults and apply the `AM_*` environment variables that are set.
    pub fn from_env() -> anyhow::Result<LayoutConfig> {
        let mut config = LayoutConfig::default();
        if let Ok(val) = std::env::var(ENV_DEFAULT_ARRAY_LEN) {
            config.default_array_len = val
                .trim()
                .parse()
                .with_context(|| format!("invalid value for `{}={}`", ENV_DEFAULT_ARRAY_LEN, val))?;
        }
        if let Ok(val) = std::env::var(ENV_DEFAULT_MATRIX_DIMS) {
            config.default_matrix_dims = parse_matrix_dims(&val)
                .with_context(|| format!("invalid value for `{}={}`", ENV_DEFAULT_MATRIX_DIMS, val))?;
        }
        Ok(config)
    }

    pub fn from_yaml_str(s: &str) -> anyhow::Result<LayoutConfig> {
        serde_yaml::from_str(s).context("failed to parse layout configuration")
    }

    pub fn from_yaml_file(path: &std::path::Path) -> anyhow::Result<LayoutConfig> {
        let s = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read layout configuration {}", path.display()))?;
        Self::from_yaml_str(&s)
            .with_context(|| format!("in layout configuration file {}", path.display()))
    }
}
