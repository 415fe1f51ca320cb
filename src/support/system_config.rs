//-
// Copyright (c) 2024, Jason Lingle
//
// This file is part of Mimegraph.
//
// Mimegraph is free software: you can  redistribute it and/or modify it under
// the terms of the GNU General Public  License as published by the Free
// Software Foundation, either version 3 of the License, or (at your option)
// any later version.
//
// Mimegraph is distributed in the hope  that it will be useful, but WITHOUT
// ANY WARRANTY; without even the  implied warranty of MERCHANTABILITY or
// FITNESS FOR A PARTICULAR PURPOSE. See  the GNU General Public License for
// more details.
//
// You should have received a copy of the GNU General Public License along with
// Mimegraph. If not, see <http://www.gnu.org/licenses/>.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// The configuration for a Mimegraph installation.
///
/// This is stored in a file named `mimegraph.toml` under the root directory
/// given on the command line. Every section and every option is optional.
#[derive(Clone, Debug, Deserialize, Serialize, Default)]
pub struct SystemConfig {
    /// Where blobs are kept.
    #[serde(default)]
    pub store: StoreConfig,

    /// Tuning for encoding and decoding.
    #[serde(default)]
    pub codec: CodecConfig,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct StoreConfig {
    /// The directory holding the blob store, relative to the root unless
    /// absolute.
    #[serde(default = "default_store_path")]
    pub path: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        StoreConfig {
            path: default_store_path(),
        }
    }
}

fn default_store_path() -> PathBuf {
    PathBuf::from("blobs")
}

#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct CodecConfig {
    /// If true, the children of a multipart are encoded and decoded on the
    /// rayon thread pool instead of one after another.
    ///
    /// The result is identical either way.
    #[serde(default)]
    pub parallel_subparts: bool,

    /// The deepest nesting of parts (and of legacy chunked bodies) that will
    /// be followed before the tree is considered malformed.
    #[serde(default = "default_max_depth")]
    pub max_depth: u32,
}

impl Default for CodecConfig {
    fn default() -> Self {
        CodecConfig {
            parallel_subparts: false,
            max_depth: default_max_depth(),
        }
    }
}

fn default_max_depth() -> u32 {
    32
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn empty_config_is_all_defaults() {
        let config: SystemConfig = toml::from_str("").unwrap();
        assert_eq!(PathBuf::from("blobs"), config.store.path);
        assert_eq!(CodecConfig::default(), config.codec);
        assert_eq!(32, config.codec.max_depth);
    }

    #[test]
    fn partial_sections() {
        let config: SystemConfig = toml::from_str(
            "[codec]\n\
             parallel_subparts = true\n",
        )
        .unwrap();
        assert!(config.codec.parallel_subparts);
        assert_eq!(32, config.codec.max_depth);

        let config: SystemConfig =
            toml::from_str("[store]\npath = \"/var/lib/mail\"\n").unwrap();
        assert_eq!(PathBuf::from("/var/lib/mail"), config.store.path);
        assert!(!config.codec.parallel_subparts);
    }
}
