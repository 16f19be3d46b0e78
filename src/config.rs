// Copyright 2024 Saptak Santra
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! World configuration

use serde::{Deserialize, Serialize};

use crate::error::Result;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Remove an archetype as soon as its last member leaves.
    ///
    /// When off, empty archetypes stay around (keeping their transition
    /// edges warm) until [`World::cleanup`](crate::World::cleanup).
    pub auto_delete_empty_archetypes: bool,

    /// Name unnamed entities after their id
    pub entity_name_default: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            auto_delete_empty_archetypes: false,
            entity_name_default: true,
        }
    }
}

impl Config {
    /// Parse from JSON; missing fields keep their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EcsError;

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = Config::from_json(r#"{ "auto_delete_empty_archetypes": true }"#).unwrap();
        assert!(config.auto_delete_empty_archetypes);
        assert!(config.entity_name_default);
    }

    #[test]
    fn test_json_roundtrip() {
        let config = Config {
            auto_delete_empty_archetypes: true,
            entity_name_default: false,
        };
        let json = config.to_json().unwrap();
        assert_eq!(Config::from_json(&json).unwrap(), config);
    }

    #[test]
    fn test_bad_json_is_config_error() {
        assert!(matches!(Config::from_json("{ nope"), Err(EcsError::Config(_))));
    }
}
