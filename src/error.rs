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

//! Error types

use thiserror::Error;

use crate::entity::Entity;

/// ECS error type
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EcsError {
    /// Entity was never created or has already been deleted
    #[error("entity {0} is not alive")]
    NotAlive(Entity),

    /// Entity is in the middle of its own deletion cascade
    #[error("entity {0} is being deleted")]
    Deleting(Entity),

    /// Protected key used by an external add/set/remove
    #[error("component {0} is protected")]
    Protected(Entity),

    /// Readonly key used by an external set
    #[error("component {0} is readonly")]
    Readonly(Entity),

    /// Key cannot carry data (flag, or already used without data)
    #[error("entity {0} cannot carry component data")]
    NotAComponent(Entity),

    /// Key already stores values of another type
    #[error("component {key} stores `{expected}`, not `{found}`")]
    TypeMismatch {
        key: Entity,
        expected: &'static str,
        found: &'static str,
    },

    /// Archetype not found
    #[error("archetype not found")]
    ArchetypeNotFound,

    /// Built-in flags are owned by the world
    #[error("built-in flag {0} cannot be deleted")]
    BuiltinFlag(Entity),

    /// Error raised from inside a hook
    #[error("hook failed: {0}")]
    Hook(String),

    /// Several hooks failed while deleting an entity
    #[error("{} hook(s) failed while deleting {entity}", errors.len())]
    CascadeFailed {
        entity: Entity,
        errors: Vec<EcsError>,
    },

    /// The entity was created, but a hook fired by its creation failed
    #[error("entity {entity} was created but a hook failed: {source}")]
    CreatedWithErrors {
        entity: Entity,
        source: Box<EcsError>,
    },

    /// Invalid configuration
    #[error("config error: {0}")]
    Config(String),
}

impl EcsError {
    /// Convenience constructor for hook bodies.
    pub fn hook(message: impl Into<String>) -> Self {
        EcsError::Hook(message.into())
    }

    /// Entity that exists despite this error, if any.
    ///
    /// Set when creation succeeded but one of the hooks it fired did not.
    pub fn created_entity(&self) -> Option<Entity> {
        match self {
            EcsError::CreatedWithErrors { entity, .. } => Some(*entity),
            _ => None,
        }
    }

    /// Folds the errors collected during a cascade into one result.
    pub(crate) fn collect(entity: Entity, mut errors: Vec<EcsError>) -> Result<()> {
        match errors.len() {
            0 => Ok(()),
            1 => Err(errors.remove(0)),
            _ => Err(EcsError::CascadeFailed { entity, errors }),
        }
    }
}

impl From<serde_json::Error> for EcsError {
    fn from(err: serde_json::Error) -> Self {
        EcsError::Config(err.to_string())
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, EcsError>;
