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

//! Batched entity construction
//!
//! [`World::create_entity`](crate::World::create_entity) hands the init
//! closure an [`EntityBuilder`]. Nothing touches the world until the closure
//! returns; the entity is then placed straight into its final archetype and
//! hooks run only after every queued key is installed.

use std::any::Any;
use std::fmt;

use crate::component::{AsEntity, ColumnInfo, Component, ComponentData};
use crate::entity::Entity;

/// Queued key for a new entity
pub(crate) enum BuildOp {
    Add(Entity),
    Set {
        key: Entity,
        column: ColumnInfo,
        value: Box<dyn Any>,
    },
}

impl BuildOp {
    pub(crate) fn key(&self) -> Entity {
        match self {
            BuildOp::Add(key) => *key,
            BuildOp::Set { key, .. } => *key,
        }
    }
}

impl fmt::Debug for BuildOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BuildOp::Add(key) => f.debug_tuple("Add").field(key).finish(),
            BuildOp::Set { key, column, .. } => f
                .debug_struct("Set")
                .field("key", key)
                .field("type", &column.type_name)
                .finish(),
        }
    }
}

/// Collects the keys of an entity under construction.
///
/// Each key is queued once, at the position of its first mention. A later
/// `set` on an already queued key replaces the value in place.
#[derive(Debug)]
pub struct EntityBuilder {
    entity: Entity,
    ops: Vec<BuildOp>,
}

impl EntityBuilder {
    pub(crate) fn new(entity: Entity) -> Self {
        Self {
            entity,
            ops: Vec::new(),
        }
    }

    /// Id the entity will have once created
    pub fn entity(&self) -> Entity {
        self.entity
    }

    /// Queue a key without a value
    pub fn add(&mut self, key: impl AsEntity) -> &mut Self {
        let key = key.entity();
        if self.position(key).is_none() {
            self.ops.push(BuildOp::Add(key));
        }
        self
    }

    /// Queue a key with its initial value
    pub fn set<T: ComponentData>(&mut self, component: Component<T>, value: T) -> &mut Self {
        let key = component.entity();
        let op = BuildOp::Set {
            key,
            column: ColumnInfo::of::<T>(),
            value: Box::new(value),
        };
        match self.position(key) {
            Some(index) => self.ops[index] = op,
            None => self.ops.push(op),
        }
        self
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    fn position(&self, key: Entity) -> Option<usize> {
        self.ops.iter().position(|op| op.key() == key)
    }

    pub(crate) fn into_ops(self) -> Vec<BuildOp> {
        self.ops
    }
}
