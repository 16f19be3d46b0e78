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

//! Cascade ECS - archetype Entity Component System with lifecycle hooks
//!
//! Components and flags are entities, so any entity can be used as a key on
//! another. Deleting an entity strips it from every holder, firing the
//! registered hooks along the way.

pub mod archetype;
pub mod builder;
pub mod component;
pub mod config;
pub mod debug;
pub mod entity;
pub mod error;
pub mod hooks;
pub mod prelude;
pub mod query;
pub mod table;
pub mod world;


pub use archetype::*;
pub use builder::*;
pub use component::*;
pub use config::*;
pub use entity::*;
pub use error::*;
pub use hooks::*;
pub use query::*;
pub use table::*;
pub use world::*;
