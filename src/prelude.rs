//! Convenient re-exports of commonly used types.
//!
//! The prelude can be imported with:
//! ```
//! use cascade_ecs::prelude::*;
//! ```

pub use crate::builder::EntityBuilder;
pub use crate::component::{AsEntity, Component, ComponentDescriptor, Flag, FlagDescriptor};
pub use crate::config::Config;
pub use crate::debug::WorldInspector;
pub use crate::entity::{Access, Entity, EntityKind};
pub use crate::error::{EcsError, Result};
pub use crate::query::{Query, QueryData};
pub use crate::world::{is_live_entity, World};
