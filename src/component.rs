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

//! Component and Flag keys
//!
//! Components and flags are ordinary entities used as keys on other
//! entities. A [`Component<T>`] stores one `T` per holder in a dense column;
//! a [`Flag`] only records presence.

use std::any::{type_name, Any, TypeId};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;

use crate::entity::{Access, Entity};
use crate::error::Result;
use crate::hooks::{self, HookFn, HookKind};
use crate::world::World;

/// Marker trait for component values
///
/// Values are compared on `set` (equal writes are no-ops) and cloned when
/// handed to hooks.
pub trait ComponentData: 'static + Clone + PartialEq {}

/// Automatically implement ComponentData for all valid types
impl<T: 'static + Clone + PartialEq> ComponentData for T {}

/// Anything that names an entity
pub trait AsEntity {
    fn entity(&self) -> Entity;
}

impl AsEntity for Entity {
    fn entity(&self) -> Entity {
        *self
    }
}

impl<K: AsEntity + ?Sized> AsEntity for &K {
    fn entity(&self) -> Entity {
        (**self).entity()
    }
}

/// Presence-only key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Flag(Entity);

impl Flag {
    /// Use any entity as a flag key.
    pub fn from_entity(entity: Entity) -> Self {
        Flag(entity)
    }
}

impl AsEntity for Flag {
    fn entity(&self) -> Entity {
        self.0
    }
}

impl From<Flag> for Entity {
    fn from(flag: Flag) -> Self {
        flag.0
    }
}

/// Data-bearing key holding a `T` per entity
pub struct Component<T> {
    entity: Entity,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Component<T> {
    /// Use any entity as a typed component key.
    ///
    /// The value type is fixed by the first `set` through this key.
    pub fn from_entity(entity: Entity) -> Self {
        Self {
            entity,
            _marker: PhantomData,
        }
    }
}

impl<T> AsEntity for Component<T> {
    fn entity(&self) -> Entity {
        self.entity
    }
}

impl<T> From<Component<T>> for Entity {
    fn from(component: Component<T>) -> Self {
        component.entity
    }
}

impl<T> Clone for Component<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Component<T> {}

impl<T> PartialEq for Component<T> {
    fn eq(&self, other: &Self) -> bool {
        self.entity == other.entity
    }
}

impl<T> Eq for Component<T> {}

impl<T> Hash for Component<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.entity.hash(state);
    }
}

impl<T> fmt::Debug for Component<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Component")
            .field(&self.entity)
            .field(&type_name::<T>())
            .finish()
    }
}

/// Column factory registered for every data-bearing key
#[derive(Clone, Copy)]
pub struct ColumnInfo {
    pub type_id: TypeId,
    pub type_name: &'static str,
    /// `TypeId` of the `Component<T>` handle for this column
    pub handle_type_id: TypeId,
    factory: fn() -> Box<dyn ComponentColumn>,
    handle: fn(&dyn Any) -> Option<Entity>,
}

impl ColumnInfo {
    pub fn of<T: ComponentData>() -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            type_name: type_name::<T>(),
            handle_type_id: TypeId::of::<Component<T>>(),
            factory: TypedColumn::<T>::boxed,
            handle: |value| value.downcast_ref::<Component<T>>().map(AsEntity::entity),
        }
    }

    pub fn new_column(&self) -> Box<dyn ComponentColumn> {
        (self.factory)()
    }

    /// Entity named by a type-erased `Component<T>` of this column's type
    pub fn handle_entity(&self, value: &dyn Any) -> Option<Entity> {
        (self.handle)(value)
    }
}

impl fmt::Debug for ColumnInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ColumnInfo")
            .field("type_name", &self.type_name)
            .finish()
    }
}

/// Type-erased component column
///
/// Rows are parallel to the owning archetype's member list. `None` is the
/// absent sentinel: the key is present but carries no value.
pub trait ComponentColumn: Any {
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn push_empty(&mut self);

    fn swap_remove(&mut self, row: usize);

    /// Swap-remove `row` and append its value to `dst`
    fn move_row(&mut self, row: usize, dst: &mut dyn ComponentColumn);

    /// Leave `None` behind and return the old value
    fn take(&mut self, row: usize) -> Option<Box<dyn Any>>;

    /// Store a boxed value; false if the type does not match
    fn write(&mut self, row: usize, value: Box<dyn Any>) -> bool;

    fn value(&self, row: usize) -> Option<&dyn Any>;

    fn clone_value(&self, row: usize) -> Option<Box<dyn Any>>;

    fn clone_empty(&self) -> Box<dyn ComponentColumn>;

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// Dense `Vec<Option<T>>` column
pub struct TypedColumn<T> {
    data: Vec<Option<T>>,
}

impl<T: ComponentData> TypedColumn<T> {
    pub fn new() -> Self {
        Self { data: Vec::new() }
    }

    fn boxed() -> Box<dyn ComponentColumn> {
        Box::new(Self::new())
    }

    pub fn as_slice(&self) -> &[Option<T>] {
        &self.data
    }

    pub fn as_mut_slice(&mut self) -> &mut [Option<T>] {
        &mut self.data
    }
}

impl<T: ComponentData> Default for TypedColumn<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: ComponentData> ComponentColumn for TypedColumn<T> {
    fn len(&self) -> usize {
        self.data.len()
    }

    fn push_empty(&mut self) {
        self.data.push(None);
    }

    fn swap_remove(&mut self, row: usize) {
        self.data.swap_remove(row);
    }

    fn move_row(&mut self, row: usize, dst: &mut dyn ComponentColumn) {
        let value = self.data.swap_remove(row);
        match dst.as_any_mut().downcast_mut::<TypedColumn<T>>() {
            Some(dst) => dst.data.push(value),
            None => debug_assert!(false, "BUG: column type changed between archetypes"),
        }
    }

    fn take(&mut self, row: usize) -> Option<Box<dyn Any>> {
        let value = self.data.get_mut(row)?.take()?;
        Some(Box::new(value))
    }

    fn write(&mut self, row: usize, value: Box<dyn Any>) -> bool {
        match (self.data.get_mut(row), value.downcast::<T>()) {
            (Some(slot), Ok(value)) => {
                *slot = Some(*value);
                true
            }
            _ => false,
        }
    }

    fn value(&self, row: usize) -> Option<&dyn Any> {
        self.data.get(row)?.as_ref().map(|value| value as &dyn Any)
    }

    fn clone_value(&self, row: usize) -> Option<Box<dyn Any>> {
        let value = self.data.get(row)?.as_ref()?;
        Some(Box::new(value.clone()))
    }

    fn clone_empty(&self) -> Box<dyn ComponentColumn> {
        Self::boxed()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Static description of a component: name, access and inline hooks.
///
/// Inline hooks are registered when the component is created, so they run
/// before anything added later through `World::on_*`.
pub struct ComponentDescriptor<T> {
    pub(crate) name: Option<String>,
    pub(crate) access: Access,
    pub(crate) hooks: Vec<(HookKind, HookFn)>,
    _marker: PhantomData<fn() -> T>,
}

impl<T: ComponentData> ComponentDescriptor<T> {
    pub fn new() -> Self {
        Self {
            name: None,
            access: Access::Public,
            hooks: Vec::new(),
            _marker: PhantomData,
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Reject external `set`
    pub fn readonly(mut self) -> Self {
        self.access = Access::Readonly;
        self
    }

    /// Reject external `add`, `set` and `remove`
    pub fn protected(mut self) -> Self {
        self.access = Access::Protected;
        self
    }

    pub fn on_add<F>(mut self, f: F) -> Self
    where
        F: Fn(&mut World, Entity, Option<&T>) -> Result<()> + 'static,
    {
        self.hooks.push((HookKind::Add, hooks::current_value_hook::<T, _>(f)));
        self
    }

    pub fn on_change<F>(mut self, f: F) -> Self
    where
        F: Fn(&mut World, Entity, Option<&T>, Option<&T>) -> Result<()> + 'static,
    {
        self.hooks.push((HookKind::Change, hooks::change_hook::<T, _>(f)));
        self
    }

    pub fn on_new_value<F>(mut self, f: F) -> Self
    where
        F: Fn(&mut World, Entity, &T, Option<&T>) -> Result<()> + 'static,
    {
        self.hooks.push((HookKind::Change, hooks::new_value_hook::<T, _>(f)));
        self
    }

    pub fn on_remove<F>(mut self, f: F) -> Self
    where
        F: Fn(&mut World, Entity, Option<&T>) -> Result<()> + 'static,
    {
        self.hooks.push((HookKind::Remove, hooks::previous_value_hook::<T, _>(f)));
        self
    }

    pub fn on_delete<F>(mut self, f: F) -> Self
    where
        F: Fn(&mut World, Entity, Option<&T>) -> Result<()> + 'static,
    {
        self.hooks.push((HookKind::Delete, hooks::previous_value_hook::<T, _>(f)));
        self
    }
}

impl<T: ComponentData> Default for ComponentDescriptor<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Static description of a flag
#[derive(Default)]
pub struct FlagDescriptor {
    pub(crate) name: Option<String>,
    pub(crate) access: Access,
    pub(crate) hooks: Vec<(HookKind, HookFn)>,
}

impl FlagDescriptor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Reject external `add` and `remove`
    pub fn protected(mut self) -> Self {
        self.access = Access::Protected;
        self
    }

    pub fn on_add<F>(mut self, f: F) -> Self
    where
        F: Fn(&mut World, Entity) -> Result<()> + 'static,
    {
        self.hooks.push((HookKind::Add, hooks::flag_hook(f)));
        self
    }

    pub fn on_remove<F>(mut self, f: F) -> Self
    where
        F: Fn(&mut World, Entity) -> Result<()> + 'static,
    {
        self.hooks.push((HookKind::Remove, hooks::flag_hook(f)));
        self
    }

    pub fn on_delete<F>(mut self, f: F) -> Self
    where
        F: Fn(&mut World, Entity) -> Result<()> + 'static,
    {
        self.hooks.push((HookKind::Delete, hooks::flag_hook(f)));
        self
    }
}
