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

//! Lifecycle hooks
//!
//! Handlers are keyed by `(key, kind)` and run in registration order.
//! Every handler gets the world back mutably, so a hook may write to the
//! entity that triggered it (including protected keys) or create and delete
//! other entities.
//!
//! Dispatch order for a single key:
//! - add: `OnAdd(value)` then `OnChange(value, None)` when a value was stored
//! - set on a present key: `OnChange(value, prev)` when the value differs
//! - remove: `OnRemove(prev)`, `OnDelete(prev)` during a whole-entity delete,
//!   then `OnChange(None, prev)` when there was a value

use std::any::Any;
use std::rc::Rc;

use ahash::AHashMap;
use smallvec::SmallVec;

use crate::component::{AsEntity, Component, ComponentData};
use crate::entity::Entity;
use crate::error::{EcsError, Result};
use crate::world::World;

/// Lifecycle event a handler listens to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HookKind {
    Add,
    /// Also carries `on_new_value` handlers, which filter out `None` values
    Change,
    Remove,
    Delete,
}

/// Type-erased payload of a hook call
#[derive(Clone, Copy, Default)]
pub struct HookArgs<'a> {
    pub value: Option<&'a dyn Any>,
    pub prev: Option<&'a dyn Any>,
}

pub(crate) type HookFn = Rc<dyn Fn(&mut World, Entity, HookArgs<'_>) -> Result<()>>;

/// `(key, kind)` → handlers in registration order
#[derive(Default)]
pub struct HookRegistry {
    handlers: AHashMap<(Entity, HookKind), Vec<HookFn>>,
}

impl HookRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn register(&mut self, key: Entity, kind: HookKind, handler: HookFn) {
        self.handlers.entry((key, kind)).or_default().push(handler);
    }

    /// Snapshot of the handlers, so dispatch can hand out `&mut World`
    pub(crate) fn handlers(&self, key: Entity, kind: HookKind) -> SmallVec<[HookFn; 4]> {
        self.handlers
            .get(&(key, kind))
            .map(|list| list.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn has(&self, key: Entity, kind: HookKind) -> bool {
        self.handlers.get(&(key, kind)).is_some_and(|list| !list.is_empty())
    }

    pub fn has_any(&self, key: Entity) -> bool {
        [HookKind::Add, HookKind::Change, HookKind::Remove, HookKind::Delete]
            .into_iter()
            .any(|kind| self.has(key, kind))
    }

    /// Drop every handler registered on `key`
    pub fn clear_key(&mut self, key: Entity) {
        self.handlers.retain(|(k, _), _| *k != key);
    }

    /// Total number of handlers
    pub fn len(&self) -> usize {
        self.handlers.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Pins the closure to the higher-ranked handler signature
fn hook_fn<F>(f: F) -> HookFn
where
    F: Fn(&mut World, Entity, HookArgs<'_>) -> Result<()> + 'static,
{
    Rc::new(f)
}

fn downcast<T: 'static>(value: Option<&dyn Any>) -> Option<&T> {
    value.and_then(|value| value.downcast_ref::<T>())
}

pub(crate) fn current_value_hook<T, F>(f: F) -> HookFn
where
    T: ComponentData,
    F: Fn(&mut World, Entity, Option<&T>) -> Result<()> + 'static,
{
    hook_fn(move |world, entity, args| {
        f(world, entity, downcast::<T>(args.value))
    })
}

pub(crate) fn previous_value_hook<T, F>(f: F) -> HookFn
where
    T: ComponentData,
    F: Fn(&mut World, Entity, Option<&T>) -> Result<()> + 'static,
{
    hook_fn(move |world, entity, args| {
        f(world, entity, downcast::<T>(args.prev))
    })
}

pub(crate) fn change_hook<T, F>(f: F) -> HookFn
where
    T: ComponentData,
    F: Fn(&mut World, Entity, Option<&T>, Option<&T>) -> Result<()> + 'static,
{
    hook_fn(move |world, entity, args| {
        f(world, entity, downcast::<T>(args.value), downcast::<T>(args.prev))
    })
}

pub(crate) fn new_value_hook<T, F>(f: F) -> HookFn
where
    T: ComponentData,
    F: Fn(&mut World, Entity, &T, Option<&T>) -> Result<()> + 'static,
{
    hook_fn(move |world, entity, args| {
        match downcast::<T>(args.value) {
            Some(value) => f(world, entity, value, downcast::<T>(args.prev)),
            None => Ok(()),
        }
    })
}

pub(crate) fn flag_hook<F>(f: F) -> HookFn
where
    F: Fn(&mut World, Entity) -> Result<()> + 'static,
{
    hook_fn(move |world, entity, _| f(world, entity))
}

/// Hook registration
impl World {
    fn hook_key(&self, key: Entity) -> Result<Entity> {
        if self.is_live(key) {
            Ok(key)
        } else {
            Err(EcsError::NotAlive(key))
        }
    }

    fn typed_hook_key<T: ComponentData>(&self, component: Component<T>) -> Result<Entity> {
        let key = self.hook_key(component.entity())?;
        self.table().check_column_type::<T>(key)?;
        Ok(key)
    }

    /// Fires after `component` is added, with the stored value if any
    pub fn on_add<T, F>(&mut self, component: Component<T>, f: F) -> Result<()>
    where
        T: ComponentData,
        F: Fn(&mut World, Entity, Option<&T>) -> Result<()> + 'static,
    {
        let key = self.typed_hook_key(component)?;
        self.hooks_mut().register(key, HookKind::Add, current_value_hook::<T, _>(f));
        Ok(())
    }

    /// Fires with `(value, prev)` whenever the stored value changes
    pub fn on_change<T, F>(&mut self, component: Component<T>, f: F) -> Result<()>
    where
        T: ComponentData,
        F: Fn(&mut World, Entity, Option<&T>, Option<&T>) -> Result<()> + 'static,
    {
        let key = self.typed_hook_key(component)?;
        self.hooks_mut().register(key, HookKind::Change, change_hook::<T, _>(f));
        Ok(())
    }

    /// Like [`on_change`](Self::on_change), skipping changes to `None`
    pub fn on_new_value<T, F>(&mut self, component: Component<T>, f: F) -> Result<()>
    where
        T: ComponentData,
        F: Fn(&mut World, Entity, &T, Option<&T>) -> Result<()> + 'static,
    {
        let key = self.typed_hook_key(component)?;
        self.hooks_mut().register(key, HookKind::Change, new_value_hook::<T, _>(f));
        Ok(())
    }

    /// Fires after `component` is removed, with the value it held
    pub fn on_remove<T, F>(&mut self, component: Component<T>, f: F) -> Result<()>
    where
        T: ComponentData,
        F: Fn(&mut World, Entity, Option<&T>) -> Result<()> + 'static,
    {
        let key = self.typed_hook_key(component)?;
        self.hooks_mut().register(key, HookKind::Remove, previous_value_hook::<T, _>(f));
        Ok(())
    }

    /// Fires when the holder itself is deleted, after `on_remove`
    pub fn on_delete<T, F>(&mut self, component: Component<T>, f: F) -> Result<()>
    where
        T: ComponentData,
        F: Fn(&mut World, Entity, Option<&T>) -> Result<()> + 'static,
    {
        let key = self.typed_hook_key(component)?;
        self.hooks_mut().register(key, HookKind::Delete, previous_value_hook::<T, _>(f));
        Ok(())
    }

    pub fn on_flag_add<F>(&mut self, flag: impl AsEntity, f: F) -> Result<()>
    where
        F: Fn(&mut World, Entity) -> Result<()> + 'static,
    {
        let key = self.hook_key(flag.entity())?;
        self.hooks_mut().register(key, HookKind::Add, flag_hook(f));
        Ok(())
    }

    pub fn on_flag_remove<F>(&mut self, flag: impl AsEntity, f: F) -> Result<()>
    where
        F: Fn(&mut World, Entity) -> Result<()> + 'static,
    {
        let key = self.hook_key(flag.entity())?;
        self.hooks_mut().register(key, HookKind::Remove, flag_hook(f));
        Ok(())
    }

    pub fn on_flag_delete<F>(&mut self, flag: impl AsEntity, f: F) -> Result<()>
    where
        F: Fn(&mut World, Entity) -> Result<()> + 'static,
    {
        let key = self.hook_key(flag.entity())?;
        self.hooks_mut().register(key, HookKind::Delete, flag_hook(f));
        Ok(())
    }
}
