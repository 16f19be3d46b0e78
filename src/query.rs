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

//! Query system with archetype filtering
//!
//! A [`Query`] matches whole archetypes: every key of its data must be in the
//! signature, no `without` key may be, and the optional custom predicate must
//! accept it. Iteration then walks the matched columns densely.
//!
//! [`Query::for_each`] may add, remove or delete on the entity it is visiting.
//! Touching any other entity from the body is not supported.

use std::fmt;
use std::rc::Rc;

use smallvec::SmallVec;
#[cfg(feature = "profiling")]
use tracing::info_span;

use crate::archetype::{Archetype, ArchetypeId, Signature};
use crate::component::{AsEntity, Component, ComponentData, Flag};
use crate::entity::Entity;
use crate::error::Result;
use crate::world::World;

const MAX_QUERY_KEYS: usize = 8;

/// What a query requires and what it yields per entity
pub trait QueryData {
    /// Borrowed per-entity item
    type Item<'w>;
    /// Cloned per-entity item, used when the world is handed out mutably
    type Owned;
    /// Per-archetype column views
    type Fetch<'w>;

    /// Keys an archetype must contain
    fn keys(&self) -> SmallVec<[Entity; MAX_QUERY_KEYS]>;

    fn prepare<'w>(&self, archetype: &'w Archetype) -> Self::Fetch<'w>;

    fn fetch<'w>(fetch: &Self::Fetch<'w>, row: usize) -> Self::Item<'w>;

    fn fetch_owned(&self, archetype: &Archetype, row: usize) -> Self::Owned;
}

impl<T: ComponentData> QueryData for Component<T> {
    type Item<'w> = Option<&'w T>;
    type Owned = Option<T>;
    type Fetch<'w> = Option<&'w [Option<T>]>;

    fn keys(&self) -> SmallVec<[Entity; MAX_QUERY_KEYS]> {
        SmallVec::from_elem(self.entity(), 1)
    }

    fn prepare<'w>(&self, archetype: &'w Archetype) -> Self::Fetch<'w> {
        archetype.column::<T>(self.entity())
    }

    fn fetch<'w>(fetch: &Self::Fetch<'w>, row: usize) -> Self::Item<'w> {
        (*fetch).and_then(|column| column.get(row)?.as_ref())
    }

    fn fetch_owned(&self, archetype: &Archetype, row: usize) -> Self::Owned {
        archetype
            .column::<T>(self.entity())
            .and_then(|column| column.get(row).cloned().flatten())
    }
}

/// Presence-only requirement
macro_rules! impl_key_only {
    ($ty:ty) => {
        impl QueryData for $ty {
            type Item<'w> = ();
            type Owned = ();
            type Fetch<'w> = ();

            fn keys(&self) -> SmallVec<[Entity; MAX_QUERY_KEYS]> {
                SmallVec::from_elem(self.entity(), 1)
            }

            fn prepare<'w>(&self, _archetype: &'w Archetype) -> Self::Fetch<'w> {}

            fn fetch<'w>(_fetch: &Self::Fetch<'w>, _row: usize) -> Self::Item<'w> {}

            fn fetch_owned(&self, _archetype: &Archetype, _row: usize) -> Self::Owned {}
        }
    };
}

impl_key_only!(Flag);
impl_key_only!(Entity);

/// No data; filter-only queries
impl QueryData for () {
    type Item<'w> = ();
    type Owned = ();
    type Fetch<'w> = ();

    fn keys(&self) -> SmallVec<[Entity; MAX_QUERY_KEYS]> {
        SmallVec::new()
    }

    fn prepare<'w>(&self, _archetype: &'w Archetype) -> Self::Fetch<'w> {}

    fn fetch<'w>(_fetch: &Self::Fetch<'w>, _row: usize) -> Self::Item<'w> {}

    fn fetch_owned(&self, _archetype: &Archetype, _row: usize) -> Self::Owned {}
}

macro_rules! impl_query_data {
    ($($T:ident),*) => {
        #[allow(non_snake_case)]
        impl<$($T: QueryData),*> QueryData for ($($T,)*) {
            type Item<'w> = ($($T::Item<'w>,)*);
            type Owned = ($($T::Owned,)*);
            type Fetch<'w> = ($($T::Fetch<'w>,)*);

            fn keys(&self) -> SmallVec<[Entity; MAX_QUERY_KEYS]> {
                let ($($T,)*) = self;
                let mut keys = SmallVec::new();
                $(keys.extend($T.keys());)*
                keys
            }

            fn prepare<'w>(&self, archetype: &'w Archetype) -> Self::Fetch<'w> {
                let ($($T,)*) = self;
                ($($T.prepare(archetype),)*)
            }

            fn fetch<'w>(fetch: &Self::Fetch<'w>, row: usize) -> Self::Item<'w> {
                let ($($T,)*) = fetch;
                ($(<$T as QueryData>::fetch($T, row),)*)
            }

            fn fetch_owned(&self, archetype: &Archetype, row: usize) -> Self::Owned {
                let ($($T,)*) = self;
                ($($T.fetch_owned(archetype, row),)*)
            }
        }
    };
}

impl_query_data!(A);
impl_query_data!(A, B);
impl_query_data!(A, B, C);
impl_query_data!(A, B, C, D);
impl_query_data!(A, B, C, D, E);
impl_query_data!(A, B, C, D, E, F);
impl_query_data!(A, B, C, D, E, F, G);
impl_query_data!(A, B, C, D, E, F, G, H);

type Predicate = Rc<dyn Fn(&Signature) -> bool>;

/// Archetype filter plus the data to read from matches
pub struct Query<Q: QueryData = ()> {
    data: Q,
    required: SmallVec<[Entity; MAX_QUERY_KEYS]>,
    excluded: SmallVec<[Entity; MAX_QUERY_KEYS]>,
    custom: Option<Predicate>,
}

impl<Q: QueryData> Query<Q> {
    pub fn new(data: Q) -> Self {
        let mut required = data.keys();
        required.sort_unstable();
        required.dedup();
        Self {
            data,
            required,
            excluded: SmallVec::new(),
            custom: None,
        }
    }

    /// Also require these keys, without reading them
    pub fn with<K: AsEntity>(mut self, keys: impl IntoIterator<Item = K>) -> Self {
        self.required.extend(keys.into_iter().map(|key| key.entity()));
        self.required.sort_unstable();
        self.required.dedup();
        self
    }

    /// Skip archetypes containing any of these keys
    pub fn without<K: AsEntity>(mut self, keys: impl IntoIterator<Item = K>) -> Self {
        self.excluded.extend(keys.into_iter().map(|key| key.entity()));
        self
    }

    /// Extra predicate over the full signature, e.g. "A or B".
    /// A second call replaces the first.
    pub fn custom(mut self, predicate: impl Fn(&Signature) -> bool + 'static) -> Self {
        self.custom = Some(Rc::new(predicate));
        self
    }

    pub fn matches(&self, signature: &Signature) -> bool {
        self.required.iter().all(|&key| signature.contains(key))
            && !self.excluded.iter().any(|&key| signature.contains(key))
            && self.custom.as_ref().map_or(true, |predicate| predicate(signature))
    }

    /// Matching archetypes, found through the required key held by the
    /// fewest archetypes
    fn matching<'w>(&self, world: &'w World) -> Vec<(ArchetypeId, &'w Archetype)> {
        let table = world.table();
        let rarest = self
            .required
            .iter()
            .copied()
            .min_by_key(|&key| table.archetype_count_with(key));

        match rarest {
            Some(key) => table
                .archetypes_with(key)
                .into_iter()
                .filter_map(|id| table.get(id).map(|archetype| (id, archetype)))
                .filter(|(_, archetype)| self.matches(archetype.signature()))
                .collect(),
            None => table
                .iter()
                .filter(|(_, archetype)| self.matches(archetype.signature()))
                .collect(),
        }
    }

    /// Number of matching entities
    pub fn count(&self, world: &World) -> usize {
        self.matching(world)
            .iter()
            .map(|(_, archetype)| archetype.len())
            .sum()
    }

    pub fn iter<'w>(&'w self, world: &'w World) -> QueryIter<'w, Q> {
        QueryIter {
            data: &self.data,
            archetypes: self
                .matching(world)
                .into_iter()
                .map(|(_, archetype)| archetype)
                .collect::<Vec<_>>()
                .into_iter(),
            current: None,
            row: 0,
        }
    }

    pub fn entities(&self, world: &World) -> Vec<Entity> {
        self.iter(world).map(|(entity, _)| entity).collect()
    }

    /// Visit every match with mutable access to the world.
    ///
    /// Member counts are taken up front and each archetype is walked from
    /// its last row down, so the body may move or delete the visited entity
    /// without skipping or repeating anyone. Entities that join a matched
    /// archetype during the walk are not visited.
    ///
    /// Changing other entities is not tracked. In particular, deleting the
    /// visited entity strips it from every holder; a holder that matched
    /// and lands past the snapshot of an archetype not yet walked is
    /// skipped.
    pub fn for_each<F>(&self, world: &mut World, mut f: F) -> Result<()>
    where
        F: FnMut(&mut World, Entity, Q::Owned) -> Result<()>,
    {
        let snapshot: Vec<(ArchetypeId, usize)> = self
            .matching(world)
            .into_iter()
            .map(|(id, archetype)| (id, archetype.len()))
            .collect();

        #[cfg(feature = "profiling")]
        let span = info_span!(
            "query.for_each",
            archetypes = snapshot.len(),
            entities = snapshot.iter().map(|(_, len)| len).sum::<usize>()
        );
        #[cfg(feature = "profiling")]
        let _span_guard = span.enter();

        for (id, len) in snapshot {
            for row in (0..len).rev() {
                // Gone when the body emptied it under auto-delete
                let Some(archetype) = world.table().get(id) else {
                    break;
                };
                let Some(&entity) = archetype.entities().get(row) else {
                    continue;
                };
                let values = self.data.fetch_owned(archetype, row);
                f(world, entity, values)?;
            }
        }
        Ok(())
    }
}

impl<Q: QueryData + fmt::Debug> fmt::Debug for Query<Q> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Query")
            .field("data", &self.data)
            .field("required", &self.required)
            .field("excluded", &self.excluded)
            .field("custom", &self.custom.is_some())
            .finish()
    }
}

/// Borrowing iterator over `(entity, item)`
pub struct QueryIter<'w, Q: QueryData> {
    data: &'w Q,
    archetypes: std::vec::IntoIter<&'w Archetype>,
    current: Option<(&'w Archetype, Q::Fetch<'w>)>,
    row: usize,
}

impl<'w, Q: QueryData> Iterator for QueryIter<'w, Q> {
    type Item = (Entity, Q::Item<'w>);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some((archetype, fetch)) = &self.current {
                if let Some(&entity) = archetype.entities().get(self.row) {
                    let item = Q::fetch(fetch, self.row);
                    self.row += 1;
                    return Some((entity, item));
                }
            }

            let archetype = self.archetypes.next()?;
            self.current = Some((archetype, self.data.prepare(archetype)));
            self.row = 0;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matches_required_and_excluded() {
        let (a, b, c) = (
            Entity::from_raw(10),
            Entity::from_raw(11),
            Entity::from_raw(12),
        );
        let query = Query::new(Flag::from_entity(a)).without([b]);
        assert!(query.matches(&Signature::from_keys([a, c])));
        assert!(!query.matches(&Signature::from_keys([a, b])));
        assert!(!query.matches(&Signature::from_keys([c])));
    }

    #[test]
    fn test_custom_predicate_expresses_or() {
        let (a, b) = (Entity::from_raw(10), Entity::from_raw(11));
        let query = Query::new(()).custom(move |sig| sig.contains(a) || sig.contains(b));
        assert!(query.matches(&Signature::from_keys([b])));
        assert!(!query.matches(&Signature::new()));
    }

    #[test]
    fn test_iter_reads_values() -> Result<()> {
        let mut world = World::new();
        let hp = world.component::<u32>("Hp")?;
        let tag = world.flag("Tag")?;
        let a = world.create_entity("a", |b| {
            b.set(hp, 3).add(tag);
            Ok(())
        })?;
        let b = world.entity("b")?;
        world.add(b, hp)?;

        let query = Query::new((hp, tag));
        let rows: Vec<_> = query.iter(&world).collect();
        assert_eq!(rows, vec![(a, (Some(&3), ()))]);

        let mut values: Vec<_> = Query::new(hp).iter(&world).map(|(_, v)| v.copied()).collect();
        values.sort();
        assert_eq!(values, vec![None, Some(3)]);
        Ok(())
    }

    #[test]
    fn test_filter_only_query_counts_everything() {
        let world = World::new();
        // the two built-in flags
        assert_eq!(Query::new(()).count(&world), 2);
    }
}
