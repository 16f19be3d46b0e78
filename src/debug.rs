use tracing::info;

use crate::entity::{Access, Entity, EntityKind};
use crate::world::World;

/// World inspector for debugging
pub struct WorldInspector;

impl WorldInspector {
    /// Get total entity count
    pub fn entity_count(world: &World) -> usize {
        world.entity_count()
    }

    /// Get archetype summary
    pub fn archetype_summary(world: &World) -> Vec<ArchetypeInfo> {
        world
            .archetypes()
            .map(|archetype| ArchetypeInfo {
                signature: archetype
                    .signature()
                    .iter()
                    .map(|key| Self::label(world, key))
                    .collect(),
                entity_count: archetype.len(),
                column_count: archetype.column_count(),
                edge_count: archetype.edges().len(),
            })
            .collect()
    }

    /// Details of a live entity
    pub fn entity_info(world: &World, entity: Entity) -> Option<EntityInfo> {
        let keys = world.components_of(entity).ok()?;
        Some(EntityInfo {
            entity,
            name: world.name(entity).map(str::to_owned),
            kind: world.kind(entity)?,
            access: world.access(entity)?,
            keys: keys.iter().map(|key| Self::label(world, key)).collect(),
            deleting: world.is_deleting(entity),
        })
    }

    /// Log world summary at info level
    pub fn log_summary(world: &World) {
        info!(
            entities = world.entity_count(),
            archetypes = world.archetype_count(),
            "world summary"
        );
        for info in Self::archetype_summary(world) {
            info!(
                keys = ?info.signature,
                entities = info.entity_count,
                columns = info.column_count,
                "archetype"
            );
        }
    }

    fn label(world: &World, key: Entity) -> String {
        world
            .name(key)
            .map_or_else(|| key.to_string(), str::to_owned)
    }
}

/// Archetype information for debugging
#[derive(Clone, Debug)]
pub struct ArchetypeInfo {
    /// Key names, falling back to `#id`
    pub signature: Vec<String>,
    pub entity_count: usize,
    pub column_count: usize,
    pub edge_count: usize,
}

#[derive(Clone, Debug)]
pub struct EntityInfo {
    pub entity: Entity,
    pub name: Option<String>,
    pub kind: EntityKind,
    pub access: Access,
    pub keys: Vec<String>,
    pub deleting: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_info_uses_names() {
        let mut world = World::new();
        let hp = world.component::<i32>("Hp").unwrap();
        let e = world.entity("e").unwrap();
        world.set(e, hp, 1).unwrap();

        let info = WorldInspector::entity_info(&world, e).unwrap();
        assert_eq!(info.kind, EntityKind::Entity);
        assert!(info.keys.contains(&"Hp".to_string()));
        assert!(info.keys.contains(&"EntityFlag".to_string()));
    }

    #[test]
    fn test_archetype_summary_counts() {
        let mut world = World::new();
        world.entity("a").unwrap();
        let summary = WorldInspector::archetype_summary(&world);
        assert_eq!(summary.len(), world.archetype_count());
        let total: usize = summary.iter().map(|info| info.entity_count).sum();
        assert_eq!(total, WorldInspector::entity_count(&world));
    }
}
