#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use cascade_ecs::prelude::*;

    fn init_tracing() {
        let _ = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_test_writer()
            .try_init();
    }

    fn log<T>() -> Rc<RefCell<Vec<T>>> {
        Rc::new(RefCell::new(Vec::new()))
    }

    #[test]
    fn test_delete_cascades_to_holders() -> Result<()> {
        init_tracing();
        let mut world = World::new();
        let hp = world.component::<u32>("Hp")?;
        let e1 = world.entity("e1")?;
        let e2 = world.entity("e2")?;
        world.set(e1, hp, 3)?;
        world.add(e2, e1)?;

        let events = log();
        let sink = events.clone();
        world.on_remove(hp, move |_, entity, prev| {
            sink.borrow_mut().push(format!("hp remove {entity} {prev:?}"));
            Ok(())
        })?;
        let sink = events.clone();
        world.on_delete(hp, move |_, entity, prev| {
            sink.borrow_mut().push(format!("hp delete {entity} {prev:?}"));
            Ok(())
        })?;
        let sink = events.clone();
        world.on_flag_remove(e1, move |_, entity| {
            sink.borrow_mut().push(format!("e1 remove {entity}"));
            Ok(())
        })?;
        let sink = events.clone();
        world.on_flag_delete(e1, move |_, entity| {
            sink.borrow_mut().push(format!("e1 delete {entity}"));
            Ok(())
        })?;

        world.delete(e1)?;

        assert!(!world.has(e2, e1));
        assert!(world.is_deleted(e1));
        assert!(!world.is_live(e1));
        assert_eq!(
            *events.borrow(),
            vec![
                format!("hp remove {e1} Some(3)"),
                format!("hp delete {e1} Some(3)"),
                format!("e1 remove {e2}"),
            ]
        );
        Ok(())
    }

    #[test]
    fn test_deleting_a_component_strips_every_holder() -> Result<()> {
        init_tracing();
        let mut world = World::new();
        let hp = world.component::<u32>("Hp")?;
        let tag = world.flag("Tag")?;
        let removed = log();
        let deleted = log();

        let sink = removed.clone();
        world.on_remove(hp, move |_, entity, prev| {
            sink.borrow_mut().push((entity, prev.copied()));
            Ok(())
        })?;
        let sink = deleted.clone();
        world.on_delete(hp, move |_, entity, _| {
            sink.borrow_mut().push(entity);
            Ok(())
        })?;

        let mut holders = Vec::new();
        for i in 0..4 {
            let e = world.entity(None)?;
            world.set(e, hp, i)?;
            if i % 2 == 0 {
                world.add(e, tag)?;
            }
            holders.push(e);
        }

        world.delete(hp)?;

        assert_eq!(removed.borrow().len(), 4);
        assert!(deleted.borrow().is_empty());
        for &e in &holders {
            assert!(world.is_live(e));
            assert!(!world.has(e, hp));
        }
        assert!(!world.archetypes().any(|a| a.signature().contains(hp)));
        assert_eq!(Query::new(tag).count(&world), 2);
        Ok(())
    }

    #[test]
    fn test_single_hook_failure_is_returned_as_is() -> Result<()> {
        let mut world = World::new();
        let hp = world.component::<u32>("Hp")?;
        world.on_delete(hp, |_, _, _| Err(EcsError::hook("refused")))?;
        let e = world.entity("e")?;
        world.set(e, hp, 1)?;

        assert_eq!(world.delete(e), Err(EcsError::hook("refused")));
        assert!(world.is_deleted(e));
        Ok(())
    }

    #[test]
    fn test_cascade_reports_all_failures_after_cleanup() -> Result<()> {
        init_tracing();
        let mut world = World::new();
        let hp = world.component::<u32>("Hp")?;
        let e1 = world.entity("e1")?;
        let e2 = world.entity("e2")?;
        let e3 = world.entity("e3")?;
        world.set(e1, hp, 1)?;
        world.add(e2, e1)?;
        world.add(e3, e1)?;

        world.on_remove(hp, |_, _, _| Err(EcsError::hook("hp")))?;
        world.on_flag_remove(e1, |_, holder| Err(EcsError::hook(format!("holder {holder}"))))?;

        let err = world.delete(e1).unwrap_err();
        match err {
            EcsError::CascadeFailed { entity, errors } => {
                assert_eq!(entity, e1);
                assert_eq!(errors.len(), 3);
                assert_eq!(errors[0], EcsError::hook("hp"));
            }
            other => panic!("expected CascadeFailed, got {other:?}"),
        }
        assert!(!world.has(e2, e1));
        assert!(!world.has(e3, e1));
        assert!(world.is_deleted(e1));
        Ok(())
    }

    #[test]
    fn test_deleting_entity_rejects_adds_but_allows_removes() -> Result<()> {
        let mut world = World::new();
        let hp = world.component::<u32>("Hp")?;
        let armor = world.component::<u32>("Armor")?;
        let outcomes = log();

        let sink = outcomes.clone();
        world.on_delete(hp, move |world, entity, _| {
            assert!(world.is_deleting(entity));
            sink.borrow_mut().push(world.set(entity, hp, 9));
            sink.borrow_mut().push(world.remove(entity, armor));
            Ok(())
        })?;

        let e = world.create_entity("e", |b| {
            b.set(hp, 1).set(armor, 2);
            Ok(())
        })?;
        world.delete(e)?;

        assert_eq!(*outcomes.borrow(), vec![Err(EcsError::Deleting(e)), Ok(())]);
        assert!(world.is_deleted(e));
        Ok(())
    }

    #[test]
    fn test_deleting_entity_cannot_become_a_key() -> Result<()> {
        let mut world = World::new();
        let hp = world.component::<u32>("Hp")?;
        let bystander = world.entity("bystander")?;
        let outcome = log();

        let sink = outcome.clone();
        world.on_delete(hp, move |world, entity, _| {
            sink.borrow_mut().push(world.add(bystander, entity));
            Ok(())
        })?;
        let e = world.entity("e")?;
        world.set(e, hp, 1)?;
        world.delete(e)?;

        assert_eq!(*outcome.borrow(), vec![Err(EcsError::Deleting(e))]);
        assert!(world.components_of(bystander)?.len() == 1);
        Ok(())
    }

    #[test]
    fn test_delete_inside_delete_is_noop() -> Result<()> {
        let mut world = World::new();
        let hp = world.component::<u32>("Hp")?;
        let calls = log();
        let sink = calls.clone();
        world.on_delete(hp, move |world, entity, _| {
            sink.borrow_mut().push(world.delete(entity));
            Ok(())
        })?;

        let e = world.entity("e")?;
        world.set(e, hp, 1)?;
        world.delete(e)?;
        assert_eq!(*calls.borrow(), vec![Ok(())]);
        assert!(world.is_deleted(e));
        Ok(())
    }

    #[test]
    fn test_self_keyed_entity() -> Result<()> {
        let mut world = World::new();
        let e = world.entity("e")?;
        world.add(e, e)?;
        assert!(world.has(e, e));

        world.delete(e)?;
        assert!(world.is_deleted(e));
        assert!(!world.archetypes().any(|a| a.signature().contains(e)));
        Ok(())
    }

    #[test]
    fn test_clear_component() -> Result<()> {
        init_tracing();
        let mut world = World::new();
        let hp = world.component::<u32>("Hp")?;
        let tag = world.flag("Tag")?;
        let removed = log();
        let deleted = log();

        let sink = removed.clone();
        world.on_remove(hp, move |_, _, prev| {
            sink.borrow_mut().push(prev.copied());
            Ok(())
        })?;
        let sink = deleted.clone();
        world.on_delete(hp, move |_, entity, _| {
            sink.borrow_mut().push(entity);
            Ok(())
        })?;

        for i in 0..5 {
            let e = world.entity(None)?;
            world.set(e, hp, i)?;
            if i % 2 == 1 {
                world.add(e, tag)?;
            }
        }
        let bare = world.entity(None)?;
        world.add(bare, hp)?;

        world.clear_component(hp)?;

        let mut prevs = removed.borrow().clone();
        prevs.sort();
        assert_eq!(prevs, vec![None, Some(0), Some(1), Some(2), Some(3), Some(4)]);
        assert!(deleted.borrow().is_empty());
        assert!(world.is_live(hp.entity()));
        assert_eq!(Query::new(hp).count(&world), 0);
        assert_eq!(Query::new(tag).count(&world), 2);
        Ok(())
    }

    #[test]
    fn test_clear_component_skips_holders_deleted_by_earlier_hooks() -> Result<()> {
        let mut world = World::new();
        let hp = world.component::<u32>("Hp")?;
        let holders = log();
        for i in 0..3 {
            let e = world.entity(None)?;
            world.set(e, hp, i)?;
            holders.borrow_mut().push(e);
        }

        let seen = log();
        let (sink, others) = (seen.clone(), holders.clone());
        world.on_remove(hp, move |world, entity, _| {
            assert!(world.is_live(entity), "{entity} reached a hook after deletion");
            sink.borrow_mut().push(entity);
            for &other in others.borrow().iter() {
                if other != entity && world.is_live(other) {
                    world.delete(other)?;
                }
            }
            Ok(())
        })?;

        world.clear_component(hp)?;
        assert_eq!(seen.borrow().len(), 1);
        assert_eq!(Query::new(world.entity_flag()).count(&world), 1);
        Ok(())
    }

    #[test]
    fn test_clear_component_under_auto_delete() -> Result<()> {
        let mut world = World::with_config(Config {
            auto_delete_empty_archetypes: true,
            ..Config::default()
        });
        let hp = world.component::<u32>("Hp")?;
        for i in 0..3 {
            let e = world.entity(None)?;
            world.set(e, hp, i)?;
        }

        world.clear_component(hp)?;
        assert!(!world.archetypes().any(|a| a.signature().contains(hp)));
        assert_eq!(Query::new(world.entity_flag()).count(&world), 3);
        Ok(())
    }
}
