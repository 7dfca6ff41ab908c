//! Integration tests for collection loading, cloning and stashing

mod common;

use std::collections::HashSet;

use common::*;
use void_ecs::{Entity, LocalTransform, Mesh, Renderable};
use void_library::*;

#[test]
fn test_file_loaded_once_for_two_direct_instances() {
    let loader = loader();
    let mut scene = scene(&loader);
    let a = instance(&mut scene, "a", "house.toml");
    let b = instance(&mut scene, "b", "house.toml");

    scene.resolve_instance(a).unwrap();
    scene.resolve_instance(b).unwrap();

    assert_eq!(loader.loads_of("house.toml"), 1);
    assert_eq!(scene.collections().len(), 1);
    assert_eq!(scene.instance(a).unwrap().collection_id(), a);
    assert_eq!(scene.instance(b).unwrap().collection_id(), a);

    let first: HashSet<Entity> = scene.instance(a).unwrap().entities().iter().copied().collect();
    let second: HashSet<Entity> = scene.instance(b).unwrap().entities().iter().copied().collect();
    assert_eq!(first.len(), 4);
    assert_eq!(second.len(), 4);
    assert!(first.is_disjoint(&second));
}

#[test]
fn test_clone_preserves_structure() {
    let loader = loader();
    let mut scene = scene(&loader);
    let a = instance(&mut scene, "a", "house.toml");
    let b = instance(&mut scene, "b", "house.toml");
    scene.resolve_instance(a).unwrap();
    scene.resolve_instance(b).unwrap();

    let entities = scene.instance(b).unwrap().entities().to_vec();
    let paint = named(&scene, &entities, "paint").unwrap();
    let walls = named(&scene, &entities, "walls").unwrap();
    let door = named(&scene, &entities, "door").unwrap();
    let spawn = named(&scene, &entities, "spawn_point").unwrap();
    let world = scene.world();

    assert_eq!(world.parent_of(paint), Some(b));
    assert_eq!(world.parent_of(walls), Some(b));
    assert_eq!(world.parent_of(door), Some(walls));
    assert_eq!(world.parent_of(spawn), Some(b));
    assert_eq!(world.get_component::<Mesh>(walls).unwrap().material, paint);
    assert_eq!(world.get_component::<Renderable>(door).unwrap().mesh, walls);
    assert_eq!(world.get_component::<LocalTransform>(spawn).unwrap().translation, [0.0, 0.0, 2.0]);
}

#[test]
fn test_clone_remap_domain_and_distinct_images() {
    let loader = loader();
    let mut scene = scene(&loader);
    let a = instance(&mut scene, "a", "house.toml");
    let b = instance(&mut scene, "b", "house.toml");
    scene.resolve_instance(a).unwrap();
    scene.resolve_instance(b).unwrap();

    let source: HashSet<Entity> = scene.instance(b).unwrap().entities().iter().copied().collect();
    let first_target = scene.world_mut().spawn_named("copy1");
    let second_target = scene.world_mut().spawn_named("copy2");

    let first = scene.clone_instance(b, first_target).unwrap();
    let second = scene.clone_instance(b, second_target).unwrap();

    let domain: HashSet<Entity> = first.domain().collect();
    assert_eq!(domain, source);
    assert_eq!(second.domain().collect::<HashSet<_>>(), source);

    let first_image: HashSet<Entity> = first.image().collect();
    let second_image: HashSet<Entity> = second.image().collect();
    assert_eq!(first_image.len(), source.len());
    assert!(first_image.is_disjoint(&source));
    assert!(second_image.is_disjoint(&source));
    assert!(first_image.is_disjoint(&second_image));
}

#[test]
fn test_resolve_is_idempotent() {
    let loader = loader();
    let mut scene = scene(&loader);
    let lib = instance(&mut scene, "lib", "marked.toml");
    configure(&mut scene, lib, LoadStrategy::DirectLoad, InstanceKind::Library);

    scene.resolve_instance(lib).unwrap();
    let entities = scene.instance(lib).unwrap().entities().to_vec();
    let stats = scene.stats();

    scene.resolve_instance(lib).unwrap();
    assert_eq!(scene.instance(lib).unwrap().entities(), &entities[..]);
    assert_eq!(scene.stats(), stats);
    assert_eq!(scene.collections().len(), 1);
    assert_eq!(scene.disabled_entities().len(), 1);
    assert_eq!(loader.loads_of("marked.toml"), 1);
}

#[test]
fn test_disable_enable_round_trip() {
    let loader = loader();
    let mut scene = scene(&loader);
    let a = instance(&mut scene, "a", "house.toml");
    scene.resolve_instance(a).unwrap();

    let entities = scene.instance(a).unwrap().entities().to_vec();
    let walls = named(&scene, &entities, "walls").unwrap();
    let door = named(&scene, &entities, "door").unwrap();
    let before_mesh = scene.world().get_component::<Mesh>(walls).cloned();
    let before_renderable = scene.world().get_component::<Renderable>(door).cloned();

    let handle = scene.disable(walls).unwrap().unwrap();
    assert!(!scene.world().is_alive(walls));
    assert!(!scene.world().is_alive(door));
    assert!(scene.is_stashed(walls));
    assert_eq!(scene.world().name(handle), Some("walls"));

    assert!(scene.enable(walls).unwrap());
    assert!(!scene.world().is_alive(handle));
    assert_eq!(scene.world().parent_of(walls), Some(a));
    assert_eq!(scene.world().parent_of(door), Some(walls));
    assert_eq!(scene.world().get_component::<Mesh>(walls).cloned(), before_mesh);
    assert_eq!(scene.world().get_component::<Renderable>(door).cloned(), before_renderable);

    // never-stashed entities are a no-op
    assert!(!scene.enable(door).unwrap());
}

#[test]
fn test_library_kind_stashes_logic_entities() {
    let loader = loader();
    let mut scene = scene(&loader);
    let lib = instance(&mut scene, "lib", "marked.toml");
    configure(&mut scene, lib, LoadStrategy::DirectLoad, InstanceKind::Library);
    scene.resolve_instance(lib).unwrap();

    let entities = scene.instance(lib).unwrap().entities().to_vec();
    assert_eq!(entities.len(), 2);
    let statue = named(&scene, &entities, "statue").unwrap();
    let trigger = entities.iter().copied().find(|&e| e != statue).unwrap();

    assert!(scene.world().is_alive(statue));
    assert!(!scene.is_stashed(statue));
    assert!(!scene.world().is_alive(trigger));
    assert!(scene.is_stashed(trigger));
    assert_eq!(scene.display_name(trigger), Some("trigger"));
}

#[test]
fn test_whole_clone_restores_stashed_entities() {
    let loader = loader();
    let mut scene = scene(&loader);
    let lib = instance(&mut scene, "lib", "marked.toml");
    configure(&mut scene, lib, LoadStrategy::DirectLoad, InstanceKind::Library);
    scene.resolve_instance(lib).unwrap();

    let user = instance(&mut scene, "user", "marked.toml");
    scene.resolve_instance(user).unwrap();

    let entities = scene.instance(user).unwrap().entities().to_vec();
    assert_eq!(entities.len(), 2);
    for &e in &entities {
        assert!(scene.world().is_alive(e));
        assert_eq!(scene.world().parent_of(e), Some(user));
    }
    assert!(named(&scene, &entities, "trigger").is_some());
    assert!(named(&scene, &entities, "statue").is_some());
    // canonical stash untouched
    assert_eq!(scene.disabled_entities().len(), 1);
}

#[test]
fn test_whole_clone_of_default_kind_skips_disabled_members() {
    let loader = loader();
    let mut scene = scene(&loader);
    let a = instance(&mut scene, "a", "props.toml");
    scene.resolve_instance(a).unwrap();
    let barrel = named(&scene, scene.instance(a).unwrap().entities(), "barrel").unwrap();
    scene.disable(barrel).unwrap();

    let b = instance(&mut scene, "b", "props.toml");
    scene.resolve_instance(b).unwrap();

    let entities = scene.instance(b).unwrap().entities().to_vec();
    assert_eq!(entities.len(), 1);
    assert!(named(&scene, &entities, "barrel").is_none());
    assert!(named(&scene, &entities, "crate").is_some());
    assert_eq!(scene.world().children_of(b).len(), 1);
}

#[test]
fn test_whole_clone_ignores_foreign_children_of_canonical() {
    let loader = loader();
    let mut scene = scene(&loader);
    let a = instance(&mut scene, "a", "props.toml");
    scene.resolve_instance(a).unwrap();
    let extra = scene.world_mut().spawn_named("extra");
    scene.world_mut().attach(extra, a).unwrap();

    let c = instance(&mut scene, "c", "props.toml");
    scene.resolve_instance(c).unwrap();

    let entities: HashSet<Entity> = scene.instance(c).unwrap().entities().iter().copied().collect();
    let children: HashSet<Entity> = scene.world().children_of(c).into_iter().collect();
    assert_eq!(children, entities);
    assert_eq!(children.len(), 2);

    scene.unload_instance(c);
    assert!(scene.world().children_of(c).is_empty());
    assert!(scene.world().is_alive(extra));
    assert_eq!(scene.world().parent_of(extra), Some(a));
}

#[test]
fn test_name_scoped_resolve() {
    let loader = loader();
    let mut scene = scene(&loader);
    let props = instance(&mut scene, "props", "props.toml");
    scene.resolve_instance(props).unwrap();

    let only_crate = instance(&mut scene, "crate_only", "props.toml");
    scene.instance_mut(only_crate).unwrap().entity_name = "crate".into();
    scene.resolve_instance(only_crate).unwrap();

    let instance = scene.instance(only_crate).unwrap();
    assert_eq!(instance.entities().len(), 1);
    assert_eq!(instance.collection_id(), props);
    let clone = instance.entities()[0];
    assert_eq!(scene.world().name(clone), Some("crate"));
    assert_eq!(scene.world().parent_of(clone), Some(only_crate));
}

#[test]
fn test_name_scoped_resolve_finds_stashed_entity() {
    let loader = loader();
    let mut scene = scene(&loader);
    let lib = instance(&mut scene, "lib", "marked.toml");
    configure(&mut scene, lib, LoadStrategy::DirectLoad, InstanceKind::Library);
    scene.resolve_instance(lib).unwrap();

    let trigger = instance(&mut scene, "trigger_user", "marked.toml");
    scene.instance_mut(trigger).unwrap().entity_name = "trigger".into();
    scene.resolve_instance(trigger).unwrap();

    let entities = scene.instance(trigger).unwrap().entities().to_vec();
    assert_eq!(entities.len(), 1);
    assert!(scene.world().is_alive(entities[0]));
    assert_eq!(scene.world().name(entities[0]), Some("trigger"));
}

#[test]
fn test_name_miss_leaves_instance_empty() {
    let loader = loader();
    let mut scene = scene(&loader);
    let props = instance(&mut scene, "props", "props.toml");
    scene.resolve_instance(props).unwrap();

    let missing = instance(&mut scene, "missing", "props.toml");
    scene.instance_mut(missing).unwrap().entity_name = "lamp".into();
    scene.resolve_instance(missing).unwrap();

    let instance = scene.instance(missing).unwrap();
    assert!(instance.entities().is_empty());
    assert!(!instance.is_resolved());
}

#[test]
fn test_spawn_and_preload_uses_library_helper() {
    let loader = loader();
    let mut scene = scene(&loader);
    let a = instance(&mut scene, "a", "marked.toml");
    let b = instance(&mut scene, "b", "marked.toml");
    configure(&mut scene, a, LoadStrategy::SpawnAndPreload, InstanceKind::Default);
    configure(&mut scene, b, LoadStrategy::SpawnAndPreload, InstanceKind::Default);

    scene.resolve_instance(a).unwrap();
    scene.resolve_instance(b).unwrap();

    let helper = scene.world().find_by_name("LIB_marked.toml").unwrap();
    let helper_instance = scene.instance(helper).unwrap();
    assert_eq!(helper_instance.kind, InstanceKind::Library);
    assert_eq!(helper_instance.collection_id(), helper);

    assert_eq!(loader.loads_of("marked.toml"), 1);
    assert_eq!(scene.instance(a).unwrap().collection_id(), helper);
    assert_eq!(scene.instance(a).unwrap().entities().len(), 2);
    assert_eq!(scene.instance(b).unwrap().entities().len(), 2);
}

#[test]
fn test_failed_preload_removes_helper() {
    let loader = loader();
    let mut scene = scene(&loader);
    let a = instance(&mut scene, "a", "nowhere.toml");
    configure(&mut scene, a, LoadStrategy::SpawnAndPreload, InstanceKind::Default);

    assert!(scene.resolve_instance(a).is_err());
    assert!(scene.world().find_by_name("LIB_nowhere.toml").is_none());
    assert_eq!(scene.instance_entities(), vec![a]);
}

#[test]
fn test_scene_file_loader_reads_from_asset_root() {
    init_logging();
    let root = std::env::temp_dir().join(format!("void_library_assets_{}", std::process::id()));
    std::fs::create_dir_all(&root).unwrap();
    std::fs::write(root.join("props.toml"), PROPS).unwrap();

    let config = LibraryConfig {
        asset_root: root.clone(),
        ..LibraryConfig::default()
    };
    let mut scene = Scene::with_file_loader(config);
    let props = instance(&mut scene, "props", "props.toml");
    scene.resolve_instance(props).unwrap();

    assert_eq!(scene.instance(props).unwrap().entities().len(), 2);
    let _ = std::fs::remove_dir_all(&root);
}
