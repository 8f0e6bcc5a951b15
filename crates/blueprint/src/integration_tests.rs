//! End-to-end placement scenarios against the in-memory test world.

use std::sync::Arc;

use glam::{DVec3, IVec3};

use crate::blueprint::Blueprint;
use crate::geom::{BoundingBox, Mirror, Rotation};
use crate::options::PlacementOptions;
use crate::record::{CellRecord, EntityRecord};
use crate::rules::{DecayRule, GravityRule};
use crate::state::{CellState, BARRIER};
use crate::tag::Tag;
use crate::test_world::TestWorld;
use crate::world::{update_flags, HeightmapKind, WorldReader};

fn row(name: &str, count: i32) -> Blueprint {
    let cells = (0..count)
        .map(|x| CellRecord::new(IVec3::new(x, 0, 0), CellState::of(name), None))
        .collect();
    Blueprint::from_cells(IVec3::new(count, 1, 1), cells)
}

#[test]
fn test_place_writes_cells_at_offset() {
    let mut world = TestWorld::new();
    let bp = row("stone", 3);
    let placed = bp.place(
        &mut world,
        IVec3::new(10, 5, -2),
        IVec3::ZERO,
        &PlacementOptions::new(),
        update_flags::DEFAULT,
    );
    assert!(placed);
    for x in 0..3 {
        assert!(world.cell(IVec3::new(10 + x, 5, -2)).is("stone"));
    }
}

#[test]
fn test_empty_blueprint_is_a_no_op() {
    let mut world = TestWorld::new();
    let bp = Blueprint::from_cells(IVec3::ZERO, Vec::new());
    let placed = bp.place(
        &mut world,
        IVec3::ZERO,
        IVec3::ZERO,
        &PlacementOptions::new(),
        update_flags::DEFAULT,
    );
    assert!(!placed);
    assert!(world.writes.is_empty());
}

#[test]
fn test_rotation_moves_cells_and_rotates_states() {
    let mut world = TestWorld::new();
    let bp = Blueprint::from_cells(
        IVec3::new(2, 1, 1),
        vec![
            CellRecord::new(IVec3::new(0, 0, 0), CellState::of("stone"), None),
            CellRecord::new(
                IVec3::new(1, 0, 0),
                CellState::of("stone_stairs").with_property("facing", "north"),
                None,
            ),
        ],
    );
    let options = PlacementOptions::new().with_rotation(Rotation::Cw90);
    bp.place(&mut world, IVec3::ZERO, IVec3::ZERO, &options, update_flags::DEFAULT);

    // (1,0,0) under CW_90 around the origin lands at (0,0,1).
    let stairs = world.cell(IVec3::new(0, 0, 1));
    assert!(stairs.is("stone_stairs"));
    assert_eq!(stairs.property("facing"), Some("east"));
    assert!(world.cell(IVec3::ZERO).is("stone"));
}

#[test]
fn test_mirror_applies_to_both_position_and_state() {
    let mut world = TestWorld::new();
    let bp = Blueprint::from_cells(
        IVec3::new(1, 1, 2),
        vec![CellRecord::new(
            IVec3::new(0, 0, 1),
            CellState::of("stone_stairs").with_property("facing", "north"),
            None,
        )],
    );
    let options = PlacementOptions::new().with_mirror(Mirror::LeftRight);
    bp.place(&mut world, IVec3::ZERO, IVec3::ZERO, &options, update_flags::DEFAULT);

    let stairs = world.cell(IVec3::new(0, 0, -1));
    assert!(stairs.is("stone_stairs"));
    assert_eq!(stairs.property("facing"), Some("south"));
}

#[test]
fn test_gravity_rule_snaps_columns_to_terrain() {
    let mut world = TestWorld::new();
    world.set_height(4, 0, 5);
    let bp = Blueprint::from_cells(
        IVec3::new(1, 2, 1),
        vec![
            CellRecord::new(IVec3::new(0, 0, 0), CellState::of("stone"), None),
            CellRecord::new(IVec3::new(0, 1, 0), CellState::of("dirt"), None),
        ],
    );
    let options = PlacementOptions::new().with_rule(Arc::new(GravityRule::new(
        HeightmapKind::WorldSurface,
        2,
    )));
    bp.place(
        &mut world,
        IVec3::new(4, 60, 0),
        IVec3::ZERO,
        &options,
        update_flags::DEFAULT,
    );

    // Ground 5 + offset 2 + relative Y keeps the column shape on the terrain.
    assert!(world.cell(IVec3::new(4, 7, 0)).is("stone"));
    assert!(world.cell(IVec3::new(4, 8, 0)).is("dirt"));
    assert!(world.cell(IVec3::new(4, 60, 0)).is_air());
}

#[test]
fn test_decayed_cells_never_reach_the_world() {
    let mut world = TestWorld::new();
    let bp = row("stone", 32);
    let options = PlacementOptions::new().with_rule(Arc::new(DecayRule::new(0.0)));
    let placed = bp.place(
        &mut world,
        IVec3::ZERO,
        IVec3::ZERO,
        &options,
        update_flags::DEFAULT,
    );
    // The call still succeeds; the world just receives nothing.
    assert!(placed);
    assert!(world.writes.len() <= 1, "wrote {}", world.writes.len());
}

#[test]
fn test_clip_box_skips_outside_cells() {
    let mut world = TestWorld::new();
    let bp = row("stone", 5);
    let clip = BoundingBox::from_corners(IVec3::new(0, 0, 0), IVec3::new(2, 0, 0));
    let options = PlacementOptions::new().with_clip(clip);
    bp.place(&mut world, IVec3::ZERO, IVec3::ZERO, &options, update_flags::DEFAULT);

    assert!(world.cell(IVec3::new(2, 0, 0)).is("stone"));
    assert!(world.cell(IVec3::new(3, 0, 0)).is_air());
    assert!(world.cell(IVec3::new(4, 0, 0)).is_air());
}

fn waterloggable(name: &str) -> CellState {
    CellState::of(name).with_property("waterlogged", "false")
}

#[test]
fn test_existing_source_waterlogs_placed_container() {
    let mut world = TestWorld::new();
    world.put(IVec3::ZERO, CellState::of("water"));
    let bp = Blueprint::from_cells(
        IVec3::ONE,
        vec![CellRecord::new(IVec3::ZERO, waterloggable("stone_stairs"), None)],
    );
    bp.place(
        &mut world,
        IVec3::ZERO,
        IVec3::ZERO,
        &PlacementOptions::new(),
        update_flags::DEFAULT,
    );
    assert!(world.cell(IVec3::ZERO).is_waterlogged());
}

#[test]
fn test_fluid_leveling_fills_chain_from_one_source() {
    let mut world = TestWorld::new();
    // Flowing water along the row, with a real source just past its end.
    for x in 0..4 {
        world.put(IVec3::new(x, 0, 0), CellState::of("flowing_water"));
    }
    world.put(IVec3::new(4, 0, 0), CellState::of("water"));

    let bp = Blueprint::from_cells(
        IVec3::new(4, 1, 1),
        (0..4)
            .map(|x| CellRecord::new(IVec3::new(x, 0, 0), waterloggable("stone_stairs"), None))
            .collect(),
    );
    bp.place(
        &mut world,
        IVec3::ZERO,
        IVec3::ZERO,
        &PlacementOptions::new(),
        update_flags::DEFAULT,
    );

    // Leveling walks source-ness down the chain one pass at a time.
    for x in 0..4 {
        assert!(
            world.cell(IVec3::new(x, 0, 0)).is_waterlogged(),
            "cell {x} not leveled"
        );
    }
}

#[test]
fn test_fluid_chain_without_source_stays_unfilled() {
    let mut world = TestWorld::new();
    for x in 0..4 {
        world.put(IVec3::new(x, 0, 0), CellState::of("flowing_water"));
    }
    let bp = Blueprint::from_cells(
        IVec3::new(4, 1, 1),
        (0..4)
            .map(|x| CellRecord::new(IVec3::new(x, 0, 0), waterloggable("stone_stairs"), None))
            .collect(),
    );
    bp.place(
        &mut world,
        IVec3::ZERO,
        IVec3::ZERO,
        &PlacementOptions::new(),
        update_flags::DEFAULT,
    );
    for x in 0..4 {
        assert!(!world.cell(IVec3::new(x, 0, 0)).is_waterlogged());
    }
}

#[test]
fn test_adapt_fluids_off_ignores_existing_water() {
    let mut world = TestWorld::new();
    world.put(IVec3::ZERO, CellState::of("water"));
    let bp = Blueprint::from_cells(
        IVec3::ONE,
        vec![CellRecord::new(IVec3::ZERO, waterloggable("stone_stairs"), None)],
    );
    let options = PlacementOptions::new().with_adapt_fluids(false);
    bp.place(&mut world, IVec3::ZERO, IVec3::ZERO, &options, update_flags::DEFAULT);
    assert!(!world.cell(IVec3::ZERO).is_waterlogged());
}

#[test]
fn test_metadata_cells_prestamp_barrier_then_restamp() {
    let mut world = TestWorld::new();
    let mut stale = Tag::compound();
    stale.insert("stale", Tag::Int(1));
    world.put_metadata(IVec3::ZERO, stale);

    let mut meta = Tag::compound();
    meta.insert("loot", Tag::from("rare"));
    let bp = Blueprint::from_cells(
        IVec3::ONE,
        vec![CellRecord::new(IVec3::ZERO, CellState::of("chest"), Some(meta.clone()))],
    );
    bp.place(
        &mut world,
        IVec3::ZERO,
        IVec3::ZERO,
        &PlacementOptions::new(),
        update_flags::DEFAULT,
    );

    // Old holder cleared, placeholder written before the real state, fresh
    // metadata stamped after all cells are in.
    assert!(world.cleared_metadata.contains(&IVec3::ZERO));
    let states: Vec<&str> = world
        .writes
        .iter()
        .filter(|(pos, _)| *pos == IVec3::ZERO)
        .map(|(_, state)| state.name())
        .collect();
    assert_eq!(states, vec![BARRIER, "chest"]);
    assert_eq!(world.metadata(IVec3::ZERO), Some(meta));
}

#[test]
fn test_rejected_write_gets_no_metadata() {
    let mut world = TestWorld::new();
    world.reject_writes.push(IVec3::ZERO);
    let mut meta = Tag::compound();
    meta.insert("loot", Tag::from("rare"));
    let bp = Blueprint::from_cells(
        IVec3::ONE,
        vec![CellRecord::new(IVec3::ZERO, CellState::of("chest"), Some(meta))],
    );
    bp.place(
        &mut world,
        IVec3::ZERO,
        IVec3::ZERO,
        &PlacementOptions::new(),
        update_flags::DEFAULT,
    );
    assert_eq!(world.metadata(IVec3::ZERO), None);
}

#[test]
fn test_boundary_reconciliation_joins_wall_to_existing_cube() {
    let mut world = TestWorld::new();
    world.put(IVec3::new(1, 0, 0), CellState::of("stone"));
    let bp = Blueprint::from_cells(
        IVec3::ONE,
        vec![CellRecord::new(IVec3::ZERO, CellState::of("stone_wall"), None)],
    );
    bp.place(
        &mut world,
        IVec3::ZERO,
        IVec3::ZERO,
        &PlacementOptions::new(),
        update_flags::DEFAULT,
    );

    let wall = world.cell(IVec3::ZERO);
    assert_eq!(wall.property("east"), Some("true"));
    assert_eq!(wall.property("west"), Some("false"));
    assert!(world.updated.contains(&IVec3::ZERO));
}

#[test]
fn test_reconciliation_reaches_outward_neighbors() {
    let mut world = TestWorld::new();
    world.put(IVec3::new(1, 0, 0), CellState::of("oak_fence"));
    let bp = Blueprint::from_cells(
        IVec3::ONE,
        vec![CellRecord::new(IVec3::ZERO, CellState::of("stone"), None)],
    );
    bp.place(
        &mut world,
        IVec3::ZERO,
        IVec3::ZERO,
        &PlacementOptions::new(),
        update_flags::DEFAULT,
    );
    // The pre-existing fence grows an arm toward the new full cube.
    assert_eq!(world.cell(IVec3::new(1, 0, 0)).property("west"), Some("true"));
}

#[test]
fn test_known_shape_skips_reconciliation() {
    let mut world = TestWorld::new();
    world.put(IVec3::new(1, 0, 0), CellState::of("stone"));
    let bp = Blueprint::from_cells(
        IVec3::ONE,
        vec![CellRecord::new(IVec3::ZERO, CellState::of("stone_wall"), None)],
    );
    let options = PlacementOptions::new().with_known_shape(true);
    bp.place(&mut world, IVec3::ZERO, IVec3::ZERO, &options, update_flags::DEFAULT);

    assert_eq!(world.cell(IVec3::ZERO).property("east"), None);
    assert!(world.updated.is_empty());
}

fn entity_with_yaw(yaw: f64) -> EntityRecord {
    let mut meta = Tag::compound();
    meta.insert("id", Tag::from("lantern_keeper"));
    meta.insert("yaw", Tag::Double(yaw));
    EntityRecord {
        float_pos: DVec3::new(0.5, 0.0, 0.5),
        cell_pos: IVec3::ZERO,
        metadata: meta,
    }
}

#[test]
fn test_entities_spawn_offset_with_finalize_flag() {
    let mut world = TestWorld::new();
    let mut bp = row("stone", 1);
    bp.push_entity(entity_with_yaw(30.0));
    let options = PlacementOptions::new().with_finalize_entities(true);
    bp.place(
        &mut world,
        IVec3::new(10, 0, 0),
        IVec3::ZERO,
        &options,
        update_flags::DEFAULT,
    );

    let (spawned, finalize) = &world.spawned[0];
    assert!(*finalize);
    assert_eq!(spawned.float_pos, DVec3::new(10.5, 0.0, 0.5));
    assert_eq!(spawned.cell_pos, IVec3::new(10, 0, 0));
}

#[test]
fn test_entity_yaw_turns_with_mirror_and_rotation() {
    let mut world = TestWorld::new();
    let mut bp = row("stone", 1);
    bp.push_entity(entity_with_yaw(30.0));
    let options = PlacementOptions::new()
        .with_mirror(Mirror::LeftRight)
        .with_rotation(Rotation::Cw90);
    bp.place(&mut world, IVec3::ZERO, IVec3::ZERO, &options, update_flags::DEFAULT);

    // LEFT_RIGHT sends 30 to 150; the quarter turn adds 90.
    let yaw = world.spawned[0].0.metadata.get("yaw").and_then(Tag::as_double);
    assert_eq!(yaw, Some(240.0));
}

#[test]
fn test_ignore_entities_suppresses_spawning() {
    let mut world = TestWorld::new();
    let mut bp = row("stone", 1);
    bp.push_entity(entity_with_yaw(0.0));
    let options = PlacementOptions::new().with_ignore_entities(true);
    bp.place(&mut world, IVec3::ZERO, IVec3::ZERO, &options, update_flags::DEFAULT);
    assert!(world.spawned.is_empty());
}

#[test]
fn test_capture_then_place_reproduces_region() {
    let mut source = TestWorld::new();
    source.put(IVec3::new(0, 0, 0), CellState::of("stone"));
    source.put(
        IVec3::new(1, 0, 0),
        CellState::of("stone_stairs").with_property("facing", "west"),
    );
    let mut meta = Tag::compound();
    meta.insert("loot", Tag::from("common"));
    source.put(IVec3::new(1, 1, 0), CellState::of("chest"));
    source.put_metadata(IVec3::new(1, 1, 0), meta.clone());

    let mut bp = Blueprint::new();
    bp.capture_from_world(&source, IVec3::ZERO, IVec3::new(2, 2, 1), false, None);

    let mut target = TestWorld::new();
    let offset = IVec3::new(100, 10, 100);
    bp.place(
        &mut target,
        offset,
        IVec3::ZERO,
        &PlacementOptions::new(),
        update_flags::DEFAULT,
    );

    assert!(target.cell(offset).is("stone"));
    assert_eq!(
        target.cell(offset + IVec3::new(1, 0, 0)).property("facing"),
        Some("west")
    );
    assert!(target.cell(offset + IVec3::new(1, 1, 0)).is("chest"));
    assert_eq!(target.metadata(offset + IVec3::new(1, 1, 0)), Some(meta));
}

#[test]
fn test_capture_ignore_filter_drops_named_state() {
    let mut source = TestWorld::new();
    source.put(IVec3::new(0, 0, 0), CellState::of("stone"));
    source.put(IVec3::new(1, 0, 0), CellState::of("scaffolding"));

    let mut bp = Blueprint::new();
    bp.capture_from_world(
        &source,
        IVec3::ZERO,
        IVec3::new(2, 1, 1),
        false,
        Some("scaffolding"),
    );
    assert_eq!(bp.variants()[0].len(), 1);
    assert!(bp.variants()[0].state(0).is("stone"));
}

#[test]
fn test_capture_orders_plain_before_shaped_before_metadata() {
    let mut source = TestWorld::new();
    source.put(IVec3::new(0, 0, 0), CellState::of("stone_stairs"));
    source.put(IVec3::new(1, 0, 0), CellState::of("stone"));
    source.put(IVec3::new(2, 0, 0), CellState::of("chest"));
    source.put_metadata(IVec3::new(2, 0, 0), Tag::compound());

    let mut bp = Blueprint::new();
    bp.capture_from_world(&source, IVec3::ZERO, IVec3::new(3, 1, 1), false, None);

    let names: Vec<String> = bp.variants()[0]
        .records()
        .map(|r| r.state.name().to_string())
        .collect();
    assert_eq!(names, vec!["stone", "stone_stairs", "chest"]);
}

#[test]
fn test_forced_variant_index_places_that_variant() {
    let mut world = TestWorld::new();
    let mut bp = row("stone", 1);
    bp.push_variant(vec![CellState::of("deepslate")]);
    let options = PlacementOptions::new().with_variant_index(1);
    bp.place(&mut world, IVec3::ZERO, IVec3::ZERO, &options, update_flags::DEFAULT);
    assert!(world.cell(IVec3::ZERO).is("deepslate"));
}
