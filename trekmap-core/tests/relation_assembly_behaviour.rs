//! Behaviour tests for multipolygon relation assembly.
#![expect(clippy::float_arithmetic, reason = "fixture rings are offset squares")]

use geo::Coord;
use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};
use std::cell::RefCell;
use trekmap_core::{
    Assembly, AssemblyConfig, AssemblyError, Member, RelationAssembler, RingStrategy, Role,
};

type Outcome = Option<Result<Assembly, AssemblyError>>;

fn square(way_id: i64, role: Role, min: f64, size: f64) -> Member {
    let max = min + size;
    Member::new(
        way_id,
        Some(role),
        vec![
            Coord { x: min, y: min },
            Coord { x: max, y: min },
            Coord { x: max, y: max },
            Coord { x: min, y: max },
            Coord { x: min, y: min },
        ],
    )
}

#[fixture]
fn members() -> RefCell<Vec<Member>> {
    RefCell::new(Vec::new())
}

#[fixture]
fn config() -> RefCell<AssemblyConfig> {
    RefCell::new(AssemblyConfig::default())
}

#[fixture]
fn outcome() -> RefCell<Outcome> {
    RefCell::new(None)
}

#[given("a closed outer ring")]
fn given_outer(#[from(members)] members: &RefCell<Vec<Member>>) {
    members.borrow_mut().push(square(1, Role::Outer, 0.0, 100.0));
}

#[given("an inner ring inside the outer ring")]
fn given_inner(#[from(members)] members: &RefCell<Vec<Member>>) {
    members.borrow_mut().push(square(2, Role::Inner, 10.0, 20.0));
}

#[given("an outer way that never closes")]
fn given_open_outer(#[from(members)] members: &RefCell<Vec<Member>>) {
    members.borrow_mut().push(Member::new(
        3,
        Some(Role::Outer),
        vec![
            Coord { x: 200.0, y: 0.0 },
            Coord { x: 300.0, y: 0.0 },
            Coord { x: 300.0, y: 100.0 },
        ],
    ));
}

#[given("{count} separate outer rings")]
fn given_separate_rings(count: i32, #[from(members)] members: &RefCell<Vec<Member>>) {
    let mut members = members.borrow_mut();
    for index in 0..count {
        members.push(square(
            i64::from(index),
            Role::Outer,
            f64::from(index) * 50.0,
            10.0,
        ));
    }
}

#[given("two overlapping outer rings")]
fn given_overlapping(#[from(members)] members: &RefCell<Vec<Member>>) {
    let mut members = members.borrow_mut();
    members.push(square(1, Role::Outer, 0.0, 10.0));
    members.push(square(2, Role::Outer, 5.0, 10.0));
}

#[given("a ring ceiling of {limit}")]
fn given_ceiling(limit: usize, #[from(config)] config: &RefCell<AssemblyConfig>) {
    config.borrow_mut().max_rings = limit;
}

#[given("partial relation import is enabled")]
fn given_partial(#[from(config)] config: &RefCell<AssemblyConfig>) {
    config.borrow_mut().import_partial = true;
}

#[given("the union ring strategy")]
fn given_union(#[from(config)] config: &RefCell<AssemblyConfig>) {
    config.borrow_mut().strategy = RingStrategy::Union;
}

#[when("the relation is assembled")]
fn when_assembled(
    #[from(members)] members: &RefCell<Vec<Member>>,
    #[from(config)] config: &RefCell<AssemblyConfig>,
    #[from(outcome)] outcome: &RefCell<Outcome>,
) {
    let assembler = RelationAssembler::new(config.borrow().clone());
    *outcome.borrow_mut() = Some(assembler.assemble(42, &members.borrow()));
}

#[then("the assembly yields {count} polygons")]
fn then_polygons(count: usize, #[from(outcome)] outcome: &RefCell<Outcome>) {
    let outcome = outcome.borrow();
    let assembly = outcome
        .as_ref()
        .and_then(|result| result.as_ref().ok())
        .expect("assembly succeeded");
    assert_eq!(assembly.polygons.len(), count);
}

#[then("the largest polygon has {holes} holes")]
fn then_holes(holes: usize, #[from(outcome)] outcome: &RefCell<Outcome>) {
    let outcome = outcome.borrow();
    let polygon = outcome
        .as_ref()
        .and_then(|result| result.as_ref().ok())
        .and_then(|assembly| assembly.polygons.first())
        .expect("at least one polygon");
    assert_eq!(polygon.interiors().len(), holes);
}

#[then("the relation is rejected as incomplete")]
fn then_incomplete(#[from(outcome)] outcome: &RefCell<Outcome>) {
    assert!(matches!(
        *outcome.borrow(),
        Some(Err(AssemblyError::Incomplete { relation: 42, .. }))
    ));
}

#[then("the relation is rejected as too complex")]
fn then_too_complex(#[from(outcome)] outcome: &RefCell<Outcome>) {
    assert!(matches!(
        *outcome.borrow(),
        Some(Err(AssemblyError::TooComplex { relation: 42, .. }))
    ));
}

#[scenario(path = "tests/features/relation_assembly.feature", index = 0)]
fn outer_with_inner(
    members: RefCell<Vec<Member>>,
    config: RefCell<AssemblyConfig>,
    outcome: RefCell<Outcome>,
) {
    let _ = (members, config, outcome);
}

#[scenario(path = "tests/features/relation_assembly.feature", index = 1)]
fn open_outer_is_dropped(
    members: RefCell<Vec<Member>>,
    config: RefCell<AssemblyConfig>,
    outcome: RefCell<Outcome>,
) {
    let _ = (members, config, outcome);
}

#[scenario(path = "tests/features/relation_assembly.feature", index = 2)]
fn partial_import(
    members: RefCell<Vec<Member>>,
    config: RefCell<AssemblyConfig>,
    outcome: RefCell<Outcome>,
) {
    let _ = (members, config, outcome);
}

#[scenario(path = "tests/features/relation_assembly.feature", index = 3)]
fn too_complex(
    members: RefCell<Vec<Member>>,
    config: RefCell<AssemblyConfig>,
    outcome: RefCell<Outcome>,
) {
    let _ = (members, config, outcome);
}

#[scenario(path = "tests/features/relation_assembly.feature", index = 4)]
fn union_merges_outers(
    members: RefCell<Vec<Member>>,
    config: RefCell<AssemblyConfig>,
    outcome: RefCell<Outcome>,
) {
    let _ = (members, config, outcome);
}

#[scenario(path = "tests/features/relation_assembly.feature", index = 5)]
fn containment_keeps_outers(
    members: RefCell<Vec<Member>>,
    config: RefCell<AssemblyConfig>,
    outcome: RefCell<Outcome>,
) {
    let _ = (members, config, outcome);
}
