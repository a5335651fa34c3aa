//! Behaviour tests for routing elements into typed rows.

use geo::Coord;
use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};
use std::cell::RefCell;
use trekmap_core::{Element, EngineConfig, Mapping, Member, Record, RowBuilder, Value};

fn split_tag(tag: &str) -> (&str, &str) {
    tag.split_once('=').expect("tags are written as key=value")
}

fn square() -> Vec<Coord<f64>> {
    vec![
        Coord { x: 0.0, y: 0.0 },
        Coord { x: 10.0, y: 0.0 },
        Coord { x: 10.0, y: 10.0 },
        Coord { x: 0.0, y: 10.0 },
        Coord { x: 0.0, y: 0.0 },
    ]
}

#[fixture]
fn element() -> RefCell<Option<Element>> {
    RefCell::new(None)
}

#[fixture]
fn records() -> RefCell<Vec<Record>> {
    RefCell::new(Vec::new())
}

fn only_record<'a>(records: &'a [Record], table: &str) -> &'a Record {
    let mut matching = records.iter().filter(|record| record.table == table);
    let record = matching.next().expect("a record for the table");
    assert!(matching.next().is_none(), "exactly one record for {table}");
    record
}

#[given("a closed way tagged {first} and {second}")]
fn given_closed_way(
    first: String,
    second: String,
    #[from(element)] element: &RefCell<Option<Element>>,
) {
    let tags = [split_tag(&first), split_tag(&second)];
    *element.borrow_mut() = Some(Element::way(10, square(), tags));
}

#[given("a way tagged {first} and {second}")]
fn given_way(first: String, second: String, #[from(element)] element: &RefCell<Option<Element>>) {
    let tags = [split_tag(&first), split_tag(&second)];
    let coords = vec![Coord { x: 0.0, y: 0.0 }, Coord { x: 50.0, y: 0.0 }];
    *element.borrow_mut() = Some(Element::way(11, coords, tags));
}

#[given("a multipolygon relation {id} tagged {tag}")]
fn given_relation(id: i64, tag: String, #[from(element)] element: &RefCell<Option<Element>>) {
    let members = vec![Member::new(1, None, square())];
    let tags = [("type", "multipolygon"), split_tag(&tag)];
    *element.borrow_mut() = Some(Element::relation(id, members, tags));
}

#[given("a node tagged {tag}")]
fn given_node(tag: String, #[from(element)] element: &RefCell<Option<Element>>) {
    let location = Coord { x: 1.0, y: 2.0 };
    *element.borrow_mut() = Some(Element::node(12, location, [split_tag(&tag)]));
}

#[when("the element is processed with the MapTrek mapping")]
fn when_processed(
    #[from(element)] element: &RefCell<Option<Element>>,
    #[from(records)] records: &RefCell<Vec<Record>>,
) {
    let builder = RowBuilder::new(Mapping::maptrek(), &EngineConfig::default());
    let element = element.borrow();
    let input = element.as_ref().expect("an element was given");
    *records.borrow_mut() = builder.build(input);
}

#[then("no record is written to {table}")]
fn then_no_record(table: String, #[from(records)] records: &RefCell<Vec<Record>>) {
    assert!(records.borrow().iter().all(|record| record.table != table));
}

#[then("no records are produced")]
fn then_nothing(#[from(records)] records: &RefCell<Vec<Record>>) {
    assert!(records.borrow().is_empty());
}

#[then("the {table} record has height {height}")]
fn then_height(table: String, height: i64, #[from(records)] records: &RefCell<Vec<Record>>) {
    let records = records.borrow();
    let record = only_record(&records, &table);
    assert_eq!(record.row.get("height"), Some(&Value::Integer(height)));
}

#[then("the {table} record has no height")]
fn then_no_height(table: String, #[from(records)] records: &RefCell<Vec<Record>>) {
    let records = records.borrow();
    let record = only_record(&records, &table);
    assert!(record.row.has_column("height"));
    assert_eq!(record.row.get("height"), None);
}

#[then("the {table} record has osm_id {id}")]
fn then_osm_id(table: String, id: i64, #[from(records)] records: &RefCell<Vec<Record>>) {
    let records = records.borrow();
    assert_eq!(only_record(&records, &table).osm_id, id);
}

#[then("the {table} record has z_order {z_order}")]
fn then_z_order(table: String, z_order: i64, #[from(records)] records: &RefCell<Vec<Record>>) {
    let records = records.borrow();
    let record = only_record(&records, &table);
    assert_eq!(record.row.get("z_order"), Some(&Value::Integer(z_order)));
}

#[scenario(path = "tests/features/row_builder.feature", index = 0)]
fn area_outline_filtered(element: RefCell<Option<Element>>, records: RefCell<Vec<Record>>) {
    let _ = (element, records);
}

#[scenario(path = "tests/features/row_builder.feature", index = 1)]
fn height_converted(element: RefCell<Option<Element>>, records: RefCell<Vec<Record>>) {
    let _ = (element, records);
}

#[scenario(path = "tests/features/row_builder.feature", index = 2)]
fn height_unparsable(element: RefCell<Option<Element>>, records: RefCell<Vec<Record>>) {
    let _ = (element, records);
}

#[scenario(path = "tests/features/row_builder.feature", index = 3)]
fn relation_ids_negated(element: RefCell<Option<Element>>, records: RefCell<Vec<Record>>) {
    let _ = (element, records);
}

#[scenario(path = "tests/features/row_builder.feature", index = 4)]
fn unmatched_elements(element: RefCell<Option<Element>>, records: RefCell<Vec<Record>>) {
    let _ = (element, records);
}

#[scenario(path = "tests/features/row_builder.feature", index = 5)]
fn bridge_z_order(element: RefCell<Option<Element>>, records: RefCell<Vec<Record>>) {
    let _ = (element, records);
}
