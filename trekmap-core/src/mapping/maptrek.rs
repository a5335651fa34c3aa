//! The MapTrek import schema.
//!
//! Nineteen tables covering buildings, points of interest, roads, railways,
//! water, land use and administrative boundaries. Localised names are kept
//! for English, German and Russian.

use super::{FieldDeclaration, GeometryCategory, Mapping, TableDefinition};
use crate::codec::Codec;
use crate::value::Value;

const LANGUAGES: [&str; 3] = ["en", "de", "ru"];

const AMENITY_COMMON: &[&str] = &[
    "police",
    "fire_station",
    "place_of_worship",
    "pharmacy",
    "doctors",
    "veterinary",
    "cafe",
    "pub",
    "bar",
    "fast_food",
    "restaurant",
    "bank",
    "atm",
    "bus_station",
    "fuel",
    "post_office",
    "theatre",
    "cinema",
    "shelter",
    "bicycle_rental",
];

const SHOPS: &[&str] = &[
    "bakery",
    "hairdresser",
    "supermarket",
    "doityourself",
    "mall",
    "pet",
    "car",
    "car_repair",
];

const TOURISM_COMMON: &[&str] = &[
    "wilderness_hut",
    "alpine_hut",
    "camp_site",
    "caravan_site",
    "guest_house",
    "motel",
    "hostel",
    "hotel",
    "attraction",
    "viewpoint",
    "museum",
    "information",
];

const HISTORIC: &[&str] = &["memorial", "castle", "ruins", "monument"];

const PLACES: &[&str] = &[
    "ocean",
    "sea",
    "country",
    "state",
    "region",
    "island",
    "city",
    "town",
    "village",
    "hamlet",
    "suburb",
    "neighbourhood",
    "locality",
    "isolated_dwelling",
];

const PROTECTED_AREAS: &[&str] = &["nature_reserve", "protected_area", "national_park"];

fn text(column: &str) -> FieldDeclaration {
    FieldDeclaration::new(column, Codec::String)
}

fn names() -> Vec<FieldDeclaration> {
    let mut fields = vec![FieldDeclaration::new("name", Codec::Name)];
    fields.extend(LANGUAGES.iter().map(|lang| {
        FieldDeclaration::new(
            &format!("name:{lang}"),
            Codec::LocalizedName {
                lang: (*lang).to_owned(),
            },
        )
    }));
    fields
}

fn priorities(values: &[&str]) -> Codec {
    Codec::ZOrder {
        priorities: values.iter().map(|value| (*value).to_owned()).collect(),
    }
}

fn area() -> FieldDeclaration {
    FieldDeclaration::new("area", Codec::PseudoArea)
}

fn class() -> FieldDeclaration {
    FieldDeclaration::new("class", Codec::Class)
}

fn joined(parts: &[&[&'static str]]) -> Vec<&'static str> {
    parts.iter().flat_map(|part| part.iter().copied()).collect()
}

fn building(name: &str) -> TableDefinition {
    let mut fields = ["building", "amenity", "shop", "historic", "tourism", "religion", "fee", "access"]
        .map(text)
        .to_vec();
    fields.extend(names());
    fields.extend([
        text("building:parts"),
        FieldDeclaration::new("height", Codec::Height),
        FieldDeclaration::new("min_height", Codec::Height),
        FieldDeclaration::new("building:levels", Codec::Integer),
        FieldDeclaration::new("building:min_level", Codec::Integer),
        text("building:colour"),
        text("roof:colour"),
        text("building:material"),
        text("roof:material"),
        text("addr:housenumber"),
    ]);
    TableDefinition::new(name, GeometryCategory::Polygon)
        .with_fields(fields)
        .with_label_field()
}

fn highway(name: &str, classes: &[&str]) -> TableDefinition {
    let mut fields = names();
    fields.extend([
        FieldDeclaration::new("tunnel", Codec::Bool).with_default(Value::Bool(false)),
        FieldDeclaration::new("bridge", Codec::Bool).with_default(Value::Bool(false)),
        FieldDeclaration::new("layer", Codec::Integer),
        FieldDeclaration::new("oneway", Codec::Direction),
        text("ref"),
        text("access"),
        FieldDeclaration::new("z_order", Codec::WayZOrder),
    ]);
    TableDefinition::new(name, GeometryCategory::Line)
        .with_fields(fields)
        .with_rule("highway", classes)
        .with_filter("area", Codec::Bool)
}

fn labelled_polygons(name: &str, extra: Vec<FieldDeclaration>) -> TableDefinition {
    let mut fields = names();
    fields.extend(extra);
    TableDefinition::new(name, GeometryCategory::Polygon)
        .with_fields(fields)
        .with_label_field()
}

impl Mapping {
    /// The built-in MapTrek schema.
    ///
    /// # Examples
    /// ```
    /// use trekmap_core::{GeometryCategory, Mapping};
    ///
    /// let mapping = Mapping::maptrek();
    /// let roads = mapping.table("motorways").expect("built-in table");
    /// assert_eq!(roads.geometry, GeometryCategory::Line);
    /// ```
    #[must_use]
    pub fn maptrek() -> Self {
        Self {
            tables: vec![
                buildings(),
                building("building_parts").with_rule("building:part", &["__any__"]),
                amenities(),
                highway(
                    "motorways",
                    &["motorway", "motorway_link", "trunk", "trunk_link", "primary"],
                ),
                highway(
                    "mainroads",
                    &[
                        "primary_link",
                        "secondary",
                        "secondary_link",
                        "tertiary",
                        "tertiary_link",
                        "road",
                        "unclassified",
                    ],
                ),
                transport_points(),
                landusages(),
                TableDefinition::new("forests", GeometryCategory::Polygon)
                    .with_fields([area()])
                    .with_rule("landuse", &["forest", "wood"])
                    .with_rule("natural", &["forest", "wood"]),
                TableDefinition::new("waterways", GeometryCategory::Line)
                    .with_fields(names())
                    .with_rule("barrier", &["ditch"])
                    .with_rule("waterway", &["stream", "river", "canal", "drain", "ditch"])
                    .with_filter("tunnel", Codec::Bool),
                labelled_polygons("waterareas", vec![area()])
                    .with_rule("waterway", &["riverbank", "dock"])
                    .with_rule("natural", &["water"])
                    .with_rule("landuse", &["basin", "reservoir"]),
                railways(),
                places(),
                TableDefinition::new("admin", GeometryCategory::Polygon)
                    .with_fields([FieldDeclaration::new(
                        "admin_level",
                        Codec::OneOfInt {
                            values: vec![1, 2, 3, 4, 5, 6],
                        },
                    )])
                    .with_rule("boundary", &["administrative"]),
                TableDefinition::new("barrierpoints", GeometryCategory::Point).with_rule(
                    "barrier",
                    &[
                        "block",
                        "bollard",
                        "border_control",
                        "chain",
                        "cycle_barrier",
                        "gate",
                        "lift_gate",
                        "toll_booth",
                        "yes",
                    ],
                ),
                TableDefinition::new("barrierways", GeometryCategory::Line).with_rule(
                    "barrier",
                    &["city_wall", "fence", "hedge", "retaining_wall", "wall"],
                ),
                labelled_polygons("labelednatureareas", vec![class(), area()])
                    .with_rule("natural", &["marsh", "wetland"])
                    .with_rule("place", &["island"]),
                natureareas(),
                labeledurbanareas(),
                urbanareas(),
            ],
        }
    }
}

fn buildings() -> TableDefinition {
    building("buildings")
        .without_type_field()
        .with_rule("building", &["__any__"])
        .with_rule(
            "amenity",
            &joined(&[AMENITY_COMMON, &["parking", "library", "car_repair", "toilets"]]),
        )
        .with_rule("shop", SHOPS)
        .with_rule("tourism", TOURISM_COMMON)
        .with_rule("historic", HISTORIC)
}

fn amenities() -> TableDefinition {
    let mut fields = ["amenity", "shop", "historic", "tourism", "leisure", "religion", "fee", "access"]
        .map(text)
        .to_vec();
    fields.extend(names());
    TableDefinition::new("amenities", GeometryCategory::Point)
        .without_type_field()
        .with_fields(fields)
        .with_rule(
            "amenity",
            &joined(&[
                &["drinking_water"],
                AMENITY_COMMON,
                &[
                    "fountain",
                    "telephone",
                    "parking",
                    "post_box",
                    "library",
                    "car_repair",
                    "toilets",
                    "university",
                    "school",
                    "college",
                    "kindergarten",
                    "hospital",
                ],
            ]),
        )
        .with_rule("leisure", &["playground"])
        .with_rule("shop", SHOPS)
        .with_rule(
            "tourism",
            &joined(&[TOURISM_COMMON, &["picnic_site", "artwork"]]),
        )
        .with_rule("historic", HISTORIC)
}

fn transport_points() -> TableDefinition {
    let mut fields = vec![class(), text("station")];
    fields.extend(names());
    TableDefinition::new("transport_points", GeometryCategory::Point)
        .with_fields(fields)
        .with_rule("highway", &["traffic_signals", "bus_stop"])
        .with_rule(
            "railway",
            &[
                "station",
                "halt",
                "tram_stop",
                "crossing",
                "level_crossing",
                "subway_entrance",
            ],
        )
        .with_rule("aeroway", &["aerodrome", "heliport", "helipad"])
}

fn landusages() -> TableDefinition {
    labelled_polygons(
        "landusages",
        vec![
            area(),
            FieldDeclaration::new("z_order", priorities(&joined(&[&["military"], PROTECTED_AREAS]))),
        ],
    )
    .with_rule("landuse", &["military"])
    .with_rule("leisure", PROTECTED_AREAS)
    .with_rule("boundary", PROTECTED_AREAS)
}

fn railways() -> TableDefinition {
    TableDefinition::new("railways", GeometryCategory::Line)
        .with_fields([
            FieldDeclaration::new("tunnel", Codec::Bool).with_default(Value::Bool(false)),
            FieldDeclaration::new("bridge", Codec::Bool).with_default(Value::Bool(false)),
            FieldDeclaration::new("layer", Codec::Integer),
            FieldDeclaration::new("z_order", Codec::WayZOrder),
        ])
        .with_rule(
            "railway",
            &[
                "rail",
                "tram",
                "light_rail",
                "monorail",
                "miniature",
                "subway",
                "narrow_gauge",
                "preserved",
                "funicular",
                "disused",
                "abandoned",
            ],
        )
}

fn places() -> TableDefinition {
    let mut fields = names();
    fields.extend([
        FieldDeclaration::new("z_order", priorities(PLACES)),
        FieldDeclaration::new("population", Codec::Integer),
        FieldDeclaration::new("admin_level", Codec::Integer),
        FieldDeclaration::new("capital", Codec::Integer),
    ]);
    TableDefinition::new("places", GeometryCategory::Point)
        .with_fields(fields)
        .with_rule("place", PLACES)
}

fn natureareas() -> TableDefinition {
    TableDefinition::new("natureareas", GeometryCategory::Polygon)
        .with_fields([class(), area()])
        .with_rule(
            "landuse",
            &[
                "meadow",
                "grass",
                "vineyard",
                "farmland",
                "greenhouse_horticulture",
                "plant_nursery",
            ],
        )
        .with_rule(
            "natural",
            &[
                "grassland",
                "scrub",
                "scree",
                "shingle",
                "sand",
                "beach",
                "mud",
                "glacier",
            ],
        )
}

fn labeledurbanareas() -> TableDefinition {
    labelled_polygons("labeledurbanareas", vec![class(), area()])
        .with_rule("landuse", &["cemetery"])
        .with_rule(
            "leisure",
            &["dog_park", "park", "playground", "sports_centre", "water_park"],
        )
        .with_rule(
            "amenity",
            &[
                "university",
                "school",
                "college",
                "kindergarten",
                "hospital",
                "place_of_worship",
            ],
        )
        .with_rule("tourism", &["zoo"])
}

fn urbanareas() -> TableDefinition {
    TableDefinition::new("urbanareas", GeometryCategory::Polygon)
        .with_fields([class(), area()])
        .with_rule("amenity", &["fountain"])
        .with_rule(
            "landuse",
            &[
                "residential",
                "retail",
                "commercial",
                "industrial",
                "village_green",
                "recreation_ground",
                "allotments",
                "quarry",
                "farmyard",
            ],
        )
        .with_rule(
            "leisure",
            &["garden", "golf_course", "pitch", "stadium", "common"],
        )
        .with_rule("tourism", &["picnic_site"])
}
