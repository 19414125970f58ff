// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::place::{self, PlaceKind};
use crate::tests::common::world;

use anyhow::Result;

#[test]
fn spot_and_leaf_paths() -> Result<()> {
    place::check_spot_path("Cave > Entry > Door")?;
    place::check_leaf_path("Cave > Entry > Door > Open")?;

    let err = place::check_spot_path("Cave > Entry > Door > Open").unwrap_err();
    assert!(err
        .to_string()
        .contains("expected 2 `>` separators, found 3"));

    let err = place::check_leaf_path("Cave > Entry > Door").unwrap_err();
    assert!(err
        .to_string()
        .contains("expected 3 `>` separators, found 2"));

    assert!(place::check_spot_path("Cave >  > Door").is_err());
    Ok(())
}

#[test]
fn kinds_by_depth() {
    assert_eq!(PlaceKind::of("Cave"), Some(PlaceKind::Region));
    assert_eq!(PlaceKind::of("Cave > Entry"), Some(PlaceKind::Area));
    assert_eq!(PlaceKind::of("Cave > Entry > Door"), Some(PlaceKind::Spot));
    assert_eq!(PlaceKind::of("Cave > Entry > Door > Open"), Some(PlaceKind::Leaf));
    assert_eq!(PlaceKind::of("a > b > c > d > e"), None);
}

#[test]
fn ancestors_and_containment() {
    let spot = "Cave > Entry > Door";
    assert_eq!(
        place::ancestor(spot, PlaceKind::Region).as_deref(),
        Some("Cave")
    );
    assert_eq!(
        place::ancestor(spot, PlaceKind::Area).as_deref(),
        Some("Cave > Entry")
    );
    assert_eq!(place::ancestor("Cave", PlaceKind::Area), None);

    assert!(place::contains("Cave", spot));
    assert!(place::contains("Cave > Entry", spot));
    assert!(place::contains(spot, spot));
    assert!(!place::contains("Cave > Pool", spot));
    // Segment-wise, not textual.
    assert!(!place::contains("Cav", spot));
}

#[test]
fn identifiers() {
    assert_eq!(
        place::identifier("Cave > Entry > Door Way"),
        "Cave__Entry__Door_Way"
    );
}

#[test]
fn catalog_places() -> Result<()> {
    let catalog = world()?;
    assert_eq!(catalog.location_kind("Town"), Some(PlaceKind::Region));
    assert_eq!(
        catalog.location_kind("Cave > Entry > Door > Chest"),
        Some(PlaceKind::Leaf)
    );
    assert_eq!(catalog.location_kind("Cave > Entry > Door > Nope"), None);
    assert_eq!(catalog.location_kind("Sky"), None);

    let spots: Vec<String> = catalog.spots().map(|(p, _)| p).collect();
    assert_eq!(
        spots,
        [
            "Cave > Entry > Door",
            "Cave > Entry > Ledge",
            "Cave > Pool > Edge",
            "Town > Square > Fountain"
        ]
    );
    Ok(())
}
