use domain::Registry;

#[test]
fn campus_default_groups_in_order() {
    let registry = Registry::campus_default();
    let names: Vec<&str> = registry
        .neighborhoods()
        .iter()
        .map(|group| group.name.as_str())
        .collect();
    assert_eq!(
        names,
        vec![
            "East Neighborhood",
            "Mount Olympus Neighborhood",
            "North Neighborhood",
            "West Neighborhood",
        ]
    );
    assert_eq!(registry.len(), 18);
    assert_eq!(registry.names().next(), Some("DellPlain Hall"));
    assert!(registry.contains("Shaw Hall"));
    assert!(!registry.contains("shaw hall"));
    assert_eq!(
        registry.neighborhood_of("Day Hall"),
        Some("Mount Olympus Neighborhood")
    );
}

#[test]
fn duplicate_and_blank_names_are_dropped() {
    let registry = Registry::new([
        ("A", vec!["One", "Two", " "]),
        ("B", vec!["Two", "Three"]),
    ]);
    assert_eq!(registry.len(), 3);
    assert_eq!(registry.neighborhoods()[1].locations, vec!["Three".to_string()]);
    assert_eq!(registry.neighborhood_of("Two"), Some("A"));
}
