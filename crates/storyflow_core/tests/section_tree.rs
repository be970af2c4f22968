use storyflow_core::{contains_section, find_section, remove_section, replace_section, Section};

fn node(id: &str, children: Vec<Section>) -> Section {
    let mut section = Section::with_id(id, format!("Title {id}"));
    section.subsections = children;
    section
}

/// a
/// ├── a1
/// │   └── a1x
/// └── a2
/// b
/// c
/// └── c1
fn sample_forest() -> Vec<Section> {
    vec![
        node(
            "a",
            vec![node("a1", vec![node("a1x", vec![])]), node("a2", vec![])],
        ),
        node("b", vec![]),
        node("c", vec![node("c1", vec![])]),
    ]
}

fn all_ids(forest: &[Section]) -> Vec<String> {
    let mut ids = Vec::new();
    for section in forest {
        ids.push(section.id.clone());
        ids.extend(all_ids(&section.subsections));
    }
    ids
}

fn rename(section: &Section) -> Section {
    Section {
        title: "changed".to_string(),
        ..section.clone()
    }
}

#[test]
fn replace_with_absent_id_returns_equal_forest() {
    let forest = sample_forest();
    let result = replace_section(&forest, "zzz", rename);
    assert_eq!(result, forest);
}

#[test]
fn replace_changes_only_the_matching_node() {
    let forest = sample_forest();
    let result = replace_section(&forest, "a1x", rename);

    assert_eq!(find_section(&result, "a1x").unwrap().title, "changed");
    for id in ["a", "a1", "a2", "b", "c", "c1"] {
        assert_eq!(
            find_section(&result, id).unwrap().title,
            find_section(&forest, id).unwrap().title,
            "node {id} must keep its title"
        );
    }
    assert_eq!(all_ids(&result), all_ids(&forest));
}

#[test]
fn replace_transforms_every_duplicate_match() {
    let forest = vec![node("dup", vec![]), node("x", vec![node("dup", vec![])])];
    let result = replace_section(&forest, "dup", rename);

    assert_eq!(result[0].title, "changed");
    assert_eq!(result[1].subsections[0].title, "changed");
    assert_eq!(result[1].title, "Title x");
}

#[test]
fn remove_drops_node_and_subtree_keeping_order() {
    let forest = sample_forest();
    let result = remove_section(&forest, "a1");

    assert!(!contains_section(&result, "a1"));
    assert!(!contains_section(&result, "a1x"));
    assert_eq!(all_ids(&result), vec!["a", "a2", "b", "c", "c1"]);
}

#[test]
fn remove_is_idempotent() {
    let forest = sample_forest();
    let once = remove_section(&forest, "c");
    let twice = remove_section(&once, "c");
    assert_eq!(once, twice);
}

#[test]
fn remove_absent_id_is_noop() {
    let forest = sample_forest();
    assert_eq!(remove_section(&forest, "missing"), forest);
}

#[test]
fn operations_leave_input_untouched() {
    let forest = sample_forest();
    let snapshot = forest.clone();

    let _ = replace_section(&forest, "b", rename);
    let _ = remove_section(&forest, "a");

    assert_eq!(forest, snapshot);
}
