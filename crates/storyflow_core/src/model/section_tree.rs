//! Pure operations over the section forest of one board.
//!
//! # Responsibility
//! - Locate a section by id at any depth.
//! - Produce a new forest with one section replaced or removed.
//!
//! # Invariants
//! - Inputs are never mutated; every operation returns a new forest.
//! - Order of untouched siblings is preserved.
//! - An absent target id yields a forest equal in content to the input.

use crate::model::board::Section;

/// Returns a new forest where every section whose id equals `target_id` is
/// replaced by `transform(section)`.
///
/// The walk visits every branch: matched nodes are not descended into, all
/// other nodes are rebuilt with the walk applied to their subsections. When
/// ids are not unique, every match is transformed.
pub fn replace_section<F>(forest: &[Section], target_id: &str, transform: F) -> Vec<Section>
where
    F: Fn(&Section) -> Section,
{
    replace_with(forest, target_id, &transform)
}

fn replace_with<F>(forest: &[Section], target_id: &str, transform: &F) -> Vec<Section>
where
    F: Fn(&Section) -> Section,
{
    forest
        .iter()
        .map(|section| {
            if section.id == target_id {
                transform(section)
            } else {
                Section {
                    subsections: replace_with(&section.subsections, target_id, transform),
                    ..section.clone()
                }
            }
        })
        .collect()
}

/// Returns a new forest without any section whose id equals `target_id`.
///
/// Removing a node drops its whole subtree, including the todos and files it
/// holds. Applying the operation twice equals applying it once.
pub fn remove_section(forest: &[Section], target_id: &str) -> Vec<Section> {
    forest
        .iter()
        .filter(|section| section.id != target_id)
        .map(|section| Section {
            subsections: remove_section(&section.subsections, target_id),
            ..section.clone()
        })
        .collect()
}

/// Depth-first lookup of the first section with `id`.
pub fn find_section<'a>(forest: &'a [Section], id: &str) -> Option<&'a Section> {
    for section in forest {
        if section.id == id {
            return Some(section);
        }
        if let Some(found) = find_section(&section.subsections, id) {
            return Some(found);
        }
    }
    None
}

/// Returns whether `id` exists anywhere in the forest.
pub fn contains_section(forest: &[Section], id: &str) -> bool {
    find_section(forest, id).is_some()
}
