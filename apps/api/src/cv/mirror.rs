//! Mirror Synchronizer: recomputes the top-level `projects` / `languages` views.
//!
//! Runs at the end of every assembly and before every persistence call. Nothing
//! else writes the mirrors, so between two edits they may lag behind the sections.

use crate::cv::models::{Document, Item, SectionType};

fn section_items(doc: &Document, section_type: &SectionType) -> Vec<Item> {
    doc.section(section_type)
        .map(|s| s.items.clone())
        .unwrap_or_default()
}

pub fn sync_mirrors(doc: &mut Document) {
    doc.projects = section_items(doc, &SectionType::Projects);
    doc.languages = section_items(doc, &SectionType::Languages);
}

pub fn mirrors_in_sync(doc: &Document) -> bool {
    doc.projects == section_items(doc, &SectionType::Projects)
        && doc.languages == section_items(doc, &SectionType::Languages)
}
