//! Mutation API: index-addressed edits issued by the editor.
//!
//! Every operation returns whether it was applied. Out-of-range indices and
//! fields an item cannot take are logged and ignored; the document is left
//! exactly as it was. Mirrors are never touched here.

use serde::Deserialize;
use serde_json::Value;
use tracing::warn;

use crate::cv::bullets;
use crate::cv::fields::scalar_to_string;
use crate::cv::languages::dedup_languages;
use crate::cv::models::{Document, EntryItem, Item, ItemFields, Section, SectionType};
use crate::cv::sections::{build_items, empty_item, normalize_item};

/// Partial update for one section. Absent fields are left unchanged; an empty
/// title clears it.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SectionPatch {
    pub title: Option<String>,
    pub items: Option<Vec<Value>>,
}

impl Document {
    pub fn update_personal_info(&mut self, field: &str, value: &str) -> bool {
        let Some(slot) = self.personal_info.field_mut(field) else {
            warn!("Ignoring update of unknown personal info field '{field}'");
            return false;
        };
        *slot = non_empty(value);
        true
    }

    pub fn update_summary(&mut self, value: &str) -> bool {
        self.summary = non_empty(value);
        true
    }

    pub fn update_section(&mut self, section_index: usize, patch: SectionPatch) -> bool {
        let Some(section) = self.section_at(section_index) else {
            return false;
        };
        if let Some(title) = patch.title {
            section.title = non_empty(&title);
        }
        if let Some(items) = patch.items {
            let items = build_items(&section.section_type, &items);
            section.items = if section.section_type == SectionType::Languages {
                let languages = items.into_iter().filter_map(Item::into_language).collect();
                dedup_languages(languages).into_iter().map(Item::Language).collect()
            } else {
                items
            };
        }
        true
    }

    /// Sets `field` on one item. A bare skill string is wrapped into `{ skill }`
    /// before the write. Renaming a language onto one already listed is refused.
    pub fn update_section_item(
        &mut self,
        section_index: usize,
        item_index: usize,
        field: &str,
        value: &Value,
    ) -> bool {
        if matches!(field, "language" | "name") {
            let renamed = scalar_to_string(value).unwrap_or_default();
            if self.language_taken(section_index, &renamed, Some(item_index)) {
                warn!("Language '{renamed}' is already listed in section {section_index}");
                return false;
            }
        }
        let Some(item) = self.item_at(section_index, item_index) else {
            return false;
        };
        if !item.set_field(field, value) {
            warn!("Field '{field}' is not writable on item {section_index}/{item_index}");
            return false;
        }
        true
    }

    pub fn delete_section_item(&mut self, section_index: usize, item_index: usize) -> bool {
        let Some(section) = self.section_at(section_index) else {
            return false;
        };
        if item_index >= section.items.len() {
            warn!(
                "Item index {item_index} out of range for section {section_index} ({} items)",
                section.items.len()
            );
            return false;
        }
        section.items.remove(item_index);
        true
    }

    /// Appends one raw entry, normalized with the section's item mapping. A
    /// language already listed in the section is refused.
    pub fn add_section_item(&mut self, section_index: usize, raw: &Value) -> bool {
        let Some(section) = self.section_at(section_index) else {
            return false;
        };
        let item = normalize_item(&section.section_type, raw)
            .unwrap_or_else(|| empty_item(&section.section_type));
        if let Some(lang) = item.as_language() {
            if self.language_taken(section_index, &lang.language, None) {
                warn!("Language '{}' is already listed in section {section_index}", lang.language);
                return false;
            }
        }
        let Some(section) = self.section_at(section_index) else {
            return false;
        };
        section.items.push(item);
        true
    }

    /// Adds an empty section of `section_type` unless one already exists.
    pub fn add_section(&mut self, section_type: SectionType, title: Option<String>) -> bool {
        if self.has_section(&section_type) {
            warn!("Section '{}' already exists", section_type.as_str());
            return false;
        }
        let mut section = Section::new(section_type, Vec::new());
        if let Some(title) = title {
            section.title = non_empty(&title);
        }
        self.sections.push(section);
        true
    }

    pub fn move_section(&mut self, from: usize, to: usize) -> bool {
        let len = self.sections.len();
        if from >= len || to >= len {
            warn!("Cannot move section {from} to {to}: {len} sections");
            return false;
        }
        let section = self.sections.remove(from);
        self.sections.insert(to, section);
        true
    }

    pub fn add_bullet(&mut self, section_index: usize, item_index: usize) -> bool {
        let Some(entry) = self.entry_at(section_index, item_index) else {
            return false;
        };
        bullets::promote_to_bullets(&mut entry.content);
        true
    }

    pub fn update_bullet(
        &mut self,
        section_index: usize,
        item_index: usize,
        bullet_index: usize,
        text: &str,
    ) -> bool {
        let Some(entry) = self.entry_at(section_index, item_index) else {
            return false;
        };
        if !bullets::update_bullet(&mut entry.content, bullet_index, text) {
            warn!("Bullet {bullet_index} out of range on item {section_index}/{item_index}");
            return false;
        }
        true
    }

    pub fn delete_bullet(
        &mut self,
        section_index: usize,
        item_index: usize,
        bullet_index: usize,
    ) -> bool {
        let Some(entry) = self.entry_at(section_index, item_index) else {
            return false;
        };
        if !bullets::delete_bullet(&mut entry.content, bullet_index) {
            warn!("Bullet {bullet_index} out of range on item {section_index}/{item_index}");
            return false;
        }
        true
    }

    /// Whether `language` matches (trimmed, case-insensitive) an entry of the
    /// languages section at `section_index` other than `skip`. Blank never matches.
    fn language_taken(&self, section_index: usize, language: &str, skip: Option<usize>) -> bool {
        let key = language.trim().to_lowercase();
        let Some(section) = self.sections.get(section_index) else {
            return false;
        };
        if key.is_empty() || section.section_type != SectionType::Languages {
            return false;
        }
        section
            .items
            .iter()
            .enumerate()
            .filter(|(i, _)| Some(*i) != skip)
            .filter_map(|(_, item)| item.as_language())
            .any(|lang| lang.dedup_key() == key)
    }

    fn section_at(&mut self, section_index: usize) -> Option<&mut Section> {
        let len = self.sections.len();
        let section = self.sections.get_mut(section_index);
        if section.is_none() {
            warn!("Section index {section_index} out of range ({len} sections)");
        }
        section
    }

    fn item_at(&mut self, section_index: usize, item_index: usize) -> Option<&mut Item> {
        let section = self.section_at(section_index)?;
        let len = section.items.len();
        let item = section.items.get_mut(item_index);
        if item.is_none() {
            warn!("Item index {item_index} out of range for section {section_index} ({len} items)");
        }
        item
    }

    fn entry_at(&mut self, section_index: usize, item_index: usize) -> Option<&mut EntryItem> {
        let entry = self.item_at(section_index, item_index)?.as_entry_mut();
        if entry.is_none() {
            warn!("Item {section_index}/{item_index} does not carry bullets");
        }
        entry
    }
}

fn non_empty(value: &str) -> Option<String> {
    (!value.trim().is_empty()).then(|| value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cv::assembler::assemble;
    use crate::cv::mirror::{mirrors_in_sync, sync_mirrors};
    use crate::cv::models::{LanguageItem, NamedSkill, SkillItem};
    use serde_json::json;

    fn sample() -> Document {
        assemble(&json!({
            "personalInfo": {"name": "Grace Hopper"},
            "experience": [{"title": "Rear Admiral", "company": "US Navy", "description": "- Built COBOL\n- Found a moth"}],
            "projects": [{"title": "FLOW-MATIC", "role": "Lead"}],
            "skills": ["Excel", "Assembly"],
            "languages": ["English"]
        }))
    }

    #[test]
    fn test_update_personal_info_and_summary() {
        let mut doc = sample();
        assert!(doc.update_personal_info("email", "grace@navy.mil"));
        assert!(doc.update_personal_info("name", ""));
        assert!(!doc.update_personal_info("shoeSize", "9"));
        assert!(doc.update_summary("Pioneer"));
        assert_eq!(doc.personal_info.email.as_deref(), Some("grace@navy.mil"));
        assert_eq!(doc.personal_info.name, None);
        assert_eq!(doc.summary.as_deref(), Some("Pioneer"));
    }

    #[test]
    fn test_update_section_item_wraps_bare_skill() {
        let mut doc = sample();
        assert!(doc.update_section_item(2, 0, "skill", &json!("Excel 97")));
        assert!(doc.update_section_item(2, 0, "skill", &json!("Excel 2003")));
        assert_eq!(
            doc.sections[2].items[0],
            Item::Skill(SkillItem::Named(NamedSkill::new("Excel 2003")))
        );
        assert_eq!(doc.sections[2].items[1], Item::Skill(SkillItem::Bare("Assembly".into())));
    }

    #[test]
    fn test_out_of_range_mutations_leave_document_unchanged() {
        let mut doc = sample();
        let before = doc.clone();
        assert!(!doc.update_section_item(0, 5, "title", &json!("x")));
        assert!(!doc.update_section_item(9, 0, "title", &json!("x")));
        assert!(!doc.delete_section_item(1, 3));
        assert!(!doc.update_section(7, SectionPatch::default()));
        assert!(!doc.add_section_item(7, &json!({})));
        assert!(!doc.update_bullet(0, 0, 10, "x"));
        assert!(!doc.delete_bullet(0, 0, 10));
        assert!(!doc.add_bullet(3, 0));
        assert!(!doc.move_section(0, 99));
        assert_eq!(doc, before);
    }

    #[test]
    fn test_bullet_editing_flow() {
        let mut doc = sample();
        assert!(doc.add_bullet(0, 0));
        assert!(doc.update_bullet(0, 0, 2, "Coined 'debugging'"));
        assert!(doc.update_bullet(0, 0, 0, "Built COBOL compilers"));
        let Item::Experience(entry) = &doc.sections[0].items[0] else {
            panic!("expected experience item");
        };
        assert_eq!(
            entry.content.bullet_points().unwrap(),
            &["Built COBOL compilers", "Found a moth", "Coined 'debugging'"]
        );
        assert_eq!(entry.content.description(), "");
        assert!(!doc.update_section_item(0, 0, "description", &json!("back to text")));
    }

    #[test]
    fn test_update_section_renormalizes_items() {
        let mut doc = sample();
        let patch = SectionPatch {
            title: Some("Sprachen".into()),
            items: Some(vec![json!({"name": "Deutsch", "niveau": "B1"}), json!(null)]),
        };
        assert!(doc.update_section(3, patch));
        assert_eq!(doc.sections[3].title.as_deref(), Some("Sprachen"));
        assert_eq!(
            serde_json::to_value(&doc.sections[3].items).unwrap(),
            json!([{"language": "Deutsch", "level": "B1"}])
        );
    }

    #[test]
    fn test_add_and_delete_items() {
        let mut doc = sample();
        assert!(doc.add_section_item(1, &json!({"title": "A-0"})));
        assert!(doc.add_section_item(1, &Value::Null));
        assert_eq!(doc.sections[1].items.len(), 3);
        assert!(matches!(doc.sections[1].items[2], Item::Project(_)));
        assert!(doc.delete_section_item(1, 0));
        assert_eq!(doc.sections[1].items.len(), 2);
        assert!(doc.add_section_item(3, &json!({})));
        assert_eq!(doc.sections[3].items[1], Item::Language(Default::default()));
    }

    #[test]
    fn test_add_and_move_sections() {
        let mut doc = sample();
        assert!(!doc.add_section(SectionType::Skills, None));
        assert!(doc.add_section(SectionType::Hobbies, Some("Freizeit".into())));
        let last = doc.sections.len() - 1;
        assert!(doc.move_section(last, 0));
        assert_eq!(doc.sections[0].section_type, SectionType::Hobbies);
        assert_eq!(doc.sections[0].title.as_deref(), Some("Freizeit"));
        assert!(doc.sections[0].items.is_empty());
    }

    #[test]
    fn test_mirrors_consistent_after_edits_and_sync() {
        let mut doc = sample();
        doc.delete_section_item(1, 0);
        doc.add_section_item(3, &json!("Deutsch"));
        assert!(!mirrors_in_sync(&doc));
        sync_mirrors(&mut doc);
        assert!(mirrors_in_sync(&doc));
        assert!(doc.projects.is_empty());
        assert_eq!(doc.languages.len(), 2);
    }

    fn language_names(doc: &Document) -> Vec<&str> {
        doc.sections[3]
            .items
            .iter()
            .filter_map(Item::as_language)
            .map(|l| l.language.as_str())
            .collect()
    }

    #[test]
    fn test_adding_a_listed_language_is_refused() {
        let mut doc = sample();
        assert!(!doc.add_section_item(3, &json!(" english ")));
        assert!(doc.add_section_item(3, &json!({"name": "Deutsch", "niveau": "B1"})));
        assert!(!doc.add_section_item(3, &json!({"language": "DEUTSCH"})));
        assert_eq!(language_names(&doc), vec!["English", "Deutsch"]);
    }

    #[test]
    fn test_renaming_onto_a_listed_language_is_refused() {
        let mut doc = sample();
        assert!(doc.add_section_item(3, &json!("Deutsch")));
        assert!(!doc.update_section_item(3, 1, "language", &json!("ENGLISH")));
        assert!(!doc.update_section_item(3, 1, "name", &json!("English ")));
        assert_eq!(language_names(&doc), vec!["English", "Deutsch"]);
        // Re-casing an entry does not collide with itself.
        assert!(doc.update_section_item(3, 0, "language", &json!("english")));
        assert_eq!(language_names(&doc), vec!["english", "Deutsch"]);
    }

    #[test]
    fn test_update_section_dedups_languages() {
        let mut doc = sample();
        let patch = SectionPatch {
            title: None,
            items: Some(vec![json!("English"), json!({"language": "english ", "level": "C1"}), json!("Deutsch")]),
        };
        assert!(doc.update_section(3, patch));
        assert_eq!(language_names(&doc), vec!["English", "Deutsch"]);
    }

    #[test]
    fn test_blank_items_survive_save_and_reload() {
        let mut doc = sample();
        assert!(doc.add_section_item(0, &Value::Null));
        assert!(doc.add_section_item(1, &Value::Null));
        assert!(doc.add_section_item(2, &Value::Null));
        assert!(doc.add_section_item(3, &Value::Null));
        assert!(doc.add_section_item(3, &json!({})));
        assert!(doc.add_section(SectionType::Education, None));
        assert!(doc.add_section_item(4, &Value::Null));
        assert!(doc.add_section(SectionType::Other("volunteering".into()), None));
        assert!(doc.add_section_item(5, &Value::Null));
        assert_eq!(doc.sections[2].items[2], Item::Skill(SkillItem::Named(NamedSkill::default())));
        assert_eq!(doc.sections[3].items[1], Item::Language(LanguageItem::default()));

        sync_mirrors(&mut doc);
        let reloaded = assemble(&doc.to_value());
        assert_eq!(reloaded, doc);
    }
}
