//! Document Assembler: builds the canonical `Document` from any raw payload.
//!
//! Flow: personal info → summary → sections already present in the payload →
//! sections synthesized from raw collections (`BUILD_ORDER`) → language merge →
//! mirror sync.
//!
//! The same function runs on fresh producer output and on a previously saved
//! document, so it must be a fixed point of itself: sections are only synthesized
//! for types the payload does not already carry, and language extraction finds
//! nothing to move in a skill list it already cleaned.

use serde_json::Value;
use tracing::debug;

use crate::cv::fields::{resolve_array, resolve_object, resolve_opt, resolve_str};
use crate::cv::languages::{dedup_languages, normalize_language, partition_languages};
use crate::cv::mirror::sync_mirrors;
use crate::cv::models::{Document, Item, LanguageItem, PersonalInfo, Section, SectionType};
use crate::cv::sections::{build_items, raw_collection, BUILD_ORDER};

const PERSONAL_KEYS: &[&str] = &[
    "personalInfo",
    "personal_info",
    "personalData",
    "personal",
    "contact",
];
const SUMMARY_KEYS: &[&str] = &[
    "summary",
    "profile",
    "about",
    "aboutMe",
    "professionalSummary",
    "profileSummary",
    "zusammenfassung",
];
const SECTION_LIST_KEYS: &[&str] = &["sections"];
const SECTION_TYPE_KEYS: &[&str] = &["type", "sectionType", "kind"];
const SECTION_TITLE_KEYS: &[&str] = &["title", "name", "heading"];
const SECTION_ITEM_KEYS: &[&str] = &["items", "entries"];

const NAME_KEYS: &[&str] = &["name", "fullName", "full_name"];
const FIRST_NAME_KEYS: &[&str] = &["firstName", "first_name", "vorname"];
const LAST_NAME_KEYS: &[&str] = &["lastName", "last_name", "nachname"];
const TITLE_KEYS: &[&str] = &["title", "jobTitle", "job_title", "headline", "desiredPosition"];
const EMAIL_KEYS: &[&str] = &["email", "mail", "e_mail"];
const PHONE_KEYS: &[&str] = &["phone", "telephone", "mobile", "telefon"];
const ADDRESS_KEYS: &[&str] = &["address", "street", "adresse"];
const LOCATION_KEYS: &[&str] = &["location", "city", "ort", "wohnort"];
const WEBSITE_KEYS: &[&str] = &["website", "url", "homepage"];
const LINKEDIN_KEYS: &[&str] = &["linkedin", "linkedIn", "linkedinUrl"];
const PHOTO_KEYS: &[&str] = &["photoUrl", "photo", "image", "avatar"];

/// Normalizes a raw payload into the canonical document. Never fails: malformed
/// parts degrade to empty values.
pub fn assemble(payload: &Value) -> Document {
    let mut doc = Document {
        personal_info: build_personal_info(payload),
        summary: build_summary(payload),
        ..Default::default()
    };

    let mut found_languages: Vec<LanguageItem> = Vec::new();

    for raw_section in resolve_array(payload, SECTION_LIST_KEYS) {
        match existing_section(raw_section, &mut found_languages) {
            Some(section) => doc.sections.push(section),
            None => debug!("Skipping malformed section entry: {raw_section}"),
        }
    }

    for section_type in BUILD_ORDER {
        if doc.has_section(section_type) {
            continue;
        }
        let raw = raw_collection(payload, section_type);
        let items: Vec<Item> = match section_type {
            SectionType::Skills | SectionType::SoftSkills => {
                let (skills, languages) = partition_languages(raw);
                found_languages.extend(languages.into_iter().filter_map(normalize_language));
                build_items(section_type, skills)
            }
            SectionType::Languages => {
                let mut languages: Vec<LanguageItem> =
                    raw.iter().filter_map(normalize_language).collect();
                languages.append(&mut found_languages);
                dedup_languages(languages)
                    .into_iter()
                    .map(Item::Language)
                    .collect()
            }
            _ => build_items(section_type, raw),
        };
        if !items.is_empty() {
            doc.sections.push(Section::new(section_type.clone(), items));
        }
    }

    merge_languages(&mut doc, found_languages);
    sync_mirrors(&mut doc);
    doc
}

/// A section carried by the payload itself (a previously saved document).
/// Skill-like sections hand their misfiled languages to `found_languages`.
fn existing_section(raw: &Value, found_languages: &mut Vec<LanguageItem>) -> Option<Section> {
    if !raw.is_object() {
        return None;
    }
    let section_type = SectionType::from(resolve_str(raw, SECTION_TYPE_KEYS, ""));
    let title = resolve_opt(raw, SECTION_TITLE_KEYS);
    let raw_items = resolve_array(raw, SECTION_ITEM_KEYS);

    let items = if section_type.is_skill_like() {
        let (skills, languages) = partition_languages(raw_items);
        found_languages.extend(languages.into_iter().filter_map(normalize_language));
        build_items(&section_type, skills)
    } else {
        build_items(&section_type, raw_items)
    };

    Some(Section {
        section_type,
        title,
        items,
    })
}

/// Appends languages extracted after the languages section was already in place,
/// then enforces uniqueness within that section.
fn merge_languages(doc: &mut Document, found: Vec<LanguageItem>) {
    let Some(section) = doc.section_mut(&SectionType::Languages) else {
        return;
    };
    let mut languages: Vec<LanguageItem> = section
        .items
        .iter()
        .filter_map(|item| item.as_language().cloned())
        .collect();
    languages.extend(found);
    section.items = dedup_languages(languages)
        .into_iter()
        .map(Item::Language)
        .collect();
}

fn build_personal_info(payload: &Value) -> PersonalInfo {
    let record = resolve_object(payload, PERSONAL_KEYS).unwrap_or(payload);
    let name = resolve_opt(record, NAME_KEYS).or_else(|| {
        let first = resolve_str(record, FIRST_NAME_KEYS, "");
        let last = resolve_str(record, LAST_NAME_KEYS, "");
        let full = format!("{} {}", first.trim(), last.trim());
        let full = full.trim();
        (!full.is_empty()).then(|| full.to_string())
    });

    PersonalInfo {
        name,
        title: resolve_opt(record, TITLE_KEYS),
        email: resolve_opt(record, EMAIL_KEYS),
        phone: resolve_opt(record, PHONE_KEYS),
        address: resolve_opt(record, ADDRESS_KEYS),
        location: resolve_opt(record, LOCATION_KEYS),
        website: resolve_opt(record, WEBSITE_KEYS),
        linkedin: resolve_opt(record, LINKEDIN_KEYS),
        photo_url: resolve_opt(record, PHOTO_KEYS),
    }
}

fn build_summary(payload: &Value) -> Option<String> {
    resolve_opt(payload, SUMMARY_KEYS).or_else(|| {
        resolve_object(payload, PERSONAL_KEYS).and_then(|p| resolve_opt(p, SUMMARY_KEYS))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cv::models::{EntryContent, SkillItem};
    use serde_json::json;

    fn wizard_payload() -> Value {
        json!({
            "personal": {
                "firstName": "Ada",
                "lastName": "Lovelace",
                "email": "ada@example.com",
                "jobTitle": "Engineer"
            },
            "profile": "Analytical engine enthusiast.",
            "workExperiences": [
                {
                    "position": "Engineer",
                    "company": "Babbage & Co",
                    "startDate": "1842",
                    "description": "- Wrote the first program\n- Annotated the memoir"
                },
                {
                    "jobTitle": "Consultant",
                    "employer": "Self",
                    "bulletPoints": ["Advised"],
                    "location": "London"
                }
            ],
            "education": [{"degree": "Private tutoring", "school": "Home"}],
            "projects": [{"name": "Note G", "role": "Author", "details": "Bernoulli numbers"}],
            "skills": {"hard": ["Mathematics", "Englisch", {"skill": "Französisch"}], "soft": ["Patience"]},
            "languages": [{"name": "English", "niveau": "Native"}, "englisch"],
            "hobbies": ["Horses"],
            "certificates": [{"name": "Royal Society access", "issuer": "Faraday"}],
            "values": "not a list"
        })
    }

    #[test]
    fn test_assemble_builds_sections_in_fixed_order() {
        let doc = assemble(&wizard_payload());
        let types: Vec<&str> = doc.sections.iter().map(|s| s.section_type.as_str()).collect();
        assert_eq!(
            types,
            vec![
                "experience",
                "education",
                "projects",
                "skills",
                "softSkills",
                "languages",
                "hobbies",
                "certificates"
            ]
        );
        assert_eq!(doc.personal_info.name.as_deref(), Some("Ada Lovelace"));
        assert_eq!(doc.personal_info.title.as_deref(), Some("Engineer"));
        assert_eq!(doc.summary.as_deref(), Some("Analytical engine enthusiast."));
    }

    #[test]
    fn test_assemble_is_idempotent() {
        let first = assemble(&wizard_payload());
        let second = assemble(&first.to_value());
        assert_eq!(first, second);
        let third = assemble(&second.to_value());
        assert_eq!(second, third);
    }

    #[test]
    fn test_assemble_is_idempotent_for_split_descriptions() {
        let first = assemble(&wizard_payload());
        let Item::Experience(entry) = &first.sections[0].items[0] else {
            panic!("expected experience item");
        };
        assert_eq!(
            entry.content.description(),
            "- Wrote the first program\n- Annotated the memoir"
        );
        let second = assemble(&first.to_value());
        assert_eq!(first.sections[0], second.sections[0]);
    }

    #[test]
    fn test_language_extraction_and_dedup() {
        let payload = json!({"skills": ["Excel", "Englisch", {"skill": "Englisch"}]});
        let doc = assemble(&payload);

        let skills = doc.section(&SectionType::Skills).unwrap();
        assert_eq!(skills.items, vec![Item::Skill(SkillItem::Bare("Excel".into()))]);

        let languages = doc.section(&SectionType::Languages).unwrap();
        assert_eq!(languages.items.len(), 1);
        assert_eq!(
            serde_json::to_value(&languages.items[0]).unwrap(),
            json!({"language": "Englisch", "level": ""})
        );
    }

    #[test]
    fn test_raw_languages_win_over_extracted_duplicates() {
        let doc = assemble(&wizard_payload());
        let languages: Vec<&LanguageItem> = doc
            .section(&SectionType::Languages)
            .unwrap()
            .items
            .iter()
            .filter_map(Item::as_language)
            .collect();
        let names: Vec<&str> = languages.iter().map(|l| l.language.as_str()).collect();
        assert_eq!(names, vec!["English", "englisch", "Französisch"]);
        assert_eq!(languages[0].level, "Native");
    }

    #[test]
    fn test_extracted_languages_merge_into_saved_languages_section() {
        let saved = json!({
            "sections": [
                {"type": "languages", "title": "Sprachen", "items": [{"language": "Deutsch", "level": "C2"}]},
                {"type": "skills", "items": ["Rust", "Spanisch", "deutsch"]}
            ]
        });
        let doc = assemble(&saved);
        assert_eq!(doc.sections.len(), 2);
        assert_eq!(doc.sections[0].title.as_deref(), Some("Sprachen"));
        let names: Vec<String> = doc.sections[0]
            .items
            .iter()
            .filter_map(Item::as_language)
            .map(|l| l.language.clone())
            .collect();
        assert_eq!(names, vec!["Deutsch", "Spanisch"]);
        assert_eq!(doc.sections[1].items, vec![Item::Skill(SkillItem::Bare("Rust".into()))]);
    }

    #[test]
    fn test_saved_sections_are_not_duplicated() {
        let first = assemble(&wizard_payload());
        let mut saved = first.to_value();
        // Raw collections that survived a careless merge upstream must not re-spawn sections.
        saved["experience"] = json!([{"title": "Ghost"}]);
        let second = assemble(&saved);
        assert_eq!(second.sections.len(), first.sections.len());
        assert_eq!(second.sections[0], first.sections[0]);
    }

    #[test]
    fn test_empty_collections_do_not_create_sections() {
        let doc = assemble(&json!({"experience": [], "hobbies": [null, ""]}));
        assert!(doc.sections.is_empty());
        assert!(doc.projects.is_empty());
        assert!(doc.languages.is_empty());
    }

    #[test]
    fn test_malformed_payload_yields_empty_document() {
        assert_eq!(assemble(&json!("garbage")), Document::default());
        assert_eq!(assemble(&Value::Null), Document::default());
        let doc = assemble(&json!({"sections": [42, {"type": "skills"}]}));
        assert_eq!(doc.sections.len(), 1);
        assert!(doc.sections[0].items.is_empty());
    }

    #[test]
    fn test_unknown_saved_section_survives_as_generic() {
        let saved = json!({"sections": [{"type": "volunteering", "items": [{"org": "Red Cross"}, "Tafel"]}]});
        let doc = assemble(&saved);
        let value = doc.to_value();
        assert_eq!(value["sections"][0]["type"], "volunteering");
        assert_eq!(value["sections"][0]["items"][0]["org"], "Red Cross");
        assert_eq!(value["sections"][0]["items"][1]["name"], "Tafel");
        assert_eq!(assemble(&value), doc);
    }

    /// Every non-blank scalar below `value`, as text.
    fn leaves(value: &Value, out: &mut Vec<String>) {
        match value {
            Value::Array(arr) => arr.iter().for_each(|v| leaves(v, out)),
            Value::Object(obj) => obj.values().for_each(|v| leaves(v, out)),
            Value::Null => {}
            scalar => {
                if let Some(text) = crate::cv::fields::scalar_to_string(scalar) {
                    if !text.trim().is_empty() {
                        out.push(text);
                    }
                }
            }
        }
    }

    fn item_leaves(doc: &Document) -> Vec<String> {
        let mut out = Vec::new();
        for section in doc.to_value()["sections"].as_array().into_iter().flatten() {
            leaves(&section["items"], &mut out);
        }
        out.iter().map(|s| s.to_lowercase()).collect()
    }

    fn odd_shapes_payload() -> Value {
        json!({
            "experience": [{
                "title": "Eng",
                "position": "Senior Eng",
                "bulletPoints": "Shipped the billing service"
            }],
            "skills": [{"tool": "Docker"}, {"skill": "Rust", "years": 7}],
            "certificates": [{"certificate": "AWS SAA", "name": "Cloud"}]
        })
    }

    fn nested_payload() -> Value {
        json!({
            "projects": [{
                "title": "Compiler",
                "name": "rustc fork",
                "role": "Lead",
                "client": "Mozilla",
                "startDate": {"year": 2021},
                "from": "2021-03",
                "bullets": [
                    {"text": "Wrote MIR passes", "impact": "2x"},
                    {"result": "Cut build time"},
                    ["nested", "list"]
                ]
            }],
            "education": [{"degree": "BSc", "title": "Computer Science", "school": "TU Berlin", "grade": 1.3}],
            "languages": [{"sprache": "Deutsch", "niveau": "C2", "name": "German", "certified": true}],
            "hobbies": ["Chess", {"hobby": "Climbing", "since": 2015}],
            "skills": {"hard": ["Go"], "soft": [{"name": "Mentoring", "since": "2019"}]}
        })
    }

    #[test]
    fn test_no_leaf_value_is_lost() {
        let cases = [
            (
                wizard_payload(),
                vec![
                    "workExperiences",
                    "education",
                    "projects",
                    "skills",
                    "languages",
                    "hobbies",
                    "certificates",
                ],
            ),
            (odd_shapes_payload(), vec!["experience", "skills", "certificates"]),
            (
                nested_payload(),
                vec!["projects", "education", "languages", "hobbies", "skills"],
            ),
        ];
        for (payload, collections) in cases {
            let doc = assemble(&payload);
            let kept = item_leaves(&doc);
            for key in collections {
                let mut expected = Vec::new();
                leaves(&payload[key], &mut expected);
                for leaf in expected {
                    // Duplicate languages collapse case-insensitively.
                    let leaf = leaf.to_lowercase();
                    assert!(
                        kept.iter().any(|k| k.contains(&leaf)),
                        "{key}: lost {leaf:?}, kept {kept:?}"
                    );
                }
            }
            assert_eq!(assemble(&doc.to_value()), doc, "not a fixed point: {payload}");
        }
    }

    #[test]
    fn test_odd_shapes_map_into_fields() {
        let doc = assemble(&odd_shapes_payload());
        let Item::Experience(entry) = &doc.sections[0].items[0] else {
            panic!("expected experience item");
        };
        assert_eq!(entry.title, "Eng");
        assert_eq!(entry.content.description(), "Shipped the billing service");
        assert_eq!(entry.extra["position"], "Senior Eng");
        let value = doc.to_value();
        let skills = &value["sections"][1]["items"];
        assert_eq!(skills[0], json!({"skill": "", "tool": "Docker"}));
        assert_eq!(skills[1], json!({"skill": "Rust", "years": 7}));
    }

    #[test]
    fn test_mirrors_match_sections_after_assembly() {
        let doc = assemble(&wizard_payload());
        assert_eq!(doc.projects, doc.section(&SectionType::Projects).unwrap().items);
        assert_eq!(doc.languages, doc.section(&SectionType::Languages).unwrap().items);
        let Item::Project(project) = &doc.projects[0] else {
            panic!("expected project item");
        };
        assert_eq!(
            project.content,
            EntryContent::Description {
                description: "Bernoulli numbers".into()
            }
        );
    }
}
