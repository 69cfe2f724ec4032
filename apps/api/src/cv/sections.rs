//! Section Builder: maps raw collections into typed sections.
//!
//! Each section type has a list of payload keys it may live under and an item
//! mapping. Entries the mapping does not recognize still become an item through
//! the generic fallback, so nothing is dropped silently.

use serde_json::Value;

use crate::cv::bullets::content_from_raw;
use crate::cv::fields::{
    is_absent, resolve_array, resolve_object, scalar_to_string, FieldReader,
};
use crate::cv::languages::normalize_language;
use crate::cv::models::{
    EducationItem, EntryItem, GenericItem, Item, LanguageItem, NamedSkill, SectionType, SkillItem,
};

const DATE_FROM_KEYS: &[&str] = &["dateFrom", "startDate", "start_date", "from", "start", "von"];
const DATE_TO_KEYS: &[&str] = &["dateTo", "endDate", "end_date", "to", "end", "bis"];

const EXPERIENCE_TITLE_KEYS: &[&str] = &["title", "position", "role", "jobTitle", "job_title"];
const EXPERIENCE_COMPANY_KEYS: &[&str] =
    &["company", "employer", "organization", "firma", "arbeitgeber"];

const PROJECT_TITLE_KEYS: &[&str] = &["title", "name", "projectName", "project_name"];
const PROJECT_ROLE_KEYS: &[&str] = &["role", "position", "company", "client"];

const EDUCATION_DEGREE_KEYS: &[&str] = &["degree", "title", "qualification", "abschluss"];
const EDUCATION_INSTITUTION_KEYS: &[&str] =
    &["institution", "school", "university", "schule", "hochschule"];

const SKILL_NAME_KEYS: &[&str] = &["skill", "name", "title"];

// Keys each item shape serializes. Leftovers may not reuse them.
const EXPERIENCE_OUTPUT_KEYS: &[&str] =
    &["title", "company", "dateFrom", "dateTo", "description", "bulletPoints"];
const PROJECT_OUTPUT_KEYS: &[&str] =
    &["title", "role", "dateFrom", "dateTo", "description", "bulletPoints"];
const EDUCATION_OUTPUT_KEYS: &[&str] = &["degree", "institution", "dateFrom", "dateTo"];

const GENERIC_NAME_KEYS: &[&str] = &[
    "name",
    "title",
    "value",
    "label",
    "text",
    "hobby",
    "certificate",
];

const EXPERIENCE_COLLECTION_KEYS: &[&str] = &[
    "experience",
    "experiences",
    "workExperience",
    "workExperiences",
    "work_experience",
    "berufserfahrung",
];
const EDUCATION_COLLECTION_KEYS: &[&str] = &["education", "educations", "ausbildung"];
const PROJECT_COLLECTION_KEYS: &[&str] = &["projects", "projekte"];
const SKILL_COLLECTION_KEYS: &[&str] = &["skills", "hardSkills", "hard_skills", "kenntnisse"];
const HARD_SKILL_KEYS: &[&str] = &["hard", "hardSkills", "technical"];
const SOFT_SKILL_COLLECTION_KEYS: &[&str] = &["softSkills", "soft_skills"];
const SOFT_SKILL_KEYS: &[&str] = &["soft", "softSkills"];
const LANGUAGE_COLLECTION_KEYS: &[&str] = &["languages", "sprachen", "languageSkills"];
const VALUE_COLLECTION_KEYS: &[&str] = &[
    "values",
    "workValues",
    "work_values",
    "workStyle",
    "work_style",
    "werte",
];
const HOBBY_COLLECTION_KEYS: &[&str] = &["hobbies", "interests", "hobbys"];
const CERTIFICATE_COLLECTION_KEYS: &[&str] =
    &["certificates", "certifications", "zertifikate"];

/// Section types the assembler synthesizes from raw collections, in build order.
/// Skills come before languages so extraction can feed the languages section.
pub const BUILD_ORDER: &[SectionType] = &[
    SectionType::Experience,
    SectionType::Education,
    SectionType::Projects,
    SectionType::Skills,
    SectionType::SoftSkills,
    SectionType::Languages,
    SectionType::Values,
    SectionType::Hobbies,
    SectionType::Certificates,
];

/// The raw collection for `section_type` within a whole payload.
///
/// `skills` may be a flat array or a `{ hard, soft }` object; soft skills fall back
/// to the `soft` half of that object.
pub fn raw_collection<'a>(payload: &'a Value, section_type: &SectionType) -> &'a [Value] {
    match section_type {
        SectionType::Experience => resolve_array(payload, EXPERIENCE_COLLECTION_KEYS),
        SectionType::Education => resolve_array(payload, EDUCATION_COLLECTION_KEYS),
        SectionType::Projects => resolve_array(payload, PROJECT_COLLECTION_KEYS),
        SectionType::Skills => match resolve_object(payload, SKILL_COLLECTION_KEYS) {
            Some(split) => resolve_array(split, HARD_SKILL_KEYS),
            None => resolve_array(payload, SKILL_COLLECTION_KEYS),
        },
        SectionType::SoftSkills => {
            let direct = resolve_array(payload, SOFT_SKILL_COLLECTION_KEYS);
            if !direct.is_empty() {
                return direct;
            }
            resolve_object(payload, SKILL_COLLECTION_KEYS)
                .map(|split| resolve_array(split, SOFT_SKILL_KEYS))
                .unwrap_or(&[])
        }
        SectionType::Languages => resolve_array(payload, LANGUAGE_COLLECTION_KEYS),
        SectionType::Values => resolve_array(payload, VALUE_COLLECTION_KEYS),
        SectionType::Hobbies => resolve_array(payload, HOBBY_COLLECTION_KEYS),
        SectionType::Certificates => resolve_array(payload, CERTIFICATE_COLLECTION_KEYS),
        SectionType::Other(_) => &[],
    }
}

/// Maps one raw entry into the item shape of `section_type`.
/// `None` only for absent entries (`null`, empty strings).
pub fn normalize_item(section_type: &SectionType, raw: &Value) -> Option<Item> {
    if is_absent(raw) {
        return None;
    }
    let item = match section_type {
        SectionType::Experience => Item::Experience(entry_item(
            raw,
            EXPERIENCE_TITLE_KEYS,
            EXPERIENCE_COMPANY_KEYS,
            EXPERIENCE_OUTPUT_KEYS,
        )),
        SectionType::Projects => Item::Project(entry_item(
            raw,
            PROJECT_TITLE_KEYS,
            PROJECT_ROLE_KEYS,
            PROJECT_OUTPUT_KEYS,
        )),
        SectionType::Education => Item::Education(education_item(raw)),
        SectionType::Skills | SectionType::SoftSkills => Item::Skill(skill_item(raw)),
        SectionType::Languages => Item::Language(normalize_language(raw)?),
        SectionType::Values
        | SectionType::Hobbies
        | SectionType::Certificates
        | SectionType::Other(_) => Item::Generic(generic_item(raw)),
    };
    Some(item)
}

/// A blank item of the section's shape, for the editor to fill in. Every blank
/// item survives a save and reload unchanged.
pub fn empty_item(section_type: &SectionType) -> Item {
    match section_type {
        SectionType::Experience => Item::Experience(EntryItem::default()),
        SectionType::Projects => Item::Project(EntryItem::default()),
        SectionType::Education => Item::Education(EducationItem::default()),
        SectionType::Skills | SectionType::SoftSkills => {
            Item::Skill(SkillItem::Named(NamedSkill::default()))
        }
        SectionType::Languages => Item::Language(LanguageItem::default()),
        SectionType::Values
        | SectionType::Hobbies
        | SectionType::Certificates
        | SectionType::Other(_) => Item::Generic(GenericItem::default()),
    }
}

pub fn build_items<'a, I>(section_type: &SectionType, raw: I) -> Vec<Item>
where
    I: IntoIterator<Item = &'a Value>,
{
    raw.into_iter()
        .filter_map(|entry| normalize_item(section_type, entry))
        .collect()
}

fn entry_item(
    raw: &Value,
    title_keys: &[&'static str],
    counterpart_keys: &[&'static str],
    output_keys: &[&str],
) -> EntryItem {
    if !raw.is_object() {
        return EntryItem {
            title: scalar_to_string(raw).unwrap_or_else(|| raw.to_string()),
            ..Default::default()
        };
    }
    let mut reader = FieldReader::new(raw);
    let title = reader.take(title_keys);
    let counterpart = reader.take(counterpart_keys);
    let date_from = reader.take(DATE_FROM_KEYS);
    let date_to = reader.take(DATE_TO_KEYS);
    let (content, content_keys) = content_from_raw(raw);
    reader.consume(content_keys);
    EntryItem {
        title,
        counterpart,
        date_from,
        date_to,
        content,
        extra: reader.leftovers(output_keys),
    }
}

fn education_item(raw: &Value) -> EducationItem {
    if !raw.is_object() {
        return EducationItem {
            degree: scalar_to_string(raw).unwrap_or_else(|| raw.to_string()),
            ..Default::default()
        };
    }
    let mut reader = FieldReader::new(raw);
    EducationItem {
        degree: reader.take(EDUCATION_DEGREE_KEYS),
        institution: reader.take(EDUCATION_INSTITUTION_KEYS),
        date_from: reader.take(DATE_FROM_KEYS),
        date_to: reader.take(DATE_TO_KEYS),
        extra: reader.leftovers(EDUCATION_OUTPUT_KEYS),
    }
}

fn skill_item(raw: &Value) -> SkillItem {
    match raw {
        Value::Object(_) => {
            let mut reader = FieldReader::new(raw);
            let skill = reader.take(SKILL_NAME_KEYS);
            SkillItem::Named(NamedSkill {
                skill,
                extra: reader.leftovers(&["skill"]),
            })
        }
        other => SkillItem::Bare(scalar_to_string(other).unwrap_or_else(|| other.to_string())),
    }
}

fn generic_item(raw: &Value) -> GenericItem {
    match raw {
        Value::Object(_) => {
            let mut reader = FieldReader::new(raw);
            let name = reader.take(GENERIC_NAME_KEYS);
            GenericItem {
                name,
                extra: reader.leftovers(&["name"]),
            }
        }
        other => GenericItem {
            name: scalar_to_string(other).unwrap_or_else(|| other.to_string()),
            extra: Default::default(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cv::models::EntryContent;
    use serde_json::json;

    #[test]
    fn test_experience_item_resolves_aliases_and_keeps_extras() {
        let raw = json!({
            "position": "Backend Engineer",
            "employer": "Acme",
            "startDate": "2020-01",
            "endDate": "2022-06",
            "description": "- Built APIs",
            "location": "Berlin"
        });
        let Some(Item::Experience(entry)) = normalize_item(&SectionType::Experience, &raw) else {
            panic!("expected experience item");
        };
        assert_eq!(entry.title, "Backend Engineer");
        assert_eq!(entry.counterpart, "Acme");
        assert_eq!(entry.date_from, "2020-01");
        assert_eq!(entry.date_to, "2022-06");
        assert_eq!(entry.content.description(), "- Built APIs");
        assert_eq!(entry.extra["location"], "Berlin");
    }

    #[test]
    fn test_bullets_win_over_description() {
        let raw = json!({"title": "X", "bulletPoints": ["a"], "description": "b"});
        let Some(Item::Experience(entry)) = normalize_item(&SectionType::Experience, &raw) else {
            panic!("expected experience item");
        };
        assert_eq!(
            entry.content,
            EntryContent::Bullets {
                bullet_points: vec!["a".into()]
            }
        );
        assert!(!entry.extra.contains_key("description"));
    }

    #[test]
    fn test_project_role_is_counterpart() {
        let raw = json!({"name": "Compiler", "role": "Maintainer"});
        let Some(Item::Project(entry)) = normalize_item(&SectionType::Projects, &raw) else {
            panic!("expected project item");
        };
        assert_eq!(entry.title, "Compiler");
        assert_eq!(entry.counterpart, "Maintainer");
    }

    #[test]
    fn test_skills_keep_bare_strings_and_wrap_objects() {
        let items = build_items(
            &SectionType::Skills,
            &[json!("Excel"), json!({"name": "SQL"}), json!(""), Value::Null],
        );
        assert_eq!(
            items,
            vec![
                Item::Skill(SkillItem::Bare("Excel".into())),
                Item::Skill(SkillItem::Named(NamedSkill::new("SQL"))),
            ]
        );
    }

    #[test]
    fn test_skill_objects_keep_their_other_fields() {
        let items = build_items(
            &SectionType::Skills,
            &[json!({"tool": "Docker"}), json!({"skill": "Rust", "years": 7})],
        );
        let Item::Skill(SkillItem::Named(docker)) = &items[0] else {
            panic!("expected named skill");
        };
        assert_eq!(docker.skill, "");
        assert_eq!(docker.extra["tool"], "Docker");
        let Item::Skill(SkillItem::Named(rust)) = &items[1] else {
            panic!("expected named skill");
        };
        assert_eq!(rust.skill, "Rust");
        assert_eq!(rust.extra["years"], 7);
    }

    #[test]
    fn test_losing_aliases_are_kept_as_extras() {
        let raw = json!({"title": "Eng", "position": "Senior Eng", "company": {"name": "Acme"}});
        let Some(Item::Experience(entry)) = normalize_item(&SectionType::Experience, &raw) else {
            panic!("expected experience item");
        };
        assert_eq!(entry.title, "Eng");
        assert_eq!(entry.extra["position"], "Senior Eng");
        assert_eq!(entry.extra["companyRaw"], json!({"name": "Acme"}));
        assert!(!entry.extra.contains_key("company"));

        let cert = json!({"certificate": "AWS SAA", "name": "Cloud"});
        let Some(Item::Generic(generic)) = normalize_item(&SectionType::Certificates, &cert) else {
            panic!("expected generic item");
        };
        assert_eq!(generic.name, "Cloud");
        assert_eq!(generic.extra["certificate"], "AWS SAA");
    }

    #[test]
    fn test_empty_items_normalize_to_themselves() {
        for section_type in BUILD_ORDER {
            let blank = empty_item(section_type);
            let value = serde_json::to_value(&blank).unwrap();
            assert_eq!(normalize_item(section_type, &value), Some(blank), "{section_type:?}");
        }
    }

    #[test]
    fn test_unknown_type_falls_back_to_generic() {
        let custom = SectionType::Other("volunteering".into());
        let items = build_items(&custom, &[json!({"organisation": "Red Cross"}), json!(7)]);
        let Item::Generic(first) = &items[0] else {
            panic!("expected generic item");
        };
        assert_eq!(first.name, "");
        assert_eq!(first.extra["organisation"], "Red Cross");
        assert_eq!(items[1], Item::Generic(GenericItem { name: "7".into(), extra: Default::default() }));
    }

    #[test]
    fn test_absent_entries_are_skipped() {
        assert!(build_items(&SectionType::Hobbies, &[Value::Null, json!("  ")]).is_empty());
        assert_eq!(build_items(&SectionType::Hobbies, &[json!("Chess")]).len(), 1);
    }

    #[test]
    fn test_raw_collection_handles_split_skills() {
        let payload = json!({"skills": {"hard": ["Rust"], "soft": ["Teamwork"]}});
        assert_eq!(raw_collection(&payload, &SectionType::Skills), &[json!("Rust")]);
        assert_eq!(raw_collection(&payload, &SectionType::SoftSkills), &[json!("Teamwork")]);
    }

    #[test]
    fn test_raw_collection_prefers_direct_soft_skills() {
        let payload = json!({"skills": ["Rust"], "soft_skills": ["Patience"]});
        assert_eq!(raw_collection(&payload, &SectionType::Skills), &[json!("Rust")]);
        assert_eq!(raw_collection(&payload, &SectionType::SoftSkills), &[json!("Patience")]);
    }
}
