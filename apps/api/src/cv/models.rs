//! Canonical CV document model.
//!
//! Only the assembler builds these types from raw JSON. They serialize back to the
//! plain object that is handed to persistence and to the rendering templates.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;

use crate::cv::fields::scalar_to_string;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonalInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub linkedin: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub photo_url: Option<String>,
}

impl PersonalInfo {
    /// Mutable slot for a field by its serialized name. `None` for unknown fields.
    pub fn field_mut(&mut self, field: &str) -> Option<&mut Option<String>> {
        let slot = match field {
            "name" => &mut self.name,
            "title" => &mut self.title,
            "email" => &mut self.email,
            "phone" => &mut self.phone,
            "address" => &mut self.address,
            "location" => &mut self.location,
            "website" => &mut self.website,
            "linkedin" => &mut self.linkedin,
            "photoUrl" => &mut self.photo_url,
            _ => return None,
        };
        Some(slot)
    }

    /// Non-empty fields in display order, as `(field, value)` pairs.
    pub fn entries(&self) -> Vec<(&'static str, &str)> {
        [
            ("name", &self.name),
            ("title", &self.title),
            ("email", &self.email),
            ("phone", &self.phone),
            ("address", &self.address),
            ("location", &self.location),
            ("website", &self.website),
            ("linkedin", &self.linkedin),
            ("photoUrl", &self.photo_url),
        ]
        .into_iter()
        .filter_map(|(k, v)| v.as_deref().map(|v| (k, v)))
        .collect()
    }
}

/// Discriminates the item shape of a section. Unrecognized tags are kept verbatim
/// in `Other` so they survive a save/reload cycle.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum SectionType {
    Experience,
    Education,
    Projects,
    Skills,
    SoftSkills,
    Languages,
    Values,
    Hobbies,
    Certificates,
    Other(String),
}

impl SectionType {
    pub fn as_str(&self) -> &str {
        match self {
            SectionType::Experience => "experience",
            SectionType::Education => "education",
            SectionType::Projects => "projects",
            SectionType::Skills => "skills",
            SectionType::SoftSkills => "softSkills",
            SectionType::Languages => "languages",
            SectionType::Values => "values",
            SectionType::Hobbies => "hobbies",
            SectionType::Certificates => "certificates",
            SectionType::Other(tag) => tag,
        }
    }

    pub fn default_title(&self) -> Option<&'static str> {
        match self {
            SectionType::Experience => Some("Experience"),
            SectionType::Education => Some("Education"),
            SectionType::Projects => Some("Projects"),
            SectionType::Skills => Some("Skills"),
            SectionType::SoftSkills => Some("Soft Skills"),
            SectionType::Languages => Some("Languages"),
            SectionType::Values => Some("Values"),
            SectionType::Hobbies => Some("Hobbies"),
            SectionType::Certificates => Some("Certificates"),
            SectionType::Other(_) => None,
        }
    }

    /// Sections whose raw items are scanned for misfiled languages.
    pub fn is_skill_like(&self) -> bool {
        matches!(self, SectionType::Skills | SectionType::SoftSkills)
    }
}

impl From<String> for SectionType {
    fn from(tag: String) -> Self {
        let normalized: String = tag
            .trim()
            .chars()
            .filter(|c| !matches!(c, '_' | '-' | ' '))
            .collect::<String>()
            .to_lowercase();
        match normalized.as_str() {
            "experience" | "experiences" | "workexperience" | "workexperiences" => {
                SectionType::Experience
            }
            "education" | "educations" => SectionType::Education,
            "projects" | "project" => SectionType::Projects,
            "skills" | "skill" | "hardskills" => SectionType::Skills,
            "softskills" => SectionType::SoftSkills,
            "languages" | "language" => SectionType::Languages,
            "values" | "workvalues" | "workstyle" => SectionType::Values,
            "hobbies" | "interests" => SectionType::Hobbies,
            "certificates" | "certifications" => SectionType::Certificates,
            _ => SectionType::Other(tag),
        }
    }
}

impl From<SectionType> for String {
    fn from(section_type: SectionType) -> Self {
        match section_type {
            SectionType::Other(tag) => tag,
            known => known.as_str().to_string(),
        }
    }
}

/// Capability shared by every item shape: text rendering and field updates by name.
pub trait ItemFields {
    fn render_text(&self) -> String;

    /// Sets `field` to `value`. Returns `false` when the field is not writable on
    /// this shape; the item is then left untouched.
    fn set_field(&mut self, field: &str, value: &Value) -> bool;
}

/// The authoritative content of an experience or project entry.
///
/// Once an entry holds `Bullets`, the description is gone for good.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum EntryContent {
    Bullets {
        #[serde(rename = "bulletPoints")]
        bullet_points: Vec<String>,
    },
    Description {
        description: String,
    },
}

impl EntryContent {
    pub fn description(&self) -> &str {
        match self {
            EntryContent::Description { description } => description,
            EntryContent::Bullets { .. } => "",
        }
    }

    pub fn bullet_points(&self) -> Option<&[String]> {
        match self {
            EntryContent::Bullets { bullet_points } => Some(bullet_points),
            EntryContent::Description { .. } => None,
        }
    }
}

impl Default for EntryContent {
    fn default() -> Self {
        EntryContent::Description {
            description: String::new(),
        }
    }
}

/// Experience or project entry. `counterpart` is the company for experience and
/// the role for projects.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EntryItem {
    pub title: String,
    pub counterpart: String,
    pub date_from: String,
    pub date_to: String,
    pub content: EntryContent,
    pub extra: BTreeMap<String, Value>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ExperienceView<'a> {
    title: &'a str,
    company: &'a str,
    date_from: &'a str,
    date_to: &'a str,
    #[serde(flatten)]
    content: &'a EntryContent,
    #[serde(flatten)]
    extra: &'a BTreeMap<String, Value>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ProjectView<'a> {
    title: &'a str,
    role: &'a str,
    date_from: &'a str,
    date_to: &'a str,
    #[serde(flatten)]
    content: &'a EntryContent,
    #[serde(flatten)]
    extra: &'a BTreeMap<String, Value>,
}

impl ItemFields for EntryItem {
    fn render_text(&self) -> String {
        let mut out = join_non_empty(&[&self.title, &self.counterpart], " – ");
        let dates = date_range(&self.date_from, &self.date_to);
        if !dates.is_empty() {
            out.push_str(&format!(" ({dates})"));
        }
        match &self.content {
            EntryContent::Bullets { bullet_points } => {
                for bullet in bullet_points.iter().filter(|b| !b.trim().is_empty()) {
                    out.push_str(&format!("\n- {bullet}"));
                }
            }
            EntryContent::Description { description } if !description.trim().is_empty() => {
                out.push('\n');
                out.push_str(description);
            }
            EntryContent::Description { .. } => {}
        }
        out
    }

    fn set_field(&mut self, field: &str, value: &Value) -> bool {
        match field {
            "bulletPoints" => {
                let Some(arr) = value.as_array() else {
                    return false;
                };
                self.content = EntryContent::Bullets {
                    bullet_points: arr
                        .iter()
                        .map(|v| scalar_to_string(v).unwrap_or_default())
                        .collect(),
                };
                true
            }
            "description" => match &mut self.content {
                EntryContent::Description { description } => {
                    set_string(description, value)
                }
                EntryContent::Bullets { .. } => false,
            },
            "title" => set_string(&mut self.title, value),
            "company" | "role" | "counterpart" => set_string(&mut self.counterpart, value),
            "dateFrom" => set_string(&mut self.date_from, value),
            "dateTo" => set_string(&mut self.date_to, value),
            other => set_extra(&mut self.extra, other, value),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EducationItem {
    pub degree: String,
    pub institution: String,
    pub date_from: String,
    pub date_to: String,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl ItemFields for EducationItem {
    fn render_text(&self) -> String {
        let mut out = join_non_empty(&[&self.degree, &self.institution], ", ");
        let dates = date_range(&self.date_from, &self.date_to);
        if !dates.is_empty() {
            out.push_str(&format!(" ({dates})"));
        }
        out
    }

    fn set_field(&mut self, field: &str, value: &Value) -> bool {
        match field {
            "degree" => set_string(&mut self.degree, value),
            "institution" => set_string(&mut self.institution, value),
            "dateFrom" => set_string(&mut self.date_from, value),
            "dateTo" => set_string(&mut self.date_to, value),
            other => set_extra(&mut self.extra, other, value),
        }
    }
}

/// A skill is valid at rest either as a bare string or as `{ "skill": ... }`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SkillItem {
    Bare(String),
    Named(NamedSkill),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct NamedSkill {
    pub skill: String,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl NamedSkill {
    pub fn new(skill: impl Into<String>) -> Self {
        Self {
            skill: skill.into(),
            extra: BTreeMap::new(),
        }
    }
}

impl SkillItem {
    pub fn skill(&self) -> &str {
        match self {
            SkillItem::Bare(s) => s,
            SkillItem::Named(named) => &named.skill,
        }
    }

    /// Wraps a bare string into the object shape. No-op when already wrapped.
    pub fn wrap(&mut self) {
        if let SkillItem::Bare(s) = self {
            *self = SkillItem::Named(NamedSkill::new(std::mem::take(s)));
        }
    }
}

impl ItemFields for SkillItem {
    fn render_text(&self) -> String {
        match self {
            SkillItem::Named(named) => with_details(&named.skill, &named.extra),
            SkillItem::Bare(s) => s.clone(),
        }
    }

    fn set_field(&mut self, field: &str, value: &Value) -> bool {
        self.wrap();
        let SkillItem::Named(named) = self else {
            return false;
        };
        match field {
            "skill" | "name" => set_string(&mut named.skill, value),
            other => set_extra(&mut named.extra, other, value),
        }
    }
}

/// Editable fields are `language` and `level`. Anything else an upstream entry
/// carried is kept in `extra` but cannot be edited.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LanguageItem {
    pub language: String,
    pub level: String,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl LanguageItem {
    pub fn new(language: impl Into<String>, level: impl Into<String>) -> Self {
        Self {
            language: language.into(),
            level: level.into(),
            extra: BTreeMap::new(),
        }
    }

    /// Key under which two entries count as the same language.
    pub fn dedup_key(&self) -> String {
        self.language.trim().to_lowercase()
    }
}

impl ItemFields for LanguageItem {
    fn render_text(&self) -> String {
        if self.level.trim().is_empty() {
            self.language.clone()
        } else {
            format!("{} ({})", self.language, self.level)
        }
    }

    fn set_field(&mut self, field: &str, value: &Value) -> bool {
        match field {
            "language" | "name" => set_string(&mut self.language, value),
            "level" => set_string(&mut self.level, value),
            _ => false,
        }
    }
}

/// Fallback shape for values, hobbies, certificates and unrecognized section types.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GenericItem {
    pub name: String,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl ItemFields for GenericItem {
    fn render_text(&self) -> String {
        with_details(&self.name, &self.extra)
    }

    fn set_field(&mut self, field: &str, value: &Value) -> bool {
        match field {
            "name" => set_string(&mut self.name, value),
            other => set_extra(&mut self.extra, other, value),
        }
    }
}

/// One entry of a section. The variant is selected by the owning section's type.
#[derive(Debug, Clone, PartialEq)]
pub enum Item {
    Experience(EntryItem),
    Project(EntryItem),
    Education(EducationItem),
    Skill(SkillItem),
    Language(LanguageItem),
    Generic(GenericItem),
}

impl Item {
    pub fn as_entry_mut(&mut self) -> Option<&mut EntryItem> {
        match self {
            Item::Experience(entry) | Item::Project(entry) => Some(entry),
            _ => None,
        }
    }

    pub fn as_language(&self) -> Option<&LanguageItem> {
        match self {
            Item::Language(lang) => Some(lang),
            _ => None,
        }
    }

    pub fn into_language(self) -> Option<LanguageItem> {
        match self {
            Item::Language(lang) => Some(lang),
            _ => None,
        }
    }

    fn fields(&self) -> &dyn ItemFields {
        match self {
            Item::Experience(e) | Item::Project(e) => e,
            Item::Education(e) => e,
            Item::Skill(s) => s,
            Item::Language(l) => l,
            Item::Generic(g) => g,
        }
    }

    fn fields_mut(&mut self) -> &mut dyn ItemFields {
        match self {
            Item::Experience(e) | Item::Project(e) => e,
            Item::Education(e) => e,
            Item::Skill(s) => s,
            Item::Language(l) => l,
            Item::Generic(g) => g,
        }
    }
}

impl ItemFields for Item {
    fn render_text(&self) -> String {
        self.fields().render_text()
    }

    fn set_field(&mut self, field: &str, value: &Value) -> bool {
        self.fields_mut().set_field(field, value)
    }
}

impl Serialize for Item {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Item::Experience(e) => ExperienceView {
                title: &e.title,
                company: &e.counterpart,
                date_from: &e.date_from,
                date_to: &e.date_to,
                content: &e.content,
                extra: &e.extra,
            }
            .serialize(serializer),
            Item::Project(e) => ProjectView {
                title: &e.title,
                role: &e.counterpart,
                date_from: &e.date_from,
                date_to: &e.date_to,
                content: &e.content,
                extra: &e.extra,
            }
            .serialize(serializer),
            Item::Education(e) => e.serialize(serializer),
            Item::Skill(s) => s.serialize(serializer),
            Item::Language(l) => l.serialize(serializer),
            Item::Generic(g) => g.serialize(serializer),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Section {
    #[serde(rename = "type")]
    pub section_type: SectionType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub items: Vec<Item>,
}

impl Section {
    /// A section with the type's default title.
    pub fn new(section_type: SectionType, items: Vec<Item>) -> Self {
        let title = section_type.default_title().map(String::from);
        Self {
            section_type,
            title,
            items,
        }
    }
}

/// The canonical document. `projects` and `languages` are mirrors of the matching
/// sections and are only ever written by `cv::mirror::sync_mirrors`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub personal_info: PersonalInfo,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    pub sections: Vec<Section>,
    pub projects: Vec<Item>,
    pub languages: Vec<Item>,
}

impl Document {
    pub fn section(&self, section_type: &SectionType) -> Option<&Section> {
        self.sections
            .iter()
            .find(|s| &s.section_type == section_type)
    }

    pub fn section_mut(&mut self, section_type: &SectionType) -> Option<&mut Section> {
        self.sections
            .iter_mut()
            .find(|s| &s.section_type == section_type)
    }

    pub fn has_section(&self, section_type: &SectionType) -> bool {
        self.section(section_type).is_some()
    }

    /// No personal info, no summary and no section with items.
    pub fn is_empty(&self) -> bool {
        self.personal_info.entries().is_empty()
            && self.summary.is_none()
            && self.sections.iter().all(|s| s.items.is_empty())
    }

    /// Plain JSON form handed to persistence and templates.
    pub fn to_value(&self) -> Value {
        // Only string-keyed maps and plain data below; serialization cannot fail.
        serde_json::to_value(self).unwrap_or_default()
    }
}

fn set_string(slot: &mut String, value: &Value) -> bool {
    match value {
        Value::Null => {
            slot.clear();
            true
        }
        other => match scalar_to_string(other) {
            Some(s) => {
                *slot = s;
                true
            }
            None => false,
        },
    }
}

fn set_extra(extra: &mut BTreeMap<String, Value>, field: &str, value: &Value) -> bool {
    if field.is_empty() {
        return false;
    }
    if value.is_null() {
        extra.remove(field);
    } else {
        extra.insert(field.to_string(), value.clone());
    }
    true
}

/// `name (a, b)` with the scalar extras as details.
fn with_details(name: &str, extra: &BTreeMap<String, Value>) -> String {
    let details: Vec<String> = extra
        .values()
        .filter_map(scalar_to_string)
        .filter(|s| !s.trim().is_empty())
        .collect();
    if details.is_empty() {
        name.to_string()
    } else {
        format!("{name} ({})", details.join(", "))
    }
}

fn join_non_empty(parts: &[&str], sep: &str) -> String {
    parts
        .iter()
        .map(|p| p.trim())
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>()
        .join(sep)
}

fn date_range(from: &str, to: &str) -> String {
    match (from.trim(), to.trim()) {
        ("", "") => String::new(),
        (from, "") => format!("{from} –"),
        ("", to) => to.to_string(),
        (from, to) => format!("{from} – {to}"),
    }
}
