use crate::cv::models::{Document, ItemFields};

/// Renders a document as Markdown: header, contact lines, summary, then every
/// section in document order. Empty sections are skipped.
pub fn render_document_to_md(doc: &Document) -> String {
    let info = &doc.personal_info;
    let mut md = format!("# {}\n\n", info.name.as_deref().unwrap_or("Curriculum Vitae"));

    if let Some(title) = &info.title {
        md.push_str(&format!("**{title}**\n\n"));
    }
    for (field, value) in info.entries() {
        if matches!(field, "name" | "title" | "photoUrl") {
            continue;
        }
        md.push_str(&format!("- **{}:** {}\n", title_case(field), value));
    }
    if !md.ends_with("\n\n") {
        md.push('\n');
    }

    if let Some(summary) = &doc.summary {
        md.push_str(&format!("{summary}\n\n"));
    }

    for section in &doc.sections {
        if section.items.is_empty() {
            continue;
        }
        let heading = section
            .title
            .clone()
            .unwrap_or_else(|| title_case(section.section_type.as_str()));
        md.push_str(&format!("## {heading}\n\n"));
        for item in &section.items {
            let text = item.render_text();
            if text.trim().is_empty() {
                continue;
            }
            let mut lines = text.lines();
            if let Some(first) = lines.next() {
                md.push_str(&format!("- {first}\n"));
            }
            for line in lines {
                md.push_str(&format!("  {line}\n"));
            }
        }
        md.push('\n');
    }
    md
}

/// `softSkills` → `Soft Skills`, `linkedin` → `Linkedin`.
fn title_case(key: &str) -> String {
    let mut spaced = String::with_capacity(key.len() + 4);
    for (i, c) in key.chars().enumerate() {
        if i > 0 && c.is_uppercase() {
            spaced.push(' ');
        }
        spaced.push(if c == '_' { ' ' } else { c });
    }
    spaced
        .split_whitespace()
        .map(|w| {
            let mut c = w.chars();
            match c.next() {
                None => String::new(),
                Some(f) => f.to_uppercase().to_string() + c.as_str(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
