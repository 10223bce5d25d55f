// =============================================================================
// DOCUMENT SNAPSHOT MODEL
// =============================================================================
//
// A read-only mirror of the Google Docs `documents.get` response, trimmed to
// the fields we render or search. Every struct defaults its fields so that a
// sparse or partially populated response still deserializes.
//
// Shape:
//   Document -> Body | Tabs -> StructuralElement (paragraph / table / ...)
//   Table -> rows -> cells -> StructuralElement (same shape, recursive)

use serde::Deserialize;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DocumentSnapshot {
    #[allow(dead_code)]
    pub document_id: String,
    pub title: String,
    pub revision_id: Option<String>,
    /// Present when the document was fetched without tab content.
    pub body: Option<Body>,
    /// Present when fetched with `includeTabsContent=true`.
    pub tabs: Vec<Tab>,
}

impl DocumentSnapshot {
    /// The body that edit indices refer to: the legacy body or the first tab.
    pub fn primary_body(&self) -> Option<&Body> {
        self.body.as_ref().or_else(|| {
            self.tabs
                .first()
                .and_then(|tab| tab.document_tab.as_ref())
                .and_then(|doc_tab| doc_tab.body.as_ref())
        })
    }

    /// Every body in the document, tabs in depth-first order.
    pub fn bodies(&self) -> Vec<&Body> {
        let mut bodies = Vec::new();
        if let Some(body) = &self.body {
            bodies.push(body);
        }
        collect_tab_bodies(&self.tabs, &mut bodies);
        bodies
    }

    pub fn tab_count(&self) -> usize {
        fn count(tabs: &[Tab]) -> usize {
            tabs.iter().map(|t| 1 + count(&t.child_tabs)).sum()
        }
        count(&self.tabs)
    }

    pub fn stats(&self) -> DocumentStats {
        let mut stats = DocumentStats::default();
        for body in self.bodies() {
            stats.visit(&body.content);
        }
        stats
    }
}

fn collect_tab_bodies<'a>(tabs: &'a [Tab], out: &mut Vec<&'a Body>) {
    for tab in tabs {
        if let Some(body) = tab.document_tab.as_ref().and_then(|d| d.body.as_ref()) {
            out.push(body);
        }
        collect_tab_bodies(&tab.child_tabs, out);
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Tab {
    pub tab_properties: TabProperties,
    pub document_tab: Option<DocumentTab>,
    pub child_tabs: Vec<Tab>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TabProperties {
    #[allow(dead_code)]
    pub tab_id: String,
    pub title: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DocumentTab {
    pub body: Option<Body>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Body {
    pub content: Vec<StructuralElement>,
}

/// One block of the document. At most one of the payload fields is set.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StructuralElement {
    pub start_index: Option<i64>,
    #[allow(dead_code)]
    pub end_index: Option<i64>,
    pub paragraph: Option<Paragraph>,
    pub table: Option<Table>,
    #[allow(dead_code)]
    pub section_break: Option<SectionBreak>,
    pub table_of_contents: Option<TableOfContents>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Paragraph {
    pub elements: Vec<ParagraphElement>,
    pub paragraph_style: Option<ParagraphStyle>,
    pub bullet: Option<Bullet>,
}

impl Paragraph {
    pub fn named_style(&self) -> Option<&str> {
        self.paragraph_style
            .as_ref()
            .and_then(|s| s.named_style_type.as_deref())
    }

    pub fn text_runs(&self) -> impl Iterator<Item = &TextRun> {
        self.elements.iter().filter_map(|e| e.text_run.as_ref())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ParagraphStyle {
    pub named_style_type: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Bullet {
    pub nesting_level: Option<u32>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ParagraphElement {
    pub start_index: Option<i64>,
    pub end_index: Option<i64>,
    pub text_run: Option<TextRun>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TextRun {
    pub content: Option<String>,
    pub text_style: Option<TextStyle>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TextStyle {
    pub bold: Option<bool>,
    pub italic: Option<bool>,
    pub underline: Option<bool>,
    pub strikethrough: Option<bool>,
    pub link: Option<Link>,
}

impl TextStyle {
    pub fn link_url(&self) -> Option<&str> {
        self.link
            .as_ref()
            .and_then(|l| l.url.as_deref())
            .filter(|url| !url.is_empty())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Link {
    pub url: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Table {
    pub table_rows: Vec<TableRow>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TableRow {
    pub table_cells: Vec<TableCell>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TableCell {
    pub content: Vec<StructuralElement>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SectionBreak {}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TableOfContents {
    pub content: Vec<StructuralElement>,
}

/// Block counts used by the document info tool.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DocumentStats {
    pub paragraphs: usize,
    pub tables: usize,
    /// Characters of text-run content, including paragraph newlines.
    pub characters: usize,
}

impl DocumentStats {
    fn visit(&mut self, elements: &[StructuralElement]) {
        for element in elements {
            if let Some(paragraph) = &element.paragraph {
                self.paragraphs += 1;
                self.characters += paragraph
                    .text_runs()
                    .map(|run| run.content.as_deref().unwrap_or_default().chars().count())
                    .sum::<usize>();
            }
            if let Some(table) = &element.table {
                self.tables += 1;
                for cell in table.table_rows.iter().flat_map(|r| &r.table_cells) {
                    self.visit(&cell.content);
                }
            }
            if let Some(toc) = &element.table_of_contents {
                self.visit(&toc.content);
            }
        }
    }
}

// =============================================================================
// DOCUMENT IDS
// =============================================================================

/// Extracts the document ID from a Google Docs URL, or accepts a bare ID.
pub fn extract_document_id(url_or_id: &str) -> Option<String> {
    let url_or_id = url_or_id.trim();
    if url_or_id.contains("docs.google.com") {
        let start = url_or_id.find("/document/d/")?;
        let after_d = &url_or_id[start + "/document/d/".len()..];
        let end = after_d
            .find(|c| c == '/' || c == '?' || c == '#')
            .unwrap_or(after_d.len());
        let id = &after_d[..end];
        if is_plausible_id(id) {
            return Some(id.to_string());
        }
    } else if is_plausible_id(url_or_id) {
        return Some(url_or_id.to_string());
    }
    None
}

fn is_plausible_id(id: &str) -> bool {
    !id.is_empty()
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

pub fn document_url(document_id: &str) -> String {
    format!("https://docs.google.com/document/d/{}/edit", document_id)
}
