// =============================================================================
// DOCUMENT RENDERER
// =============================================================================
//
// Pure functions turning a `DocumentSnapshot` into plain text or Markdown.
// Both renderers are total: any snapshot renders, an empty one renders as
// `EMPTY_DOCUMENT`.
//
// **Markdown rules:**
// - HEADING_n -> `#` x n (max 6), TITLE -> `#`, SUBTITLE -> `##`
// - bulleted paragraphs -> `- ` with two spaces per nesting level
// - inline styles nest in a fixed order (emphasis, underline, strike, link)
//
// **Tables:** one `| a | b |` line per row. The first physical row is always
// followed by the header separator; the Docs model has no header flag, so this
// is a fixed layout rule rather than something read from the content.

use serde::{Deserialize, Serialize};

use super::document_models::{
    Body, DocumentSnapshot, Paragraph, StructuralElement, Tab, Table, TextRun, TextStyle,
};

/// Returned instead of an empty string so callers can tell "no content" apart.
pub const EMPTY_DOCUMENT: &str = "(document is empty)";

const MAX_HEADING_LEVEL: usize = 6;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RenderFormat {
    Text,
    #[default]
    Markdown,
}

pub fn render(doc: &DocumentSnapshot, format: RenderFormat) -> String {
    let mut out = String::new();

    match doc.tabs.as_slice() {
        [] => {
            if let Some(body) = &doc.body {
                render_body(body, format, &mut out);
            }
        }
        // A lone tab is just the document; no tab title line.
        [only] if only.child_tabs.is_empty() => render_tab_body(only, format, &mut out),
        tabs => render_tabs(tabs, format, 0, &mut out),
    }

    let rendered = out.trim_end();
    if rendered.trim().is_empty() {
        EMPTY_DOCUMENT.to_string()
    } else {
        rendered.to_string()
    }
}

pub fn render_text(doc: &DocumentSnapshot) -> String {
    render(doc, RenderFormat::Text)
}

pub fn render_markdown(doc: &DocumentSnapshot) -> String {
    render(doc, RenderFormat::Markdown)
}

/// Cuts an already rendered string to `max_length` characters.
///
/// Runs after rendering, never during it. The suffix reports how much was
/// dropped and the full length.
pub fn truncate_rendered(rendered: String, max_length: Option<usize>) -> String {
    let Some(max_length) = max_length else {
        return rendered;
    };

    let total = rendered.chars().count();
    if max_length >= total {
        return rendered;
    }

    let cut = rendered
        .char_indices()
        .nth(max_length)
        .map(|(byte, _)| byte)
        .unwrap_or(rendered.len());

    let mut truncated = rendered[..cut].to_string();
    truncated.push_str(&format!(
        "\n\n[truncated: {} characters omitted of {} total]",
        total - max_length,
        total
    ));
    truncated
}

// =============================================================================
// BLOCKS
// =============================================================================

fn render_tabs(tabs: &[Tab], format: RenderFormat, depth: usize, out: &mut String) {
    for tab in tabs {
        start_block(out);
        let title = tab.tab_properties.title.trim();
        if format == RenderFormat::Markdown {
            out.push_str(&"#".repeat((depth + 1).min(MAX_HEADING_LEVEL)));
            out.push(' ');
        }
        out.push_str(title);
        out.push_str("\n\n");

        render_tab_body(tab, format, out);
        render_tabs(&tab.child_tabs, format, depth + 1, out);
    }
}

fn render_tab_body(tab: &Tab, format: RenderFormat, out: &mut String) {
    if let Some(body) = tab.document_tab.as_ref().and_then(|d| d.body.as_ref()) {
        render_body(body, format, out);
    }
}

fn render_body(body: &Body, format: RenderFormat, out: &mut String) {
    render_elements(&body.content, format, out);
}

fn render_elements(elements: &[StructuralElement], format: RenderFormat, out: &mut String) {
    for element in elements {
        if let Some(paragraph) = &element.paragraph {
            match format {
                RenderFormat::Text => render_text_paragraph(paragraph, out),
                RenderFormat::Markdown => render_markdown_paragraph(paragraph, out),
            }
        }
        if let Some(table) = &element.table {
            render_table(table, format, out);
        }
        if let Some(toc) = &element.table_of_contents {
            render_elements(&toc.content, format, out);
        }
        // Section breaks carry no text.
    }
}

fn render_text_paragraph(paragraph: &Paragraph, out: &mut String) {
    out.push_str(&plain_inline(paragraph));
}

enum BlockKind {
    Heading(usize),
    ListItem(usize),
    Plain,
}

fn classify(paragraph: &Paragraph) -> BlockKind {
    if let Some(level) = paragraph.named_style().and_then(heading_level) {
        return BlockKind::Heading(level);
    }
    if let Some(bullet) = &paragraph.bullet {
        return BlockKind::ListItem(bullet.nesting_level.unwrap_or(0) as usize);
    }
    BlockKind::Plain
}

/// Markdown heading level for a Docs named style, if it is a heading at all.
pub fn heading_level(named_style: &str) -> Option<usize> {
    match named_style {
        "TITLE" => Some(1),
        "SUBTITLE" => Some(2),
        other => other
            .strip_prefix("HEADING_")
            .and_then(|n| n.parse::<usize>().ok())
            .filter(|n| *n >= 1)
            .map(|n| n.min(MAX_HEADING_LEVEL)),
    }
}

fn render_markdown_paragraph(paragraph: &Paragraph, out: &mut String) {
    let inline = markdown_inline(paragraph);
    let inline = inline.trim();
    if inline.is_empty() {
        return;
    }

    match classify(paragraph) {
        BlockKind::Heading(level) => {
            start_block(out);
            out.push_str(&"#".repeat(level));
            out.push(' ');
            out.push_str(inline);
            out.push_str("\n\n");
        }
        BlockKind::ListItem(nesting) => {
            start_line(out);
            out.push_str(&"  ".repeat(nesting));
            out.push_str("- ");
            out.push_str(inline);
            out.push('\n');
        }
        BlockKind::Plain => {
            start_block(out);
            out.push_str(inline);
            out.push_str("\n\n");
        }
    }
}

fn render_table(table: &Table, format: RenderFormat, out: &mut String) {
    start_block(out);

    for (row_index, row) in table.table_rows.iter().enumerate() {
        let cells: Vec<String> = row
            .table_cells
            .iter()
            .map(|cell| cell_text(&cell.content, format))
            .collect();

        out.push_str(&table_line(&cells));
        if row_index == 0 {
            out.push_str(&separator_line(cells.len()));
        }
    }

    out.push('\n');
}

fn table_line(cells: &[String]) -> String {
    if cells.is_empty() {
        return "|  |\n".to_string();
    }
    let mut line = String::from("|");
    for cell in cells {
        line.push(' ');
        line.push_str(cell);
        line.push_str(" |");
    }
    line.push('\n');
    line
}

fn separator_line(columns: usize) -> String {
    let mut line = String::from("|");
    for _ in 0..columns.max(1) {
        line.push_str(" --- |");
    }
    line.push('\n');
    line
}

/// All text inside a cell on one line. Nested tables are flattened into it.
fn cell_text(elements: &[StructuralElement], format: RenderFormat) -> String {
    let mut pieces = Vec::new();
    collect_cell_text(elements, format, &mut pieces);

    let flattened = pieces.join(" ");
    match format {
        RenderFormat::Markdown => flattened.replace('|', "\\|"),
        RenderFormat::Text => flattened,
    }
}

fn collect_cell_text(elements: &[StructuralElement], format: RenderFormat, pieces: &mut Vec<String>) {
    for element in elements {
        if let Some(paragraph) = &element.paragraph {
            let inline = match format {
                RenderFormat::Text => plain_inline(paragraph),
                RenderFormat::Markdown => markdown_inline(paragraph),
            };
            let line = inline
                .split(['\n', '\r'])
                .map(str::trim)
                .filter(|part| !part.is_empty())
                .collect::<Vec<_>>()
                .join(" ");
            if !line.is_empty() {
                pieces.push(line);
            }
        }
        if let Some(table) = &element.table {
            for cell in table.table_rows.iter().flat_map(|row| &row.table_cells) {
                collect_cell_text(&cell.content, format, pieces);
            }
        }
        if let Some(toc) = &element.table_of_contents {
            collect_cell_text(&toc.content, format, pieces);
        }
    }
}

/// Ensures the next block starts after a blank line.
fn start_block(out: &mut String) {
    if out.is_empty() || out.ends_with("\n\n") {
        return;
    }
    if out.ends_with('\n') {
        out.push('\n');
    } else {
        out.push_str("\n\n");
    }
}

fn start_line(out: &mut String) {
    if !out.is_empty() && !out.ends_with('\n') {
        out.push('\n');
    }
}

// =============================================================================
// INLINE
// =============================================================================

/// Docs uses U+000B for soft line breaks inside a paragraph.
fn run_content(run: &TextRun) -> String {
    run.content
        .as_deref()
        .unwrap_or_default()
        .replace('\u{000b}', "\n")
}

fn plain_inline(paragraph: &Paragraph) -> String {
    paragraph.text_runs().map(run_content).collect()
}

fn markdown_inline(paragraph: &Paragraph) -> String {
    // Neighbouring runs with identical styling are merged first so that
    // "**a****b**" comes out as "**ab**".
    let mut spans: Vec<(String, TextStyle)> = Vec::new();
    for run in paragraph.text_runs() {
        let content = run_content(run);
        let style = run.text_style.clone().unwrap_or_default();
        match spans.last_mut() {
            Some((text, last_style)) if *last_style == style => text.push_str(&content),
            _ => spans.push((content, style)),
        }
    }

    spans
        .iter()
        .map(|(text, style)| decorate_span(text, style))
        .collect()
}

/// Keeps surrounding whitespace outside the markers: `**x** ` not `**x **`.
fn decorate_span(text: &str, style: &TextStyle) -> String {
    let core = text.trim();
    if core.is_empty() {
        return text.to_string();
    }
    let leading = &text[..text.len() - text.trim_start().len()];
    let trailing = &text[text.trim_end().len()..];

    format!("{}{}{}", leading, decorate(core, style), trailing)
}

/// Applies inline markers in a fixed order, innermost first:
/// emphasis, underline (skipped for links), strikethrough, link.
pub fn decorate(text: &str, style: &TextStyle) -> String {
    let bold = style.bold.unwrap_or(false);
    let italic = style.italic.unwrap_or(false);
    let underline = style.underline.unwrap_or(false);
    let strikethrough = style.strikethrough.unwrap_or(false);
    let link = style.link_url();

    let mut decorated = match (bold, italic) {
        (true, true) => format!("***{}***", text),
        (true, false) => format!("**{}**", text),
        (false, true) => format!("*{}*", text),
        (false, false) => text.to_string(),
    };

    if underline && link.is_none() {
        decorated = format!("<u>{}</u>", decorated);
    }
    if strikethrough {
        decorated = format!("~~{}~~", decorated);
    }
    if let Some(url) = link {
        decorated = format!("[{}]({})", decorated, url);
    }

    decorated
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn doc(content: Value) -> DocumentSnapshot {
        serde_json::from_value(json!({
            "documentId": "doc-1",
            "title": "Test",
            "body": {"content": content}
        }))
        .unwrap()
    }

    fn run(text: &str, style: Value) -> Value {
        json!({"textRun": {"content": text, "textStyle": style}})
    }

    fn para(style: &str, runs: Vec<Value>) -> Value {
        json!({"paragraph": {
            "elements": runs,
            "paragraphStyle": {"namedStyleType": style}
        }})
    }

    fn bullet(text: &str, nesting: u32) -> Value {
        json!({"paragraph": {
            "elements": [run(text, json!({}))],
            "paragraphStyle": {"namedStyleType": "NORMAL_TEXT"},
            "bullet": {"listId": "l1", "nestingLevel": nesting}
        }})
    }

    fn table(rows: Vec<Vec<&str>>) -> Value {
        let rows: Vec<Value> = rows
            .into_iter()
            .map(|cells| {
                let cells: Vec<Value> = cells
                    .into_iter()
                    .map(|c| json!({"content": [para("NORMAL_TEXT", vec![run(&format!("{}\n", c), json!({}))])]}))
                    .collect();
                json!({"tableCells": cells})
            })
            .collect();
        json!({"table": {"tableRows": rows}})
    }

    #[test]
    fn test_empty_document_renders_sentinel() {
        assert_eq!(render_text(&DocumentSnapshot::default()), EMPTY_DOCUMENT);
        assert_eq!(render_markdown(&doc(json!([{"sectionBreak": {}}]))), EMPTY_DOCUMENT);
        assert_eq!(
            render_markdown(&doc(json!([para("NORMAL_TEXT", vec![run("\n", json!({}))])]))),
            EMPTY_DOCUMENT
        );
    }

    #[test]
    fn test_text_concatenates_runs_in_order() {
        let d = doc(json!([
            {"sectionBreak": {}},
            para("HEADING_1", vec![run("Intro\n", json!({"bold": true}))]),
            para("NORMAL_TEXT", vec![run("Hello ", json!({})), run("world", json!({"italic": true})), run("!\n", json!({}))]),
        ]));
        assert_eq!(render_text(&d), "Intro\nHello world!");
    }

    #[test]
    fn test_render_is_deterministic() {
        let d = doc(json!([para("NORMAL_TEXT", vec![run("same\n", json!({"bold": true}))])]));
        assert_eq!(render_text(&d), render_text(&d));
        assert_eq!(render_markdown(&d), render_markdown(&d));
    }

    #[test]
    fn test_markdown_headings_and_clamping() {
        let d = doc(json!([
            para("TITLE", vec![run("Title\n", json!({}))]),
            para("SUBTITLE", vec![run("Sub\n", json!({}))]),
            para("HEADING_3", vec![run("Three\n", json!({}))]),
            para("HEADING_9", vec![run("Deep\n", json!({}))]),
        ]));
        assert_eq!(
            render_markdown(&d),
            "# Title\n\n## Sub\n\n### Three\n\n###### Deep"
        );
    }

    #[test]
    fn test_heading_level_mapping() {
        assert_eq!(heading_level("HEADING_1"), Some(1));
        assert_eq!(heading_level("HEADING_6"), Some(6));
        assert_eq!(heading_level("HEADING_7"), Some(6));
        assert_eq!(heading_level("HEADING_0"), None);
        assert_eq!(heading_level("NORMAL_TEXT"), None);
    }

    #[test]
    fn test_bold_italic_uses_triple_marker() {
        let style = TextStyle {
            bold: Some(true),
            italic: Some(true),
            ..Default::default()
        };
        assert_eq!(decorate("both", &style), "***both***");

        let d = doc(json!([para("NORMAL_TEXT", vec![run("both\n", json!({"bold": true, "italic": true}))])]));
        let rendered = render_markdown(&d);
        assert_eq!(rendered, "***both***");
        assert!(!rendered.contains("***both**"));
    }

    #[test]
    fn test_single_styles() {
        let bold = TextStyle {
            bold: Some(true),
            ..Default::default()
        };
        let italic = TextStyle {
            italic: Some(true),
            ..Default::default()
        };
        assert_eq!(decorate("b", &bold), "**b**");
        assert_eq!(decorate("i", &italic), "*i*");
    }

    #[test]
    fn test_style_nesting_order() {
        let style: TextStyle = serde_json::from_value(json!({
            "bold": true,
            "underline": true,
            "strikethrough": true
        }))
        .unwrap();
        assert_eq!(decorate("x", &style), "~~<u>**x**</u>~~");

        let linked: TextStyle = serde_json::from_value(json!({
            "italic": true,
            "underline": true,
            "strikethrough": true,
            "link": {"url": "https://example.com"}
        }))
        .unwrap();
        // Underline is implied by the link and dropped.
        assert_eq!(decorate("x", &linked), "[~~*x*~~](https://example.com)");
    }

    #[test]
    fn test_markers_hug_text_and_adjacent_runs_merge() {
        let d = doc(json!([para("NORMAL_TEXT", vec![
            run("Say ", json!({})),
            run("hello ", json!({"bold": true})),
            run("there", json!({"bold": true})),
            run(" now\n", json!({})),
        ])]));
        assert_eq!(render_markdown(&d), "Say **hello there** now");
    }

    #[test]
    fn test_bullets_and_paragraph_separation() {
        let d = doc(json!([
            para("NORMAL_TEXT", vec![run("Lead in\n", json!({}))]),
            bullet("one\n", 0),
            bullet("nested\n", 1),
            bullet("two\n", 0),
            para("NORMAL_TEXT", vec![run("After\n", json!({}))]),
        ]));
        assert_eq!(
            render_markdown(&d),
            "Lead in\n\n- one\n  - nested\n- two\n\nAfter"
        );
    }

    #[test]
    fn test_table_has_one_separator_after_first_row() {
        let d = doc(json!([table(vec![
            vec!["Name", "Role"],
            vec!["Ada", "Eng"],
            vec!["Bob", "PM"],
        ])]));
        let rendered = render_markdown(&d);
        let lines: Vec<&str> = rendered.lines().collect();

        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0], "| Name | Role |");
        assert_eq!(lines[1], "| --- | --- |");
        assert_eq!(lines[2], "| Ada | Eng |");
        assert_eq!(lines[3], "| Bob | PM |");
        assert_eq!(rendered.matches("---").count(), 2);
    }

    #[test]
    fn test_single_row_table_still_gets_separator() {
        let d = doc(json!([table(vec![vec!["only"]])]));
        assert_eq!(render_text(&d), "| only |\n| --- |");
    }

    #[test]
    fn test_cell_newlines_flatten_and_pipes_escape() {
        let cell = json!({"content": [
            para("NORMAL_TEXT", vec![run("first\n", json!({}))]),
            para("NORMAL_TEXT", vec![run("a|b\n", json!({}))]),
        ]});
        let d = doc(json!([{"table": {"tableRows": [{"tableCells": [cell]}]}}]));
        assert_eq!(render_markdown(&d), "| first a\\|b |\n| --- |");
        assert_eq!(render_text(&d), "| first a|b |\n| --- |");
    }

    #[test]
    fn test_deeply_nested_tables_terminate() {
        let mut content = json!([para("NORMAL_TEXT", vec![run("core\n", json!({}))])]);
        for _ in 0..20 {
            content = json!([{"table": {"tableRows": [{"tableCells": [{"content": content}]}]}}]);
        }
        let d = doc(content);
        assert_eq!(render_text(&d), "| core |\n| --- |");
    }

    #[test]
    fn test_multi_tab_documents_get_tab_titles() {
        let d: DocumentSnapshot = serde_json::from_value(json!({
            "documentId": "d",
            "title": "T",
            "tabs": [
                {
                    "tabProperties": {"title": "First"},
                    "documentTab": {"body": {"content": [para("NORMAL_TEXT", vec![run("one\n", json!({}))])]}},
                    "childTabs": [{
                        "tabProperties": {"title": "Nested"},
                        "documentTab": {"body": {"content": [para("NORMAL_TEXT", vec![run("two\n", json!({}))])]}}
                    }]
                },
                {
                    "tabProperties": {"title": "Second"},
                    "documentTab": {"body": {"content": [para("NORMAL_TEXT", vec![run("three\n", json!({}))])]}}
                }
            ]
        }))
        .unwrap();

        assert_eq!(
            render_markdown(&d),
            "# First\n\none\n\n## Nested\n\ntwo\n\n# Second\n\nthree"
        );
    }

    #[test]
    fn test_single_tab_renders_like_body() {
        let d: DocumentSnapshot = serde_json::from_value(json!({
            "tabs": [{
                "tabProperties": {"title": "Tab 1"},
                "documentTab": {"body": {"content": [para("NORMAL_TEXT", vec![run("body\n", json!({}))])]}}
            }]
        }))
        .unwrap();
        assert_eq!(render_markdown(&d), "body");
    }

    #[test]
    fn test_truncation_reports_elided_characters() {
        let text = "abcdefghij".to_string();
        let truncated = truncate_rendered(text, Some(4));
        assert!(truncated.starts_with("abcd\n\n"));
        assert!(truncated.ends_with("[truncated: 6 characters omitted of 10 total]"));
    }

    #[test]
    fn test_truncation_noop_when_within_limit() {
        assert_eq!(truncate_rendered("short".to_string(), Some(5)), "short");
        assert_eq!(truncate_rendered("short".to_string(), Some(50)), "short");
        assert_eq!(truncate_rendered("short".to_string(), None), "short");
    }

    #[test]
    fn test_truncation_respects_char_boundaries() {
        let truncated = truncate_rendered("héllo wörld".to_string(), Some(2));
        assert!(truncated.starts_with("hé\n\n"));
        assert!(truncated.contains("9 characters omitted of 11 total"));
    }
}
