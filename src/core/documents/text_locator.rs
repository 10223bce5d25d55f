// Finds literal text in a document body and reports it as Docs index ranges.
//
// Docs indices count UTF-16 code units, while Rust strings are UTF-8, so each
// match is mapped back through the run it starts and ends in. Matches never
// span paragraphs, nor inline objects inside one.

use super::document_api::TextRange;
use super::document_models::{Body, Paragraph, StructuralElement};

/// Returns every non-overlapping match of `needle` in document order, or just
/// the first one when `all` is false.
pub fn find_text_ranges(body: &Body, needle: &str, all: bool) -> Vec<TextRange> {
    let mut ranges = Vec::new();
    if needle.is_empty() {
        return ranges;
    }
    visit(&body.content, needle, all, &mut ranges);
    ranges
}

fn visit(elements: &[StructuralElement], needle: &str, all: bool, ranges: &mut Vec<TextRange>) {
    for element in elements {
        if !all && !ranges.is_empty() {
            return;
        }
        if let Some(paragraph) = &element.paragraph {
            search_paragraph(paragraph, element.start_index, needle, all, ranges);
        }
        if let Some(table) = &element.table {
            for cell in table.table_rows.iter().flat_map(|row| &row.table_cells) {
                visit(&cell.content, needle, all, ranges);
            }
        }
        if let Some(toc) = &element.table_of_contents {
            visit(&toc.content, needle, all, ranges);
        }
    }
}

/// A run's position both in the joined segment string and in the document.
struct RunSpan {
    byte_start: usize,
    doc_start: i64,
}

/// Runs whose document indices follow on from each other without a gap.
#[derive(Default)]
struct Segment {
    text: String,
    spans: Vec<RunSpan>,
}

fn search_paragraph(
    paragraph: &Paragraph,
    element_start: Option<i64>,
    needle: &str,
    all: bool,
    ranges: &mut Vec<TextRange>,
) {
    let mut segments: Vec<Segment> = vec![Segment::default()];
    let mut next_doc_index = element_start;

    for element in &paragraph.elements {
        // Non-text elements (inline images, page breaks) still occupy indices,
        // and no match may run across one.
        let Some(run) = &element.text_run else {
            next_doc_index = element.end_index.or(next_doc_index);
            segments.push(Segment::default());
            continue;
        };
        let content = run.content.as_deref().unwrap_or_default();
        let Some(doc_start) = element.start_index.or(next_doc_index) else {
            // No anchor for this paragraph's indices.
            return;
        };
        if next_doc_index.is_some_and(|expected| expected != doc_start) {
            segments.push(Segment::default());
        }

        let Some(segment) = segments.last_mut() else {
            return;
        };
        segment.spans.push(RunSpan {
            byte_start: segment.text.len(),
            doc_start,
        });
        segment.text.push_str(content);
        next_doc_index = Some(doc_start + utf16_len(content));
    }

    for segment in segments.iter().filter(|s| !s.spans.is_empty()) {
        for (byte_offset, matched) in segment.text.match_indices(needle) {
            let start = doc_index(&segment.text, &segment.spans, byte_offset);
            let end = doc_index(&segment.text, &segment.spans, byte_offset + matched.len());
            ranges.push(TextRange {
                start_index: start,
                end_index: end,
            });
            if !all {
                return;
            }
        }
    }
}

/// Maps a byte offset in a segment's joined text to a document index.
fn doc_index(text: &str, spans: &[RunSpan], byte_offset: usize) -> i64 {
    // Last span starting at or before the offset. An offset at the very end
    // belongs to the last run.
    let span = spans
        .iter()
        .rev()
        .find(|span| span.byte_start <= byte_offset)
        .unwrap_or(&spans[0]);

    span.doc_start + utf16_len(&text[span.byte_start..byte_offset])
}

fn utf16_len(s: &str) -> i64 {
    s.encode_utf16().count() as i64
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn body(content: Value) -> Body {
        serde_json::from_value(json!({ "content": content })).unwrap()
    }

    fn run(start: i64, text: &str) -> Value {
        let end = start + text.encode_utf16().count() as i64;
        json!({"startIndex": start, "endIndex": end, "textRun": {"content": text}})
    }

    #[test]
    fn test_finds_first_and_all_occurrences() {
        let b = body(json!([
            {"sectionBreak": {}, "endIndex": 1},
            {"startIndex": 1, "paragraph": {"elements": [run(1, "cat and cat\n")]}},
            {"startIndex": 13, "paragraph": {"elements": [run(13, "one cat\n")]}},
        ]));

        let first = find_text_ranges(&b, "cat", false);
        assert_eq!(
            first,
            vec![TextRange {
                start_index: 1,
                end_index: 4
            }]
        );

        let all = find_text_ranges(&b, "cat", true);
        let starts: Vec<i64> = all.iter().map(|r| r.start_index).collect();
        assert_eq!(starts, vec![1, 9, 17]);
        assert!(all.iter().all(|r| r.end_index - r.start_index == 3));
    }

    #[test]
    fn test_match_spanning_runs() {
        let b = body(json!([
            {"startIndex": 1, "paragraph": {"elements": [run(1, "hel"), run(4, "lo world\n")]}},
        ]));
        assert_eq!(
            find_text_ranges(&b, "hello", true),
            vec![TextRange {
                start_index: 1,
                end_index: 6
            }]
        );
    }

    #[test]
    fn test_match_never_straddles_an_inline_object() {
        // "hel" [image at 4..5] "lo": the visible text reads "hello" but the
        // indices have a hole, so there is no contiguous range to format.
        let b = body(json!([
            {"startIndex": 1, "paragraph": {"elements": [
                run(1, "hel"),
                {"startIndex": 4, "endIndex": 5, "inlineObjectElement": {"inlineObjectId": "img"}},
                run(5, "lo hello\n"),
            ]}},
        ]));
        assert_eq!(
            find_text_ranges(&b, "hello", true),
            vec![TextRange {
                start_index: 8,
                end_index: 13
            }]
        );
        assert_eq!(
            find_text_ranges(&b, "lo", false),
            vec![TextRange {
                start_index: 5,
                end_index: 7
            }]
        );
    }

    #[test]
    fn test_indices_count_utf16_units() {
        // The emoji is two UTF-16 code units and four UTF-8 bytes.
        let b = body(json!([
            {"startIndex": 1, "paragraph": {"elements": [run(1, "😀 target\n")]}},
        ]));
        assert_eq!(
            find_text_ranges(&b, "target", true),
            vec![TextRange {
                start_index: 4,
                end_index: 10
            }]
        );
    }

    #[test]
    fn test_searches_inside_tables() {
        let b = body(json!([
            {"startIndex": 1, "table": {"tableRows": [{"tableCells": [{"content": [
                {"startIndex": 4, "paragraph": {"elements": [run(4, "in cell\n")]}}
            ]}]}]}},
        ]));
        assert_eq!(
            find_text_ranges(&b, "cell", true),
            vec![TextRange {
                start_index: 7,
                end_index: 11
            }]
        );
    }

    #[test]
    fn test_missing_text_yields_nothing() {
        let b = body(json!([
            {"startIndex": 1, "paragraph": {"elements": [run(1, "nothing here\n")]}},
        ]));
        assert!(find_text_ranges(&b, "absent", true).is_empty());
        assert!(find_text_ranges(&b, "", true).is_empty());
    }
}
