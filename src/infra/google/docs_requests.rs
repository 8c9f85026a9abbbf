// Translate a `SummaryDocument` into Docs API `batchUpdate` requests.
//
// Text is inserted block by block starting at index 1 of the empty document;
// indexes are counted in UTF-16 code units as the API requires. Styling
// requests come after every insertion, so the ranges they carry stay valid.

use serde_json::{json, Value};

use crate::core::summaries::{DocBlock, SummaryDocument};

const BULLET_PRESET: &str = "BULLET_DISC_CIRCLE_SQUARE";

fn utf16_len(text: &str) -> usize {
    text.encode_utf16().count()
}

fn range(start: usize, end: usize) -> Value {
    json!({ "startIndex": start, "endIndex": end })
}

pub fn document_requests(document: &SummaryDocument) -> Vec<Value> {
    let mut inserts = Vec::new();
    let mut styles = Vec::new();
    let mut cursor = 1;
    // Start and end of the bullet run currently being collected.
    let mut bullets: Option<(usize, usize)> = None;

    let flush = |bullets: &mut Option<(usize, usize)>, styles: &mut Vec<Value>| {
        if let Some((start, end)) = bullets.take() {
            styles.push(json!({
                "createParagraphBullets": {
                    "range": range(start, end),
                    "bulletPreset": BULLET_PRESET,
                }
            }));
        }
    };

    for block in &document.blocks {
        match block {
            DocBlock::PageBreak => {
                flush(&mut bullets, &mut styles);
                inserts.push(json!({ "insertPageBreak": { "location": { "index": cursor } } }));
                // Page break plus the newline the API adds after it.
                cursor += 2;
            }
            DocBlock::Heading(text) | DocBlock::Bullet(text) | DocBlock::Paragraph(text) => {
                let line = format!("{text}\n");
                let start = cursor;
                let end = start + utf16_len(&line);
                inserts.push(json!({
                    "insertText": { "location": { "index": start }, "text": line }
                }));
                cursor = end;

                match block {
                    DocBlock::Bullet(_) => {
                        bullets = Some(match bullets {
                            Some((run_start, _)) => (run_start, end),
                            None => (start, end),
                        });
                    }
                    DocBlock::Heading(_) => {
                        flush(&mut bullets, &mut styles);
                        styles.push(json!({
                            "updateParagraphStyle": {
                                "range": range(start, end),
                                "paragraphStyle": { "namedStyleType": "HEADING_1" },
                                "fields": "namedStyleType",
                            }
                        }));
                    }
                    _ => flush(&mut bullets, &mut styles),
                }
            }
        }
    }
    flush(&mut bullets, &mut styles);

    inserts.extend(styles);
    inserts
}
