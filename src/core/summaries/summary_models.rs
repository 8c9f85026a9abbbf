use serde_json::Value;

/// Instruction sent ahead of every transcript. The spelling note exists because
/// speech-to-text keeps writing one customer's name as "Audet".
pub const SUMMARY_PROMPT: &str = "Analyze the following call transcript and provide a summary in JSON format. \
The JSON object must have three keys: 'discussion_topics', 'key_takeaways', and 'action_items'. \
Each key should have a value that is an array of strings. Please provide at least 3 items for each category. \
IMPORTANT: In the summary, always use the correct spelling 'Audette' instead of 'Audet'.";

/// Structured summary returned by the text-generation model.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CallSummary {
    pub discussion_topics: Vec<String>,
    pub key_takeaways: Vec<String>,
    pub action_items: Vec<String>,
}

/// Full prompt for one transcript.
pub fn summary_prompt(transcript: &str) -> String {
    format!("{SUMMARY_PROMPT}\n\nTranscript:\n{transcript}")
}

/// Pull the JSON object out of free-form model output.
///
/// Models tend to wrap the object in prose or code fences, so this takes
/// everything from the first `{` to the last `}` and parses that.
pub fn extract_summary(text: &str) -> Result<CallSummary, String> {
    let start = text.find('{');
    let end = text.rfind('}');
    let json = match (start, end) {
        (Some(start), Some(end)) if end > start => &text[start..=end],
        _ => return Err(format!("No JSON object found in model response: {text}")),
    };

    let value: Value = serde_json::from_str(json)
        .map_err(|e| format!("Failed to parse extracted JSON: {e}. Extracted text: {json}"))?;

    Ok(CallSummary {
        discussion_topics: string_list(&value, "discussion_topics"),
        key_takeaways: string_list(&value, "key_takeaways"),
        action_items: string_list(&value, "action_items"),
    })
}

/// Strings under `key`; anything that is not an array of strings is ignored.
fn string_list(value: &Value, key: &str) -> Vec<String> {
    value
        .get(key)
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|item| item.as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}

/// One block of a generated document body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocBlock {
    Heading(String),
    Bullet(String),
    Paragraph(String),
    PageBreak,
}

/// Backend-neutral description of a call summary document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryDocument {
    pub title: String,
    pub blocks: Vec<DocBlock>,
}

impl SummaryDocument {
    /// Topics, takeaways and action items as bulleted sections, then the full
    /// transcript on its own page.
    pub fn new(title: impl Into<String>, summary: &CallSummary, transcript: &str) -> Self {
        let mut blocks = Vec::new();
        let sections = [
            ("Key Discussion Topics", &summary.discussion_topics),
            ("Key Takeaways", &summary.key_takeaways),
            ("Key Action Items", &summary.action_items),
        ];

        for (heading, items) in sections {
            blocks.push(DocBlock::Heading(heading.to_string()));
            blocks.extend(items.iter().cloned().map(DocBlock::Bullet));
        }

        blocks.push(DocBlock::PageBreak);
        blocks.push(DocBlock::Heading("Transcript".to_string()));
        blocks.push(DocBlock::Paragraph(transcript.to_string()));

        Self {
            title: title.into(),
            blocks,
        }
    }
}
