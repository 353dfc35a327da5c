//! Default LLM prompts for route extraction.

/// Default prompt for extracting a route from permit text.
///
/// `{content}` is replaced with the document text.
pub const DEFAULT_ROUTE_PROMPT: &str = r#"You are a routing assistant. Read the following transport permit text and extract the permitted route.

Respond ONLY with a single JSON object in exactly this format, with no markdown, code fences, commentary or extra keys:
{
  "origin": "Start address or location",
  "destination": "End address or location",
  "waypoints": ["Stop 1", "Stop 2"]
}

List waypoints in the order they appear in the permit. Use an empty array when there are none.

Text:
"""{content}""""#;
