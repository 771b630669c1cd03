//! Opinion response parsing.
//!
//! These functions extract structured fields from free-form model responses.
//! They are pure domain logic — no I/O, no session management, just text and
//! JSON-fragment pattern matching.
//!
//! Models are asked for JSON but do not reliably produce it, so every parser
//! has a conservative fallback:
//!
//! | Function | Fields | Fallback |
//! |----------|--------|----------|
//! | [`parse_opinion_response`] | `choice`, `reasoning`, `confidence` | whole text, confidence 0.5 |
//! | [`parse_safety_response`] | `assessment`, `concerns`, `approved` | approved (no veto) |
//! | [`parse_consistency_response`] | `consistent`, `note` | consistent |

/// Locate the outermost JSON object embedded in a response, if any.
fn find_json_object(response: &str) -> Option<serde_json::Value> {
    let start = response.find('{')?;
    let end = response[start..].rfind('}')?;
    serde_json::from_str(&response[start..start + end + 1]).ok()
}

/// Case-insensitive string field lookup (models capitalize inconsistently).
fn get_str<'a>(value: &'a serde_json::Value, key: &str) -> Option<&'a str> {
    let obj = value.as_object()?;
    obj.iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(key))
        .and_then(|(_, v)| v.as_str())
}

fn get_f64(value: &serde_json::Value, key: &str) -> Option<f64> {
    let obj = value.as_object()?;
    obj.iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(key))
        .and_then(|(_, v)| v.as_f64())
}

fn get_bool(value: &serde_json::Value, key: &str) -> Option<bool> {
    let obj = value.as_object()?;
    obj.iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(key))
        .and_then(|(_, v)| v.as_bool())
}

/// Parse a panelist opinion response.
///
/// Expected shape: `{"choice": "...", "reasoning": "...", "confidence": 0.8}`.
/// When the JSON is missing or malformed, the entire response text becomes
/// the opinion with a neutral confidence of 0.5.
///
/// # Returns
///
/// `(opinion_text, confidence)`
///
/// # Examples
///
/// ```
/// use consilium_domain::discussion::parsing::parse_opinion_response;
///
/// let (opinion, confidence) =
///     parse_opinion_response(r#"{"choice": "CT-guided biopsy", "reasoning": "Spiculated margins.", "confidence": 0.9}"#);
/// assert!(opinion.starts_with("CT-guided biopsy"));
/// assert_eq!(confidence, 0.9);
///
/// let (opinion, confidence) = parse_opinion_response("Plain text answer");
/// assert_eq!(opinion, "Plain text answer");
/// assert_eq!(confidence, 0.5);
/// ```
pub fn parse_opinion_response(response: &str) -> (String, f64) {
    if let Some(json) = find_json_object(response) {
        let choice = get_str(&json, "choice");
        let reasoning = get_str(&json, "reasoning");
        let confidence = get_f64(&json, "confidence")
            .map(|c| c.clamp(0.0, 1.0))
            .unwrap_or(0.5);

        let opinion = match (choice, reasoning) {
            (Some(c), Some(r)) => format!("{}\n{}", c, r),
            (Some(c), None) => c.to_string(),
            (None, Some(r)) => r.to_string(),
            (None, None) => response.trim().to_string(),
        };

        if !opinion.is_empty() {
            return (opinion, confidence);
        }
    }

    (response.trim().to_string(), 0.5)
}

/// Parse a safety/ethics assessment response.
///
/// Expected shape:
/// `{"assessment": "...", "concerns": [...], "approved": false}`.
/// A missing or unparseable `approved` field defaults to approval — a veto
/// must be explicit, never the product of a parse failure.
///
/// # Returns
///
/// `(assessment_text, approved)`
pub fn parse_safety_response(response: &str) -> (String, bool) {
    if let Some(json) = find_json_object(response) {
        let approved = get_bool(&json, "approved").unwrap_or(true);

        let mut text = get_str(&json, "assessment")
            .unwrap_or("")
            .to_string();
        if let Some(concerns) = json
            .as_object()
            .and_then(|o| o.iter().find(|(k, _)| k.eq_ignore_ascii_case("concerns")))
            .and_then(|(_, v)| v.as_array())
        {
            let listed: Vec<&str> = concerns.iter().filter_map(|c| c.as_str()).collect();
            if !listed.is_empty() {
                if !text.is_empty() {
                    text.push('\n');
                }
                text.push_str(&format!("Concerns: {}", listed.join("; ")));
            }
        }

        if text.is_empty() {
            text = response.trim().to_string();
        }
        return (text, approved);
    }

    (response.trim().to_string(), true)
}

/// Parse a consistency review response.
///
/// Expected shape: `{"consistent": true, "note": "..."}`. Falls back to
/// keyword matching ("INCONSISTENT", "CONTRADICT") and finally to
/// consistent — an inconsistency flag must be explicit.
///
/// # Returns
///
/// `(note_text, consistent)`
pub fn parse_consistency_response(response: &str) -> (String, bool) {
    if let Some(json) = find_json_object(response) {
        if let Some(consistent) = get_bool(&json, "consistent") {
            let note = get_str(&json, "note")
                .map(str::to_string)
                .unwrap_or_else(|| response.trim().to_string());
            return (note, consistent);
        }
    }

    let upper = response.to_uppercase();
    let inconsistent = upper.contains("INCONSISTENT") || upper.contains("CONTRADICT");

    (response.trim().to_string(), !inconsistent)
}
