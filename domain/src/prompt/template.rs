//! Prompt templates for the discussion flow

use crate::core::case::Case;
use crate::discussion::transcript::Transcript;
use crate::knowledge::entry::KnowledgeEntry;

/// Templates for generating prompts at each stage of a consultation
pub struct PromptTemplate;

impl PromptTemplate {
    /// User prompt for a panelist opinion turn.
    ///
    /// From round 2 on, the prior rounds of the transcript are included so
    /// the panel argues against what has already been said rather than
    /// restating round 1.
    pub fn opinion_prompt(
        case: &Case,
        transcript: &Transcript,
        retrieved: &[KnowledgeEntry],
    ) -> String {
        let mut prompt = format!(
            r#"Clinical case {}:

{}
"#,
            case.id(),
            case.as_prompt_text()
        );

        if !retrieved.is_empty() {
            prompt.push_str("\nRelevant prior knowledge:\n");
            for entry in retrieved {
                prompt.push_str(&format!("- [{}] {}\n", entry.kind_label(), entry.text));
            }
        }

        if !transcript.is_empty() {
            prompt.push_str("\nDiscussion so far:\n");
            prompt.push_str(&Self::render_transcript(transcript));
        }

        prompt.push_str(
            r#"
Give your opinion on this case. Respond with JSON:
{"choice": "<your recommendation>", "reasoning": "<brief clinical reasoning>", "confidence": <0.0-1.0>}"#,
        );

        prompt
    }

    /// User prompt for the safety/ethics assessment.
    ///
    /// Safety sees the case and the prior rounds only — turns within the
    /// current round are independent of each other.
    pub fn safety_prompt(case: &Case, transcript: &Transcript) -> String {
        let mut prompt = format!(
            r#"Clinical case {}:

{}
"#,
            case.id(),
            case.as_prompt_text()
        );

        if !transcript.is_empty() {
            prompt.push_str("\nPanel discussion so far:\n");
            prompt.push_str(&Self::render_transcript(transcript));
        }

        prompt.push_str(
            r#"
Evaluate the panel's direction for safety risks, ethical issues and bias.
Respond with JSON:
{"assessment": "<summary>", "concerns": ["..."], "approved": <true|false>}
Set "approved": false only for a non-negotiable safety or ethics objection."#,
        );

        prompt
    }

    /// User prompt for the consistency review of a completed round.
    pub fn consistency_prompt(transcript: &Transcript, current_opinions: &[(String, String)]) -> String {
        let mut prompt = String::from("Prior discussion:\n");
        prompt.push_str(&Self::render_transcript(transcript));

        prompt.push_str("\nCurrent round:\n");
        for (role, opinion) in current_opinions {
            prompt.push_str(&format!("\n--- {} ---\n{}\n", role, opinion));
        }

        prompt.push_str(
            r#"
Check the current round's reasoning for internal consistency against the
prior discussion. Respond with JSON:
{"consistent": <true|false>, "note": "<what contradicts, if anything>"}"#,
        );

        prompt
    }

    /// User prompt for the lead physician's single-decision override on
    /// escalation.
    pub fn override_prompt(case: &Case, transcript: &Transcript) -> String {
        format!(
            r#"Clinical case {}:

{}

Full panel discussion:
{}
The panel could not settle this case. As lead physician you must now make
the final call alone. Respond with JSON:
{{"choice": "<final recommendation>", "reasoning": "<justification>", "confidence": <0.0-1.0>}}"#,
            case.id(),
            case.as_prompt_text(),
            Self::render_transcript(transcript)
        )
    }

    fn render_transcript(transcript: &Transcript) -> String {
        let mut out = String::new();
        for round in transcript.rounds() {
            out.push_str(&format!("Round {}:\n", round.number));
            for turn in &round.turns {
                out.push_str(&format!("  [{}] {}\n", turn.role, turn.opinion));
            }
        }
        out
    }
}
