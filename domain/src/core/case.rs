//! Case value objects
//!
//! A [`Case`] is the immutable input of a consultation session: the clinical
//! description plus optional structured fields. It is created once at session
//! start and never modified afterwards.

use serde::{Deserialize, Serialize};

/// Unique identifier of a clinical case (Value Object)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CaseId(String);

impl CaseId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CaseId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for CaseId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for CaseId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// A clinical case to be discussed by the panel (Entity, immutable)
///
/// # Example
///
/// ```
/// use consilium_domain::core::case::Case;
///
/// let case = Case::new("case-001", "3cm lung nodule, spiculated margins")
///     .with_age(57)
///     .with_symptom("persistent cough");
///
/// assert_eq!(case.id().as_str(), "case-001");
/// assert_eq!(case.age(), Some(57));
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Case {
    id: CaseId,
    description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    age: Option<u32>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    symptoms: Vec<String>,
}

impl Case {
    pub fn new(id: impl Into<CaseId>, description: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            description: description.into(),
            age: None,
            symptoms: Vec::new(),
        }
    }

    pub fn with_age(mut self, age: u32) -> Self {
        self.age = Some(age);
        self
    }

    pub fn with_symptom(mut self, symptom: impl Into<String>) -> Self {
        self.symptoms.push(symptom.into());
        self
    }

    pub fn id(&self) -> &CaseId {
        &self.id
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn age(&self) -> Option<u32> {
        self.age
    }

    pub fn symptoms(&self) -> &[String] {
        &self.symptoms
    }

    /// Render the case as retrieval/prompt text: description plus any
    /// structured fields in a stable order.
    pub fn as_prompt_text(&self) -> String {
        let mut text = self.description.clone();
        if let Some(age) = self.age {
            text.push_str(&format!("\nAge: {}", age));
        }
        if !self.symptoms.is_empty() {
            text.push_str(&format!("\nSymptoms: {}", self.symptoms.join(", ")));
        }
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_case_construction() {
        let case = Case::new("c-1", "chest pain on exertion")
            .with_age(64)
            .with_symptom("dyspnea")
            .with_symptom("diaphoresis");

        assert_eq!(case.id().to_string(), "c-1");
        assert_eq!(case.description(), "chest pain on exertion");
        assert_eq!(case.age(), Some(64));
        assert_eq!(case.symptoms().len(), 2);
    }

    #[test]
    fn test_prompt_text_includes_structured_fields() {
        let case = Case::new("c-2", "fever of unknown origin").with_age(8);
        let text = case.as_prompt_text();

        assert!(text.contains("fever of unknown origin"));
        assert!(text.contains("Age: 8"));
        assert!(!text.contains("Symptoms"));
    }

    #[test]
    fn test_case_id_from_string() {
        let id: CaseId = "abc".into();
        assert_eq!(id.as_str(), "abc");
    }
}
