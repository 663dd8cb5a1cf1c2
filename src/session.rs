//! Persisted session state
//!
//! The snapshot is an opaque JSON blob for the host to store. Loading it
//! back through [`SuggestionManager::restore`](crate::SuggestionManager::restore)
//! realigns every pending suggestion against the saved text.

use crate::error::SessionError;
use crate::suggestion::Suggestion;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub text: String,
    #[serde(default)]
    pub suggestions: Vec<Suggestion>,
    /// Milliseconds since the Unix epoch
    #[serde(default)]
    pub timestamp: u64,
}

impl SessionSnapshot {
    pub fn to_json(&self) -> Result<String, SessionError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self, SessionError> {
        Ok(serde_json::from_str(json)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::suggestion::{EditType, SuggestionId, SuggestionState};

    #[test]
    fn test_json_shape() {
        let mut suggestion = Suggestion::new(SuggestionId(3), EditType::Line, "quick", "speedy", 4, 9)
            .with_doc_range(5, 10);
        suggestion.state = SuggestionState::Rejected;
        let snapshot = SessionSnapshot {
            text: "The quick fox".into(),
            suggestions: vec![suggestion],
            timestamp: 42,
        };

        let json = snapshot.to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["suggestions"][0]["editType"], "Line");
        assert_eq!(value["suggestions"][0]["state"], "rejected");
        assert_eq!(value["suggestions"][0]["charStart"], 4);

        assert_eq!(SessionSnapshot::from_json(&json).unwrap(), snapshot);
    }

    #[test]
    fn test_minimal_and_malformed() {
        let snapshot = SessionSnapshot::from_json(r#"{"text":"hi"}"#).unwrap();
        assert!(snapshot.suggestions.is_empty());
        assert!(matches!(SessionSnapshot::from_json("{"), Err(SessionError::Json(_))));
    }
}
