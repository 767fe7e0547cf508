use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Saved expand/cursor state for one root directory
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionState {
    /// Absolute paths of expanded directories
    #[serde(default)]
    pub expanded: Vec<String>,
    /// Absolute path of the cursor node
    #[serde(default)]
    pub cursor: Option<String>,
}

/// The whole state file: one record per root path, in first-saved order
pub type SessionDocument = IndexMap<String, SessionState>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serde_defaults_on_empty_object() {
        let state: SessionState = serde_json::from_str("{}").unwrap();
        assert!(state.expanded.is_empty());
        assert!(state.cursor.is_none());
    }

    #[test]
    fn null_cursor_round_trips() {
        let json = r#"{"/proj": {"expanded": ["/proj", "/proj/src"], "cursor": null}}"#;
        let doc: SessionDocument = serde_json::from_str(json).unwrap();
        let state = &doc["/proj"];
        assert_eq!(state.expanded, vec!["/proj", "/proj/src"]);
        assert!(state.cursor.is_none());
        let out = serde_json::to_string(&doc).unwrap();
        assert!(out.contains("\"cursor\":null"));
    }
}
