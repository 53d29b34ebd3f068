//! Action vocabulary and results.

use serde::{Deserialize, Serialize};

/// Scroll the window by `amount` pixels, or one viewport when `amount` is
/// null. `direction` is `1` for down and `-1` for up.
pub const SCROLL_JS: &str = r#"function (amount, direction) {
    const dy = amount === null ? window.innerHeight : amount;
    window.scrollBy(0, direction * dy);
    return window.scrollY;
}"#;

pub const EXTRACT_CONTENT_JS: &str =
    "function () { return document.body ? document.body.innerText : ''; }";

/// One step the controller can perform.
///
/// Serialized with an `action` tag, e.g.
/// `{"action": "click_element", "index": 3}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Action {
    ClickElement { index: usize },
    InputText { index: usize, text: String },
    GoToUrl { url: String },
    GoBack,
    OpenTab { url: String },
    SwitchTab { page_id: usize },
    ScrollDown {
        #[serde(default)]
        amount: Option<i64>,
    },
    ScrollUp {
        #[serde(default)]
        amount: Option<i64>,
    },
    SendKeys { keys: String },
    ExtractContent,
    Wait {
        #[serde(default = "default_wait_seconds")]
        seconds: u64,
    },
    Done { text: String },
}

fn default_wait_seconds() -> u64 {
    3
}

impl Action {
    /// Highlight index the action addresses, if any.
    pub fn index(&self) -> Option<usize> {
        match self {
            Action::ClickElement { index } | Action::InputText { index, .. } => Some(*index),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Action::ClickElement { .. } => "click_element",
            Action::InputText { .. } => "input_text",
            Action::GoToUrl { .. } => "go_to_url",
            Action::GoBack => "go_back",
            Action::OpenTab { .. } => "open_tab",
            Action::SwitchTab { .. } => "switch_tab",
            Action::ScrollDown { .. } => "scroll_down",
            Action::ScrollUp { .. } => "scroll_up",
            Action::SendKeys { .. } => "send_keys",
            Action::ExtractContent => "extract_content",
            Action::Wait { .. } => "wait",
            Action::Done { .. } => "done",
        }
    }
}

/// Outcome of one action.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionResult {
    pub is_done: bool,
    pub extracted_content: Option<String>,
    pub error: Option<String>,
    /// Whether the driving loop should keep this result in its history.
    pub include_in_memory: bool,
}

impl ActionResult {
    pub fn content(content: impl Into<String>) -> Self {
        Self {
            extracted_content: Some(content.into()),
            include_in_memory: true,
            ..Default::default()
        }
    }

    pub fn error(error: impl Into<String>) -> Self {
        Self {
            error: Some(error.into()),
            include_in_memory: true,
            ..Default::default()
        }
    }

    /// Final result; ends a multi-action sequence.
    pub fn done(text: impl Into<String>) -> Self {
        Self {
            is_done: true,
            extracted_content: Some(text.into()),
            include_in_memory: true,
            ..Default::default()
        }
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_action_tagged_deserialize() {
        let action: Action =
            serde_json::from_value(json!({"action": "input_text", "index": 2, "text": "hi"})).unwrap();
        assert_eq!(
            action,
            Action::InputText {
                index: 2,
                text: "hi".into()
            }
        );
        assert_eq!(action.index(), Some(2));

        let action: Action = serde_json::from_value(json!({"action": "scroll_down"})).unwrap();
        assert_eq!(action, Action::ScrollDown { amount: None });
        assert_eq!(action.index(), None);

        let action: Action = serde_json::from_value(json!({"action": "wait"})).unwrap();
        assert_eq!(action, Action::Wait { seconds: 3 });
    }

    #[test]
    fn test_unknown_action_rejected() {
        let result: Result<Action, _> = serde_json::from_value(json!({"action": "fly"}));
        assert!(result.is_err());
    }

    #[test]
    fn test_name_matches_tag() {
        let actions = vec![
            Action::ClickElement { index: 0 },
            Action::GoBack,
            Action::ExtractContent,
            Action::SwitchTab { page_id: 1 },
        ];
        for action in actions {
            let value = serde_json::to_value(&action).unwrap();
            assert_eq!(value["action"], action.name());
        }
    }

    #[test]
    fn test_result_shape() {
        let value = serde_json::to_value(ActionResult::error("boom")).unwrap();
        assert_eq!(
            value,
            json!({
                "is_done": false,
                "extracted_content": null,
                "error": "boom",
                "include_in_memory": true
            })
        );
        assert!(ActionResult::done("ok").is_done);
        assert!(ActionResult::content("x").is_success());
    }
}
