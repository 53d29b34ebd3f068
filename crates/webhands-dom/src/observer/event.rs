use serde::{Deserialize, Serialize};

/// Node summary carried by mutation records.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SerializedNode {
    #[serde(default)]
    pub node_name: String,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub class_name: Option<String>,
}

/// One DOM change recorded by the in-page observer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MutationEvent {
    Added {
        target: SerializedNode,
    },
    Removed {
        target: SerializedNode,
    },
    #[serde(rename_all = "camelCase")]
    Attribute {
        target: SerializedNode,
        attribute_name: String,
        #[serde(default)]
        old_value: Option<String>,
        #[serde(default)]
        new_value: Option<String>,
    },
    /// Text content change.
    #[serde(rename_all = "camelCase")]
    Modified {
        target: SerializedNode,
        #[serde(default)]
        old_value: Option<String>,
        #[serde(default)]
        new_value: Option<String>,
    },
}

impl MutationEvent {
    pub fn target(&self) -> &SerializedNode {
        match self {
            MutationEvent::Added { target }
            | MutationEvent::Removed { target }
            | MutationEvent::Attribute { target, .. }
            | MutationEvent::Modified { target, .. } => target,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_page_records() {
        let batch = json!([
            {"type": "added", "target": {"nodeName": "DIV", "id": "toast", "className": "toast"}},
            {"type": "attribute", "target": {"nodeName": "BUTTON", "id": "go", "className": null},
             "attributeName": "disabled", "oldValue": null, "newValue": ""},
            {"type": "modified", "target": {"nodeName": "P", "id": null, "className": ""},
             "oldValue": "Loading", "newValue": "Done"}
        ]);
        let events: Vec<MutationEvent> = serde_json::from_value(batch).unwrap();
        assert_eq!(events.len(), 3);
        assert_eq!(events[0].target().id.as_deref(), Some("toast"));
        match &events[1] {
            MutationEvent::Attribute {
                attribute_name,
                new_value,
                ..
            } => {
                assert_eq!(attribute_name, "disabled");
                assert_eq!(new_value.as_deref(), Some(""));
            }
            other => panic!("unexpected event {:?}", other),
        }
        assert!(matches!(events[2], MutationEvent::Modified { .. }));
    }
}
