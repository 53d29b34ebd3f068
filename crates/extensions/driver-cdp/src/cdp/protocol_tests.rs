use super::*;

#[test]
fn test_cdp_request_serialize() {
    let req = CdpRequest {
        id: 7,
        method: "Runtime.callFunctionOn".to_string(),
        params: Some(serde_json::json!({"objectId": "obj-1"})),
        session_id: Some("S1".to_string()),
    };
    let json = serde_json::to_value(&req).unwrap();
    assert_eq!(json["id"], 7);
    assert_eq!(json["sessionId"], "S1");
    assert_eq!(json["params"]["objectId"], "obj-1");
}

#[test]
fn test_cdp_request_omits_empty_fields() {
    let req = CdpRequest {
        id: 1,
        method: "Target.getTargets".to_string(),
        params: None,
        session_id: None,
    };
    let json = serde_json::to_string(&req).unwrap();
    assert!(!json.contains("params"));
    assert!(!json.contains("sessionId"));
}

#[test]
fn test_cdp_event_deserialize() {
    let json = r#"{"method": "Page.loadEventFired", "params": {"timestamp": 1.0}, "sessionId": "S1"}"#;
    let resp: CdpResponse = serde_json::from_str(json).unwrap();
    assert!(resp.id.is_none());
    assert_eq!(resp.method.as_deref(), Some("Page.loadEventFired"));
    assert_eq!(resp.session_id.as_deref(), Some("S1"));
}

#[test]
fn test_remote_object_null_has_no_node() {
    let null: RemoteObject =
        serde_json::from_str(r#"{"type": "object", "subtype": "null", "value": null}"#).unwrap();
    assert!(null.node_id().is_none());

    let node: RemoteObject = serde_json::from_str(
        r#"{"type": "object", "subtype": "node", "className": "HTMLButtonElement", "objectId": "1.2.3"}"#,
    )
    .unwrap();
    assert_eq!(node.node_id(), Some("1.2.3"));
}

#[test]
fn test_target_info_is_page() {
    let info: TargetInfo = serde_json::from_str(
        r#"{"targetId": "T1", "type": "page", "title": "", "url": "about:blank", "attached": false}"#,
    )
    .unwrap();
    assert!(info.is_page());
}

#[test]
fn test_enum_serialization() {
    assert_eq!(serde_json::to_string(&MouseButton::Left).unwrap(), "\"left\"");
    assert_eq!(
        serde_json::to_string(&MouseEventType::MousePressed).unwrap(),
        "\"mousePressed\""
    );
    assert_eq!(serde_json::to_string(&ScreenshotFormat::Png).unwrap(), "\"png\"");
}
