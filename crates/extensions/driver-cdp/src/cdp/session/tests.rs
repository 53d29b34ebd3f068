use super::*;
use serde_json::json;

use super::input::key_definition;
use super::js::exception_message;

#[test]
fn test_quad_center() {
    let quad = [10.0, 20.0, 30.0, 20.0, 30.0, 40.0, 10.0, 40.0];
    assert_eq!(PageSession::quad_center(&quad), (20.0, 30.0));
    assert_eq!(PageSession::quad_center(&[1.0, 2.0]), (0.0, 0.0));
}

#[test]
fn test_get_modifiers() {
    assert_eq!(PageSession::get_modifiers(&[]), 0);
    assert_eq!(PageSession::get_modifiers(&["Control"]), 2);
    assert_eq!(PageSession::get_modifiers(&["ctrl", "Shift"]), 10);
    assert_eq!(PageSession::get_modifiers(&["Meta", "Alt"]), 5);
}

#[test]
fn test_enter_carries_text() {
    assert_eq!(key_definition("Enter"), (Some(13), Some("\r")));
    assert_eq!(key_definition("Tab"), (Some(9), None));
    assert_eq!(key_definition("a"), (None, None));
}

#[test]
fn test_exception_message_prefers_description() {
    let details = json!({
        "text": "Uncaught",
        "exception": {
            "type": "object",
            "description": "SyntaxError: 'div[' is not a valid selector."
        }
    });
    assert_eq!(
        exception_message(&details),
        "SyntaxError: 'div[' is not a valid selector."
    );
    assert_eq!(exception_message(&json!({"text": "Uncaught"})), "Uncaught");
}
