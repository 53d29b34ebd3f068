//! Input (mouse and keyboard) operations for CDP page session.

use serde_json::json;
use tracing::debug;

use crate::cdp::error::CdpError;
use crate::cdp::protocol::{KeyEventType, MouseButton, MouseEventType};

use super::core::PageSession;

/// Windows virtual key code and text for keys that need them to trigger
/// their default action.
pub(super) fn key_definition(key: &str) -> (Option<i64>, Option<&'static str>) {
    match key {
        "Enter" => (Some(13), Some("\r")),
        "Tab" => (Some(9), None),
        "Backspace" => (Some(8), None),
        "Escape" => (Some(27), None),
        "Delete" => (Some(46), None),
        "ArrowLeft" => (Some(37), None),
        "ArrowUp" => (Some(38), None),
        "ArrowRight" => (Some(39), None),
        "ArrowDown" => (Some(40), None),
        "PageUp" => (Some(33), None),
        "PageDown" => (Some(34), None),
        "Home" => (Some(36), None),
        "End" => (Some(35), None),
        _ => (None, None),
    }
}

impl PageSession {
    /// Click at viewport coordinates.
    pub async fn click(&self, x: f64, y: f64) -> Result<(), CdpError> {
        self.call(
            "Input.dispatchMouseEvent",
            Some(json!({
                "type": MouseEventType::MouseMoved,
                "x": x,
                "y": y,
            })),
        )
        .await?;

        for event in [MouseEventType::MousePressed, MouseEventType::MouseReleased] {
            self.call(
                "Input.dispatchMouseEvent",
                Some(json!({
                    "type": event,
                    "x": x,
                    "y": y,
                    "button": MouseButton::Left,
                    "clickCount": 1,
                })),
            )
            .await?;
        }

        debug!("Clicked at ({}, {})", x, y);
        Ok(())
    }

    /// Insert text at the focused element.
    pub async fn type_text(&self, text: &str) -> Result<(), CdpError> {
        self.call("Input.insertText", Some(json!({"text": text})))
            .await?;
        debug!("Typed {} characters", text.len());
        Ok(())
    }

    /// Press a key, or a `+`-joined combination such as `Control+a`.
    pub async fn press_key(&self, combo: &str) -> Result<(), CdpError> {
        let parts: Vec<&str> = combo.split('+').collect();
        let (key, modifier_names) = match parts.split_last() {
            Some((key, rest)) if !key.is_empty() => (*key, rest),
            // a lone "+" or a combination ending in "+"
            _ => ("+", &parts[..parts.len().saturating_sub(2)]),
        };
        let modifiers = Self::get_modifiers(modifier_names);
        let (code, text) = key_definition(key);

        let mut down = json!({
            "type": if text.is_some() { KeyEventType::KeyDown } else { KeyEventType::RawKeyDown },
            "key": key,
            "modifiers": modifiers,
        });
        if let Some(code) = code {
            down["windowsVirtualKeyCode"] = json!(code);
        }
        if let Some(text) = text {
            down["text"] = json!(text);
        }
        self.call("Input.dispatchKeyEvent", Some(down)).await?;

        self.call(
            "Input.dispatchKeyEvent",
            Some(json!({
                "type": KeyEventType::KeyUp,
                "key": key,
                "modifiers": modifiers,
            })),
        )
        .await?;
        Ok(())
    }

    /// Modifier bit flags from modifier names.
    pub(super) fn get_modifiers(modifiers: &[&str]) -> i32 {
        let mut flags = 0;
        for m in modifiers {
            match m.to_lowercase().as_str() {
                "alt" => flags |= 1,
                "control" | "ctrl" => flags |= 2,
                "meta" | "command" | "cmd" => flags |= 4,
                "shift" => flags |= 8,
                _ => {}
            }
        }
        flags
    }
}
