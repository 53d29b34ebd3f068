//! Action controller.
//!
//! [`Controller::act`] runs one [`Action`] and turns any failure into an
//! [`ActionResult`] carrying the error. [`Controller::multi_act`] runs a
//! queue of actions and stops early when the page grows elements that were
//! not in the selector map the queue was planned against.

mod actions;

use std::sync::Arc;
use std::time::Duration;

use serde_json::{Value, json};
use tracing::{debug, info, warn};
use webhands_dom::DomService;
use webhands_protocols::{Telemetry, TelemetryEvent};

use crate::context::{BrowserContext, BrowserError, BrowserResult};

pub use actions::{Action, ActionResult, EXTRACT_CONTENT_JS, SCROLL_JS};

#[derive(Debug, Clone)]
pub struct ControllerConfig {
    /// Pause between queued actions.
    pub wait_between_actions: Duration,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            wait_between_actions: Duration::from_millis(500),
        }
    }
}

pub struct Controller {
    config: ControllerConfig,
    telemetry: Arc<dyn Telemetry>,
}

impl Controller {
    pub fn new(config: ControllerConfig, telemetry: Arc<dyn Telemetry>) -> Self {
        Self { config, telemetry }
    }

    /// Execute one action against `context`.
    pub async fn act(&self, action: &Action, context: &BrowserContext) -> ActionResult {
        let result = match self.execute(action, context).await {
            Ok(result) => result,
            Err(e) => {
                warn!(action = action.name(), "Action failed: {}", e);
                ActionResult::error(e.to_string())
            }
        };
        self.telemetry.capture(TelemetryEvent::ActionExecuted {
            action: action.name().to_string(),
            success: result.is_success(),
        });
        result
    }

    async fn execute(&self, action: &Action, context: &BrowserContext) -> BrowserResult<ActionResult> {
        match action {
            Action::ClickElement { index } => {
                let (state, id) = context
                    .cached_node(*index)
                    .await
                    .ok_or(BrowserError::NoElementAtIndex(*index))?;
                if DomService::is_file_uploader(&state.tree, id) {
                    return Ok(ActionResult::content(format!(
                        "Index {} - has an element which opens file upload dialog. \
                         To upload files please use a specific function to upload files",
                        index
                    )));
                }
                let message = match context.click_element_by_index(*index).await? {
                    Some(tab) => format!(
                        "Clicked element with index {}; it opened tab {} which is now active",
                        index, tab
                    ),
                    None => format!("Clicked element with index {}", index),
                };
                info!("{}", message);
                Ok(ActionResult::content(message))
            }
            Action::InputText { index, text } => {
                context.input_text_by_index(*index, text).await?;
                Ok(ActionResult::content(format!(
                    "Input {} into index {}",
                    text, index
                )))
            }
            Action::GoToUrl { url } => {
                context.navigate_to(url).await?;
                Ok(ActionResult::content(format!("Navigated to {}", url)))
            }
            Action::GoBack => {
                context.go_back().await?;
                Ok(ActionResult::content("Navigated back"))
            }
            Action::OpenTab { url } => {
                let page_id = context.create_new_tab(Some(url)).await?;
                Ok(ActionResult::content(format!(
                    "Opened new tab {} with {}",
                    page_id, url
                )))
            }
            Action::SwitchTab { page_id } => {
                context.switch_to_tab(*page_id).await?;
                Ok(ActionResult::content(format!("Switched to tab {}", page_id)))
            }
            Action::ScrollDown { amount } => {
                self.scroll(context, *amount, 1).await?;
                Ok(ActionResult::content(scroll_message("down", *amount)))
            }
            Action::ScrollUp { amount } => {
                self.scroll(context, *amount, -1).await?;
                Ok(ActionResult::content(scroll_message("up", *amount)))
            }
            Action::SendKeys { keys } => {
                context.init().await?;
                context.current_page().await?.press_key(keys).await?;
                Ok(ActionResult::content(format!("Sent keys: {}", keys)))
            }
            Action::ExtractContent => {
                context.init().await?;
                let page = context.current_page().await?;
                let text = match page.evaluate(EXTRACT_CONTENT_JS, vec![]).await? {
                    Value::String(text) => text,
                    Value::Null => String::new(),
                    other => other.to_string(),
                };
                let url = page.url().await?;
                Ok(ActionResult::content(format!(
                    "Extracted page content from {}:\n{}",
                    url, text
                )))
            }
            Action::Wait { seconds } => {
                tokio::time::sleep(Duration::from_secs(*seconds)).await;
                Ok(ActionResult::content(format!("Waited for {} seconds", seconds)))
            }
            Action::Done { text } => Ok(ActionResult::done(text.clone())),
        }
    }

    async fn scroll(&self, context: &BrowserContext, amount: Option<i64>, direction: i64) -> BrowserResult<()> {
        context.init().await?;
        let page = context.current_page().await?;
        page.evaluate(SCROLL_JS, vec![json!(amount), json!(direction)])
            .await?;
        Ok(())
    }

    /// Execute `actions` in order.
    ///
    /// Stops after a `done` or failed action. Before each action after the
    /// first that addresses an element by index, the page is re-snapshotted;
    /// if a branch path appears that the original selector map did not have,
    /// the remaining actions are dropped.
    pub async fn multi_act(&self, actions: &[Action], context: &BrowserContext) -> Vec<ActionResult> {
        let cached = context.cached_path_hashes().await;
        let mut results = Vec::with_capacity(actions.len());
        let mut aborted_on_change = false;

        for (i, action) in actions.iter().enumerate() {
            if i > 0 && action.index().is_some() {
                match context.get_state(false).await {
                    Ok(state) => {
                        let fresh = state.dom.path_hashes();
                        if !fresh.is_subset(&cached) {
                            info!(
                                executed = i,
                                remaining = actions.len() - i,
                                "Something new appeared after action {} / {}",
                                i,
                                actions.len()
                            );
                            aborted_on_change = true;
                            break;
                        }
                    }
                    Err(e) => {
                        results.push(ActionResult::error(e.to_string()));
                        break;
                    }
                }
            }

            let result = self.act(action, context).await;
            let stop = result.is_done || result.error.is_some();
            results.push(result);
            if stop {
                debug!(action = action.name(), "Stopping action sequence");
                break;
            }

            if i + 1 < actions.len() {
                tokio::time::sleep(self.config.wait_between_actions).await;
            }
        }

        self.telemetry.capture(TelemetryEvent::MultiActFinished {
            requested: actions.len(),
            executed: results.len(),
            aborted_on_change,
        });
        results
    }
}

fn scroll_message(direction: &str, amount: Option<i64>) -> String {
    match amount {
        Some(amount) => format!("Scrolled {} the page by {} pixels", direction, amount),
        None => format!("Scrolled {} the page by one page", direction),
    }
}

#[cfg(test)]
#[path = "controller_tests.rs"]
mod tests;
