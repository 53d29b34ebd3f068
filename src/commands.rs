//! Subcommand handlers.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use tokio::time::Instant;
use tracing::{info, warn};

use webhands_browser::{Action, BrowserContext, Controller};
use webhands_config::Config;
use webhands_dom::{DomService, MutationEvent};
use webhands_driver_cdp::CdpBrowser;
use webhands_protocols::BrowserDriver;

use crate::adapters;

type CmdResult = Result<(), Box<dyn std::error::Error>>;

const LISTING_ATTRIBUTES: &[&str] = &[
    "id",
    "name",
    "type",
    "placeholder",
    "aria-label",
    "role",
    "href",
    "title",
    "alt",
];

/// Connect to Chrome and open `url` in a fresh context.
async fn open_context(config: &Config, url: &str) -> Result<BrowserContext, Box<dyn std::error::Error>> {
    let browser: Arc<dyn BrowserDriver> =
        Arc::new(CdpBrowser::connect(adapters::driver_config(config)).await?);
    let context = BrowserContext::new(
        browser,
        adapters::context_config(config),
        adapters::telemetry(config),
    );
    context.init().await?;
    context.navigate_to(url).await?;
    Ok(context)
}

async fn close_context(context: &BrowserContext) {
    if let Err(e) = context.close().await {
        warn!("Failed to close browser context: {}", e);
    }
}

pub(crate) async fn state(config: &Config, url: &str, vision: bool, screenshot: &Path) -> CmdResult {
    let context = open_context(config, url).await?;
    let result = print_state(&context, vision, screenshot).await;
    close_context(&context).await;
    result
}

async fn print_state(context: &BrowserContext, vision: bool, screenshot: &Path) -> CmdResult {
    let state = context.get_state(vision).await?;
    println!("URL: {}", state.url);
    println!("Title: {}", state.title);
    for tab in &state.tabs {
        println!("Tab {}: {} ({})", tab.page_id, tab.title, tab.url);
    }
    println!();
    println!("{}", state.clickable_elements_to_string(LISTING_ATTRIBUTES));

    if let Some(data) = state.screenshot {
        let bytes = STANDARD.decode(data)?;
        tokio::fs::write(screenshot, bytes).await?;
        info!("Screenshot written to {}", screenshot.display());
    }
    Ok(())
}

pub(crate) async fn act(config: &Config, url: &str, actions: &str) -> CmdResult {
    let actions: Vec<Action> = serde_json::from_str(actions)?;
    let context = open_context(config, url).await?;
    let result = run_actions(config, &context, &actions).await;
    close_context(&context).await;
    result
}

async fn run_actions(config: &Config, context: &BrowserContext, actions: &[Action]) -> CmdResult {
    // indexes in the actions refer to this snapshot
    context.get_state(false).await?;

    let controller = Controller::new(adapters::controller_config(config), adapters::telemetry(config));
    let results = controller.multi_act(actions, context).await;
    println!("{}", serde_json::to_string_pretty(&results)?);
    if results.len() < actions.len() {
        warn!(
            "Executed {} of {} actions",
            results.len(),
            actions.len()
        );
    }
    Ok(())
}

pub(crate) async fn find(config: &Config, url: &str, selector: &str, include_hidden: bool) -> CmdResult {
    let context = open_context(config, url).await?;
    let result = find_in(config, &context, selector, include_hidden).await;
    close_context(&context).await;
    result
}

async fn find_in(config: &Config, context: &BrowserContext, selector: &str, include_hidden: bool) -> CmdResult {
    let page = context.current_page().await?;
    let dom = DomService::with_config(page.clone(), adapters::dom_service_config(config));
    let options = adapters::find_options(config, include_hidden);

    match dom.find_element(selector, &options).await? {
        Some(handle) => {
            let visible = dom.is_visible(&handle).await?;
            let enabled = dom.is_enabled(&handle).await?;
            println!("Found {} (visible: {}, enabled: {})", selector, visible, enabled);
        }
        None => println!("No element matched {} within {:?}", selector, options.timeout),
    }
    dom.cleanup().await;
    Ok(())
}

pub(crate) async fn watch(config: &Config, url: &str, seconds: u64) -> CmdResult {
    let context = open_context(config, url).await?;
    let result = watch_in(config, &context, Duration::from_secs(seconds)).await;
    close_context(&context).await;
    result
}

async fn watch_in(config: &Config, context: &BrowserContext, duration: Duration) -> CmdResult {
    let page = context.current_page().await?;
    let dom = DomService::with_config(page, adapters::dom_service_config(config));
    let mut subscription = dom.subscribe()?;
    dom.start_observing().await?;
    info!("Watching DOM mutations for {:?}", duration);

    let deadline = Instant::now() + duration;
    loop {
        tokio::select! {
            event = subscription.recv() => match event {
                Some(event) => print_mutation(&event),
                None => break,
            },
            _ = tokio::time::sleep_until(deadline) => break,
        }
    }

    dom.cleanup().await;
    Ok(())
}

fn print_mutation(event: &MutationEvent) {
    let target = event.target();
    let id = target
        .id
        .as_deref()
        .map(|id| format!("#{}", id))
        .unwrap_or_default();
    match event {
        MutationEvent::Added { .. } => println!("+ {}{}", target.node_name, id),
        MutationEvent::Removed { .. } => println!("- {}{}", target.node_name, id),
        MutationEvent::Attribute {
            attribute_name,
            old_value,
            new_value,
            ..
        } => println!(
            "~ {}{} [{}] {:?} -> {:?}",
            target.node_name, id, attribute_name, old_value, new_value
        ),
        MutationEvent::Modified {
            old_value,
            new_value,
            ..
        } => println!(
            "~ {}{} text {:?} -> {:?}",
            target.node_name, id, old_value, new_value
        ),
    }
}
