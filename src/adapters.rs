//! Mapping from the file configuration onto component configs.

use std::sync::Arc;

use webhands_browser::{BrowserContextConfig, ControllerConfig};
use webhands_config::Config;
use webhands_dom::{DomServiceConfig, FindOptions};
use webhands_driver_cdp::CdpBrowserConfig;
use webhands_protocols::{NoopTelemetry, Telemetry, TracingTelemetry};

pub(crate) fn driver_config(config: &Config) -> CdpBrowserConfig {
    let browser = &config.browser;
    CdpBrowserConfig {
        debug_port: browser.debug_port,
        headless: browser.headless,
        profile_dir: Some(browser.profile_dir()),
        chrome_path: browser.chrome_path.clone(),
        viewport_width: browser.viewport_width,
        viewport_height: browser.viewport_height,
        ..Default::default()
    }
}

pub(crate) fn context_config(config: &Config) -> BrowserContextConfig {
    BrowserContextConfig {
        cookies_file: config.browser.cookies_file.clone(),
        minimum_wait_page_load: config.agent.minimum_wait_page_load(),
        highlight_elements: config.dom.highlight_elements,
        viewport_expansion: config.dom.viewport_expansion,
        include_shadow_roots: config.dom.include_shadow_roots,
        poll_interval: config.dom.poll_interval(),
        max_attempts: config.resolver.max_attempts,
        retry_delay: config.resolver.retry_delay(),
        ..Default::default()
    }
}

pub(crate) fn controller_config(config: &Config) -> ControllerConfig {
    ControllerConfig {
        wait_between_actions: config.agent.wait_between_actions(),
    }
}

pub(crate) fn dom_service_config(config: &Config) -> DomServiceConfig {
    DomServiceConfig {
        poll_interval: config.dom.poll_interval(),
    }
}

pub(crate) fn find_options(config: &Config, include_hidden: bool) -> FindOptions {
    FindOptions {
        timeout: config.dom.find_timeout(),
        include_hidden,
        ..Default::default()
    }
}

/// Usage events go to the log unless telemetry is switched off.
pub(crate) fn telemetry(config: &Config) -> Arc<dyn Telemetry> {
    if config.telemetry.enabled {
        Arc::new(TracingTelemetry::new())
    } else {
        Arc::new(NoopTelemetry)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use webhands_config::ConfigLoader;

    use super::*;

    #[test]
    fn test_file_values_reach_components() {
        let config = ConfigLoader::load_str(
            r#"
            [browser]
            debug_port = 9333
            headless = true

            [dom]
            poll_interval_ms = 250
            viewport_expansion = -1

            [resolver]
            max_attempts = 5
            retry_delay_ms = 50

            [agent]
            wait_between_actions_ms = 0
            "#,
        )
        .unwrap();

        let driver = driver_config(&config);
        assert_eq!(driver.debug_port, 9333);
        assert!(driver.headless);
        assert!(driver.profile_dir.is_some());

        let context = context_config(&config);
        assert_eq!(context.viewport_expansion, -1);
        assert_eq!(context.poll_interval, Duration::from_millis(250));
        assert_eq!(context.max_attempts, 5);
        assert_eq!(context.retry_delay, Duration::from_millis(50));

        assert_eq!(controller_config(&config).wait_between_actions, Duration::ZERO);
        assert_eq!(dom_service_config(&config).poll_interval, Duration::from_millis(250));
        assert_eq!(find_options(&config, true).timeout, Duration::from_secs(5));
    }
}
