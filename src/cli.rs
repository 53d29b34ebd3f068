//! CLI definitions for WebHands.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// WebHands CLI.
#[derive(Parser)]
#[command(name = "webhands")]
#[command(about = "Indexed DOM snapshots and element actions over Chrome")]
#[command(version)]
pub(crate) struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "config/default.toml", global = true)]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub(crate) enum Commands {
    /// Open a URL and print its indexed interactive elements
    State {
        url: String,

        /// Also capture a screenshot
        #[arg(long)]
        vision: bool,

        /// Where to write the screenshot PNG
        #[arg(long, default_value = "screenshot.png")]
        screenshot: PathBuf,
    },

    /// Open a URL and run a JSON list of actions against it
    Act {
        url: String,

        /// e.g. '[{"action":"click_element","index":0}]'
        #[arg(long)]
        actions: String,
    },

    /// Wait for a CSS selector or XPath to match
    Find {
        url: String,

        selector: String,

        /// Accept hidden elements
        #[arg(long)]
        include_hidden: bool,
    },

    /// Print DOM mutations of a page for a while
    Watch {
        url: String,

        #[arg(long, default_value_t = 10)]
        seconds: u64,
    },
}
