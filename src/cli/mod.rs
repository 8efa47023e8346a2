pub mod commands;

use clap::{Parser, Subcommand};

use crate::client::DEFAULT_PAGE_SIZE;

#[derive(Parser)]
#[command(name = "noticeboard")]
#[command(about = "Keep a notification inbox in sync from the terminal", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List notifications
    List {
        /// Only unread notifications
        #[arg(long)]
        unread: bool,

        /// Page to fetch (1-based)
        #[arg(short, long, default_value_t = 1)]
        page: u32,

        /// Notifications per page
        #[arg(short, long, default_value_t = DEFAULT_PAGE_SIZE)]
        limit: u32,
    },
    /// Show unread and total counts
    Count,
    /// Mark one notification as read
    Read {
        /// Notification id
        id: String,
    },
    /// Mark every notification as read
    ReadAll,
    /// Delete a notification
    Delete {
        /// Notification id
        id: String,
    },
    /// Mark a notification read and open its target in the browser
    Open {
        /// Notification id
        id: String,
    },
    /// Keep the inbox in sync and print new notifications until Ctrl-C
    Watch {
        /// Poll only, without the realtime channel
        #[arg(long)]
        no_push: bool,
    },
}
