use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the catalog HTTP API
    Daemon {},

    /// Fetch title, thumbnail and view count for a YouTube link
    Meta {
        /// A YouTube watch, embed or youtu.be link
        url: String,

        /// Fail instead of reporting 0 views when no view count is found
        #[clap(long, default_value = "false")]
        require_view_count: bool,
    },

    /// Print the video id extracted from a YouTube link
    VideoId {
        /// A YouTube watch, embed or youtu.be link
        url: String,
    },
}
