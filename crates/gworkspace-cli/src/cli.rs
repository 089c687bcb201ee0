//! Command-line interface definition.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// gworkspace - Google Workspace from the terminal
#[derive(Debug, Parser)]
#[command(name = "gworkspace")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(long, short, env = "GWORKSPACE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Enable debug output
    #[arg(long, short = 'v')]
    pub debug: bool,

    /// Use this bearer token instead of the stored OAuth tokens
    #[arg(long, env = "GWORKSPACE_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Authorize access to your Google account
    Auth {
        /// Run the consent flow even if tokens are already stored
        #[arg(long, short)]
        force: bool,

        /// Delete the stored tokens
        #[arg(long, conflicts_with = "force")]
        logout: bool,
    },

    /// List calendars
    Calendars {
        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// List upcoming events
    Events {
        /// Calendar ID (can be repeated; defaults to the configured calendars)
        #[arg(long = "calendar", action = clap::ArgAction::Append)]
        calendars: Vec<String>,

        /// Number of days to show, starting today
        #[arg(long, default_value_t = 1)]
        days: u32,

        /// Show recurring events as their series instead of single occurrences
        #[arg(long)]
        no_expand: bool,

        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Show a spreadsheet
    Sheet {
        /// Spreadsheet ID
        id: String,

        /// Sheet title (defaults to the first sheet)
        #[arg(long)]
        sheet: Option<String>,

        /// Print a single cell, e.g. B7
        #[arg(long)]
        cell: Option<String>,
    },

    /// Google Tasks
    Tasks {
        #[command(subcommand)]
        action: TasksAction,
    },

    /// Google Drive
    Drive {
        #[command(subcommand)]
        action: DriveAction,
    },

    /// Google Contacts
    Contacts {
        #[command(subcommand)]
        action: ContactsAction,
    },

    /// Google Books
    Books {
        #[command(subcommand)]
        action: BooksAction,
    },

    /// Google Docs
    Docs {
        #[command(subcommand)]
        action: DocsAction,
    },

    /// Configuration commands
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Debug, Subcommand)]
pub enum TasksAction {
    /// List task lists
    Lists,

    /// Show the tasks of a list
    Show {
        /// Exact title of the task list
        title: String,
    },

    /// Add a task, creating the list if needed
    Add {
        /// Exact title of the task list
        list: String,

        /// Title of the new task
        task: String,
    },

    /// Delete every task of a list
    Clear {
        /// Exact title of the task list
        title: String,
    },
}

#[derive(Debug, Subcommand)]
pub enum DriveAction {
    /// List files
    Ls {
        /// Only list children of this folder ID
        #[arg(long)]
        parent: Option<String>,

        /// Only list folders
        #[arg(long)]
        folders: bool,

        /// File fields to print as JSON, e.g. `id,name,mimeType`
        #[arg(long, value_delimiter = ',')]
        fields: Vec<String>,
    },

    /// Upload a JPEG or PNG file
    Upload {
        path: PathBuf,

        /// Name in Drive (defaults to the local file name)
        #[arg(long)]
        name: Option<String>,

        /// Destination folder ID
        #[arg(long)]
        parent: Option<String>,
    },

    /// Create a folder
    Mkdir {
        name: String,

        /// Parent folder ID
        #[arg(long)]
        parent: Option<String>,
    },

    /// Share a file with a user
    Share {
        /// File ID
        file_id: String,

        /// Email address of the grantee
        email: String,

        /// owner, organizer, fileOrganizer, writer, commenter or reader
        #[arg(long, default_value = "reader")]
        role: String,

        /// Don't send a notification email
        #[arg(long)]
        quiet: bool,
    },
}

#[derive(Debug, Subcommand)]
pub enum ContactsAction {
    /// List the members of a contact group
    Group {
        /// Group name (case-insensitive)
        name: String,
    },
}

#[derive(Debug, Subcommand)]
pub enum BooksAction {
    /// Search volumes
    Search {
        query: String,

        /// Maximum number of results
        #[arg(long, default_value_t = 10)]
        max_results: u32,
    },
}

#[derive(Debug, Subcommand)]
pub enum DocsAction {
    /// Print a document's title
    Title {
        /// Document ID
        id: String,
    },
}

/// Configuration actions.
#[derive(Debug, Subcommand)]
pub enum ConfigAction {
    /// Show configuration file path
    Path,

    /// Dump current configuration
    Dump,
}
