//! CLI module for Quill
//!
//! Provides command-line interface parsing and handling for the quill-server binary.
//! Uses clap for argument parsing and owo-colors for colored terminal output.

pub mod commands;
pub mod output;

use crate::types::Role;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Quill - blog CMS API server
#[derive(Parser, Debug)]
#[command(
    name = "quill-server",
    version,
    about = "Quill - blog CMS API server",
    long_about = "Blog CMS API server with signed session tokens and role-gated admin endpoints.\n\n\
                  Run without arguments to start the server.",
    after_help = "EXAMPLES:\n    \
                  quill-server                                   # Start the server (requires quill.toml)\n    \
                  quill-server --config my.toml                  # Use a custom config file\n    \
                  quill-server gen-secret                        # Print a fresh token secret\n    \
                  echo 'pw' | quill-server create-user --email a@b.c --name Ana --role admin"
)]
pub struct Cli {
    /// Path to the configuration file
    #[arg(short, long, default_value = "quill.toml", global = true)]
    pub config: PathBuf,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the HTTP server (default)
    Serve,

    /// Hash a password read from stdin and print the PHC string
    HashPassword,

    /// Create a user; the password is read from stdin
    CreateUser {
        #[arg(long)]
        email: String,

        #[arg(long)]
        name: String,

        /// admin, author or user
        #[arg(long, default_value = "author")]
        role: Role,
    },

    /// Print a random hex secret suitable for token signing
    GenSecret {
        /// Number of random bytes
        #[arg(long, default_value_t = 48)]
        bytes: usize,
    },

    /// Show configuration information
    Config {
        /// Validate the configuration file, including referenced env vars
        #[arg(long)]
        validate: bool,
    },
}

impl Cli {
    /// Parse CLI arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
