//! Console command grammar
//!
//! Each console line is parsed with clap, so per-command help comes from
//! the same definitions.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::codec::Codec;

/// A single console line
#[derive(Parser, Debug)]
#[command(name = "cachecon", no_binary_name = true, disable_help_subcommand = true)]
#[command(disable_help_flag = true)]
pub struct ConsoleLine {
    #[command(subcommand)]
    pub command: ConsoleCommand,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum ConsoleCommand {
    /// Put an entry (key, value) into the cache
    Put {
        /// Read the value from this file instead of the command line
        #[arg(short = 'i', long = "input-filename")]
        input: Option<PathBuf>,

        /// Store only if the current version equals this one
        #[arg(short = 'v', long = "version")]
        version: Option<String>,

        /// Lifespan in seconds
        #[arg(short = 'l', long = "lifespan")]
        lifespan: Option<u32>,

        /// Max idle time in seconds
        #[arg(short = 'I', long = "max-idle")]
        max_idle: Option<u32>,

        /// Store only if no entry exists, otherwise report CONFLICT
        #[arg(short = 'a', long = "put-if-absent")]
        put_if_absent: bool,

        /// Codec applied to the value before storing
        #[arg(short = 'e', long = "encode")]
        encode: Option<Codec>,

        key: String,

        #[arg(allow_hyphen_values = true)]
        value: Option<String>,
    },

    /// Get the value stored under a key
    Get {
        /// Write the value to this file instead of printing it
        #[arg(short = 'o', long = "output-filename")]
        output: Option<PathBuf>,

        /// Print the entry version before the value
        #[arg(short = 'v', long = "version")]
        version: bool,

        /// Codec used to decode the stored value
        #[arg(short = 'd', long = "decode")]
        decode: Option<Codec>,

        key: String,
    },

    /// Print the version of an entry
    Version { key: String },

    /// Delete an entry
    Delete {
        /// Delete only if the current version equals this one
        #[arg(short = 'v', long = "version")]
        version: Option<String>,

        key: String,
    },

    /// Check whether an entry exists
    Exists { key: String },

    /// Remove every entry of the cache
    Clear,

    /// Encode a value with a codec and print it as hex
    Encode {
        #[arg(short = 'e', long = "encode")]
        codec: Option<Codec>,

        #[arg(allow_hyphen_values = true)]
        value: String,
    },

    /// Decode a hex-encoded value with a codec and print it
    Decode {
        #[arg(short = 'd', long = "decode")]
        codec: Option<Codec>,

        hex: String,
    },

    /// Show the configuration, or set one key
    Config {
        key: Option<String>,

        #[arg(requires = "key")]
        value: Option<String>,
    },

    /// Execute every line of a file
    Include { file: PathBuf },

    /// Show help for a command
    Help { command: Option<String> },
}
