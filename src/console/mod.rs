//! Console Module
//!
//! Executes operator commands against a lazily created [`Client`].
//!
//! ## Output
//! - `STORED`, `DELETED`, `EXISTS`, `VERSION <v>` or the value on success
//! - `NOT_FOUND` (exit code 2), `CONFLICT` (3), `ERROR <msg>` (1)
//!
//! The codec for a command is chosen explicitly: the command's own
//! `-e`/`-d` option, falling back to the configured default codec.

mod command;
mod tokenize;

use std::fs;
use std::io::{self, Write};
use std::path::Path;

use clap::{CommandFactory, Parser};

use crate::client::{CacheClient, Client, Outcome, PutOptions, VersionToken};
use crate::codec::Codec;
use crate::config::Config;
use crate::error::{CacheError, Result};

pub use command::{ConsoleCommand, ConsoleLine};
pub use tokenize::{from_hex, split_command_line, to_hex};

/// Nesting limit for `include`
const MAX_INCLUDE_DEPTH: usize = 16;

/// Command executor bound to one configuration and one output
pub struct Console<W: Write> {
    config: Config,

    /// Created on first use, dropped when the configuration changes
    client: Option<Client>,

    out: W,

    include_depth: usize,
}

impl<W: Write> Console<W> {
    pub fn new(config: Config, out: W) -> Self {
        Self {
            config,
            client: None,
            out,
            include_depth: 0,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Whether the caller should stop after a failed command
    pub fn exit_on_error(&self) -> bool {
        self.config.exit_on_error
    }

    /// Consume the console and hand back its output
    pub fn into_output(self) -> W {
        self.out
    }

    /// Execute one command line; returns the exit code of the command
    ///
    /// Blank lines and `#` comments are ignored. Only failures to write
    /// output are returned as errors; command failures are reported on the
    /// output and through the exit code.
    pub fn execute_line(&mut self, line: &str) -> io::Result<i32> {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            return Ok(0);
        }

        match split_command_line(trimmed) {
            Ok(words) => self.execute_words(&words[..]),
            Err(e) => self.report(Outcome::from_error(e)),
        }
    }

    /// Execute an already split command
    pub fn execute_words<S: AsRef<str>>(&mut self, words: &[S]) -> io::Result<i32> {
        if words.is_empty() {
            return Ok(0);
        }

        let words: Vec<&str> = words.iter().map(|w| w.as_ref()).collect();
        match ConsoleLine::try_parse_from(words.iter().copied()) {
            Ok(line) => self.run(line.command),
            Err(e) => {
                let rendered = e.to_string();
                let message = rendered
                    .lines()
                    .next()
                    .unwrap_or("wrong command syntax")
                    .trim_start_matches("error: ")
                    .to_string();
                self.report(Outcome::Error(message))
            }
        }
    }

    fn run(&mut self, command: ConsoleCommand) -> io::Result<i32> {
        tracing::trace!("Console command: {:?}", command);
        match command {
            ConsoleCommand::Put {
                input,
                version,
                lifespan,
                max_idle,
                put_if_absent,
                encode,
                key,
                value,
            } => {
                let options = PutOptions {
                    version: version.map(VersionToken::from),
                    lifespan,
                    max_idle,
                    put_if_absent,
                };
                let codec = encode.unwrap_or(self.config.default_codec);
                let outcome = Outcome::resolve(
                    self.put(&key, value.as_deref(), input.as_deref(), codec, &options),
                    |()| Outcome::Stored,
                );
                self.report(outcome)
            }
            ConsoleCommand::Get {
                output,
                version,
                decode,
                key,
            } => {
                let codec = decode.unwrap_or(self.config.default_codec);
                match self.get(&key, version, codec) {
                    Ok(outcome) => self.print_value(outcome, output.as_deref()),
                    Err(e) => self.report(Outcome::from_error(e)),
                }
            }
            ConsoleCommand::Version { key } => {
                let result = self.with_client(|c| c.version(key.as_bytes()));
                self.report(Outcome::resolve(result, Outcome::Version))
            }
            ConsoleCommand::Delete { version, key } => {
                let version = version.map(VersionToken::from);
                let result = self.with_client(|c| c.delete(key.as_bytes(), version.as_ref()));
                self.report(Outcome::resolve(result, |()| Outcome::Deleted))
            }
            ConsoleCommand::Exists { key } => {
                let result = self.with_client(|c| c.exists(key.as_bytes()));
                self.report(Outcome::resolve(result, |()| Outcome::Exists))
            }
            ConsoleCommand::Clear => {
                let result = self.with_client(|c| c.clear());
                self.report(Outcome::resolve(result, |()| Outcome::Deleted))
            }
            ConsoleCommand::Encode { codec, value } => {
                let codec = codec.unwrap_or(self.config.default_codec);
                match codec.encode(value.as_bytes()) {
                    Ok(bytes) => {
                        writeln!(self.out, "{}", to_hex(&bytes))?;
                        Ok(0)
                    }
                    Err(e) => self.report(Outcome::from_error(e)),
                }
            }
            ConsoleCommand::Decode { codec, hex } => {
                let codec = codec.unwrap_or(self.config.default_codec);
                match from_hex(&hex).and_then(|bytes| codec.decode(&bytes)) {
                    Ok(bytes) => {
                        self.out.write_all(&bytes)?;
                        writeln!(self.out)?;
                        Ok(0)
                    }
                    Err(e) => self.report(Outcome::from_error(e)),
                }
            }
            ConsoleCommand::Config { key, value } => self.configure(key, value),
            ConsoleCommand::Include { file } => self.include(&file),
            ConsoleCommand::Help { command } => self.help(command.as_deref()),
        }
    }

    // =========================================================================
    // Cache Commands
    // =========================================================================

    /// Connect on first use
    fn client(&mut self) -> Result<&mut Client> {
        if self.client.is_none() {
            self.client = Some(Client::connect(&self.config)?);
        }
        self.client
            .as_mut()
            .ok_or_else(|| CacheError::Config("client unavailable".to_string()))
    }

    /// Run one operation; a transport failure drops the client so the next
    /// command reconnects instead of reusing a stream in an unknown state
    fn with_client<T>(&mut self, op: impl FnOnce(&mut Client) -> Result<T>) -> Result<T> {
        let result = self.client().and_then(op);
        if let Err(CacheError::Transport(msg)) = &result {
            tracing::debug!("Discarding client after transport error: {}", msg);
            self.client = None;
        }
        result
    }

    fn put(
        &mut self,
        key: &str,
        value: Option<&str>,
        input: Option<&Path>,
        codec: Codec,
        options: &PutOptions,
    ) -> Result<()> {
        let raw = match (value, input) {
            (Some(value), None) => value.as_bytes().to_vec(),
            (None, Some(path)) => fs::read(path).map_err(|e| {
                CacheError::Validation(format!("while reading file {}: {}", path.display(), e))
            })?,
            (Some(_), Some(_)) => {
                return Err(CacheError::Validation(
                    "You cannot supply both value and input filename.".to_string(),
                ))
            }
            (None, None) => {
                return Err(CacheError::Validation(
                    "You must supply key and either value or input filename.".to_string(),
                ))
            }
        };

        let encoded = codec.encode(&raw)?;
        self.with_client(|c| c.put(key.as_bytes(), &encoded, options))
    }

    fn get(&mut self, key: &str, want_version: bool, codec: Codec) -> Result<Outcome> {
        let entry = self.with_client(|c| c.get(key.as_bytes(), want_version))?;
        let value = codec.decode(&entry.value)?;
        Ok(Outcome::Found {
            value,
            version: entry.version,
        })
    }

    fn print_value(&mut self, outcome: Outcome, output: Option<&Path>) -> io::Result<i32> {
        let (value, version) = match outcome {
            Outcome::Found { value, version } => (value, version),
            other => return self.report(other),
        };

        if let Some(version) = &version {
            writeln!(self.out, "VERSION {}", version)?;
        }

        match output {
            Some(path) => {
                if let Err(e) = fs::write(path, &value) {
                    return self.report(Outcome::Error(format!(
                        "writing file {}: {}",
                        path.display(),
                        e
                    )));
                }
            }
            None => {
                self.out.write_all(&value)?;
                writeln!(self.out)?;
            }
        }
        Ok(0)
    }

    // =========================================================================
    // Console Commands
    // =========================================================================

    fn configure(&mut self, key: Option<String>, value: Option<String>) -> io::Result<i32> {
        match (key, value) {
            (None, _) => {
                write!(self.out, "{}", self.config)?;
                Ok(0)
            }
            (Some(key), None) => match self.config.get(&key) {
                Some(value) => {
                    writeln!(self.out, "{}", value)?;
                    Ok(0)
                }
                None => self.report(Outcome::Error(format!("Unknown config key: {}", key))),
            },
            (Some(key), Some(value)) => match self.config.set(&key, &value) {
                Ok(()) => {
                    // Rebuilt from the new configuration on next use
                    self.client = None;
                    tracing::debug!("Config {} = {}", key, value);
                    self.report(Outcome::Stored)
                }
                Err(e) => self.report(Outcome::from_error(e)),
            },
        }
    }

    fn include(&mut self, file: &Path) -> io::Result<i32> {
        if self.include_depth >= MAX_INCLUDE_DEPTH {
            return self.report(Outcome::Error("include nested too deeply".to_string()));
        }

        let contents = match fs::read_to_string(file) {
            Ok(contents) => contents,
            Err(e) => {
                return self.report(Outcome::Error(format!(
                    "reading file {}: {}",
                    file.display(),
                    e
                )))
            }
        };

        self.include_depth += 1;
        let mut status = 0;
        for line in contents.lines() {
            let code = match self.execute_line(line) {
                Ok(code) => code,
                Err(e) => {
                    self.include_depth -= 1;
                    return Err(e);
                }
            };
            if code != 0 {
                if status == 0 {
                    status = code;
                }
                if self.config.exit_on_error {
                    break;
                }
            }
        }
        self.include_depth -= 1;
        Ok(status)
    }

    fn help(&mut self, command: Option<&str>) -> io::Result<i32> {
        let mut grammar = ConsoleLine::command();
        match command {
            None => {
                writeln!(self.out, "Supported operations:")?;
                for sub in grammar.get_subcommands() {
                    let about = sub.get_about().map(|a| a.to_string()).unwrap_or_default();
                    writeln!(self.out, "  {:<10}{}", sub.get_name(), about)?;
                }
                Ok(0)
            }
            Some(name) => match grammar.find_subcommand_mut(name) {
                Some(sub) => {
                    write!(self.out, "{}", sub.render_long_help())?;
                    Ok(0)
                }
                None => self.report(Outcome::Error(format!(
                    "Can't display help. Unknown operation: {}",
                    name
                ))),
            },
        }
    }

    /// Print the status line of an outcome and return its exit code
    fn report(&mut self, outcome: Outcome) -> io::Result<i32> {
        if let Outcome::Error(msg) = &outcome {
            tracing::debug!("Command failed: {}", msg);
        }
        writeln!(self.out, "{}", outcome)?;
        Ok(outcome.exit_code())
    }
}
