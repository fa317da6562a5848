//! cachecon CLI
//!
//! Runs a single command given on the command line, or reads commands from
//! stdin until EOF.

use std::io::{self, BufRead, IsTerminal, Write};
use std::process::ExitCode;

use cachecon::{ClientKind, Config, Console};
use clap::Parser;
use tracing_subscriber::{fmt, EnvFilter};

/// cachecon CLI
#[derive(Parser, Debug)]
#[command(name = "cachecon")]
#[command(about = "Command-line client for a key-value cache (rpc, http, text protocols)")]
#[command(version)]
struct Args {
    /// Client protocol: rpc, http or text
    #[arg(short = 'c', long = "client", env = "CACHECON_CLIENT")]
    client: Option<ClientKind>,

    /// Server host
    #[arg(short = 'H', long, env = "CACHECON_HOST")]
    host: Option<String>,

    /// Server port
    #[arg(short, long, env = "CACHECON_PORT")]
    port: Option<u16>,

    /// Cache name (empty for the default cache)
    #[arg(short = 'C', long = "cache-name", env = "CACHECON_CACHE")]
    cache_name: Option<String>,

    /// Stop at the first failed command
    #[arg(short, long = "exit-on-error", env = "CACHECON_EXIT_ON_ERROR")]
    exit_on_error: bool,

    /// Set any config key (repeatable)
    #[arg(short = 'P', long = "config", value_name = "KEY=VALUE")]
    overrides: Vec<String>,

    /// Command to run; omit to read commands from stdin
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    command: Vec<String>,
}

fn build_config(args: &Args) -> cachecon::Result<Config> {
    let mut config = Config::default();

    for pair in &args.overrides {
        let (key, value) = pair.split_once('=').ok_or_else(|| {
            cachecon::CacheError::Config(format!("expected KEY=VALUE, got: {}", pair))
        })?;
        config.set(key.trim(), value.trim())?;
    }

    // Dedicated flags win over -P
    if let Some(kind) = args.client {
        config.client_type = kind;
    }
    if let Some(host) = &args.host {
        config.host = host.clone();
    }
    if let Some(port) = args.port {
        config.port = port;
    }
    if let Some(cache_name) = &args.cache_name {
        config.cache_name = cache_name.clone();
    }
    if args.exit_on_error {
        config.exit_on_error = true;
    }

    Ok(config)
}

fn main() -> ExitCode {
    // Logs go to stderr so values on stdout stay clean
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();

    let config = match build_config(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("ERROR {}", e);
            return ExitCode::from(1);
        }
    };

    tracing::debug!("cachecon v{} using {} client", cachecon::VERSION, config.client_type);

    let mut console = Console::new(config, io::stdout());

    let result = if args.command.is_empty() {
        run_repl(&mut console)
    } else {
        console.execute_words(&args.command[..])
    };

    match result {
        Ok(code) => ExitCode::from(code as u8),
        Err(e) => {
            eprintln!("ERROR writing output: {}", e);
            ExitCode::from(1)
        }
    }
}

/// Read commands until EOF; returns the exit code to terminate with
fn run_repl<W: Write>(console: &mut Console<W>) -> io::Result<i32> {
    let stdin = io::stdin();
    let interactive = stdin.is_terminal();

    if interactive {
        println!("cachecon v{}", cachecon::VERSION);
    }

    let mut lines = stdin.lock().lines();
    loop {
        if interactive {
            print!("> ");
            io::stdout().flush()?;
        }

        let line = match lines.next() {
            Some(line) => line?,
            None => break,
        };

        let code = console.execute_line(&line)?;
        io::stdout().flush()?;
        if code != 0 && console.exit_on_error() {
            return Ok(code);
        }
    }

    if interactive {
        println!("\nGood bye!");
    }
    Ok(0)
}
