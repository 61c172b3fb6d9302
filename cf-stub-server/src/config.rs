//! Stub server configuration and CLI argument parsing
//!
//! Settings come from command-line arguments with `CF_STUB_` environment
//! variable fallbacks.
//!
//! # Configuration Priority
//!
//! 1. CLI arguments (highest priority)
//! 2. Environment variables
//! 3. Default values (lowest priority)
//!
//! # Example Usage
//!
//! ```bash
//! # Serve fixtures on port 9090
//! cf-stub --port 9090 --fixtures fixtures.json
//!
//! # Enforce a UAA limit of 2 calls per second on /Groups
//! export CF_STUB_UAA_LIMITS="groups;1;2;startsWith:/Groups"
//! cf-stub
//! ```

use anyhow::{Context, Result, anyhow};
use cf_throttle::{LimiterMapping, PathSelector};
use clap::Parser;
use std::path::PathBuf;

const LOG_LEVELS: [&str; 5] = ["error", "warn", "info", "debug", "trace"];

/// Validated stub server configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Host address to bind to
    pub host: String,
    /// Port number to listen on
    pub port: u16,
    /// Optional JSON fixtures file with canned interactions
    pub fixtures: Option<PathBuf>,
    /// Server-side UAA rate limits
    pub uaa_limits: Vec<LimiterMapping>,
    /// Channel buffer size for the throttle actor
    pub buffer_size: usize,
    /// Logging level (error, warn, info, debug, trace)
    pub log_level: String,
}

/// Command-line arguments for the stub server
///
/// All arguments can also be set via environment variables with the
/// CF_STUB_ prefix. CLI arguments take precedence over environment variables.
#[derive(Parser, Debug)]
#[command(
    name = "cf-stub",
    about = "Stub Cloud Controller and UAA server",
    long_about = "Serves canned Cloud Controller and UAA responses and enforces UAA-style rate limits.\n\nEnvironment variables with CF_STUB_ prefix are supported. CLI arguments take precedence over environment variables."
)]
pub struct Args {
    #[arg(
        long,
        value_name = "HOST",
        help = "Host to bind",
        default_value = "127.0.0.1",
        env = "CF_STUB_HOST"
    )]
    pub host: String,
    #[arg(
        long,
        value_name = "PORT",
        help = "Port to listen on",
        default_value_t = 8181,
        env = "CF_STUB_PORT"
    )]
    pub port: u16,
    #[arg(
        long,
        value_name = "FILE",
        help = "JSON fixtures file with canned interactions",
        env = "CF_STUB_FIXTURES"
    )]
    pub fixtures: Option<PathBuf>,
    #[arg(
        long = "uaa-limit",
        value_name = "NAME;TIME_BASE;LIMIT;SELECTOR[;SELECTOR...]",
        help = "UAA rate limit, e.g. groups;1;2;startsWith:/Groups (repeatable)",
        env = "CF_STUB_UAA_LIMITS",
        value_delimiter = ' '
    )]
    pub uaa_limits: Vec<String>,
    #[arg(
        long,
        value_name = "SIZE",
        help = "Channel buffer size",
        default_value_t = 1024,
        env = "CF_STUB_BUFFER_SIZE"
    )]
    pub buffer_size: usize,
    #[arg(
        long,
        value_name = "LEVEL",
        help = "Log level: error, warn, info, debug, trace",
        default_value = "info",
        env = "CF_STUB_LOG_LEVEL"
    )]
    pub log_level: String,

    #[arg(
        long,
        help = "List all environment variables and exit",
        action = clap::ArgAction::SetTrue
    )]
    pub list_env_vars: bool,
}

impl Config {
    /// Build configuration from environment variables and CLI arguments
    pub fn from_env_and_args() -> Result<Self> {
        let args = Args::parse();

        if args.list_env_vars {
            Self::print_env_vars();
            std::process::exit(0);
        }

        Self::from_args(args)
    }

    /// Build and validate configuration from parsed arguments
    pub fn from_args(args: Args) -> Result<Self> {
        let uaa_limits = args
            .uaa_limits
            .iter()
            .filter(|spec| !spec.trim().is_empty())
            .map(|spec| parse_limit(spec))
            .collect::<Result<Vec<_>>>()?;

        let config = Config {
            host: args.host,
            port: args.port,
            fixtures: args.fixtures,
            uaa_limits,
            buffer_size: args.buffer_size,
            log_level: args.log_level,
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.buffer_size == 0 {
            return Err(anyhow!("Buffer size must be at least 1"));
        }

        if !LOG_LEVELS.contains(&self.log_level.to_lowercase().as_str()) {
            return Err(anyhow!(
                "Invalid log level: {}. Valid options are: {}",
                self.log_level,
                LOG_LEVELS.join(", ")
            ));
        }

        if let Some(path) = &self.fixtures {
            if !path.is_file() {
                return Err(anyhow!("Fixtures file not found: {}", path.display()));
            }
        }

        Ok(())
    }

    fn print_env_vars() {
        println!("cf-stub Environment Variables");
        println!("=============================");
        println!();
        println!("All environment variables use the CF_STUB_ prefix.");
        println!("CLI arguments take precedence over environment variables.");
        println!();
        println!("  CF_STUB_HOST=<host>             Host to bind [default: 127.0.0.1]");
        println!("  CF_STUB_PORT=<port>             Port to listen on [default: 8181]");
        println!("  CF_STUB_FIXTURES=<file>         JSON fixtures file");
        println!("  CF_STUB_UAA_LIMITS=<limits>     Space separated UAA limits");
        println!("                                  NAME;TIME_BASE;LIMIT;SELECTOR[;SELECTOR...]");
        println!("  CF_STUB_BUFFER_SIZE=<size>      Channel buffer size [default: 1024]");
        println!(
            "  CF_STUB_LOG_LEVEL=<level>       Log level: error, warn, info, debug, trace [default: info]"
        );
        println!();
        println!("Examples:");
        println!("  export CF_STUB_UAA_LIMITS=\"groups;1;2;startsWith:/Groups users;10;-1;equals:/Users\"");
        println!("  cf-stub --port 9090");
    }
}

/// Parses `NAME;TIME_BASE;LIMIT;SELECTOR[;SELECTOR...]` into a limiter mapping
pub fn parse_limit(spec: &str) -> Result<LimiterMapping> {
    let mut parts = spec.split(';').map(str::trim);

    let name = parts.next().unwrap_or_default();
    let time_base = parts
        .next()
        .ok_or_else(|| anyhow!("UAA limit {spec} is missing a time base"))?
        .parse::<u32>()
        .with_context(|| format!("UAA limit {spec} has an invalid time base"))?;
    let limit = parts
        .next()
        .ok_or_else(|| anyhow!("UAA limit {spec} is missing a limit"))?
        .parse::<i64>()
        .with_context(|| format!("UAA limit {spec} has an invalid limit"))?;
    let selectors = parts
        .map(str::parse::<PathSelector>)
        .collect::<Result<Vec<_>, _>>()?;

    LimiterMapping::builder()
        .name(name)
        .time_base(time_base)
        .limit(limit)
        .path_selectors(selectors)
        .build()
        .with_context(|| format!("invalid UAA limit {spec}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use cf_throttle::{PathMatchType, Quota};

    fn args(extra: &[&str]) -> Args {
        let mut argv = vec!["cf-stub"];
        argv.extend_from_slice(extra);
        Args::parse_from(argv)
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_args(args(&[])).unwrap();
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.buffer_size, 1024);
        assert!(config.uaa_limits.is_empty());
        assert!(config.fixtures.is_none());
    }

    #[test]
    fn test_parse_limit() {
        let mapping = parse_limit("groups;1;2;startsWith:/Groups;equals:/Users").unwrap();
        assert_eq!(mapping.name(), "groups");
        assert_eq!(mapping.time_base(), 1);
        assert_eq!(mapping.quota(), Quota::Max(2));
        assert_eq!(mapping.path_selectors().len(), 2);
        assert_eq!(
            mapping.path_selectors()[1].match_type(),
            PathMatchType::Equals
        );

        let unlimited = parse_limit("all;10;-1;all").unwrap();
        assert_eq!(unlimited.quota(), Quota::Unlimited);
    }

    #[test]
    fn test_parse_limit_errors() {
        assert!(parse_limit("groups").is_err());
        assert!(parse_limit("groups;x;2;all").is_err());
        assert!(parse_limit("groups;1;0;all").is_err());
        assert!(parse_limit("groups;1;2").is_err());
        assert!(parse_limit("groups;1;2;prefix:/Groups").is_err());
        assert!(parse_limit(";1;2;all").is_err());
    }

    #[test]
    fn test_repeated_limits_from_cli() {
        let config = Config::from_args(args(&[
            "--uaa-limit",
            "groups;1;2;startsWith:/Groups",
            "--uaa-limit",
            "tokens;5;10;contains:token",
        ]))
        .unwrap();
        assert_eq!(config.uaa_limits.len(), 2);
        assert_eq!(config.uaa_limits[1].name(), "tokens");
    }

    #[test]
    fn test_validation() {
        assert!(Config::from_args(args(&["--buffer-size", "0"])).is_err());
        assert!(Config::from_args(args(&["--log-level", "loud"])).is_err());
        assert!(Config::from_args(args(&["--fixtures", "/does/not/exist.json"])).is_err());
    }
}
