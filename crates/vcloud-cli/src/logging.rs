// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Log configuration: `--log-level`/`--log-format` flags over
//! `VCLOUD_LOG_LEVEL`/`VCLOUD_LOG_FORMAT` over the defaults.

use std::env;
use std::fmt;
use std::io::IsTerminal;

use tracing::level_filters::LevelFilter;

/// Output format for log events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Text on a terminal, JSON lines when stderr is redirected.
    Auto,
    Text,
    Json,
}

impl LogFormat {
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "auto" => Some(Self::Auto),
            "text" | "plain" => Some(Self::Text),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            LogFormat::Auto => "auto",
            LogFormat::Text => "text",
            LogFormat::Json => "json",
        })
    }
}

/// Level names accepted on the command line and in the environment. Besides
/// tracing's own names (`off`, `error`, ..., `trace`) a few aliases work.
pub fn parse_level(value: &str) -> Option<LevelFilter> {
    match value.to_ascii_lowercase().as_str() {
        "err" => Some(LevelFilter::ERROR),
        "warning" => Some(LevelFilter::WARN),
        "verbose" => Some(LevelFilter::TRACE),
        other => other.parse().ok(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogOptions {
    pub format: LogFormat,
    pub level: LevelFilter,
}

impl LogOptions {
    pub const DEFAULT: Self = Self {
        format: LogFormat::Auto,
        level: LevelFilter::INFO,
    };

    #[must_use]
    pub fn from_env() -> Self {
        let format = env::var("VCLOUD_LOG_FORMAT").ok();
        let level = env::var("VCLOUD_LOG_LEVEL").ok();
        Self::DEFAULT.with_env(format.as_deref(), level.as_deref())
    }

    /// Unparseable values leave the current setting alone.
    fn with_env(mut self, format: Option<&str>, level: Option<&str>) -> Self {
        if let Some(format) = format.and_then(LogFormat::parse) {
            self.format = format;
        }
        if let Some(level) = level.and_then(parse_level) {
            self.level = level;
        }
        self
    }

    #[must_use]
    pub fn with_overrides(self, overrides: LogSettings) -> Self {
        Self {
            format: overrides.format.unwrap_or(self.format),
            level: overrides.level.unwrap_or(self.level),
        }
    }

    /// Settle `Auto` for the given stderr.
    #[must_use]
    pub fn resolved(self, stderr_is_terminal: bool) -> Self {
        let format = match self.format {
            LogFormat::Auto if stderr_is_terminal => LogFormat::Text,
            LogFormat::Auto => LogFormat::Json,
            other => other,
        };
        Self { format, ..self }
    }
}

impl Default for LogOptions {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Logging flags given on the command line.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSettings {
    pub format: Option<LogFormat>,
    pub level: Option<LevelFilter>,
}

impl LogSettings {
    /// Pull `--log-level` and `--log-format` (either `--flag value` or
    /// `--flag=value`) out of the argument list, wherever they appear.
    pub fn extract(args: Vec<String>) -> Result<(Vec<String>, Self), String> {
        let mut settings = Self::default();
        let mut rest = Vec::with_capacity(args.len());
        let mut iter = args.into_iter();

        while let Some(arg) = iter.next() {
            let (flag, inline) = match arg.split_once('=') {
                Some((flag, value)) => (flag.to_string(), Some(value.to_string())),
                None => (arg.clone(), None),
            };
            if flag != "--log-level" && flag != "--log-format" {
                rest.push(arg);
                continue;
            }

            let value = inline
                .or_else(|| iter.next())
                .ok_or_else(|| format!("`{}` needs a value", flag))?;
            if flag == "--log-level" {
                let level = parse_level(&value).ok_or_else(|| format!("unknown log level `{}`", value))?;
                settings.level = Some(level);
            } else {
                let format = LogFormat::parse(&value).ok_or_else(|| format!("unknown log format `{}`", value))?;
                settings.format = Some(format);
            }
        }
        Ok((rest, settings))
    }

    #[must_use]
    pub fn merged_with_env(self) -> LogOptions {
        LogOptions::from_env().with_overrides(self)
    }
}

/// Install the global subscriber. Events go to stderr so they never mix
/// with command output. `RUST_LOG`, when set, replaces the level filter.
pub fn init_logging(options: LogOptions) {
    use std::sync::OnceLock;
    use tracing_subscriber::{fmt, EnvFilter};

    static INITIALISED: OnceLock<()> = OnceLock::new();

    let stderr_is_terminal = std::io::stderr().is_terminal();
    let options = options.resolved(stderr_is_terminal);
    INITIALISED.get_or_init(|| {
        let use_ansi = env::var_os("NO_COLOR").is_none() && stderr_is_terminal;
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(options.level.to_string()));
        let builder = fmt::fmt()
            .with_env_filter(filter)
            .with_ansi(use_ansi)
            .with_writer(std::io::stderr)
            .with_target(true);

        let _ = match options.format {
            LogFormat::Json => tracing::subscriber::set_global_default(builder.json().finish()),
            _ => tracing::subscriber::set_global_default(builder.compact().finish()),
        };
    });
}
