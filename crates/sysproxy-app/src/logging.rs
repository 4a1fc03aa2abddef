//! Log file placement and subscriber setup.
//!
//! The helper runs as root, but its log belongs next to the desktop user's
//! other application logs. The user's home is worked out from the
//! environment, falling back to `/tmp` when nothing sensible is found.

use std::fmt;
use std::path::{Path, PathBuf};

use directories::BaseDirs;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt as fmt_layer, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Log file name prefix; the file is `sysproxy-helper.log`.
pub const LOG_FILE_PREFIX: &str = "sysproxy-helper";

/// Directory used when no user home can be found or created.
pub const FALLBACK_LOG_DIR: &str = "/tmp";

const ROOT_HOME: &str = "/var/root";
const USERS_ROOT: &str = "/Users";
const SKIPPED_USER_DIRS: [&str; 2] = ["Shared", ".localized"];

/// Where the user's home directory was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HomeSource {
    SudoUser,
    HomeVar,
    Platform,
    UsersScan,
}

impl fmt::Display for HomeSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            HomeSource::SudoUser => "SUDO_USER",
            HomeSource::HomeVar => "HOME",
            HomeSource::Platform => "current user",
            HomeSource::UsersScan => "detected user",
        })
    }
}

/// Inputs to home discovery.
#[derive(Debug, Clone)]
pub struct HomeHints {
    pub sudo_user: Option<String>,
    pub home: Option<PathBuf>,
    pub platform_home: Option<PathBuf>,
    /// Directory holding per-user homes.
    pub users_root: PathBuf,
}

impl HomeHints {
    /// Reads hints from the process environment.
    pub fn from_env() -> Self {
        Self {
            sudo_user: std::env::var("SUDO_USER").ok(),
            home: std::env::var_os("HOME").map(PathBuf::from),
            platform_home: BaseDirs::new().map(|dirs| dirs.home_dir().to_path_buf()),
            users_root: PathBuf::from(USERS_ROOT),
        }
    }
}

fn usable_home(path: &Path) -> bool {
    !path.as_os_str().is_empty() && path != Path::new(ROOT_HOME)
}

/// Finds the home directory of the user the helper works for.
pub fn discover_home(hints: &HomeHints) -> Option<(PathBuf, HomeSource)> {
    if let Some(user) = hints.sudo_user.as_deref().filter(|u| !u.is_empty()) {
        return Some((hints.users_root.join(user), HomeSource::SudoUser));
    }

    if let Some(home) = hints.home.as_deref().filter(|h| usable_home(h)) {
        return Some((home.to_path_buf(), HomeSource::HomeVar));
    }

    if let Some(home) = hints.platform_home.as_deref().filter(|h| usable_home(h)) {
        return Some((home.to_path_buf(), HomeSource::Platform));
    }

    let mut names: Vec<String> = std::fs::read_dir(&hints.users_root)
        .ok()?
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_ok_and(|t| t.is_dir()))
        .filter_map(|entry| entry.file_name().into_string().ok())
        .filter(|name| !SKIPPED_USER_DIRS.contains(&name.as_str()))
        .collect();
    names.sort();

    names
        .into_iter()
        .next()
        .map(|name| (hints.users_root.join(name), HomeSource::UsersScan))
}

/// Log directory inside a user's home.
pub fn user_log_dir(home: &Path) -> PathBuf {
    home.join("Library")
        .join("Application Support")
        .join("sysproxy-helper")
        .join("logs")
}

/// Resolved log location, kept so it can be reported once logging is up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogLocation {
    pub dir: PathBuf,
    /// How the home was found; `None` for an explicit or fallback directory.
    pub source: Option<HomeSource>,
    /// The preferred directory could not be created.
    pub fell_back: bool,
}

/// Picks and creates the log directory.
///
/// An explicit directory wins; otherwise the discovered user's log
/// directory is used. Either falls back to `/tmp` if it cannot be created.
pub fn resolve_log_dir(explicit: Option<&Path>, hints: &HomeHints) -> LogLocation {
    let (preferred, source) = match explicit {
        Some(dir) => (Some(dir.to_path_buf()), None),
        None => match discover_home(hints) {
            Some((home, source)) => (Some(user_log_dir(&home)), Some(source)),
            None => (None, None),
        },
    };

    match preferred {
        Some(dir) if std::fs::create_dir_all(&dir).is_ok() => LogLocation {
            dir,
            source,
            fell_back: false,
        },
        Some(_) => LogLocation {
            dir: PathBuf::from(FALLBACK_LOG_DIR),
            source,
            fell_back: true,
        },
        None => LogLocation {
            dir: PathBuf::from(FALLBACK_LOG_DIR),
            source: None,
            fell_back: false,
        },
    }
}

/// Default filter directives for `level`.
pub fn filter_directives(level: &str) -> String {
    format!("sysproxy={level},tower_http={level},warn")
}

/// Logs to stdout and `<dir>/sysproxy-helper.log`.
///
/// Returns the file writer's guard, which must be held until exit. If the
/// file cannot be opened only stdout is used.
pub fn init_logging(level: &str, location: &LogLocation) -> Option<WorkerGuard> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter_directives(level)));

    let appender = RollingFileAppender::builder()
        .rotation(Rotation::NEVER)
        .filename_prefix(LOG_FILE_PREFIX)
        .filename_suffix("log")
        .build(&location.dir);

    match appender {
        Ok(appender) => {
            let (non_blocking, guard) = tracing_appender::non_blocking(appender);
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt_layer::layer().with_writer(std::io::stdout))
                .with(fmt_layer::layer().with_writer(non_blocking).with_ansi(false))
                .init();

            if let Some(source) = location.source {
                tracing::info!(%source, "Using user home for logs");
            }
            if location.fell_back {
                tracing::warn!("Unable to create preferred log directory, using /tmp");
            } else if location.source.is_none() && location.dir == Path::new(FALLBACK_LOG_DIR) {
                tracing::warn!("Unable to determine user home directory, using /tmp");
            }
            tracing::info!(dir = %location.dir.display(), "Log file initialized");
            Some(guard)
        }
        Err(e) => {
            tracing_subscriber::fmt().with_env_filter(env_filter).init();
            tracing::warn!(error = %e, "File logging unavailable, using console only");
            None
        }
    }
}
