use std::time::Duration;

const DEFAULT_DATABASE_URL: &str = "sqlite://studyplan.db?mode=rwc";

#[derive(Debug, Clone)]
pub struct DbConfig {
    pub database_url: String,
    pub max_connections: u32,
    pub busy_timeout: Duration,
    pub acquire_timeout: Duration,
    pub journal_mode: SqliteJournalMode,
    pub foreign_keys: bool,
}

impl DbConfig {
    pub fn from_env() -> Self {
        let database_url =
            std::env::var("DATABASE_URL").unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string());

        let journal_mode = std::env::var("SQLITE_JOURNAL_MODE")
            .ok()
            .as_deref()
            .and_then(SqliteJournalMode::parse)
            .unwrap_or(SqliteJournalMode::Wal);

        Self {
            database_url,
            max_connections: env_u32("DB_MAX_CONNECTIONS", 5),
            busy_timeout: Duration::from_secs(env_u64("DB_BUSY_TIMEOUT_SECS", 30)),
            acquire_timeout: Duration::from_secs(env_u64("DB_ACQUIRE_TIMEOUT_SECS", 5)),
            journal_mode,
            foreign_keys: env_bool("SQLITE_FOREIGN_KEYS", true),
        }
    }

    pub fn is_in_memory(&self) -> bool {
        self.database_url.contains(":memory:") || self.database_url.contains("mode=memory")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SqliteJournalMode {
    Wal,
    Delete,
    Truncate,
    Memory,
}

impl SqliteJournalMode {
    fn parse(value: &str) -> Option<Self> {
        match value.to_uppercase().as_str() {
            "WAL" => Some(Self::Wal),
            "DELETE" => Some(Self::Delete),
            "TRUNCATE" => Some(Self::Truncate),
            "MEMORY" => Some(Self::Memory),
            _ => None,
        }
    }

    pub fn to_sqlx(self) -> sqlx::sqlite::SqliteJournalMode {
        match self {
            Self::Wal => sqlx::sqlite::SqliteJournalMode::Wal,
            Self::Delete => sqlx::sqlite::SqliteJournalMode::Delete,
            Self::Truncate => sqlx::sqlite::SqliteJournalMode::Truncate,
            Self::Memory => sqlx::sqlite::SqliteJournalMode::Memory,
        }
    }
}

pub(crate) fn env_bool(key: &str, default: bool) -> bool {
    match std::env::var(key).ok().as_deref() {
        Some("true") | Some("1") => true,
        Some("false") | Some("0") => false,
        _ => default,
    }
}

pub(crate) fn env_u64(key: &str, default: u64) -> u64 {
    std::env::var(key)
        .ok()
        .and_then(|value| value.parse::<u64>().ok())
        .unwrap_or(default)
}

pub(crate) fn env_u32(key: &str, default: u32) -> u32 {
    std::env::var(key)
        .ok()
        .and_then(|value| value.parse::<u32>().ok())
        .unwrap_or(default)
}
