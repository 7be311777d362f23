use chrono::{DateTime, Utc};
use clap::{Args, ValueEnum};
use serde_json::json;
use sitelog::db::{Database, Sqlite};
use yansi::Paint;

use crate::{
    config::ConfigManager,
    utils::{format_timestamp, parse_since},
};

#[derive(ValueEnum, Clone, Debug)]
pub enum OutputType {
    Text,
    Json,
}

#[derive(Args, Debug)]
pub struct Cmd {
    #[arg(long, help = "SQLite database to read. Defaults to the one in the data directory.")]
    pub db: Option<String>,

    #[arg(
        short,
        long,
        value_parser = parse_since,
        help = "Only lines stored after this time. Passed as either date/time or human-friendly format.",
    )]
    pub since: Option<DateTime<Utc>>,

    #[arg(short = 'n', long, default_value_t = 20, help = "Maximum number of lines.")]
    pub limit: i64,

    #[arg(long, short, value_enum, default_value_t = OutputType::Text)]
    pub output: OutputType,

    #[arg(short, long, help = "Treat date and time in local timezone.")]
    pub local: bool,
}

impl Cmd {
    pub async fn run(&self, config: &impl ConfigManager) -> eyre::Result<()> {
        let path = match &self.db {
            Some(path) => path.clone(),
            None => config.get_db_path()?,
        };

        // Fully qualified: `yansi::Paint` also has a `new`.
        let db = <Sqlite as Database>::new(&path).await?;
        let since = self.since.unwrap_or(DateTime::<Utc>::UNIX_EPOCH);
        let entries = db.recent(since, self.limit).await?;
        log::debug!("read {} entries from {}", entries.len(), path);

        // Oldest first, like a log file.
        for entry in entries.iter().rev() {
            let time = format_timestamp(entry.created_at, self.local);
            match self.output {
                OutputType::Text => {
                    println!("{} - {}", time.green(), entry.rendered);
                }
                OutputType::Json => {
                    let json = json!({
                        "id": entry.id(),
                        "timestamp": time,
                        "level": entry.level,
                        "message": entry.message,
                        "line": entry.rendered,
                        "errorName": entry.error_name,
                        "errorMessage": entry.error_message,
                        "file": entry.file,
                        "function": entry.function,
                        "sourceLine": entry.source_line,
                    });
                    println!("{}", json);
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use sitelog::{db::LogEntry, logging::LogRecord};

    use super::*;
    use crate::config::LocalConfigManager;

    #[tokio::test]
    async fn reads_entries_from_the_given_database() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.sqlite3").to_string_lossy().to_string();

        let db = <Sqlite as Database>::new(&path).await.unwrap();
        let record = LogRecord {
            kind: "INFO".to_string(),
            message: "stored".to_string(),
            ..LogRecord::default()
        };
        db.save(&LogEntry::new("INFO stored", &record)).await.unwrap();

        for output in [OutputType::Text, OutputType::Json] {
            let cmd = Cmd {
                db: Some(path.clone()),
                since: Some(parse_since("1h").unwrap()),
                limit: 5,
                output,
                local: false,
            };
            cmd.run(&LocalConfigManager::new()).await.unwrap();
        }
    }
}
