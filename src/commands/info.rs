use clap::{Args, CommandFactory};
use sitelog::db::{Database, Sqlite};

use crate::{commands::Cli, config::ConfigManager};

#[derive(Args, Debug)]
#[command(args_conflicts_with_subcommands = true)]
pub struct Cmd {}

impl Cmd {
    pub async fn run(&self, cli: &Cli, config: &impl ConfigManager) -> eyre::Result<()> {
        let logger = cli.logger(config)?;
        let db_path = config.get_db_path().unwrap_or_default();

        println!(
            "Version:        {}",
            Cli::command().get_version().unwrap_or("")
        );
        match <Sqlite as Database>::new(&db_path).await {
            Ok(db) => println!("Database:       {}-{}", db.engine(), db.version().await?),
            Err(err) => println!("Database:       unavailable ({})", err),
        }
        println!("Database Path:  {}", db_path);
        println!("Log File:       {}", logger.file().display());
        println!("Level:          {}", logger.level());
        println!("Encoding:       {}", logger.encoding());
        println!("Format:         {}", logger.format());
        println!("Error Format:   {}", logger.error_format());
        Ok(())
    }
}
