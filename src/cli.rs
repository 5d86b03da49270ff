//! Command-line surface: choose a source and run one harvest.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::HarvestConfig;
use crate::sources;

#[derive(Parser)]
#[command(
    name = "harvest",
    version,
    about = "Job posting, course and occupation harvester"
)]
pub struct Cli {
    /// Configuration file. Missing file falls back to defaults plus
    /// environment overrides.
    #[arg(short, long, global = true, default_value = "harvest.toml")]
    pub config: PathBuf,

    /// Verbose logging.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Scrape Seek job listings.
    Seek {
        /// Search keywords.
        #[arg(long, default_value = "")]
        keywords: String,
        /// Search location.
        #[arg(long, default_value = "Australia")]
        location: String,
        /// Pages-per-run ceiling.
        #[arg(long)]
        max_pages: Option<u32>,
    },
    /// Scrape CareerJet job listings.
    Careerjet {
        /// Pages-per-run ceiling.
        #[arg(long)]
        max_pages: Option<u32>,
    },
    /// Scrape the occupation classification tables.
    Occupations,
    /// Scrape the course list and course detail pages.
    Courses {
        /// Only visit the first N detail pages.
        #[arg(long)]
        limit: Option<usize>,
    },
}

/// Peek at argv for the verbose flag before clap parses, so logging can be
/// configured first.
pub fn is_verbose() -> bool {
    std::env::args().any(|arg| arg == "-v" || arg == "--verbose")
}

/// Parse arguments and run the selected harvest.
pub async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = HarvestConfig::load(Some(&cli.config))?;

    let summary = match cli.command {
        Command::Seek {
            keywords,
            location,
            max_pages,
        } => sources::seek::harvest(&config, &keywords, &location, max_pages).await?,
        Command::Careerjet { max_pages } => sources::careerjet::harvest(&config, max_pages).await?,
        Command::Occupations => sources::occupations::harvest(&config).await?,
        Command::Courses { limit } => sources::courses::harvest(&config, limit).await?,
    };

    println!("{}", summary);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_seek_arguments() {
        let cli = Cli::try_parse_from([
            "harvest",
            "seek",
            "--keywords",
            "rust developer",
            "--max-pages",
            "3",
        ])
        .unwrap();
        match cli.command {
            Command::Seek {
                keywords,
                location,
                max_pages,
            } => {
                assert_eq!(keywords, "rust developer");
                assert_eq!(location, "Australia");
                assert_eq!(max_pages, Some(3));
            }
            _ => panic!("expected seek subcommand"),
        }
    }

    #[test]
    fn test_cli_requires_a_source() {
        assert!(Cli::try_parse_from(["harvest"]).is_err());
    }
}
