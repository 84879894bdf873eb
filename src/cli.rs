//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use crate::config::ReportFormat;
use clap::Parser;
use std::path::PathBuf;

/// Persona Revenue - rule-based persona revenue table
///
/// Builds a table of expected revenue per (country, platform, sex, age range)
/// persona from a transactions CSV and groups personas into quartile segments.
///
/// Examples:
///   persona-revenue --input persona.csv
///   persona-revenue --persona TUR_ANDROID_FEMALE_31_40
///   persona-revenue --interactive
///   persona-revenue --explore --compare-country tur
///   persona-revenue --report personas.md --format markdown
///   persona-revenue --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Transactions CSV (columns COUNTRY, SOURCE, SEX, AGE, PRICE by default)
    ///
    /// Overrides `data.path` from the config file.
    #[arg(short, long, value_name = "FILE", env = "PERSONA_INPUT")]
    pub input: Option<PathBuf>,

    /// Path to configuration file
    ///
    /// If not specified, looks for .persona.toml in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Age bucket boundaries (comma-separated, strictly increasing)
    ///
    /// Example: --boundaries 0,19,24,31,41,70
    #[arg(long, value_name = "AGES", value_delimiter = ',')]
    pub boundaries: Option<Vec<i64>>,

    /// Segment labels, lowest revenue first (comma-separated)
    ///
    /// Example: --labels D,C,B,A
    #[arg(long, value_name = "LABELS", value_delimiter = ',')]
    pub labels: Option<Vec<String>>,

    /// Look up a single persona key and exit
    ///
    /// Exit code 2 when the persona does not exist.
    #[arg(short, long, value_name = "KEY", conflicts_with = "interactive")]
    pub persona: Option<String>,

    /// Prompt for country, platform, sex and age and look up the persona
    #[arg(long)]
    pub interactive: bool,

    /// Attempts allowed per prompt in interactive mode
    #[arg(long, value_name = "NUM")]
    pub max_attempts: Option<usize>,

    /// Print a descriptive profile of the input batch
    #[arg(long)]
    pub explore: bool,

    /// With --explore, compare platform prices in this country (Mann-Whitney U)
    #[arg(long, value_name = "COUNTRY", requires = "explore")]
    pub compare_country: Option<String>,

    /// Write a report of the persona table to this file
    #[arg(short, long, value_name = "FILE")]
    pub report: Option<PathBuf>,

    /// Report format (markdown, json)
    #[arg(long, value_name = "FORMAT")]
    pub format: Option<ReportFormat>,

    /// Leave the per-persona listing out of the report
    #[arg(long)]
    pub no_personas: bool,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long)]
    pub quiet: bool,

    /// Generate a default .persona.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        if self.init_config {
            return Ok(());
        }

        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        if let Some(max_attempts) = self.max_attempts {
            if max_attempts == 0 {
                return Err("Max attempts must be at least 1".to_string());
            }
        }

        if let Some(ref key) = self.persona {
            if key.trim().is_empty() {
                return Err("Persona key must not be empty".to_string());
            }
        }

        if let Some(ref input) = self.input {
            if !input.exists() {
                return Err(format!("Input file does not exist: {}", input.display()));
            }
        }

        Ok(())
    }

    /// Returns the log level based on verbosity settings.
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_args() -> Args {
        Args {
            input: None,
            config: None,
            boundaries: None,
            labels: None,
            persona: None,
            interactive: false,
            max_attempts: None,
            explore: false,
            compare_country: None,
            report: None,
            format: None,
            no_personas: false,
            verbose: false,
            quiet: false,
            init_config: false,
        }
    }

    #[test]
    fn test_parse_lists() {
        let args = Args::try_parse_from([
            "persona-revenue",
            "--boundaries",
            "0,18,65",
            "--labels",
            "low,high",
            "--format",
            "json",
        ])
        .unwrap();

        assert_eq!(args.boundaries, Some(vec![0, 18, 65]));
        assert_eq!(
            args.labels,
            Some(vec!["low".to_string(), "high".to_string()])
        );
        assert_eq!(args.format, Some(ReportFormat::Json));
    }

    #[test]
    fn test_persona_conflicts_with_interactive() {
        let result = Args::try_parse_from([
            "persona-revenue",
            "--persona",
            "TUR_IOS_MALE_0_18",
            "--interactive",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_validation_conflicting_options() {
        let mut args = make_args();
        args.verbose = true;
        args.quiet = true;
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validation_zero_attempts() {
        let mut args = make_args();
        args.max_attempts = Some(0);
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validation_missing_input() {
        let mut args = make_args();
        args.input = Some(PathBuf::from("/definitely/not/here.csv"));
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_log_level() {
        let mut args = make_args();
        assert_eq!(args.log_level(), tracing::Level::INFO);

        args.verbose = true;
        assert_eq!(args.log_level(), tracing::Level::DEBUG);

        args.verbose = false;
        args.quiet = true;
        assert_eq!(args.log_level(), tracing::Level::ERROR);
    }
}
