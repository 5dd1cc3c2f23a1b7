use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use vmaudit_core::FieldFilter;
use vmaudit_engine::ReportFormat;

#[derive(Debug, Parser)]
#[command(name = "vmaudit")]
#[command(about = "Read-only audits of VMware inventories")]
pub struct Cli {
    /// RON file describing the endpoints to connect to.
    #[arg(long, global = true, default_value = "vmaudit.ron")]
    pub config: PathBuf,
    /// Write the report to this file instead of stdout.
    #[arg(long, global = true, conflicts_with = "save")]
    pub output: Option<PathBuf>,
    /// Write the report to a timestamped file in the configured output directory.
    #[arg(long, global = true, default_value_t = false)]
    pub save: bool,
    #[arg(long, global = true, value_enum, default_value_t = FormatArg::Csv)]
    pub format: FormatArg,
    #[arg(long, global = true, default_value_t = ',')]
    pub delimiter: char,
    /// Maximum number of inventory queries in flight; overrides the config file.
    #[arg(long, global = true)]
    pub concurrency: Option<usize>,
    /// Cancel outstanding queries after the first failed one.
    #[arg(long, global = true, default_value_t = false)]
    pub fail_fast: bool,
    /// Keep only rows whose column equals the value. Repeatable.
    #[arg(long = "where", global = true, value_name = "FIELD=VALUE")]
    pub filters: Vec<FieldFilter>,
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,
    /// Suppress the live progress line.
    #[arg(long, global = true, default_value_t = false)]
    pub quiet: bool,
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// VMs that share a cloud-assigned identifier.
    Duplicates {
        /// Extra-config key holding the identifier; overrides the config file.
        #[arg(long)]
        key: Option<String>,
    },
    /// Cluster rules touching VMs of a Cloud Director organization.
    Affinity {
        #[arg(long)]
        org: String,
    },
    /// Datastore files that no registered VM references.
    Orphans {
        #[arg(long)]
        datastore: String,
        /// vCenter that mounts the datastore; required when several are configured.
        #[arg(long)]
        vcenter: Option<String>,
    },
}

impl Command {
    pub fn report_name(&self) -> &'static str {
        match self {
            Command::Duplicates { .. } => "duplicates",
            Command::Affinity { .. } => "affinity",
            Command::Orphans { .. } => "orphans",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum FormatArg {
    Csv,
    Json,
}

impl From<FormatArg> for ReportFormat {
    fn from(value: FormatArg) -> Self {
        match value {
            FormatArg::Csv => ReportFormat::Delimited,
            FormatArg::Json => ReportFormat::Json,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "vmaudit",
            "orphans",
            "--datastore",
            "ds1",
            "--where",
            "Folder=web01",
            "--concurrency",
            "8",
            "-vv",
        ])
        .unwrap();

        assert_eq!(cli.concurrency, Some(8));
        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.filters.len(), 1);
        assert_eq!(cli.filters[0].field, "Folder");
        assert_eq!(cli.command.report_name(), "orphans");
    }

    #[test]
    fn rejects_malformed_filter() {
        let result = Cli::try_parse_from(["vmaudit", "duplicates", "--where", "nofield"]);
        assert!(result.is_err());
    }

    #[test]
    fn output_and_save_conflict() {
        let result = Cli::try_parse_from([
            "vmaudit",
            "duplicates",
            "--output",
            "x.csv",
            "--save",
        ]);
        assert!(result.is_err());
    }
}
