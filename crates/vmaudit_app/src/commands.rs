use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::Context;
use audit_logging::{audit_error, audit_info, audit_warn};
use chrono::Local;
use serde::Serialize;
use vmaudit_core::{apply_filters, TableRow};
use vmaudit_engine::reports::{affinity_report, duplicate_report, orphan_report};
use vmaudit_engine::{
    connect_all, render_report, write_report, Connections, Endpoint, ExportOptions,
    FailurePolicy, LogProgressSink, ProgressSink, ReportOutcome, RunnerSettings, TaskRunner,
};

use crate::cli::{Cli, Command};
use crate::config::{env_lookup, AppConfig};
use crate::progress::TerminalProgress;

/// Exit code for a report that was written but has missing rows because some
/// queries failed or were cancelled.
const EXIT_PARTIAL: u8 = 2;
const EXIT_OK: u8 = 0;

pub fn run(cli: Cli, config: AppConfig) -> anyhow::Result<ExitCode> {
    let runner = TaskRunner::new(RunnerSettings {
        capacity: cli.concurrency.unwrap_or(config.concurrency),
        failure_policy: if cli.fail_fast {
            FailurePolicy::CancelOnFirstFailure
        } else {
            FailurePolicy::Continue
        },
    })?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("starting async runtime")?;

    runtime.block_on(async {
        let connections = connect(&cli, &config).await?;
        let result = dispatch(&cli, &config, &connections, &runner).await;
        connections.close().await;
        result.map(ExitCode::from)
    })
}

async fn connect(cli: &Cli, config: &AppConfig) -> anyhow::Result<Connections> {
    let vcenters: Vec<Endpoint> = match &cli.command {
        Command::Orphans { vcenter, .. } => {
            vec![config.select_vcenter(vcenter.as_deref())?.resolve(env_lookup)?]
        }
        _ => config
            .vcenters
            .iter()
            .map(|vcenter| vcenter.resolve(env_lookup))
            .collect::<anyhow::Result<_>>()?,
    };
    let cloud_director = match (&cli.command, &config.cloud_director) {
        (Command::Affinity { .. }, Some(director)) => Some(director.resolve(env_lookup)?),
        _ => None,
    };

    let connections = connect_all(&vcenters, cloud_director.as_ref(), &config.client_settings())
        .await
        .context("connecting to management endpoints")?;
    Ok(connections)
}

async fn dispatch(
    cli: &Cli,
    config: &AppConfig,
    connections: &Connections,
    runner: &TaskRunner,
) -> anyhow::Result<u8> {
    let sink: Box<dyn ProgressSink> = if cli.quiet {
        Box::new(LogProgressSink)
    } else {
        Box::new(TerminalProgress::new())
    };

    match &cli.command {
        Command::Duplicates { key } => {
            let key = key.as_deref().unwrap_or(&config.cloud_id_key);
            let rows = duplicate_report(&connections.vcenters, key).await?;
            emit(cli, config, rows)?;
            Ok(EXIT_OK)
        }
        Command::Affinity { org } => {
            let outcome = affinity_report(connections, org, runner, sink.as_ref()).await?;
            finish(cli, config, outcome)
        }
        Command::Orphans { datastore, vcenter } => {
            let conn = match vcenter {
                Some(name) => connections.vcenter(name)?,
                None => connections
                    .vcenters
                    .first()
                    .context("no vCenter connection was established")?,
            };
            let outcome = orphan_report(conn, datastore, runner, sink.as_ref()).await?;
            finish(cli, config, outcome)
        }
    }
}

/// Logs what went wrong, writes whatever rows were collected and returns the
/// process status for the run.
fn finish<R: TableRow + Serialize>(
    cli: &Cli,
    config: &AppConfig,
    outcome: ReportOutcome<R>,
) -> anyhow::Result<u8> {
    for failure in &outcome.failures {
        audit_error!("Query failed for {}", failure);
    }
    if outcome.cancelled > 0 {
        audit_warn!("{} queries were cancelled after a failure", outcome.cancelled);
    }
    audit_info!(
        "Scanned {} items: {} rows, {} failures, {} cancelled",
        outcome.scanned,
        outcome.rows.len(),
        outcome.failures.len(),
        outcome.cancelled
    );

    let status = report_status(&outcome);
    emit(cli, config, outcome.rows)?;
    if status == EXIT_PARTIAL {
        eprintln!("warning: report is incomplete; see the log for failed queries");
    }
    Ok(status)
}

fn report_status<T>(outcome: &ReportOutcome<T>) -> u8 {
    if outcome.is_complete() {
        EXIT_OK
    } else {
        EXIT_PARTIAL
    }
}

fn emit<R: TableRow + Serialize>(cli: &Cli, config: &AppConfig, rows: Vec<R>) -> anyhow::Result<()> {
    let rows = apply_filters(rows, &cli.filters)?;
    let options = ExportOptions {
        format: cli.format.into(),
        delimiter: cli.delimiter,
    };

    let target = match (&cli.output, cli.save) {
        (Some(path), _) => Some(path.clone()),
        (None, true) => Some(timestamped_path(
            &config.output_dir,
            cli.command.report_name(),
            options.format.extension(),
        )),
        (None, false) => None,
    };

    match target {
        Some(path) => {
            let written = write_report(&path, &rows, &options)
                .with_context(|| format!("writing report to {}", path.display()))?;
            audit_info!("Wrote {} rows to {}", rows.len(), written.display());
            eprintln!("{} rows written to {}", rows.len(), written.display());
        }
        None => print!("{}", render_report(&rows, &options)?),
    }
    Ok(())
}

fn timestamped_path(dir: &Path, report: &str, extension: &str) -> PathBuf {
    let stamp = Local::now().format("%Y%m%d-%H%M%S");
    dir.join(format!("{report}-{stamp}.{extension}"))
}

#[cfg(test)]
mod tests {
    use clap::Parser;
    use vmaudit_core::{JobFailure, OrphanRow, TaskError};

    use super::*;

    const CONFIG: &str = r#"(
        vcenters: [(
            name: "vc01",
            url: "https://vc01.example.com",
            username: "audit",
            password_env: "VC01_PASSWORD",
        )],
    )"#;

    fn orphan(folder: &str, file: &str) -> OrphanRow {
        OrphanRow {
            datastore: "ds1".into(),
            folder: folder.into(),
            file: file.into(),
            size_bytes: 1024,
            modified: "2024-05-01T10:00:00Z".into(),
        }
    }

    fn outcome(failures: Vec<JobFailure>, cancelled: usize) -> ReportOutcome<OrphanRow> {
        ReportOutcome {
            rows: vec![orphan("web01", "[ds1] web01/old.vmdk")],
            scanned: 4,
            failures,
            cancelled,
        }
    }

    fn cli_writing_to(path: &Path) -> Cli {
        let output = path.to_str().unwrap();
        Cli::try_parse_from(["vmaudit", "--output", output, "orphans", "--datastore", "ds1"]).unwrap()
    }

    #[test]
    fn incomplete_report_is_written_and_exits_partial() {
        let temp = tempfile::TempDir::new().unwrap();
        let path = temp.path().join("orphans.csv");
        let cli = cli_writing_to(&path);
        let config = AppConfig::parse(CONFIG).unwrap();
        let failed = JobFailure {
            job_id: 2,
            label: "db01".into(),
            error: TaskError::Query("http status 500".into()),
        };

        let status = finish(&cli, &config, outcome(vec![failed], 1)).unwrap();

        assert_eq!(status, EXIT_PARTIAL);
        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.starts_with("Datastore,Folder,File,SizeBytes,Modified\n"));
        assert!(written.contains("[ds1] web01/old.vmdk"));
    }

    #[test]
    fn cancelled_jobs_alone_make_the_report_partial() {
        assert_eq!(report_status(&outcome(Vec::new(), 1)), EXIT_PARTIAL);
    }

    #[test]
    fn clean_report_exits_ok() {
        let temp = tempfile::TempDir::new().unwrap();
        let path = temp.path().join("out").join("orphans.csv");
        let cli = cli_writing_to(&path);
        let config = AppConfig::parse(CONFIG).unwrap();

        let status = finish(&cli, &config, outcome(Vec::new(), 0)).unwrap();

        assert_eq!(status, EXIT_OK);
        assert!(path.exists());
    }

    #[test]
    fn timestamped_paths_live_in_output_dir() {
        let path = timestamped_path(Path::new("reports"), "orphans", "csv");
        let name = path.file_name().unwrap().to_str().unwrap();
        assert!(path.starts_with("reports"));
        assert!(name.starts_with("orphans-"));
        assert!(name.ends_with(".csv"));
        assert_eq!(name.len(), "orphans-20240101-120000.csv".len());
    }
}
