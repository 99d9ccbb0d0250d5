//! auditarr - a read-only auditor for *arr-managed media libraries.
//!
//! Usage:
//!   auditarr scan [--config PATH] [--verbose] [--skip-permissions] [--threads N]
//!   auditarr --help
//!
//! Exits with status 2 when any library file is orphaned or at risk.

mod logging;

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use clap::{Parser, Subcommand};
use color_eyre::eyre::{Context, Result, bail};
use tokio_util::sync::CancellationToken;

use auditarr_analyze::{
    AnalysisResult, AuditInputs, Engine, EngineConfig, ServiceStatus, TracingSink,
};
use auditarr_collect::{ArrClient, CollectError, QbittorrentClient};
use auditarr_core::{
    AuditConfig, DownloadClientConfig, ManagedFile, ManagerConfig, ManagerKind, MediaFile,
    PermissionRecord, ScanError, Torrent,
};
use auditarr_report::{DiscordNotifier, ReportWriter, format_size};
use auditarr_scan::{MediaScanner, PermissionScanner, StatLinkCounter};

const DEFAULT_CONFIG: &str = "/etc/auditarr/config.toml";

/// Service name under which the media scan is reported.
const FILESYSTEM: &str = "filesystem";

/// Exit status when orphaned or at-risk files were found.
const FINDINGS_EXIT_CODE: u8 = 2;

#[derive(Parser)]
#[command(
    name = "auditarr",
    version,
    about = "Audit a media library against Sonarr, Radarr and qBittorrent",
    long_about = "auditarr compares the files on disk with what Sonarr and Radarr \
                  track and what qBittorrent seeds, and reports orphaned, unprotected \
                  and suspicious files plus ownership problems. It never modifies \
                  anything."
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run a full audit and write reports
    Scan {
        /// Configuration file
        #[arg(short, long, default_value = DEFAULT_CONFIG)]
        config: PathBuf,

        /// Enable debug logging
        #[arg(short, long)]
        verbose: bool,

        /// Skip the permission audit even if enabled in the configuration
        #[arg(long)]
        skip_permissions: bool,

        /// Walker threads per scan (0 = automatic)
        #[arg(short = 'j', long, default_value_t = 0)]
        threads: usize,
    },
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    color_eyre::install()?;

    let cli = Cli::parse();

    match cli.command {
        Command::Scan {
            config,
            verbose,
            skip_permissions,
            threads,
        } => {
            logging::init(verbose)?;
            run_scan(&config, skip_permissions, threads).await
        }
    }
}

/// Run one audit end to end.
async fn run_scan(config_path: &Path, skip_permissions: bool, threads: usize) -> Result<ExitCode> {
    let config = AuditConfig::load(config_path)
        .wrap_err_with(|| format!("Failed to load {}", config_path.display()))?;
    let audit_permissions = config.permissions.enabled && !skip_permissions;

    let cancel = CancellationToken::new();
    watch_interrupt(cancel.clone());

    let start = Instant::now();
    tracing::info!(media_root = %config.paths.media_root.display(), "starting audit");

    let (media, permissions, sonarr, radarr, torrents) = tokio::join!(
        scan_media(&config, threads, cancel.clone()),
        scan_permissions(&config, audit_permissions, threads, cancel.clone()),
        collect_manager(ManagerKind::Sonarr, &config.sonarr, cancel.clone()),
        collect_manager(ManagerKind::Radarr, &config.radarr, cancel.clone()),
        collect_torrents(&config.qbittorrent, cancel.clone()),
    );
    let (sonarr, sonarr_status) = sonarr;
    let (radarr, radarr_status) = radarr;
    let (torrents, qbit_status) = torrents;
    let (media, media_status) = media;

    if cancel.is_cancelled() {
        bail!("Audit interrupted");
    }

    let engine = build_engine(&config, audit_permissions);
    let inputs = AuditInputs {
        media,
        sonarr,
        radarr,
        torrents,
        permissions,
    };
    let mut result = tokio::task::spawn_blocking(move || engine.analyze(&inputs))
        .await
        .wrap_err("Analysis task failed")?;

    result.services = vec![media_status, sonarr_status, radarr_status, qbit_status];
    result.summary.duration = start.elapsed();

    let generated_at = Utc::now();
    let writer = ReportWriter::from_config(&config);
    let written = writer
        .write(&result, &config, generated_at)
        .wrap_err_with(|| format!("Failed to write reports to {}", writer.dir().display()))?;

    let location = written
        .first()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| writer.dir().display().to_string());
    notify(&config, &result, &location).await;

    print_summary(&result, &written);

    if result.has_findings() {
        Ok(ExitCode::from(FINDINGS_EXIT_CODE))
    } else {
        Ok(ExitCode::SUCCESS)
    }
}

/// Cancel `token` on Ctrl-C.
fn watch_interrupt(token: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupted, cancelling audit");
            token.cancel();
        }
    });
}

fn build_engine(config: &AuditConfig, audit_permissions: bool) -> Engine {
    let mut engine_config = EngineConfig::from_config(config);
    if !audit_permissions {
        engine_config = engine_config.without_permissions();
    }
    Engine::new(engine_config)
        .with_link_counter(Arc::new(StatLinkCounter))
        .with_diagnostics(Arc::new(TracingSink))
}

/// Library and download files. A failed scan leaves the audit without them
/// and is reported as a failed `filesystem` service.
async fn scan_media(
    config: &AuditConfig,
    threads: usize,
    cancel: CancellationToken,
) -> (Vec<MediaFile>, ServiceStatus) {
    let media_root = config.paths.media_root.clone();
    let torrent_root = config.paths.torrent_root.clone();

    let scan = tokio::task::spawn_blocking(move || {
        MediaScanner::new()
            .threads(threads)
            .with_cancellation(cancel)
            .scan_roots(&media_root, torrent_root.as_deref())
    })
    .await;

    let scan = match scan {
        Ok(Ok(scan)) => scan,
        Ok(Err(err)) => {
            if !matches!(err, ScanError::Cancelled) {
                tracing::warn!("media scan failed, continuing without files: {err}");
            }
            return (Vec::new(), ServiceStatus::failed(FILESYSTEM, err));
        }
        Err(err) => {
            tracing::warn!("media scan task failed, continuing without files: {err}");
            return (Vec::new(), ServiceStatus::failed(FILESYSTEM, err));
        }
    };

    for warning in &scan.warnings {
        tracing::debug!(path = %warning.path.display(), "{}", warning.message);
    }
    tracing::info!(
        files = scan.files.len(),
        size = %format_size(scan.total_size()),
        warnings = scan.warnings.len(),
        elapsed_ms = scan.duration.as_millis() as u64,
        "scanned media"
    );
    (scan.files, ServiceStatus::connected(FILESYSTEM))
}

/// Permission records for the library. Failures leave the audit without them.
async fn scan_permissions(
    config: &AuditConfig,
    enabled: bool,
    threads: usize,
    cancel: CancellationToken,
) -> Vec<PermissionRecord> {
    if !enabled {
        return Vec::new();
    }
    let media_root = config.paths.media_root.clone();
    let skip_paths = config.permissions.skip_paths.clone();

    let scan = tokio::task::spawn_blocking(move || {
        PermissionScanner::new(skip_paths)
            .threads(threads)
            .with_cancellation(cancel)
            .scan(&media_root)
    })
    .await;

    match scan {
        Ok(Ok(scan)) => {
            for warning in &scan.warnings {
                tracing::warn!(path = %warning.path.display(), "{}", warning.message);
            }
            tracing::info!(entries = scan.records.len(), "collected permissions");
            scan.records
        }
        Ok(Err(err)) => {
            tracing::error!("permission scan failed: {err}");
            Vec::new()
        }
        Err(err) => {
            tracing::error!("permission scan task failed: {err}");
            Vec::new()
        }
    }
}

async fn collect_manager(
    kind: ManagerKind,
    config: &ManagerConfig,
    cancel: CancellationToken,
) -> (Vec<ManagedFile>, ServiceStatus) {
    let name = kind.to_string();
    if !config.is_enabled() {
        tracing::info!(manager = %kind, "not configured, skipping");
        return (Vec::new(), ServiceStatus::disabled(name));
    }

    service_outcome(name, fetch_managed(kind, config, cancel).await)
}

async fn fetch_managed(
    kind: ManagerKind,
    config: &ManagerConfig,
    cancel: CancellationToken,
) -> Result<Vec<ManagedFile>, CollectError> {
    let client = ArrClient::from_config(kind, config)?.with_cancellation(cancel);
    client.test_connection().await?;
    client.collect().await
}

async fn collect_torrents(
    config: &DownloadClientConfig,
    cancel: CancellationToken,
) -> (Vec<Torrent>, ServiceStatus) {
    let name = "qbittorrent".to_string();
    if !config.is_enabled() {
        tracing::info!("qbittorrent not configured, skipping");
        return (Vec::new(), ServiceStatus::disabled(name));
    }

    service_outcome(name, fetch_torrents(config, cancel).await)
}

async fn fetch_torrents(
    config: &DownloadClientConfig,
    cancel: CancellationToken,
) -> Result<Vec<Torrent>, CollectError> {
    QbittorrentClient::from_config(config)?
        .with_cancellation(cancel)
        .collect()
        .await
}

/// A failed service contributes nothing and is reported as failed.
fn service_outcome<T>(
    name: String,
    collected: Result<Vec<T>, CollectError>,
) -> (Vec<T>, ServiceStatus) {
    match collected {
        Ok(items) => (items, ServiceStatus::connected(name)),
        Err(err) => {
            if !err.is_cancelled() {
                tracing::error!(service = %name, "collection failed: {err}");
            }
            (Vec::new(), ServiceStatus::failed(name, err))
        }
    }
}

async fn notify(config: &AuditConfig, result: &AnalysisResult, location: &str) {
    let notifier = match DiscordNotifier::new(config.notifications.discord_webhook.clone()) {
        Ok(notifier) => notifier,
        Err(err) => {
            tracing::warn!("notifications unavailable: {err}");
            return;
        }
    };
    if let Err(err) = notifier.send(result, location).await {
        tracing::warn!("failed to send notification: {err}");
    }
}

fn print_summary(result: &AnalysisResult, written: &[PathBuf]) {
    let s = &result.summary;

    println!();
    println!("{}", "─".repeat(60));
    println!(" Media audit");
    println!("{}", "─".repeat(60));
    println!(" {:<22} {:>8}", "Scanned files", s.total_files);
    println!(" {:<22} {:>8}", "Healthy", s.healthy);
    println!(" {:<22} {:>8}", "At risk", s.at_risk);
    println!(
        " {:<22} {:>8}  ({})",
        "Orphaned",
        s.orphan,
        format_size(result.orphan_size())
    );
    println!(" {:<22} {:>8}", "Orphaned downloads", s.orphaned_download);
    println!(" {:<22} {:>8}", "Suspicious", s.suspicious);
    println!(" {:<22} {:>8}", "Unlinked torrents", s.unlinked_torrents);
    if s.empty_torrents > 0 {
        println!(" {:<22} {:>8}", "Torrents without files", s.empty_torrents);
    }
    println!(
        " {:<22} {:>8}",
        "Permission issues",
        s.permission_errors + s.permission_warnings + s.permission_infos
    );
    println!("{}", "─".repeat(60));

    for service in &result.services {
        let status = match (service.enabled, service.ok) {
            (false, _) => "disabled",
            (true, true) => "connected",
            (true, false) => "failed",
        };
        println!(" {:<22} {status}", service.name);
    }
    println!(" Completed in {:.1}s", s.duration.as_secs_f64());

    for path in written {
        println!(" Report: {}", path.display());
    }
    println!();
}
