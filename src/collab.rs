//! External collaborators: downloads, clipboard and the version store.
//!
//! The engine never talks to a browser directly; these traits are the
//! seam. Production hosts bind them to real facilities, tests use the
//! in-memory doubles below.

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::LazyLock;

use anyhow::{Context, Result};
use chrono::Utc;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::model::{BannerPayload, CopyPayload, DownloadRequest, DownloadResult, FilenameSuggestion};
use crate::util::normalize_spaces;

static CELEX_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)CELEX:([0-9A-Z]+)").expect("valid CELEX pattern"));

static PATH_SEPARATORS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\\/]+").expect("valid separator pattern"));

pub trait Downloader {
    fn download(&mut self, request: &DownloadRequest) -> DownloadResult;
}

pub trait Clipboard {
    /// Writes plain text and an HTML rendition in one operation.
    fn write_rich(&mut self, payload: &CopyPayload) -> Result<()>;
    fn write_plain(&mut self, text: &str) -> Result<()>;
}

/// One durable key plus the transient update-banner record.
pub trait VersionStore {
    fn last_installed_version(&self) -> Result<Option<String>>;
    fn set_last_installed_version(&mut self, version: &str) -> Result<()>;
    fn stage_update_banner(&mut self, payload: BannerPayload) -> Result<()>;
    /// Consumes the staged banner; a second read returns `None`.
    fn take_update_banner(&mut self) -> Result<Option<BannerPayload>>;
}

/// CELEX identifier of an EUR-Lex URL, uppercased.
pub fn extract_celex_id(url: &str) -> Option<String> {
    CELEX_ID
        .captures(url)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_uppercase())
}

fn normalize_download_filename(filename: &str) -> Option<String> {
    let flat = PATH_SEPARATORS.replace_all(filename, "-");
    let flat = normalize_spaces(&flat);
    if flat.is_empty() {
        return None;
    }
    if flat.to_lowercase().ends_with(".pdf") {
        Some(flat)
    } else {
        Some(format!("{flat}.pdf"))
    }
}

/// Wraps a [`Downloader`] with the filename bookkeeping the judgment PDF
/// flow needs: EUR-Lex answers with a server-chosen `CELEX_…` name, so a
/// pending override is registered per CELEX id and served exactly once
/// through the determine-final-filename hook.
pub struct DownloadManager<D> {
    downloader: D,
    pending_by_celex: HashMap<String, FilenameSuggestion>,
}

impl<D: Downloader> DownloadManager<D> {
    pub fn new(downloader: D) -> Self {
        Self {
            downloader,
            pending_by_celex: HashMap::new(),
        }
    }

    pub fn request_download(&mut self, url: &str, filename: Option<&str>) -> DownloadResult {
        let filename = filename.and_then(normalize_download_filename);

        if let (Some(celex), Some(name)) = (extract_celex_id(url), filename.as_deref()) {
            self.pending_by_celex.insert(
                celex,
                FilenameSuggestion {
                    filename: name.to_string(),
                    uniquify: true,
                },
            );
        }

        let request = DownloadRequest {
            url: url.to_string(),
            suggested_filename: filename,
        };
        let result = self.downloader.download(&request);
        info!(url, filename = ?request.suggested_filename, ok = matches!(result, DownloadResult::Started { .. }), "download requested");
        result
    }

    /// Answers the determine-final-filename hook for a starting download.
    pub fn suggest_filename(&mut self, url: &str) -> Option<FilenameSuggestion> {
        let celex = extract_celex_id(url)?;
        self.pending_by_celex.remove(&celex)
    }
}

/// Rich write when the clipboard supports it, plain text otherwise.
pub fn copy_to_clipboard(clipboard: &mut dyn Clipboard, payload: &CopyPayload) -> Result<()> {
    if clipboard.write_rich(payload).is_ok() {
        return Ok(());
    }
    clipboard.write_plain(&payload.plain)
}

/// First install: just record the version.
pub fn handle_installed(store: &mut dyn VersionStore, version: &str) -> Result<()> {
    store.set_last_installed_version(version)
}

/// Update: record the new version and stage a banner, at most once per
/// version even when the host replays the event.
pub fn handle_updated(
    store: &mut dyn VersionStore,
    version: &str,
    previous_version: Option<&str>,
    ts: i64,
) -> Result<()> {
    if previous_version == Some(version) {
        return Ok(());
    }
    if store.last_installed_version()?.as_deref() == Some(version) {
        return Ok(());
    }
    store.set_last_installed_version(version)?;
    store.stage_update_banner(BannerPayload {
        version: version.to_string(),
        ts,
    })?;
    info!(version, "update banner staged");
    Ok(())
}

/// [`handle_updated`] stamped with the current wall clock.
pub fn handle_updated_now(
    store: &mut dyn VersionStore,
    version: &str,
    previous_version: Option<&str>,
) -> Result<()> {
    handle_updated(store, version, previous_version, Utc::now().timestamp_millis())
}

#[derive(Default)]
pub struct MemoryVersionStore {
    last_version: Option<String>,
    banner: Option<BannerPayload>,
}

impl VersionStore for MemoryVersionStore {
    fn last_installed_version(&self) -> Result<Option<String>> {
        Ok(self.last_version.clone())
    }

    fn set_last_installed_version(&mut self, version: &str) -> Result<()> {
        self.last_version = Some(version.to_string());
        Ok(())
    }

    fn stage_update_banner(&mut self, payload: BannerPayload) -> Result<()> {
        self.banner = Some(payload);
        Ok(())
    }

    fn take_update_banner(&mut self) -> Result<Option<BannerPayload>> {
        Ok(self.banner.take())
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct VersionRecord {
    last_installed_version: Option<String>,
    update_banner: Option<BannerPayload>,
}

/// Version store persisted as one pretty-printed JSON file.
pub struct JsonFileVersionStore {
    path: PathBuf,
}

impl JsonFileVersionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn load(&self) -> Result<VersionRecord> {
        if !self.path.exists() {
            return Ok(VersionRecord::default());
        }
        let raw = fs::read_to_string(&self.path)
            .with_context(|| format!("reading version store {}", self.path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("parsing version store {}", self.path.display()))
    }

    fn save(&self, record: &VersionRecord) -> Result<()> {
        let json = serde_json::to_string_pretty(record).context("serializing version store")?;
        fs::write(&self.path, json + "\n")
            .with_context(|| format!("writing version store {}", self.path.display()))
    }
}

impl VersionStore for JsonFileVersionStore {
    fn last_installed_version(&self) -> Result<Option<String>> {
        Ok(self.load()?.last_installed_version)
    }

    fn set_last_installed_version(&mut self, version: &str) -> Result<()> {
        let mut record = self.load()?;
        record.last_installed_version = Some(version.to_string());
        self.save(&record)
    }

    fn stage_update_banner(&mut self, payload: BannerPayload) -> Result<()> {
        let mut record = self.load()?;
        record.update_banner = Some(payload);
        self.save(&record)
    }

    fn take_update_banner(&mut self) -> Result<Option<BannerPayload>> {
        let mut record = self.load()?;
        let banner = record.update_banner.take();
        if banner.is_some() {
            self.save(&record)?;
        }
        Ok(banner)
    }
}
