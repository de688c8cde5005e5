//! Test doubles shared by the downloader and pipeline tests

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::AsyncWriteExt;

use crate::downloader::api::{ModInfo, ModRepository};
use crate::downloader::core::{
    EventCallback, EventEmitter, FileOperation, TaskError, TaskResult, UnpackEvent,
};
use crate::manifest::ModReference;

/// In-memory [`ModRepository`]
///
/// Projects without registered metadata answer with HTTP 404. File bodies
/// default to `"<project>:<file>"`.
#[derive(Debug, Default)]
pub(crate) struct MemoryRepository {
    infos: HashMap<u32, ModInfo>,
    bodies: HashMap<(u32, u32), Vec<u8>>,
    requests: AtomicUsize,
    download_delay: Duration,
    hang_downloads: bool,
    panic_on: Option<u32>,
}

impl MemoryRepository {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Repository knowing projects `1..=count` with slugs `mod-<id>`
    pub(crate) fn with_generated(count: u32) -> Self {
        let mut repo = Self::new();
        for id in 1..=count {
            repo = repo.with_mod(id, &format!("Mod {id}"), &format!("mod-{id}"));
        }
        repo
    }

    pub(crate) fn with_mod(mut self, project_id: u32, name: &str, slug: &str) -> Self {
        self.infos.insert(
            project_id,
            ModInfo {
                id: project_id,
                name: name.to_string(),
                slug: slug.to_string(),
            },
        );
        self
    }

    pub(crate) fn with_body(mut self, reference: ModReference, body: &[u8]) -> Self {
        self.bodies
            .insert((reference.project_id, reference.file_id), body.to_vec());
        self
    }

    pub(crate) fn with_download_delay(mut self, delay: Duration) -> Self {
        self.download_delay = delay;
        self
    }

    /// Downloads write a few bytes and then never complete
    pub(crate) fn hanging(mut self) -> Self {
        self.hang_downloads = true;
        self
    }

    /// Resolving `project_id` panics the calling worker
    pub(crate) fn panicking_on(mut self, project_id: u32) -> Self {
        self.panic_on = Some(project_id);
        self
    }

    pub(crate) fn requests(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ModRepository for MemoryRepository {
    async fn resolve_mod(&self, reference: &ModReference) -> TaskResult<ModInfo> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        if self.panic_on == Some(reference.project_id) {
            panic!("metadata lookup for project {} exploded", reference.project_id);
        }
        self.infos
            .get(&reference.project_id)
            .cloned()
            .ok_or_else(|| TaskError::HttpStatus {
                url: format!("memory://mods/{}", reference.project_id),
                status: 404,
            })
    }

    async fn download_file(&self, reference: &ModReference, dest_path: &Path) -> TaskResult<u64> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        if !self.download_delay.is_zero() {
            tokio::time::sleep(self.download_delay).await;
        }

        let body = self
            .bodies
            .get(&(reference.project_id, reference.file_id))
            .cloned()
            .unwrap_or_else(|| format!("{}:{}", reference.project_id, reference.file_id).into_bytes());

        let mut file = tokio::fs::File::create(dest_path)
            .await
            .map_err(|e| TaskError::file_system(dest_path, FileOperation::Create, e))?;
        if self.hang_downloads {
            file.write_all(b"part")
                .await
                .map_err(|e| TaskError::file_system(dest_path, FileOperation::Write, e))?;
            std::future::pending::<()>().await;
        }
        file.write_all(&body)
            .await
            .map_err(|e| TaskError::file_system(dest_path, FileOperation::Write, e))?;
        file.flush()
            .await
            .map_err(|e| TaskError::file_system(dest_path, FileOperation::Write, e))?;

        Ok(body.len() as u64)
    }
}

/// Records every event passed through its emitter
#[derive(Debug, Clone, Default)]
pub(crate) struct EventLog {
    events: Arc<Mutex<Vec<UnpackEvent>>>,
}

impl EventLog {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn callback(&self) -> EventCallback {
        let events = self.events.clone();
        Arc::new(move |event| events.lock().unwrap().push(event))
    }

    pub(crate) fn emitter(&self) -> EventEmitter {
        EventEmitter::new(self.callback())
    }

    pub(crate) fn events(&self) -> Vec<UnpackEvent> {
        self.events.lock().unwrap().clone()
    }

    pub(crate) fn progress(&self) -> Vec<u8> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                UnpackEvent::Progress(p) => Some(p),
                _ => None,
            })
            .collect()
    }

    pub(crate) fn outputs(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                UnpackEvent::Output(line) => Some(line),
                _ => None,
            })
            .collect()
    }

    pub(crate) fn finished(&self) -> Vec<bool> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                UnpackEvent::Finished(ok) => Some(ok),
                _ => None,
            })
            .collect()
    }
}

/// Non-decreasing, within 0..=100, ending at 100
pub(crate) fn assert_progress_complete(progress: &[u8]) {
    assert!(!progress.is_empty(), "no progress events");
    assert!(
        progress.windows(2).all(|w| w[0] <= w[1]),
        "progress went backwards: {:?}",
        progress
    );
    assert!(progress.iter().all(|p| *p <= 100));
    assert_eq!(progress.last(), Some(&100));
}
