//! Run archive using JSON file storage

use crate::models::{RunState, RunStep};
use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use uuid::Uuid;

/// Root JSON store containing all recorded runs
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct JsonStore {
    pub runs: Vec<RunState>,
}

/// Archive of run states, kept in memory and optionally mirrored to a JSON file
pub struct RunArchive {
    /// Path to JSON store file; `None` keeps the archive in memory only
    store_path: Option<PathBuf>,
    store: Arc<Mutex<JsonStore>>,
}

impl RunArchive {
    /// Archive that is never written to disk
    pub fn in_memory() -> Self {
        Self {
            store_path: None,
            store: Arc::new(Mutex::new(JsonStore::default())),
        }
    }

    /// Open (or create) a file-backed archive
    pub fn open<P: AsRef<Path>>(store_path: P) -> Result<Self> {
        let store_path = store_path.as_ref().to_path_buf();

        if let Some(parent) = store_path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create run archive directory")?;
        }

        let store = if store_path.exists() {
            Self::load_store(&store_path)?
        } else {
            JsonStore::default()
        };

        Ok(Self {
            store_path: Some(store_path),
            store: Arc::new(Mutex::new(store)),
        })
    }

    /// Load JSON store from file with file locking
    fn load_store(path: &Path) -> Result<JsonStore> {
        let file = File::open(path).context("Failed to open run archive file")?;

        file.lock_shared()
            .context("Failed to acquire read lock on run archive")?;

        let mut contents = String::new();
        let mut reader = std::io::BufReader::new(file);
        reader
            .read_to_string(&mut contents)
            .context("Failed to read run archive")?;

        // Lock released when the reader is dropped
        drop(reader);

        if contents.trim().is_empty() {
            return Ok(JsonStore::default());
        }

        serde_json::from_str(&contents).context("Failed to parse run archive JSON")
    }

    fn lock(&self) -> Result<MutexGuard<'_, JsonStore>> {
        self.store
            .lock()
            .map_err(|_| anyhow!("Run archive lock poisoned"))
    }

    fn snapshot(&self) -> JsonStore {
        match self.store.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Read, merge and rewrite the store file under one exclusive lock, so
    /// records written by other handles on the same file are kept.
    fn upsert_file(path: &Path, run: &RunState) -> Result<JsonStore> {
        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .open(path)
            .context("Failed to open run archive file for writing")?;

        file.lock_exclusive()
            .context("Failed to acquire write lock on run archive")?;

        let mut contents = String::new();
        file.read_to_string(&mut contents)
            .context("Failed to read run archive")?;
        let mut store = if contents.trim().is_empty() {
            JsonStore::default()
        } else {
            serde_json::from_str(&contents).context("Failed to parse run archive JSON")?
        };
        upsert(&mut store.runs, run);

        let json = serde_json::to_string_pretty(&store).context("Failed to serialize run archive")?;
        file.seek(SeekFrom::Start(0))
            .context("Failed to rewind run archive")?;
        file.set_len(0).context("Failed to truncate run archive")?;
        file.write_all(json.as_bytes())
            .context("Failed to write run archive")?;
        file.flush()
            .context("Failed to flush run archive to disk")?;

        // Lock released when the file is dropped
        Ok(store)
    }

    /// Insert or replace the record for `run.run_id`. A record is never
    /// replaced by one with fewer transitions.
    ///
    /// File-backed archives also pick up records other handles wrote since
    /// this one last touched the file.
    pub fn record(&self, run: &RunState) -> Result<()> {
        let mut store = self.lock()?;
        match &self.store_path {
            Some(path) => *store = Self::upsert_file(path, run)?,
            None => upsert(&mut store.runs, run),
        }
        Ok(())
    }

    pub fn get(&self, run_id: Uuid) -> Option<RunState> {
        self.snapshot()
            .runs
            .into_iter()
            .find(|r| r.run_id == run_id)
    }

    /// All recorded runs, oldest first
    pub fn list(&self) -> Vec<RunState> {
        let mut runs = self.snapshot().runs;
        runs.sort_by_key(|r| r.started_at);
        runs
    }

    /// Runs that never reached a terminal step (interrupted processes)
    pub fn find_incomplete(&self) -> Vec<RunState> {
        self.list()
            .into_iter()
            .filter(|r| !r.is_terminal())
            .collect()
    }

    /// Runs that are stalled as of `now`: preempted by their deadline, or
    /// still incomplete past it. These runs sent no notification.
    pub fn find_stalled(&self, now: DateTime<Utc>) -> Vec<RunState> {
        self.list()
            .into_iter()
            .filter(|r| r.deadline_exceeded() || (!r.is_terminal() && r.deadline <= now))
            .collect()
    }

    /// Count of runs by terminal step
    pub fn count_by_step(&self, step: RunStep) -> usize {
        self.snapshot()
            .runs
            .iter()
            .filter(|r| r.current_step == step)
            .count()
    }
}

fn upsert(runs: &mut Vec<RunState>, run: &RunState) {
    match runs.iter_mut().find(|r| r.run_id == run.run_id) {
        Some(existing) => {
            if run.transitions.len() >= existing.transitions.len() {
                *existing = run.clone();
            }
        }
        None => runs.push(run.clone()),
    }
}
