use std::fs::{self, File, OpenOptions};
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::{info, warn};
use ulid::Ulid;

use crate::engine::{InMemoryStore, Repository, StoreError};
use crate::limits::MAX_JOURNAL_ENTRY_BYTES;
use crate::model::*;
use crate::settings::RoomSettings;

/// Encode a single event to [len][bincode][crc32] format.
fn encode_event(writer: &mut impl Write, event: &Event) -> io::Result<()> {
    let payload =
        bincode::serialize(event).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    if payload.len() > MAX_JOURNAL_ENTRY_BYTES {
        return Err(io::Error::new(io::ErrorKind::InvalidData, "journal entry too large"));
    }
    let len = payload.len() as u32;
    let crc = crc32fast::hash(&payload);
    writer.write_all(&len.to_le_bytes())?;
    writer.write_all(&payload)?;
    writer.write_all(&crc.to_le_bytes())?;
    Ok(())
}

/// Append-only event journal.
///
/// Format per entry: `[u32: len][bincode: Event][u32: crc32]`. A truncated
/// or corrupt tail (crash mid-write) is discarded on replay.
pub struct Journal {
    writer: BufWriter<File>,
    path: PathBuf,
    appends_since_compact: u64,
}

impl Journal {
    pub fn open(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            writer: BufWriter::new(file),
            path: path.to_path_buf(),
            appends_since_compact: 0,
        })
    }

    /// Append one event and fsync before returning.
    pub fn append(&mut self, event: &Event) -> io::Result<()> {
        encode_event(&mut self.writer, event)?;
        self.writer.flush()?;
        self.writer.get_ref().sync_all()?;
        self.appends_since_compact += 1;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn appends_since_compact(&self) -> u64 {
        self.appends_since_compact
    }

    /// Replace the journal with `events` via temp file + rename.
    pub fn compact(&mut self, events: &[Event]) -> io::Result<()> {
        let tmp_path = self.path.with_extension("journal.tmp");
        {
            let mut writer = BufWriter::new(File::create(&tmp_path)?);
            for event in events {
                encode_event(&mut writer, event)?;
            }
            writer.flush()?;
            writer.get_ref().sync_all()?;
        }
        fs::rename(&tmp_path, &self.path)?;
        let file = OpenOptions::new().create(true).append(true).open(&self.path)?;
        self.writer = BufWriter::new(file);
        self.appends_since_compact = 0;
        Ok(())
    }

    /// Read every intact event from disk. A missing file is an empty journal.
    pub fn replay(path: &Path) -> io::Result<Vec<Event>> {
        let file = match File::open(path) {
            Ok(f) => f,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e),
        };
        let mut reader = BufReader::new(file);
        let mut events = Vec::new();

        loop {
            let mut len_buf = [0u8; 4];
            match reader.read_exact(&mut len_buf) {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => break,
                Err(e) => return Err(e),
            }
            let len = u32::from_le_bytes(len_buf) as usize;
            if len > MAX_JOURNAL_ENTRY_BYTES {
                warn!("journal {}: entry length {len} out of range, dropping tail", path.display());
                break;
            }

            let mut payload = vec![0u8; len];
            match reader.read_exact(&mut payload) {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => break, // truncated
                Err(e) => return Err(e),
            }

            let mut crc_buf = [0u8; 4];
            match reader.read_exact(&mut crc_buf) {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => break, // truncated
                Err(e) => return Err(e),
            }
            if u32::from_le_bytes(crc_buf) != crc32fast::hash(&payload) {
                warn!("journal {}: checksum mismatch, dropping tail", path.display());
                break;
            }

            match bincode::deserialize::<Event>(&payload) {
                Ok(event) => events.push(event),
                Err(e) => {
                    warn!("journal {}: undecodable entry ({e}), dropping tail", path.display());
                    break;
                }
            }
        }

        Ok(events)
    }
}

/// [`Repository`] that journals every write before applying it in memory.
pub struct JournaledStore {
    state: InMemoryStore,
    journal: Mutex<Journal>,
}

impl JournaledStore {
    pub async fn open(path: &Path) -> Result<Self, StoreError> {
        let events = Journal::replay(path)?;
        let state = InMemoryStore::new();
        let mut dropped = 0usize;
        for event in &events {
            if state.apply_event(event).await.is_err() {
                dropped += 1;
            }
        }
        if dropped > 0 {
            warn!("journal {}: {dropped} events referenced missing categories", path.display());
        }
        info!(
            "journal {}: replayed {} events, {} categories, {} tasks",
            path.display(),
            events.len(),
            state.category_count(),
            state.task_count()
        );
        Ok(Self {
            state,
            journal: Mutex::new(Journal::open(path)?),
        })
    }

    pub async fn appends_since_compact(&self) -> u64 {
        self.journal.lock().await.appends_since_compact()
    }

    /// Rewrite the journal as one event per live entity.
    pub async fn compact(&self) -> Result<(), StoreError> {
        let mut journal = self.journal.lock().await;
        let events = self.state.snapshot_events().await;
        journal.compact(&events)?;
        metrics::counter!(crate::observability::JOURNAL_COMPACTIONS_TOTAL).increment(1);
        info!("journal {} compacted to {} events", journal.path().display(), events.len());
        Ok(())
    }

    async fn persist(&self, event: Event) -> Result<(), StoreError> {
        // Validate before writing so the journal never holds an event
        // that replay would reject.
        if let Event::UnitSaved { category_id, .. } = &event
            && !self.state.contains_category(category_id)
        {
            return Err(StoreError::MissingCategory(category_id.clone()));
        }
        let mut journal = self.journal.lock().await;
        let started = std::time::Instant::now();
        journal.append(&event)?;
        metrics::histogram!(crate::observability::JOURNAL_APPEND_DURATION_SECONDS)
            .record(started.elapsed().as_secs_f64());
        self.state.apply_event(&event).await
    }
}

#[async_trait]
impl Repository for JournaledStore {
    async fn list_categories(&self) -> Result<Vec<Category>, StoreError> {
        self.state.list_categories().await
    }

    async fn get_category(&self, id: &str) -> Result<Option<Category>, StoreError> {
        self.state.get_category(id).await
    }

    async fn save_category(&self, category: Category) -> Result<(), StoreError> {
        self.persist(Event::CategorySaved { category }).await
    }

    async fn save_unit(&self, category_id: &str, unit: Unit) -> Result<(), StoreError> {
        self.persist(Event::UnitSaved {
            category_id: category_id.to_string(),
            unit,
        })
        .await
    }

    async fn list_tasks(&self) -> Result<Vec<HousekeepingTask>, StoreError> {
        self.state.list_tasks().await
    }

    async fn get_task(&self, id: Ulid) -> Result<Option<HousekeepingTask>, StoreError> {
        self.state.get_task(id).await
    }

    async fn upsert_task(&self, task: HousekeepingTask) -> Result<(), StoreError> {
        self.persist(Event::TaskUpserted { task }).await
    }

    async fn load_settings(&self) -> Result<RoomSettings, StoreError> {
        self.state.load_settings().await
    }

    async fn save_settings(&self, settings: RoomSettings) -> Result<(), StoreError> {
        self.persist(Event::SettingsSaved { settings }).await
    }
}
