use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
    sync::Arc,
};

use fs4::tokio::AsyncFileExt;
use tokio::{fs::File, io::AsyncWriteExt, sync::Mutex};
use tracing::{debug, info};

use crate::{
    error::{Result, StoreError},
    utils::clock::Clock,
};

use super::entities::Event;

/// Ordered record of activity boundaries mirrored into a JSON file.
///
/// The sequence is only reachable through the lock, and every mutation rewrites the whole file
/// before the lock is released. A reader of the file therefore always sees a sequence that existed
/// in memory at some point.
pub struct EventLog {
    path: PathBuf,
    events: Mutex<Vec<Event>>,
    clock: Box<dyn Clock>,
}

impl EventLog {
    /// Reads the log stored at `path`. A missing file is an empty log.
    pub async fn load(path: PathBuf, clock: Box<dyn Clock>) -> Result<Self> {
        let events = match tokio::fs::read(&path).await {
            Ok(content) => parse_events(&path, &content)?,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                info!("No event log at {path:?}, starting empty");
                vec![]
            }
            Err(source) => return Err(StoreError::Persistence { path, source }),
        };
        debug!("Loaded {} events from {path:?}", events.len());

        Ok(Self {
            path,
            events: Mutex::new(events),
            clock,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Records the start of `label` at the current moment.
    pub async fn append(&self, label: impl Into<Arc<str>>) -> Result<()> {
        let mut events = self.events.lock().await;
        let event = Event::new(label, self.clock.time());
        debug!("Appending {event:?}");
        events.push(event);
        write_events(&self.path, &events).await
    }

    /// Forgets every event.
    pub async fn reset(&self) -> Result<()> {
        let mut events = self.events.lock().await;
        info!("Resetting event log, dropping {} events", events.len());
        events.clear();
        write_events(&self.path, &events).await
    }

    pub async fn snapshot(&self) -> Vec<Event> {
        self.events.lock().await.clone()
    }
}

fn parse_events(path: &Path, content: &[u8]) -> Result<Vec<Event>> {
    // `null` shows up when an empty list was serialized as a nil slice.
    serde_json::from_slice::<Option<Vec<Event>>>(content)
        .map(Option::unwrap_or_default)
        .map_err(|source| StoreError::CorruptState {
            path: path.to_owned(),
            source,
        })
}

/// Replaces the file content with `events`. Must be called while holding the log lock.
async fn write_events(path: &Path, events: &[Event]) -> Result<()> {
    let persistence = |source: std::io::Error| StoreError::Persistence {
        path: path.to_owned(),
        source,
    };

    let buffer = serde_json::to_vec_pretty(events).map_err(|e| persistence(e.into()))?;

    let mut file = File::options()
        .write(true)
        .create(true)
        .truncate(false)
        .open(path)
        .await
        .map_err(persistence)?;

    // Truncate only after taking the file lock so shared-lock readers never see it empty.
    file.lock_exclusive().map_err(persistence)?;
    let result = async {
        file.set_len(0).await?;
        file.write_all(&buffer).await?;
        file.flush().await?;
        file.sync_data().await
    }
    .await;
    file.unlock_async().await.map_err(persistence)?;
    result.map_err(persistence)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use anyhow::Result;
    use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
    use tempfile::tempdir;

    use crate::{
        error::StoreError,
        storage::entities::Event,
        utils::clock::{DefaultClock, FixedClock, MockClock},
    };

    use super::EventLog;

    const TEST_START_DATE: NaiveDateTime =
        NaiveDateTime::new(NaiveDate::from_ymd_opt(2018, 7, 4).unwrap(), NaiveTime::MIN);

    fn start() -> DateTime<Utc> {
        Utc.from_utc_datetime(&TEST_START_DATE)
    }

    /// Clock that advances by a second on every call.
    fn ticking_clock() -> MockClock {
        let mut clock = MockClock::new();
        let mut next = start();
        clock.expect_time().returning(move || {
            let now = next;
            next += Duration::seconds(1);
            now
        });
        clock
    }

    async fn read_file(log: &EventLog) -> Result<Vec<Event>> {
        let content = tokio::fs::read(log.path()).await?;
        Ok(serde_json::from_slice(&content)?)
    }

    #[tokio::test]
    async fn test_load_missing_file_is_empty() -> Result<()> {
        let dir = tempdir()?;
        let log = EventLog::load(dir.path().join("stamps.json"), Box::new(DefaultClock)).await?;

        assert!(log.snapshot().await.is_empty());
        // Loading alone doesn't create the file.
        assert!(!log.path().exists());
        Ok(())
    }

    #[tokio::test]
    async fn test_load_corrupted_file() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("stamps.json");
        tokio::fs::write(&path, "[{\"Id\": \"work\", ").await?;

        let result = EventLog::load(path, Box::new(DefaultClock)).await;

        assert!(matches!(result, Err(StoreError::CorruptState { .. })));
        Ok(())
    }

    #[tokio::test]
    async fn test_load_null_file_is_empty() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("stamps.json");
        tokio::fs::write(&path, "null").await?;

        let log = EventLog::load(path, Box::new(DefaultClock)).await?;

        assert!(log.snapshot().await.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_append_persists_every_event() -> Result<()> {
        let dir = tempdir()?;
        let log = EventLog::load(dir.path().join("stamps.json"), Box::new(ticking_clock())).await?;

        log.append("work").await?;
        log.append("lunch").await?;
        log.append("work").await?;

        let expected = vec![
            Event::new("work", start()),
            Event::new("lunch", start() + Duration::seconds(1)),
            Event::new("work", start() + Duration::seconds(2)),
        ];
        assert_eq!(log.snapshot().await, expected);
        assert_eq!(read_file(&log).await?, expected);
        Ok(())
    }

    #[tokio::test]
    async fn test_file_is_indented_array() -> Result<()> {
        let dir = tempdir()?;
        let log =
            EventLog::load(dir.path().join("stamps.json"), Box::new(FixedClock(start()))).await?;

        log.append("work").await?;

        let content = tokio::fs::read_to_string(log.path()).await?;
        assert_eq!(
            content,
            "[\n  {\n    \"Id\": \"work\",\n    \"Stamp\": \"2018-07-04T00:00:00Z\"\n  }\n]"
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_reset_clears_memory_and_file() -> Result<()> {
        let dir = tempdir()?;
        let log = EventLog::load(dir.path().join("stamps.json"), Box::new(ticking_clock())).await?;

        log.append("work").await?;
        log.append("lunch").await?;
        log.reset().await?;

        assert!(log.snapshot().await.is_empty());
        assert_eq!(tokio::fs::read_to_string(log.path()).await?, "[]");
        Ok(())
    }

    #[tokio::test]
    async fn test_reload_yields_same_sequence() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("stamps.json");
        let log = EventLog::load(path.clone(), Box::new(DefaultClock)).await?;

        for label in ["work", "break", "work", "reading"] {
            log.append(label).await?;
        }
        let before = log.snapshot().await;
        drop(log);

        let reloaded = EventLog::load(path, Box::new(DefaultClock)).await?;

        assert_eq!(reloaded.snapshot().await, before);
        Ok(())
    }

    #[tokio::test]
    async fn test_append_after_reload_keeps_history() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("stamps.json");
        let log = EventLog::load(path.clone(), Box::new(ticking_clock())).await?;
        log.append("work").await?;
        drop(log);

        let log = EventLog::load(
            path,
            Box::new(FixedClock(start() + Duration::seconds(10))),
        )
        .await?;
        log.append("lunch").await?;

        assert_eq!(
            read_file(&log).await?,
            vec![
                Event::new("work", start()),
                Event::new("lunch", start() + Duration::seconds(10)),
            ]
        );
        Ok(())
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_appends_keep_file_in_sync() -> Result<()> {
        let dir = tempdir()?;
        let log = Arc::new(
            EventLog::load(dir.path().join("stamps.json"), Box::new(DefaultClock)).await?,
        );

        let handles = (0..32)
            .map(|i| {
                let log = log.clone();
                tokio::spawn(async move { log.append(format!("task {}", i % 4)).await })
            })
            .collect::<Vec<_>>();
        for handle in handles {
            handle.await??;
        }

        let in_memory = log.snapshot().await;
        assert_eq!(in_memory.len(), 32);
        assert_eq!(read_file(&log).await?, in_memory);
        Ok(())
    }

    #[tokio::test]
    async fn test_append_fails_when_file_cannot_be_written() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("missing").join("stamps.json");
        let log = EventLog::load(path, Box::new(DefaultClock)).await?;

        let result = log.append("work").await;

        assert!(matches!(result, Err(StoreError::Persistence { .. })));
        Ok(())
    }
}
