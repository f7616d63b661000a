//! Directory polling watcher
//!
//! Scans a directory on a fixed interval, diffs the file contents against
//! the previous snapshot, and submits changed or added files as one data
//! point per cycle. The loop is an explicit task: `run_once` drives a
//! single cycle so tests can run a bounded number deterministically, and
//! `run` paces cycles with the tokio clock until the shutdown channel
//! fires.
//!
//! A failed submission is logged and swallowed; the snapshot still
//! advances, so the failed payload is dropped and re-sent only if the
//! watched files change again.

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use tokio::sync::watch;
use tracing::{debug, warn};

use byteport_core::error::ByteportResult;
use byteport_core::transport::Transport;
use byteport_core::value::DataPoint;

/// Directory watcher submitting content changes through a transport
pub struct DirectoryWatch {
    directory: PathBuf,
    device_uid: String,
    interval: Duration,
    snapshot: HashMap<String, String>,
}

impl DirectoryWatch {
    /// Create a watcher over a directory for one device
    pub fn new(
        directory: impl Into<PathBuf>,
        device_uid: impl Into<String>,
        interval: Duration,
    ) -> Self {
        Self {
            directory: directory.into(),
            device_uid: device_uid.into(),
            interval,
            snapshot: HashMap::new(),
        }
    }

    /// Read the current directory contents
    fn scan(&self) -> ByteportResult<HashMap<String, String>> {
        let mut contents = HashMap::new();
        for entry in std::fs::read_dir(&self.directory)? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().to_string();
            contents.insert(name, std::fs::read_to_string(entry.path())?);
        }
        Ok(contents)
    }

    /// Run one scan/diff/submit cycle
    ///
    /// Returns the number of fields submitted. The snapshot advances before
    /// the submission outcome is known.
    pub async fn run_once<T: Transport>(&mut self, transport: &mut T) -> ByteportResult<usize> {
        let current = self.scan()?;

        let mut point = DataPoint::new();
        for (name, content) in &current {
            if self.snapshot.get(name) != Some(content) {
                point.insert(name.clone(), content.clone());
            }
        }
        self.snapshot = current;

        let count = point.len();
        if count == 0 {
            return Ok(0);
        }

        transport.submit(&self.device_uid, &point).await?;
        Ok(count)
    }

    /// Poll until the shutdown channel fires or closes
    pub async fn run<T: Transport>(mut self, transport: &mut T, mut shutdown: watch::Receiver<bool>) {
        loop {
            tokio::select! {
                _ = tokio::time::sleep(self.interval) => {
                    match self.run_once(transport).await {
                        Ok(0) => {}
                        Ok(count) => debug!("submitted {count} changed files"),
                        Err(e) => warn!("failed to submit directory changes: {e}"),
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        debug!("directory watch stopping");
                        return;
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use byteport_core::error::ByteportError;
    use std::collections::BTreeMap;
    use std::sync::{Arc, Mutex};

    /// Transport double recording every submission
    #[derive(Clone, Default)]
    struct RecordingTransport {
        submissions: Arc<Mutex<Vec<(String, BTreeMap<String, String>)>>>,
        fail: Arc<Mutex<bool>>,
    }

    impl RecordingTransport {
        fn submissions(&self) -> Vec<(String, BTreeMap<String, String>)> {
            self.submissions.lock().unwrap().clone()
        }

        fn set_failing(&self, failing: bool) {
            *self.fail.lock().unwrap() = failing;
        }
    }

    #[async_trait]
    impl Transport for RecordingTransport {
        fn namespace(&self) -> &str {
            "test"
        }

        async fn submit(&mut self, device_uid: &str, point: &DataPoint) -> ByteportResult<()> {
            if *self.fail.lock().unwrap() {
                return Err(ByteportError::ConnectFailed("offline".to_string()));
            }
            self.submissions
                .lock()
                .unwrap()
                .push((device_uid.to_string(), point.encode().unwrap()));
            Ok(())
        }
    }

    fn write(dir: &std::path::Path, name: &str, content: &str) {
        std::fs::write(dir.join(name), content).unwrap();
    }

    #[tokio::test]
    async fn test_first_cycle_submits_all_files() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "voltage", "3.3");
        write(dir.path(), "current", "0.2");

        let mut transport = RecordingTransport::default();
        let mut watcher = DirectoryWatch::new(dir.path(), "dev1", Duration::from_millis(10));

        let sent = watcher.run_once(&mut transport).await.unwrap();
        assert_eq!(sent, 2);

        let submissions = transport.submissions();
        assert_eq!(submissions.len(), 1);
        assert_eq!(submissions[0].0, "dev1");
        assert_eq!(submissions[0].1["voltage"], "3.3");
    }

    #[tokio::test]
    async fn test_unchanged_directory_submits_nothing() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "voltage", "3.3");

        let mut transport = RecordingTransport::default();
        let mut watcher = DirectoryWatch::new(dir.path(), "dev1", Duration::from_millis(10));

        assert_eq!(watcher.run_once(&mut transport).await.unwrap(), 1);
        assert_eq!(watcher.run_once(&mut transport).await.unwrap(), 0);
        assert_eq!(transport.submissions().len(), 1);
    }

    #[tokio::test]
    async fn test_only_changed_and_added_files_are_submitted() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "voltage", "3.3");
        write(dir.path(), "current", "0.2");

        let mut transport = RecordingTransport::default();
        let mut watcher = DirectoryWatch::new(dir.path(), "dev1", Duration::from_millis(10));
        watcher.run_once(&mut transport).await.unwrap();

        write(dir.path(), "voltage", "2.9");
        write(dir.path(), "status", "low-battery");

        let sent = watcher.run_once(&mut transport).await.unwrap();
        assert_eq!(sent, 2);

        let last = &transport.submissions()[1].1;
        assert_eq!(last.len(), 2);
        assert_eq!(last["voltage"], "2.9");
        assert_eq!(last["status"], "low-battery");
    }

    #[tokio::test]
    async fn test_failed_cycle_drops_the_payload() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "voltage", "3.3");

        let mut transport = RecordingTransport::default();
        let mut watcher = DirectoryWatch::new(dir.path(), "dev1", Duration::from_millis(10));

        transport.set_failing(true);
        assert!(watcher.run_once(&mut transport).await.is_err());

        // The snapshot advanced past the failure; nothing is retried until
        // the directory changes again
        transport.set_failing(false);
        assert_eq!(watcher.run_once(&mut transport).await.unwrap(), 0);

        write(dir.path(), "voltage", "2.9");
        assert_eq!(watcher.run_once(&mut transport).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_run_stops_on_shutdown_signal() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "voltage", "3.3");

        let transport = RecordingTransport::default();
        let watcher = DirectoryWatch::new(dir.path(), "dev1", Duration::from_millis(5));
        let (tx, rx) = watch::channel(false);

        let mut task_transport = transport.clone();
        let handle = tokio::spawn(async move { watcher.run(&mut task_transport, rx).await });

        tokio::time::sleep(Duration::from_millis(30)).await;
        tx.send(true).unwrap();
        handle.await.unwrap();

        assert!(!transport.submissions().is_empty());
    }
}
