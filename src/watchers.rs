use std::path::Path;

use crossbeam_channel::{Receiver, unbounded};
use notify::{EventKind, RecommendedWatcher, RecursiveMode, Watcher};

/// Watches one file and coalesces change notifications into a flag.
pub struct FileWatch {
    _watcher: RecommendedWatcher,
    rx: Receiver<()>,
}

impl FileWatch {
    pub fn new(path: &Path) -> notify::Result<Self> {
        let (tx, rx) = unbounded();
        let mut watcher = notify::recommended_watcher(move |res: notify::Result<notify::Event>| {
            if let Ok(event) = res {
                match event.kind {
                    EventKind::Modify(_) | EventKind::Create(_) | EventKind::Remove(_) | EventKind::Any => {
                        let _ = tx.send(());
                    }
                    _ => {}
                }
            }
        })?;
        watcher.watch(path, RecursiveMode::NonRecursive)?;
        log::info!("watching {}", path.display());
        Ok(Self { _watcher: watcher, rx })
    }

    /// True if anything changed since the last call.
    pub fn changed(&self) -> bool {
        self.rx.try_iter().count() > 0
    }
}
