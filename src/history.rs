use crate::pixelmap::PixelMap;

/// A committed grid state. The id identifies the snapshot for the saved
/// marker; two snapshots with identical pixels are still distinct.
#[derive(Debug, Clone)]
pub struct Snapshot {
    id: u64,
    pixelmap: PixelMap,
}

impl Snapshot {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn pixelmap(&self) -> &PixelMap {
        &self.pixelmap
    }
}

/// Linear undo history of committed snapshots.
#[derive(Debug, Clone)]
pub struct History {
    snapshots: Vec<Snapshot>,
    index: usize,
    next_id: u64,
    saved: Option<u64>,
}

impl History {
    /// Starts a history whose only snapshot counts as saved.
    pub fn new(initial: PixelMap) -> Self {
        let mut history = Self {
            snapshots: Vec::new(),
            index: 0,
            next_id: 0,
            saved: None,
        };
        history.reset(initial);
        history
    }

    fn snapshot(&mut self, pixelmap: PixelMap) -> Snapshot {
        let id = self.next_id;
        self.next_id += 1;
        Snapshot { id, pixelmap }
    }

    pub fn reset(&mut self, initial: PixelMap) {
        let snapshot = self.snapshot(initial);
        self.saved = Some(snapshot.id);
        self.snapshots = vec![snapshot];
        self.index = 0;
    }

    pub fn current(&self) -> &PixelMap {
        &self.snapshots[self.index].pixelmap
    }

    pub fn current_id(&self) -> u64 {
        self.snapshots[self.index].id
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    /// Appends a snapshot after the current one, dropping the redo tail.
    pub fn push(&mut self, pixelmap: PixelMap) {
        self.snapshots.truncate(self.index + 1);
        let snapshot = self.snapshot(pixelmap);
        self.snapshots.push(snapshot);
        self.index = self.snapshots.len() - 1;
    }

    pub fn can_undo(&self) -> bool {
        self.index > 0
    }

    pub fn can_redo(&self) -> bool {
        self.index + 1 < self.snapshots.len()
    }

    /// Returns whether the current snapshot moved.
    pub fn undo(&mut self) -> bool {
        if !self.can_undo() {
            return false;
        }
        self.index -= 1;
        true
    }

    pub fn redo(&mut self) -> bool {
        if !self.can_redo() {
            return false;
        }
        self.index += 1;
        true
    }

    pub fn mark_saved(&mut self) {
        self.saved = Some(self.current_id());
    }

    pub fn is_modified(&self) -> bool {
        self.saved != Some(self.current_id())
    }

    /// Trims every snapshot to new dimensions. No snapshot matches the file
    /// on disk afterwards, so the saved marker is dropped.
    pub fn resize(&mut self, width: u32, height: u32) {
        for snapshot in self.snapshots.iter_mut() {
            snapshot.pixelmap.resize(width, height);
        }
        self.saved = None;
    }

    pub fn snapshots(&self) -> impl Iterator<Item = &Snapshot> {
        self.snapshots.iter()
    }
}
