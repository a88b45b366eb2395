use hashbrown::HashMap;
use voxmesh_world::{BlockPos, ColumnCoord, SectionCoord};

/// Worker index owning `coord`. Pure in coordinates and worker count.
#[inline]
pub fn route(coord: SectionCoord, workers: usize) -> usize {
    let n = workers.max(1) as i64;
    (i64::from(coord.sx) + i64::from(coord.sy) + i64::from(coord.sz)).rem_euclid(n) as usize
}

/// Sections whose geometry can change when the block at `pos` changes: its own
/// section plus each face neighbour whose shared boundary the block touches.
pub fn affected_sections(pos: BlockPos) -> Vec<SectionCoord> {
    let own = pos.section();
    let (lx, ly, lz) = pos.local();
    let mut out = vec![own];
    for (local, axis) in [(lx, 0), (ly, 1), (lz, 2)] {
        let step = match local {
            0 => -1,
            15 => 1,
            _ => continue,
        };
        let mut d = [0i32; 3];
        d[axis] = step;
        out.push(own.offset(d[0], d[1], d[2]));
    }
    out
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SectionStatus {
    Clean,
    Pending,
    /// Dispatched; `awaiting` completions still expected. `requeue` records a
    /// re-mark that arrived while in flight.
    InFlight { awaiting: u32, requeue: bool },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MarkOutcome {
    Marked,
    Deduplicated,
    Deferred,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Dispatch {
    pub coord: SectionCoord,
    pub worker: usize,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DirtyStats {
    pub marked: u64,
    pub deduplicated: u64,
    pub deferred: u64,
    pub dispatched: u64,
    pub completed: u64,
    pub unmarked: u64,
    pub rejected: u64,
    pub orphaned: u64,
}

/// Per-section `Clean -> Pending -> InFlight -> Clean` state machine.
///
/// Clean sections are not stored, so the tracked set is exactly the
/// outstanding set (pending or in flight).
pub struct DirtyTracker {
    status: HashMap<SectionCoord, SectionStatus>,
    frame: Vec<SectionCoord>,
    /// Completions still owed for sections dropped by `forget_column`.
    orphans: HashMap<SectionCoord, u32>,
    worker_count: usize,
    stats: DirtyStats,
}

impl DirtyTracker {
    pub fn new(worker_count: usize) -> Self {
        Self {
            status: HashMap::new(),
            frame: Vec::new(),
            orphans: HashMap::new(),
            worker_count: worker_count.max(1),
            stats: DirtyStats::default(),
        }
    }

    #[inline]
    pub fn worker_count(&self) -> usize {
        self.worker_count
    }

    pub fn status(&self, coord: SectionCoord) -> SectionStatus {
        self.status
            .get(&coord)
            .copied()
            .unwrap_or(SectionStatus::Clean)
    }

    pub fn mark(&mut self, coord: SectionCoord) -> MarkOutcome {
        match self.status.get_mut(&coord) {
            None | Some(SectionStatus::Clean) => {
                self.status.insert(coord, SectionStatus::Pending);
                self.frame.push(coord);
                self.stats.marked += 1;
                MarkOutcome::Marked
            }
            Some(SectionStatus::Pending) | Some(SectionStatus::InFlight { requeue: true, .. }) => {
                self.stats.deduplicated += 1;
                MarkOutcome::Deduplicated
            }
            Some(SectionStatus::InFlight { requeue, .. }) => {
                *requeue = true;
                self.stats.deferred += 1;
                MarkOutcome::Deferred
            }
        }
    }

    /// Moves every pending section of this frame in flight, once each.
    pub fn flush_frame(&mut self) -> Vec<Dispatch> {
        let n = self.worker_count;
        let mut out = Vec::with_capacity(self.frame.len());
        for coord in self.frame.drain(..) {
            if let Some(s @ SectionStatus::Pending) = self.status.get_mut(&coord) {
                *s = SectionStatus::InFlight {
                    awaiting: 1,
                    requeue: false,
                };
                out.push(Dispatch {
                    coord,
                    worker: route(coord, n),
                });
            }
        }
        self.stats.dispatched += out.len() as u64;
        out
    }

    /// Clears the dirty flag. The owning worker acknowledges with one more
    /// completion, so the section stays outstanding until that lands.
    ///
    /// A re-mark deferred while in flight is cleared too: once unmarked, the
    /// section is not rebuilt until it is marked again.
    pub fn unmark(&mut self, coord: SectionCoord) -> Dispatch {
        let next = match self.status.get(&coord) {
            Some(SectionStatus::InFlight { awaiting, .. }) => SectionStatus::InFlight {
                awaiting: awaiting + 1,
                requeue: false,
            },
            _ => SectionStatus::InFlight {
                awaiting: 1,
                requeue: false,
            },
        };
        self.status.insert(coord, next);
        self.stats.unmarked += 1;
        Dispatch {
            coord,
            worker: route(coord, self.worker_count),
        }
    }

    /// Applies one `SectionComplete`. Returns `false` if nothing was awaiting it.
    pub fn complete(&mut self, coord: SectionCoord) -> bool {
        if let Some(owed) = self.orphans.get_mut(&coord) {
            *owed -= 1;
            if *owed == 0 {
                self.orphans.remove(&coord);
            }
            self.stats.orphaned += 1;
            return false;
        }
        let Some(s) = self.status.get_mut(&coord) else {
            log::debug!(target: "dirty", "completion for clean section {:?} ignored", coord);
            self.stats.rejected += 1;
            return false;
        };
        match *s {
            SectionStatus::InFlight { awaiting, requeue } if awaiting > 1 => {
                *s = SectionStatus::InFlight {
                    awaiting: awaiting - 1,
                    requeue,
                };
            }
            SectionStatus::InFlight { requeue: true, .. } => {
                *s = SectionStatus::Pending;
                self.frame.push(coord);
                self.stats.completed += 1;
            }
            SectionStatus::InFlight { requeue: false, .. } => {
                self.status.remove(&coord);
                self.stats.completed += 1;
            }
            SectionStatus::Pending | SectionStatus::Clean => {
                log::warn!(target: "dirty", "completion for undispatched section {:?} rejected", coord);
                self.stats.rejected += 1;
                return false;
            }
        }
        true
    }

    /// Drops every tracked section of `col`; returns how many were outstanding.
    pub fn forget_column(&mut self, col: ColumnCoord) -> usize {
        let keys: Vec<SectionCoord> = self
            .status
            .keys()
            .filter(|c| c.column() == col)
            .copied()
            .collect();
        for k in &keys {
            if let Some(SectionStatus::InFlight { awaiting, .. }) = self.status.remove(k) {
                *self.orphans.entry(*k).or_insert(0) += awaiting;
            }
        }
        self.frame.retain(|c| c.column() != col);
        keys.len()
    }

    pub fn clear(&mut self) {
        self.status.clear();
        self.frame.clear();
        self.orphans.clear();
    }

    #[inline]
    pub fn outstanding_len(&self) -> usize {
        self.status.len()
    }

    #[inline]
    pub fn is_idle(&self) -> bool {
        self.status.is_empty()
    }

    pub fn outstanding(&self) -> impl Iterator<Item = SectionCoord> + '_ {
        self.status.keys().copied()
    }

    pub fn in_flight_len(&self) -> usize {
        self.status
            .values()
            .filter(|s| matches!(s, SectionStatus::InFlight { .. }))
            .count()
    }

    pub fn stats(&self) -> DirtyStats {
        self.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sc(x: i32, y: i32, z: i32) -> SectionCoord {
        SectionCoord::new(x, y, z)
    }

    #[test]
    fn double_mark_dispatches_once() {
        let mut t = DirtyTracker::new(4);
        assert_eq!(t.mark(sc(1, 0, 0)), MarkOutcome::Marked);
        assert_eq!(t.mark(sc(1, 0, 0)), MarkOutcome::Deduplicated);
        let d = t.flush_frame();
        assert_eq!(d, vec![Dispatch { coord: sc(1, 0, 0), worker: 1 }]);
        assert!(t.flush_frame().is_empty());
        assert_eq!(t.outstanding_len(), 1);
    }

    #[test]
    fn remark_in_flight_is_deferred_until_completion() {
        let mut t = DirtyTracker::new(2);
        let c = sc(0, 0, 0);
        t.mark(c);
        t.flush_frame();
        assert_eq!(t.mark(c), MarkOutcome::Deferred);
        assert_eq!(t.mark(c), MarkOutcome::Deduplicated);
        assert!(t.flush_frame().is_empty());
        assert!(t.complete(c));
        assert_eq!(t.status(c), SectionStatus::Pending);
        assert_eq!(t.flush_frame().len(), 1);
        assert!(t.complete(c));
        assert!(t.is_idle());
    }

    #[test]
    fn unmark_waits_for_every_completion() {
        let mut t = DirtyTracker::new(1);
        let c = sc(2, 3, 4);
        t.mark(c);
        t.flush_frame();
        t.mark(c);
        t.unmark(c);
        assert_eq!(
            t.status(c),
            SectionStatus::InFlight { awaiting: 2, requeue: false }
        );
        assert!(t.complete(c));
        assert!(!t.is_idle());
        assert!(t.complete(c));
        assert!(t.is_idle());
    }

    #[test]
    fn unmark_discards_deferred_remark() {
        let mut t = DirtyTracker::new(1);
        let c = sc(1, 1, 1);
        t.mark(c);
        t.flush_frame();
        assert_eq!(t.mark(c), MarkOutcome::Deferred);
        t.unmark(c);
        assert_eq!(
            t.status(c),
            SectionStatus::InFlight { awaiting: 2, requeue: false }
        );
        assert!(t.complete(c));
        assert!(t.complete(c));
        assert!(t.is_idle());
        assert!(t.flush_frame().is_empty());
        // a later mark is honoured again
        assert_eq!(t.mark(c), MarkOutcome::Marked);
        assert_eq!(t.flush_frame().len(), 1);
    }

    #[test]
    fn unmark_pending_is_never_dispatched() {
        let mut t = DirtyTracker::new(1);
        let c = sc(0, 0, 0);
        t.mark(c);
        t.unmark(c);
        assert!(t.flush_frame().is_empty());
        assert!(t.complete(c));
        assert!(t.is_idle());
    }

    #[test]
    fn stray_completion_is_rejected() {
        let mut t = DirtyTracker::new(1);
        assert!(!t.complete(sc(0, 0, 0)));
        t.mark(sc(0, 0, 0));
        assert!(!t.complete(sc(0, 0, 0)));
        assert_eq!(t.stats().rejected, 2);
    }

    #[test]
    fn forgotten_column_absorbs_late_completions() {
        let mut t = DirtyTracker::new(1);
        let c = sc(5, 0, 5);
        t.mark(c);
        t.mark(sc(5, 1, 5));
        t.flush_frame();
        t.mark(sc(5, 2, 5));
        assert_eq!(t.forget_column(ColumnCoord::new(5, 5)), 3);
        assert!(t.is_idle());
        // column reloaded before the old completion lands
        t.mark(c);
        t.flush_frame();
        assert!(!t.complete(c));
        assert_eq!(t.status(c), SectionStatus::InFlight { awaiting: 1, requeue: false });
        assert!(t.complete(c));
        assert!(t.is_idle());
    }

    #[test]
    fn interior_block_touches_one_section() {
        assert_eq!(affected_sections(BlockPos::new(5, 5, 5)), vec![sc(0, 0, 0)]);
    }

    #[test]
    fn boundary_block_touches_neighbours() {
        let got = affected_sections(BlockPos::new(15, 7, 0));
        assert_eq!(got, vec![sc(0, 0, 0), sc(1, 0, 0), sc(0, 0, -1)]);
        let corner = affected_sections(BlockPos::new(-16, -1, 31));
        assert_eq!(corner, vec![sc(-1, -1, 1), sc(-2, -1, 1), sc(-1, 0, 1), sc(-1, -1, 2)]);
    }
}
