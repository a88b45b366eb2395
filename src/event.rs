use std::collections::{BTreeMap, VecDeque};
use std::sync::Arc;

use voxmesh_blocks::BlockStateId;
use voxmesh_world::{BlockPos, ColumnCoord};

/// Scripted driver inputs, delivered on the tick they were scheduled for.
#[derive(Clone, Debug)]
pub enum Event {
    LoadColumn { coord: ColumnCoord, payload: Arc<[u8]> },
    UnloadColumn { coord: ColumnCoord },
    MutateBlock { pos: BlockPos, state: BlockStateId },
    ReloadAssets,
}

#[derive(Debug)]
pub struct EventEnvelope {
    pub id: u64,
    pub tick: u64,
    pub kind: Event,
}

pub struct EventQueue {
    // tick -> FIFO of events due on that tick
    by_tick: BTreeMap<u64, VecDeque<EventEnvelope>>,
    pub now: u64,
    next_id: u64,
}

impl Default for EventQueue {
    fn default() -> Self {
        Self { by_tick: BTreeMap::new(), now: 0, next_id: 1 }
    }
}

impl EventQueue {
    pub fn new() -> Self { Self::default() }

    #[inline]
    fn alloc_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id = self.next_id.wrapping_add(1).max(1);
        id
    }

    pub fn emit_now(&mut self, kind: Event) -> u64 {
        self.emit_at(self.now, kind)
    }

    /// Ticks already in the past are clamped to now.
    pub fn emit_at(&mut self, tick: u64, kind: Event) -> u64 {
        let tick = tick.max(self.now);
        let id = self.alloc_id();
        self.by_tick.entry(tick).or_default().push_back(EventEnvelope { id, tick, kind });
        id
    }

    pub fn emit_after(&mut self, delta: u64, kind: Event) -> u64 {
        self.emit_at(self.now + delta, kind)
    }

    pub fn pop_ready(&mut self) -> Option<EventEnvelope> {
        let q = self.by_tick.get_mut(&self.now)?;
        let env = q.pop_front();
        if q.is_empty() {
            self.by_tick.remove(&self.now);
        }
        env
    }

    pub fn advance_tick(&mut self) {
        self.now = self.now.wrapping_add(1);
    }

    /// Events scheduled now or later.
    pub fn pending(&self) -> usize {
        self.by_tick.values().map(VecDeque::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.by_tick.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unload(cx: i32) -> Event {
        Event::UnloadColumn { coord: ColumnCoord::new(cx, 0) }
    }

    fn cx(env: &EventEnvelope) -> i32 {
        match env.kind {
            Event::UnloadColumn { coord } => coord.cx,
            _ => panic!("unexpected event"),
        }
    }

    #[test]
    fn same_tick_is_fifo() {
        let mut q = EventQueue::new();
        q.emit_now(unload(1));
        q.emit_now(unload(2));
        assert_eq!(cx(&q.pop_ready().unwrap()), 1);
        assert_eq!(cx(&q.pop_ready().unwrap()), 2);
        assert!(q.pop_ready().is_none());
        assert!(q.is_empty());
    }

    #[test]
    fn future_events_wait_for_their_tick() {
        let mut q = EventQueue::new();
        q.emit_after(2, unload(5));
        assert!(q.pop_ready().is_none());
        q.advance_tick();
        assert!(q.pop_ready().is_none());
        q.advance_tick();
        let env = q.pop_ready().unwrap();
        assert_eq!(env.tick, 2);
        assert_eq!(cx(&env), 5);
    }

    #[test]
    fn past_ticks_clamp_to_now() {
        let mut q = EventQueue::new();
        q.advance_tick();
        q.advance_tick();
        q.emit_at(0, unload(3));
        assert_eq!(q.pending(), 1);
        assert_eq!(q.pop_ready().unwrap().tick, 2);
    }
}
