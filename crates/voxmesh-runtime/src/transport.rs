use std::io;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{Receiver, Sender, select, tick, unbounded};
use voxmesh_blocks::BlockStateTable;
use voxmesh_mesh_cpu::Mesher;

use crate::protocol::{WorkerEvent, WorkerMsg};
use crate::worker::{WorkerConfig, WorkerUnit};

/// Typed link between the coordinator and its worker units.
pub trait Transport {
    fn worker_count(&self) -> usize;
    /// Messages to a terminated or unknown worker are dropped with a log line.
    fn send(&self, worker: usize, msg: WorkerMsg);
    fn broadcast(&self, msg: WorkerMsg) {
        for w in 0..self.worker_count() {
            self.send(w, msg.clone());
        }
    }
    fn try_recv(&self) -> Option<WorkerEvent>;
    /// Steps in-process units; threaded transports run on their own.
    fn pump(&mut self) {}
    /// Stops every unit and waits for it to exit. Idempotent.
    fn terminate(&mut self);
    fn active_workers(&self) -> usize;
}

/// One OS thread per worker unit.
pub struct ThreadTransport {
    senders: Vec<Sender<WorkerMsg>>,
    handles: Vec<JoinHandle<()>>,
    events: Receiver<WorkerEvent>,
    worker_count: usize,
}

impl ThreadTransport {
    pub fn spawn<F>(
        workers: usize,
        config: WorkerConfig,
        table: Arc<BlockStateTable>,
        interval: Duration,
        make_mesher: F,
    ) -> io::Result<Self>
    where
        F: Fn(usize) -> Box<dyn Mesher>,
    {
        let workers = workers.max(1);
        let interval = interval.max(Duration::from_millis(1));
        let (ev_tx, ev_rx) = unbounded::<WorkerEvent>();
        let mut senders = Vec::with_capacity(workers);
        let mut handles = Vec::with_capacity(workers);
        for i in 0..workers {
            let (tx, rx) = unbounded::<WorkerMsg>();
            let unit = WorkerUnit::new(i, config.clone(), table.clone(), make_mesher(i), ev_tx.clone());
            let handle = thread::Builder::new()
                .name(format!("voxmesh-worker-{i}"))
                .spawn(move || run_unit(unit, rx, interval))?;
            senders.push(tx);
            handles.push(handle);
        }
        log::info!(target: "worker", "spawned {} worker threads (tick {:?})", workers, interval);
        Ok(Self {
            senders,
            handles,
            events: ev_rx,
            worker_count: workers,
        })
    }
}

fn run_unit(mut unit: WorkerUnit, rx: Receiver<WorkerMsg>, interval: Duration) {
    let ticker = tick(interval);
    loop {
        select! {
            recv(rx) -> msg => match msg {
                Ok(msg) => {
                    if !unit.handle(msg) {
                        break;
                    }
                }
                Err(_) => break,
            },
            recv(ticker) -> _ => {
                unit.tick();
            }
        }
    }
    log::debug!(target: "worker", "worker {} exiting", unit.index());
}

impl Transport for ThreadTransport {
    fn worker_count(&self) -> usize {
        self.worker_count
    }

    fn send(&self, worker: usize, msg: WorkerMsg) {
        match self.senders.get(worker) {
            Some(tx) => {
                if tx.send(msg).is_err() {
                    log::warn!(target: "worker", "worker {} is gone; message dropped", worker);
                }
            }
            None => log::debug!(target: "worker", "no live worker {}; message dropped", worker),
        }
    }

    fn try_recv(&self) -> Option<WorkerEvent> {
        self.events.try_recv().ok()
    }

    fn terminate(&mut self) {
        for tx in self.senders.drain(..) {
            let _ = tx.send(WorkerMsg::Terminate);
        }
        for handle in self.handles.drain(..) {
            if handle.join().is_err() {
                log::error!(target: "worker", "worker thread panicked during shutdown");
            }
        }
    }

    fn active_workers(&self) -> usize {
        self.handles.iter().filter(|h| !h.is_finished()).count()
    }
}

impl Drop for ThreadTransport {
    fn drop(&mut self) {
        self.terminate();
    }
}

struct LocalUnit {
    unit: WorkerUnit,
    inbox: Receiver<WorkerMsg>,
    alive: bool,
}

/// In-process units stepped explicitly; deterministic scheduling for tests.
pub struct LocalTransport {
    units: Vec<LocalUnit>,
    senders: Vec<Sender<WorkerMsg>>,
    events: Receiver<WorkerEvent>,
}

impl LocalTransport {
    pub fn new<F>(workers: usize, config: WorkerConfig, table: Arc<BlockStateTable>, make_mesher: F) -> Self
    where
        F: Fn(usize) -> Box<dyn Mesher>,
    {
        let workers = workers.max(1);
        let (ev_tx, ev_rx) = unbounded();
        let mut units = Vec::with_capacity(workers);
        let mut senders = Vec::with_capacity(workers);
        for i in 0..workers {
            let (tx, rx) = unbounded();
            units.push(LocalUnit {
                unit: WorkerUnit::new(i, config.clone(), table.clone(), make_mesher(i), ev_tx.clone()),
                inbox: rx,
                alive: true,
            });
            senders.push(tx);
        }
        Self {
            units,
            senders,
            events: ev_rx,
        }
    }

    /// Delivers queued messages to one unit and runs one tick on it.
    pub fn pump_worker(&mut self, worker: usize) {
        let Some(u) = self.units.get_mut(worker) else {
            return;
        };
        if !u.alive {
            return;
        }
        while let Ok(msg) = u.inbox.try_recv() {
            if !u.unit.handle(msg) {
                u.alive = false;
                return;
            }
        }
        u.unit.tick();
    }

    /// Delivers messages without ticking.
    pub fn deliver(&mut self, worker: usize) {
        if let Some(u) = self.units.get_mut(worker).filter(|u| u.alive) {
            while let Ok(msg) = u.inbox.try_recv() {
                if !u.unit.handle(msg) {
                    u.alive = false;
                    break;
                }
            }
        }
    }

    pub fn unit(&self, worker: usize) -> Option<&WorkerUnit> {
        self.units.get(worker).map(|u| &u.unit)
    }

    /// Collects every event currently queued, in emission order.
    pub fn drain_events(&self) -> Vec<WorkerEvent> {
        self.events.try_iter().collect()
    }
}

impl Transport for LocalTransport {
    fn worker_count(&self) -> usize {
        self.units.len()
    }

    fn send(&self, worker: usize, msg: WorkerMsg) {
        let live = self.units.get(worker).is_some_and(|u| u.alive);
        match self.senders.get(worker) {
            Some(tx) if live => {
                let _ = tx.send(msg);
            }
            _ => log::debug!(target: "worker", "no live worker {}; message dropped", worker),
        }
    }

    fn try_recv(&self) -> Option<WorkerEvent> {
        self.events.try_recv().ok()
    }

    fn pump(&mut self) {
        for w in 0..self.units.len() {
            self.pump_worker(w);
        }
    }

    fn terminate(&mut self) {
        for (u, tx) in self.units.iter_mut().zip(&self.senders) {
            if u.alive {
                let _ = tx.send(WorkerMsg::Terminate);
                while let Ok(msg) = u.inbox.try_recv() {
                    if !u.unit.handle(msg) {
                        break;
                    }
                }
                u.alive = false;
            }
        }
    }

    fn active_workers(&self) -> usize {
        self.units.iter().filter(|u| u.alive).count()
    }
}
