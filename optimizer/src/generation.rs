//! Sample buffer for the generation in flight.
//!
//! Task ids are `epoch * λ + slot`. Every slot remembers the epoch it was
//! last written in, so an answer from an earlier generation decodes to a
//! slot whose tag no longer matches and is rejected, and stale fitness
//! values are never read back.

use cholcma_protocol::TaskId;
use nalgebra::{DMatrix, DVector};

use crate::error::ProtocolError;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SlotState {
    Empty,
    Dispatched,
    Evaluated(f64),
}

#[derive(Debug, Clone, Copy)]
struct Slot {
    epoch: u64,
    state: SlotState,
}

#[derive(Debug, Clone)]
pub struct Generation {
    epoch: u64,
    /// One column per slot
    samples: DMatrix<f64>,
    slots: Vec<Slot>,
    sent: usize,
    received: usize,
}

impl Generation {
    pub fn new(dim: usize, population: usize) -> Self {
        Self {
            epoch: 0,
            samples: DMatrix::zeros(dim, population),
            slots: vec![
                Slot {
                    epoch: 0,
                    state: SlotState::Empty,
                };
                population
            ],
            sent: 0,
            received: 0,
        }
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn population(&self) -> usize {
        self.slots.len()
    }

    pub fn sent(&self) -> usize {
        self.sent
    }

    pub fn received(&self) -> usize {
        self.received
    }

    /// Everything dispatched has been answered.
    pub fn is_settled(&self) -> bool {
        self.sent == self.received
    }

    /// Start the next generation. Old slot contents become unreadable.
    pub fn advance(&mut self) {
        self.epoch += 1;
        self.sent = 0;
        self.received = 0;
    }

    /// Store the next sample and return its task id.
    pub fn push(&mut self, x: &DVector<f64>) -> TaskId {
        let slot = self.sent;
        self.samples.set_column(slot, x);
        self.slots[slot] = Slot {
            epoch: self.epoch,
            state: SlotState::Dispatched,
        };
        self.sent += 1;
        self.epoch * self.population() as u64 + slot as u64
    }

    /// Record the answer for `id`.
    pub fn record(&mut self, id: TaskId, f: f64) -> Result<(), ProtocolError> {
        let pop = self.population() as u64;
        let (epoch, slot) = (id / pop, (id % pop) as usize);
        if epoch != self.epoch {
            return Err(ProtocolError::UnknownTask(id));
        }
        let entry = &mut self.slots[slot];
        if entry.epoch != self.epoch {
            return Err(ProtocolError::UnknownTask(id));
        }
        match entry.state {
            SlotState::Dispatched => {
                entry.state = SlotState::Evaluated(f);
                self.received += 1;
                Ok(())
            }
            SlotState::Evaluated(_) => Err(ProtocolError::DuplicateResult(id)),
            SlotState::Empty => Err(ProtocolError::UnknownTask(id)),
        }
    }

    pub fn state(&self, slot: usize) -> SlotState {
        match self.slots.get(slot) {
            Some(s) if s.epoch == self.epoch => s.state,
            _ => SlotState::Empty,
        }
    }

    /// Fitness of `slot` in the current generation, NaN if not evaluated.
    pub fn fitness(&self, slot: usize) -> f64 {
        match self.state(slot) {
            SlotState::Evaluated(f) => f,
            _ => f64::NAN,
        }
    }

    pub fn sample(&self, slot: usize) -> DVector<f64> {
        self.samples.column(slot).into_owned()
    }

    /// `(slot, f)` for every evaluated slot of the current generation.
    pub fn evaluated(&self) -> impl Iterator<Item = (usize, f64)> + '_ {
        (0..self.population()).filter_map(|i| match self.state(i) {
            SlotState::Evaluated(f) => Some((i, f)),
            _ => None,
        })
    }
}
