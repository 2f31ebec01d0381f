use model::records::{batch::Batch, row::RowData};
use std::fmt;

/// Lifecycle of the batch currently being assembled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchState {
    /// No rows buffered.
    Empty,
    /// Rows buffered, capacity not yet reached.
    Filling,
    /// Sealed and handed to the sink; the buffer is reset once the hand-off
    /// completes.
    Submitting,
}

impl fmt::Display for BatchState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BatchState::Empty => "empty",
            BatchState::Filling => "filling",
            BatchState::Submitting => "submitting",
        };
        f.write_str(s)
    }
}

/// Accumulates encoded rows and seals them into batches of `capacity`.
#[derive(Debug)]
pub struct BatchBuffer {
    rows: Vec<RowData>,
    capacity: usize,
    next_seq: u64,
    state: BatchState,
}

impl BatchBuffer {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        BatchBuffer {
            rows: Vec::with_capacity(capacity),
            capacity,
            next_seq: 0,
            state: BatchState::Empty,
        }
    }

    pub fn state(&self) -> BatchState {
        self.state
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Empty -> Filling, or Filling -> Submitting when the row fills the
    /// buffer, in which case the sealed batch is returned.
    pub fn push(&mut self, row: RowData) -> Option<Batch> {
        self.rows.push(row);
        self.state = BatchState::Filling;
        if self.rows.len() >= self.capacity {
            return self.seal();
        }
        None
    }

    /// Seals whatever is buffered. `None` when nothing is, so an empty batch
    /// never leaves the buffer.
    pub fn seal(&mut self) -> Option<Batch> {
        let rows = std::mem::replace(&mut self.rows, Vec::with_capacity(self.capacity));
        let batch = Batch::seal(self.next_seq, rows)?;
        self.next_seq += 1;
        self.state = BatchState::Submitting;
        Some(batch)
    }

    /// Submitting -> Empty once the sealed batch has been handed off.
    pub fn submitted(&mut self) {
        if self.state == BatchState::Submitting {
            self.state = if self.rows.is_empty() {
                BatchState::Empty
            } else {
                BatchState::Filling
            };
        }
    }
}
