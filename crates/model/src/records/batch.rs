use crate::{core::identifiers::BatchId, records::row::RowData};

/// A sealed group of rows submitted as one bulk write.
///
/// Batches are write-once: they are handed to the sink by value and never
/// mutated or resubmitted afterwards.
#[derive(Debug, Clone)]
pub struct Batch {
    pub id: BatchId,
    pub seq: u64,
    pub rows: Vec<RowData>,
    pub ts: chrono::DateTime<chrono::Utc>,
}

impl Batch {
    /// Seals `rows` into a batch. Returns `None` for an empty buffer so a
    /// zero-length batch can never reach the store.
    pub fn seal(seq: u64, rows: Vec<RowData>) -> Option<Self> {
        if rows.is_empty() {
            return None;
        }
        Some(Batch {
            id: BatchId::generate(),
            seq,
            rows,
            ts: chrono::Utc::now(),
        })
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn first_line(&self) -> u64 {
        self.rows.first().map(|r| r.line).unwrap_or_default()
    }

    pub fn size_bytes(&self) -> usize {
        self.rows.iter().map(|r| r.size_bytes()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_buffers_never_seal() {
        assert!(Batch::seal(0, Vec::new()).is_none());
        let batch = Batch::seal(3, vec![RowData::new(7, Vec::new())]).unwrap();
        assert_eq!(batch.len(), 1);
        assert_eq!(batch.seq, 3);
        assert_eq!(batch.first_line(), 7);
    }
}
