//! Completed result table
//!
//! A `ResultTable` only exists once every worker has been joined and every
//! slot holds exactly the result published for it.

use crate::error::WorkerError;
use crate::scan::worker::WorkerResult;
use std::ops::Index;

/// One published result per worker, in slot order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultTable {
    results: Vec<WorkerResult>,
}

impl ResultTable {
    /// Build a table from raw slots collected after the join barrier
    ///
    /// Fails if a slot is empty or holds another slot's result.
    pub fn from_slots(slots: Vec<Option<WorkerResult>>) -> Result<Self, WorkerError> {
        let results = slots
            .into_iter()
            .enumerate()
            .map(|(slot, result)| match result {
                None => Err(WorkerError::Unpublished { slot }),
                Some(r) if r.slot_id != slot => Err(WorkerError::SlotMismatch {
                    slot,
                    found: r.slot_id,
                }),
                Some(r) => Ok(r),
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { results })
    }

    /// Number of slots
    pub fn len(&self) -> usize {
        self.results.len()
    }

    /// True if the table has no slots
    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// Results in slot order
    pub fn iter(&self) -> std::slice::Iter<'_, WorkerResult> {
        self.results.iter()
    }

    /// Result for one slot
    pub fn get(&self, slot: usize) -> Option<&WorkerResult> {
        self.results.get(slot)
    }

    /// Every match across all slots, in slot then ascending order
    pub fn all_matches(&self) -> Vec<u64> {
        self.results
            .iter()
            .flat_map(|r| r.matches.iter().copied())
            .collect()
    }
}

impl Index<usize> for ResultTable {
    type Output = WorkerResult;

    fn index(&self, slot: usize) -> &WorkerResult {
        &self.results[slot]
    }
}

impl<'a> IntoIterator for &'a ResultTable {
    type Item = &'a WorkerResult;
    type IntoIter = std::slice::Iter<'a, WorkerResult>;

    fn into_iter(self) -> Self::IntoIter {
        self.results.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scan::worker::WorkerIdentity;

    fn result(slot_id: usize, matches: Vec<u64>) -> WorkerResult {
        WorkerResult {
            identity: WorkerIdentity::Tid(slot_id as u64 + 100),
            slot_id,
            range_start: 1,
            range_end: 10,
            elapsed_millis: 1,
            matches,
        }
    }

    #[test]
    fn test_from_complete_slots() {
        let table =
            ResultTable::from_slots(vec![Some(result(0, vec![1, 2])), Some(result(1, vec![7]))])
                .unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table[1].slot_id, 1);
        assert_eq!(table.all_matches(), vec![1, 2, 7]);
    }

    #[test]
    fn test_unpublished_slot_rejected() {
        let err = ResultTable::from_slots(vec![Some(result(0, vec![])), None]).unwrap_err();
        assert!(matches!(err, WorkerError::Unpublished { slot: 1 }));
    }

    #[test]
    fn test_misplaced_result_rejected() {
        let err = ResultTable::from_slots(vec![Some(result(1, vec![]))]).unwrap_err();
        assert!(matches!(err, WorkerError::SlotMismatch { slot: 0, found: 1 }));
    }
}
