//! In-memory append-only log.

use steward_core::{Clock, IdGenerator, RecordId};
use tracing::debug;

use crate::event::Event;
use crate::record::Record;

/// Append-only sequence of [`Record`]s.
///
/// ## Append semantics
///
/// `append()`:
/// - assigns a fresh [`RecordId`] from the injected generator
/// - stamps the record with the injected clock
/// - assigns the next sequence number (`len + 1`)
/// - never touches records already in the log
///
/// There is no `update`, `remove`, `clear` or `iter_mut`.
///
/// ## Reads
///
/// `iter()` is lazy and restartable: every call starts again at the first
/// record and yields records in append order.
#[derive(Debug, Clone)]
pub struct AppendOnlyLog<E> {
    records: Vec<Record<E>>,
}

impl<E> Default for AppendOnlyLog<E> {
    fn default() -> Self {
        Self {
            records: Vec::new(),
        }
    }
}

impl<E: Event> AppendOnlyLog<E> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `event` and return the newly created record.
    pub fn append(&mut self, event: E, ids: &dyn IdGenerator, clock: &dyn Clock) -> &Record<E> {
        let sequence = self.records.len() as u64 + 1;
        let record = Record::new(RecordId::generate(ids), sequence, clock.now(), event);

        debug!(
            record_id = %record.id(),
            sequence,
            event_type = record.payload().event_type(),
            event_version = record.payload().version(),
            "appended record"
        );

        self.records.push(record);
        &self.records[self.records.len() - 1]
    }
}

impl<E> AppendOnlyLog<E> {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Records in append order.
    pub fn iter(&self) -> Records<'_, E> {
        Records {
            inner: self.records.iter(),
        }
    }

    /// Record at a 1-based sequence number.
    pub fn get(&self, sequence: u64) -> Option<&Record<E>> {
        let idx = usize::try_from(sequence).ok()?.checked_sub(1)?;
        self.records.get(idx)
    }

    pub fn last(&self) -> Option<&Record<E>> {
        self.records.last()
    }
}

impl<'a, E> IntoIterator for &'a AppendOnlyLog<E> {
    type Item = &'a Record<E>;
    type IntoIter = Records<'a, E>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Lazy, finite iterator over a log's records.
#[derive(Debug, Clone)]
pub struct Records<'a, E> {
    inner: core::slice::Iter<'a, Record<E>>,
}

impl<'a, E> Iterator for Records<'a, E> {
    type Item = &'a Record<E>;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<E> ExactSizeIterator for Records<'_, E> {}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};
    use proptest::prelude::*;
    use steward_core::{FixedClock, SequentialIds, SteppingClock};

    #[derive(Debug, Clone, PartialEq, Eq)]
    struct Noted(u32);

    impl Event for Noted {
        fn event_type(&self) -> &'static str {
            "test.noted"
        }
    }

    fn clock() -> FixedClock {
        FixedClock::at(Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap())
    }

    #[test]
    fn append_assigns_sequence_id_and_time() {
        let ids = SequentialIds::new();
        let clock = clock();
        let mut log = AppendOnlyLog::new();

        let first = log.append(Noted(1), &ids, &clock).clone();
        let second = log.append(Noted(2), &ids, &clock).clone();

        assert_eq!(first.sequence(), 1);
        assert_eq!(second.sequence(), 2);
        assert_ne!(first.id(), second.id());
        assert_eq!(first.recorded_at(), clock.now());
        assert_eq!(log.len(), 2);
    }

    #[test]
    fn iteration_is_restartable_and_ordered() {
        let ids = SequentialIds::new();
        let clock = SteppingClock::new(
            Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap(),
            Duration::seconds(1),
        );
        let mut log = AppendOnlyLog::new();
        for n in 0..4 {
            log.append(Noted(n), &ids, &clock);
        }

        let first_pass: Vec<u32> = log.iter().map(|r| r.payload().0).collect();
        let second_pass: Vec<u32> = log.iter().map(|r| r.payload().0).collect();
        assert_eq!(first_pass, vec![0, 1, 2, 3]);
        assert_eq!(first_pass, second_pass);
        assert_eq!(log.iter().len(), 4);
    }

    #[test]
    fn get_uses_one_based_sequence() {
        let ids = SequentialIds::new();
        let mut log = AppendOnlyLog::new();
        log.append(Noted(10), &ids, &clock());

        assert!(log.get(0).is_none());
        assert_eq!(log.get(1).map(|r| r.payload().0), Some(10));
        assert!(log.get(2).is_none());
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 256,
            ..ProptestConfig::default()
        })]

        /// Property: every append grows the log by exactly one and leaves
        /// earlier records identical.
        #[test]
        fn append_is_monotonic(values in prop::collection::vec(any::<u32>(), 1..40)) {
            let ids = SequentialIds::new();
            let clock = clock();
            let mut log = AppendOnlyLog::new();

            for v in values {
                let before: Vec<Record<Noted>> = log.iter().cloned().collect();
                let len_before = log.len();

                log.append(Noted(v), &ids, &clock);

                prop_assert_eq!(log.len(), len_before + 1);
                let after: Vec<Record<Noted>> = log.iter().take(len_before).cloned().collect();
                prop_assert_eq!(before, after);
                prop_assert_eq!(log.last().map(|r| r.sequence()), Some(len_before as u64 + 1));
            }
        }
    }
}
