// src/gps/custom.rs
//! Registry of application-defined custom fields
//!
//! Entries are kept sorted by `(sentence name, term index)` so the decoder
//! can find every field of a sentence with one lookup at term 0 and then
//! walk them forward as terms arrive. Field storage lives in a separate
//! slot array indexed by [`CustomHandle`], so handles stay stable while the
//! sorted index is rearranged on insert.

use super::{decoder::MAX_TERM_SIZE, field::CustomField};
use crate::error::{GpsError, Result};
use tinyvec::ArrayVec;

/// Maximum number of custom fields a decoder can carry
pub const MAX_CUSTOM_FIELDS: usize = 16;

/// Longest sentence name the decoder can match, as it keeps at most this
/// many bytes of term 0
pub const MAX_SENTENCE_NAME: usize = MAX_TERM_SIZE - 1;

type SentenceName = ArrayVec<[u8; MAX_SENTENCE_NAME]>;

/// Stable reference to a registered custom field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CustomHandle(u8);

#[derive(Debug, Clone, Default)]
struct Entry {
    sentence: SentenceName,
    term_index: u8,
    slot: u8,
}

/// Position in the sorted index of the first entry for the sentence being
/// decoded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Cursor(usize);

#[derive(Debug, Clone, Default)]
pub struct CustomRegistry {
    entries: ArrayVec<[Entry; MAX_CUSTOM_FIELDS]>,
    slots: ArrayVec<[CustomField; MAX_CUSTOM_FIELDS]>,
}

impl CustomRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Register a field for term `term_index` (1 = first term after the
    /// sentence name) of sentences named `sentence`, e.g. `"GPRMC"`.
    pub fn register(&mut self, sentence: &str, term_index: u8) -> Result<CustomHandle> {
        if sentence.is_empty() || sentence.len() > MAX_SENTENCE_NAME {
            return Err(GpsError::Registry(format!(
                "Sentence name {:?} must be 1 to {} bytes",
                sentence, MAX_SENTENCE_NAME
            )));
        }
        if term_index == 0 {
            return Err(GpsError::Registry(
                "Term 0 is the sentence name and cannot be a custom field".to_string(),
            ));
        }
        if self.slots.len() == MAX_CUSTOM_FIELDS {
            return Err(GpsError::Registry(format!(
                "Custom field registry is full ({} fields)",
                MAX_CUSTOM_FIELDS
            )));
        }

        let mut name = SentenceName::new();
        name.extend_from_slice(sentence.as_bytes());

        let slot = self.slots.len() as u8;
        self.slots.push(CustomField::default());

        // Insert after any existing entry with the same key
        let pos = self
            .entries
            .iter()
            .position(|e| (name.as_slice(), term_index) < (e.sentence.as_slice(), e.term_index))
            .unwrap_or(self.entries.len());
        self.entries.insert(
            pos,
            Entry {
                sentence: name,
                term_index,
                slot,
            },
        );

        tracing::debug!(sentence, term_index, slot, "registered custom field");
        Ok(CustomHandle(slot))
    }

    pub fn get(&self, handle: CustomHandle) -> Option<&CustomField> {
        self.slots.get(handle.0 as usize)
    }

    pub fn get_mut(&mut self, handle: CustomHandle) -> Option<&mut CustomField> {
        self.slots.get_mut(handle.0 as usize)
    }

    /// Registered `(sentence, term index, handle)` triples in sorted order
    pub fn keys(&self) -> impl Iterator<Item = (&str, u8, CustomHandle)> + '_ {
        self.entries.iter().map(|e| {
            (
                std::str::from_utf8(e.sentence.as_slice()).unwrap_or(""),
                e.term_index,
                CustomHandle(e.slot),
            )
        })
    }

    /// Find the first entry for `sentence`, if any
    pub(crate) fn locate(&self, sentence: &[u8]) -> Option<Cursor> {
        let pos = self
            .entries
            .iter()
            .position(|e| e.sentence.as_slice() >= sentence)?;
        if self.entries[pos].sentence.as_slice() == sentence {
            Some(Cursor(pos))
        } else {
            None
        }
    }

    /// Offer a completed term to every entry of the sentence waiting for it
    pub(crate) fn stage(&mut self, cursor: Cursor, term_index: u8, term: &[u8]) {
        let slots = &mut self.slots;
        for entry in run(&self.entries, cursor).take_while(|e| e.term_index <= term_index) {
            if entry.term_index == term_index {
                slots[entry.slot as usize].set(term);
            }
        }
    }

    /// Commit every entry of the sentence under the cursor
    pub(crate) fn commit(&mut self, cursor: Cursor, now_ms: u32) {
        let slots = &mut self.slots;
        for entry in run(&self.entries, cursor) {
            slots[entry.slot as usize].commit(now_ms);
        }
    }
}

/// Entries sharing the cursor's sentence name, in term order
fn run(entries: &[Entry], cursor: Cursor) -> impl Iterator<Item = &Entry> + '_ {
    let name = entries[cursor.0].sentence.as_slice();
    entries[cursor.0..]
        .iter()
        .take_while(move |e| e.sentence.as_slice() == name)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sorted_keys(registry: &CustomRegistry) -> Vec<(String, u8)> {
        registry
            .keys()
            .map(|(name, term, _)| (name.to_string(), term))
            .collect()
    }

    #[test]
    fn test_insert_keeps_sort_order() {
        let mut registry = CustomRegistry::new();
        registry.register("GPRMC", 8).unwrap();
        registry.register("GPGSA", 15).unwrap();
        registry.register("GPRMC", 7).unwrap();
        registry.register("GPGGA", 10).unwrap();

        assert_eq!(
            sorted_keys(&registry),
            vec![
                ("GPGGA".to_string(), 10),
                ("GPGSA".to_string(), 15),
                ("GPRMC".to_string(), 7),
                ("GPRMC".to_string(), 8),
            ]
        );
    }

    #[test]
    fn test_handles_are_stable() {
        let mut registry = CustomRegistry::new();
        let late = registry.register("GPZDA", 2).unwrap();
        let early = registry.register("GPAAM", 1).unwrap();

        let cursor = registry.locate(b"GPZDA").unwrap();
        registry.stage(cursor, 2, b"25");
        registry.commit(cursor, 0);

        assert_eq!(registry.get_mut(late).unwrap().value(), "25");
        assert!(!registry.get(early).unwrap().is_valid());
    }

    #[test]
    fn test_locate() {
        let mut registry = CustomRegistry::new();
        registry.register("GPGSV", 3).unwrap();
        registry.register("GPRMC", 7).unwrap();

        assert_eq!(registry.locate(b"GPGSV"), Some(Cursor(0)));
        assert_eq!(registry.locate(b"GPRMC"), Some(Cursor(1)));
        assert_eq!(registry.locate(b"GPGGA"), None);
        assert_eq!(registry.locate(b"GPVTG"), None);
        assert_eq!(registry.locate(b"GPZDA"), None);
    }

    #[test]
    fn test_stage_matches_term_and_sentence_only() {
        let mut registry = CustomRegistry::new();
        let speed = registry.register("GPRMC", 7).unwrap();
        let course = registry.register("GPRMC", 8).unwrap();
        let other = registry.register("GPVTG", 7).unwrap();

        let cursor = registry.locate(b"GPRMC").unwrap();
        registry.stage(cursor, 7, b"022.4");
        registry.stage(cursor, 8, b"084.4");
        assert!(!registry.get(speed).unwrap().is_valid());

        registry.commit(cursor, 5);
        assert_eq!(registry.get_mut(speed).unwrap().value(), "022.4");
        assert_eq!(registry.get_mut(course).unwrap().value(), "084.4");
        assert!(!registry.get(other).unwrap().is_valid());
    }

    #[test]
    fn test_duplicate_keys_both_receive_term() {
        let mut registry = CustomRegistry::new();
        let a = registry.register("GPGGA", 9).unwrap();
        let b = registry.register("GPGGA", 9).unwrap();
        let cursor = registry.locate(b"GPGGA").unwrap();
        registry.stage(cursor, 9, b"545.4");
        registry.commit(cursor, 0);
        assert_eq!(registry.get_mut(a).unwrap().value(), "545.4");
        assert_eq!(registry.get_mut(b).unwrap().value(), "545.4");
    }

    #[test]
    fn test_register_rejects_bad_input() {
        let mut registry = CustomRegistry::new();
        assert!(registry.register("", 1).is_err());
        assert!(registry.register("GPRMC", 0).is_err());
        assert!(registry.register("THIS-NAME-IS-TOO-LONG", 1).is_err());
        assert!(registry.register("PUBXABCDEFGHIJK", 1).is_err());
        assert!(registry.is_empty());
        registry.register("PUBXABCDEFGHIJ", 1).unwrap();
        registry = CustomRegistry::new();
        for i in 0..MAX_CUSTOM_FIELDS {
            registry.register("PUBX", i as u8 + 1).unwrap();
        }
        assert!(registry.register("PUBX", 99).is_err());
        assert_eq!(registry.len(), MAX_CUSTOM_FIELDS);
    }
}
