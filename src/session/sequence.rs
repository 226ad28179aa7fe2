//! Sequence definitions and the read-only catalog built from configuration

use crate::error::{Error, Result};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Which group of channels a sequence is played on
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Hand {
    Left,
    Right,
}

impl Hand {
    /// Index of the hand's first channel when each hand has `keys_per_hand` keys
    pub fn channel_offset(self, keys_per_hand: usize) -> usize {
        match self {
            Hand::Left => 0,
            Hand::Right => keys_per_hand,
        }
    }

    /// Key index within the hand for a physical channel, if the channel belongs to it
    pub fn key_for_channel(self, channel: usize, keys_per_hand: usize) -> Option<usize> {
        let offset = self.channel_offset(keys_per_hand);
        channel
            .checked_sub(offset)
            .filter(|key| *key < keys_per_hand)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Hand::Left => "left",
            Hand::Right => "right",
        }
    }
}

impl fmt::Display for Hand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Sequence as written in the configuration file
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SequenceDef {
    /// Key indices (0-based, within the hand) in press order
    pub seq: Vec<usize>,
    pub hand: Hand,
}

/// A validated, named sequence
#[derive(Clone, Debug, PartialEq)]
pub struct Sequence {
    pub id: String,
    pub keys: Vec<usize>,
    pub hand: Hand,
}

impl Sequence {
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// 1-based key numbers separated by spaces, e.g. `[2, 0, 1]` -> `"3 1 2"`
    pub fn cue_text(&self) -> String {
        self.keys
            .iter()
            .map(|k| (k + 1).to_string())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Named sequences plus the order they are presented in within a run
#[derive(Clone, Debug)]
pub struct SequenceCatalog {
    sequences: FxHashMap<String, Sequence>,
    order: Vec<String>,
}

impl SequenceCatalog {
    /// Validate definitions against the number of keys per hand.
    ///
    /// Fails on empty sequences, keys outside the hand, an empty order or an
    /// order entry that names no sequence.
    pub fn new(
        defs: &FxHashMap<String, SequenceDef>,
        order: &[String],
        keys_per_hand: usize,
    ) -> Result<Self> {
        let mut sequences = FxHashMap::default();
        for (id, def) in defs {
            if def.seq.is_empty() {
                return Err(Error::EmptySequence(id.clone()));
            }
            if let Some(&key) = def.seq.iter().find(|&&k| k >= keys_per_hand) {
                return Err(Error::KeyOutOfRange {
                    id: id.clone(),
                    key,
                    active: keys_per_hand,
                });
            }
            sequences.insert(
                id.clone(),
                Sequence {
                    id: id.clone(),
                    keys: def.seq.clone(),
                    hand: def.hand,
                },
            );
        }

        if order.is_empty() {
            return Err(Error::InvalidConfig("sequence order is empty".into()));
        }
        if let Some(missing) = order.iter().find(|id| !sequences.contains_key(*id)) {
            return Err(Error::UnknownSequence(missing.clone()));
        }

        Ok(SequenceCatalog {
            sequences,
            order: order.to_vec(),
        })
    }

    pub fn get(&self, id: &str) -> Option<&Sequence> {
        self.sequences.get(id)
    }

    /// Sequence played in trial `trial` of a run (the order repeats as needed)
    pub fn for_trial(&self, trial: usize) -> &Sequence {
        let id = &self.order[trial % self.order.len()];
        &self.sequences[id]
    }

    pub fn sequences(&self) -> impl Iterator<Item = &Sequence> {
        self.sequences.values()
    }

    pub fn order(&self) -> &[String] {
        &self.order
    }

    pub fn len(&self) -> usize {
        self.sequences.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sequences.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn defs() -> FxHashMap<String, SequenceDef> {
        let mut defs = FxHashMap::default();
        defs.insert(
            "a".to_string(),
            SequenceDef {
                seq: vec![2, 0, 1],
                hand: Hand::Left,
            },
        );
        defs.insert(
            "b".to_string(),
            SequenceDef {
                seq: vec![4, 3],
                hand: Hand::Right,
            },
        );
        defs
    }

    #[test]
    fn test_cue_text_is_one_based() {
        let catalog = SequenceCatalog::new(&defs(), &["a".to_string()], 5).unwrap();
        assert_eq!(catalog.get("a").unwrap().cue_text(), "3 1 2");
    }

    #[test]
    fn test_order_cycles() {
        let order = vec!["a".to_string(), "b".to_string()];
        let catalog = SequenceCatalog::new(&defs(), &order, 5).unwrap();
        assert_eq!(catalog.order(), &order[..]);
        assert_eq!(catalog.sequences().count(), 2);
        assert_eq!(catalog.for_trial(0).id, "a");
        assert_eq!(catalog.for_trial(1).id, "b");
        assert_eq!(catalog.for_trial(4).id, "a");
        assert_eq!(catalog.for_trial(5).hand, Hand::Right);
    }

    #[test]
    fn test_rejects_malformed_definitions() {
        let order = vec!["a".to_string()];
        assert!(matches!(
            SequenceCatalog::new(&defs(), &order, 4),
            Err(Error::KeyOutOfRange { key: 4, .. })
        ));

        let mut empty = defs();
        empty.get_mut("b").unwrap().seq.clear();
        assert!(matches!(
            SequenceCatalog::new(&empty, &order, 5),
            Err(Error::EmptySequence(id)) if id == "b"
        ));

        assert!(matches!(
            SequenceCatalog::new(&defs(), &["zzz".to_string()], 5),
            Err(Error::UnknownSequence(_))
        ));
        assert!(SequenceCatalog::new(&defs(), &[], 5).is_err());
    }

    #[test]
    fn test_hand_channel_mapping() {
        assert_eq!(Hand::Left.key_for_channel(3, 5), Some(3));
        assert_eq!(Hand::Left.key_for_channel(5, 5), None);
        assert_eq!(Hand::Right.key_for_channel(5, 5), Some(0));
        assert_eq!(Hand::Right.key_for_channel(9, 5), Some(4));
        assert_eq!(Hand::Right.key_for_channel(2, 5), None);
        assert_eq!(Hand::Right.key_for_channel(10, 5), None);
    }
}
