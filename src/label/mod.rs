//! Churn labelling. An entity is churned if any event in its whole history is
//! the terminal action, so the label is reduced per entity first and only then
//! broadcast back onto the events.

use crate::config::LabelConfig;
use crate::events::Event;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Label {
    #[default]
    Retained,
    Churned,
}

impl Label {
    pub fn value(self) -> u8 {
        match self {
            Label::Retained => 0,
            Label::Churned => 1,
        }
    }

    pub fn as_f64(self) -> f64 {
        self.value() as f64
    }
}

/// Event with its entity's label attached
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabeledEvent {
    #[serde(flatten)]
    pub event: Event,
    pub label: Label,
}

/// Per-entity labels after the whole-history reduction
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntityLabels {
    labels: HashMap<String, Label>,
}

impl EntityLabels {
    /// Entities never seen are retained.
    pub fn get(&self, entity_id: &str) -> Label {
        self.labels.get(entity_id).copied().unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn churned(&self) -> usize {
        self.labels.values().filter(|l| **l == Label::Churned).count()
    }

    fn observe(&mut self, entity_id: &str, label: Label) {
        match self.labels.get_mut(entity_id) {
            Some(slot) => *slot = (*slot).max(label),
            None => {
                self.labels.insert(entity_id.to_string(), label);
            }
        }
    }

    /// Max-merge; associative and commutative.
    fn merge(mut self, other: EntityLabels) -> EntityLabels {
        for (entity, label) in other.labels {
            self.observe(&entity, label);
        }
        self
    }
}

pub struct Labeler {
    terminal_action: String,
    partition_size: usize,
}

impl Labeler {
    pub fn new(config: &LabelConfig, partition_size: usize) -> Self {
        Self {
            terminal_action: config.terminal_action.clone(),
            partition_size: partition_size.max(1),
        }
    }

    pub fn is_terminal(&self, page: &str) -> bool {
        page == self.terminal_action
    }

    /// Pass 1: max over the terminal indicator for every entity.
    pub fn compute(&self, events: &[Event]) -> EntityLabels {
        let labels = events
            .par_chunks(self.partition_size)
            .map(|chunk| {
                let mut partial = EntityLabels::default();
                for e in chunk {
                    let label = if self.is_terminal(&e.page) {
                        Label::Churned
                    } else {
                        Label::Retained
                    };
                    partial.observe(&e.entity_id, label);
                }
                partial
            })
            .reduce(EntityLabels::default, EntityLabels::merge);

        tracing::info!(
            entities = labels.len(),
            churned = labels.churned(),
            terminal_action = %self.terminal_action,
            "labelled entities"
        );
        labels
    }

    /// Pass 2: broadcast the entity label onto each of its events.
    pub fn broadcast(events: Vec<Event>, labels: &EntityLabels) -> Vec<LabeledEvent> {
        events
            .into_iter()
            .map(|event| {
                let label = labels.get(&event.entity_id);
                LabeledEvent { event, label }
            })
            .collect()
    }

    /// Both passes.
    pub fn label(&self, events: Vec<Event>) -> (EntityLabels, Vec<LabeledEvent>) {
        let labels = self.compute(&events);
        let labeled = Self::broadcast(events, &labels);
        (labels, labeled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labeler(partition_size: usize) -> Labeler {
        Labeler::new(&LabelConfig::default(), partition_size)
    }

    fn history() -> Vec<Event> {
        vec![
            Event::new("1", 10, "NextSong", Some(0), 1),
            Event::new("2", 11, "NextSong", Some(0), 2),
            Event::new("1", 12, "Cancel", Some(0), 1),
            Event::new("1", 13, "Cancellation Confirmation", Some(0), 1),
            Event::new("2", 14, "Thumbs Up", Some(0), 2),
        ]
    }

    #[test]
    fn label_is_broadcast_to_every_event_of_the_entity() {
        // partition size 1 forces the terminal event into its own partition
        let (labels, labeled) = labeler(1).label(history());
        assert_eq!(labels.get("1"), Label::Churned);
        assert_eq!(labels.get("2"), Label::Retained);
        for le in &labeled {
            assert_eq!(le.label, labels.get(&le.event.entity_id));
        }
        assert_eq!(
            labeled.iter().filter(|le| le.label == Label::Churned).count(),
            3
        );
    }

    #[test]
    fn entity_without_terminal_action_is_retained() {
        let events = vec![
            Event::new("9", 1, "Downgrade", Some(0), 1),
            Event::new("9", 2, "Submit Downgrade", Some(0), 1),
        ];
        let labels = labeler(16).compute(&events);
        assert_eq!(labels.get("9"), Label::Retained);
        assert_eq!(labels.churned(), 0);
    }

    #[test]
    fn terminal_action_anywhere_in_history_counts() {
        // cancellation is not the last event
        let mut events = history();
        events.push(Event::new("1", 99, "Home", Some(0), 1));
        let labels = labeler(2).compute(&events);
        assert_eq!(labels.get("1"), Label::Churned);
    }

    #[test]
    fn partitioning_does_not_change_labels() {
        let a = labeler(1).compute(&history());
        let b = labeler(1024).compute(&history());
        assert_eq!(a, b);
    }
}
