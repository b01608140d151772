//! Windowed majority vote over recent plate readings

use std::collections::{HashMap, VecDeque};

/// One accepted reading together with the vehicle measurements of its frame
#[derive(Debug, Clone, PartialEq)]
pub struct StabilizationEntry {
    pub plate_text: String,
    pub confidence: f64,
    pub color: String,
    pub distance_m: f64,
    pub height_m: f64,
}

/// Plate text that won the vote, with the metrics to commit
#[derive(Debug, Clone, PartialEq)]
pub struct StabilizedReading {
    pub plate_text: String,
    pub votes: usize,
    /// Oldest entry in the window; its metrics are the ones committed
    pub metrics: StabilizationEntry,
}

/// Bounded FIFO of readings
#[derive(Debug, Clone)]
pub struct StabilizationBuffer {
    entries: VecDeque<StabilizationEntry>,
    capacity: usize,
}

impl StabilizationBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity: capacity.max(1),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.entries.len() >= self.capacity
    }

    pub fn entries(&self) -> impl Iterator<Item = &StabilizationEntry> {
        self.entries.iter()
    }

    /// Append, evicting the oldest entry past capacity.
    pub fn push(&mut self, entry: StabilizationEntry) {
        self.entries.push_back(entry);
        while self.entries.len() > self.capacity {
            self.entries.pop_front();
        }
    }

    /// Change the capacity, dropping the oldest entries if it shrinks
    pub fn set_capacity(&mut self, capacity: usize) {
        self.capacity = capacity.max(1);
        while self.entries.len() > self.capacity {
            self.entries.pop_front();
        }
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// The majority plate of a full window, if it has at least `majority` votes.
    ///
    /// Ties on the top count go to the plate seen first in the window.
    pub fn stabilized(&self, majority: usize) -> Option<StabilizedReading> {
        if !self.is_full() {
            return None;
        }

        let mut counts: HashMap<&str, usize> = HashMap::new();
        for entry in &self.entries {
            *counts.entry(entry.plate_text.as_str()).or_insert(0) += 1;
        }

        let mut winner: Option<(&str, usize)> = None;
        for entry in &self.entries {
            let text = entry.plate_text.as_str();
            let votes = counts[text];
            if winner.map_or(true, |(_, best)| votes > best) {
                winner = Some((text, votes));
            }
        }

        let (plate_text, votes) = winner?;
        if votes < majority {
            return None;
        }
        let metrics = self.entries.front()?.clone();
        Some(StabilizedReading {
            plate_text: plate_text.to_string(),
            votes,
            metrics,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(plate: &str, confidence: f64) -> StabilizationEntry {
        StabilizationEntry {
            plate_text: plate.to_string(),
            confidence,
            color: "Red".to_string(),
            distance_m: 10.0,
            height_m: 1.2,
        }
    }

    fn fill(buffer: &mut StabilizationBuffer, plates: &[&str]) {
        for (i, plate) in plates.iter().enumerate() {
            buffer.push(entry(plate, 0.5 + i as f64 / 10.0));
        }
    }

    #[test]
    fn test_majority_wins() {
        let mut buffer = StabilizationBuffer::new(5);
        fill(&mut buffer, &["B", "A", "A", "B", "A"]);
        let reading = buffer.stabilized(3).unwrap();
        assert_eq!(reading.plate_text, "A");
        assert_eq!(reading.votes, 3);
        // metrics come from the oldest entry
        assert_eq!(reading.metrics.plate_text, "B");
        assert_eq!(reading.metrics.confidence, 0.5);
    }

    #[test]
    fn test_no_majority() {
        let mut buffer = StabilizationBuffer::new(5);
        fill(&mut buffer, &["A", "B", "A", "B", "C"]);
        assert!(buffer.stabilized(3).is_none());
    }

    #[test]
    fn test_not_full_never_stabilizes() {
        let mut buffer = StabilizationBuffer::new(5);
        fill(&mut buffer, &["A", "A", "A", "A"]);
        assert!(buffer.stabilized(3).is_none());
        buffer.push(entry("A", 0.9));
        assert!(buffer.stabilized(3).is_some());
    }

    #[test]
    fn test_fifo_eviction() {
        let mut buffer = StabilizationBuffer::new(5);
        fill(&mut buffer, &["A", "A", "A", "B", "B", "B", "C"]);
        assert_eq!(buffer.len(), 5);
        let plates: Vec<&str> = buffer.entries().map(|e| e.plate_text.as_str()).collect();
        assert_eq!(plates, vec!["A", "B", "B", "B", "C"]);
        assert_eq!(buffer.stabilized(3).unwrap().plate_text, "B");
    }

    #[test]
    fn test_shrink_capacity() {
        let mut buffer = StabilizationBuffer::new(5);
        fill(&mut buffer, &["A", "B", "C", "D"]);
        buffer.set_capacity(2);
        let plates: Vec<&str> = buffer.entries().map(|e| e.plate_text.as_str()).collect();
        assert_eq!(plates, vec!["C", "D"]);
        assert!(buffer.is_full());
    }
}
