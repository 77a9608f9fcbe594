//! Weighted probabilistic choice over link candidates

use serde::{Deserialize, Serialize};

/// Normalized running sum: `cum[i] = Σ weights[0..=i] / Σ weights`
///
/// Negative weights count as zero. When every weight is zero the
/// distribution falls back to uniform.
pub fn cumulative_distribution(weights: &[f64]) -> Vec<f64> {
    let clean: Vec<f64> = weights
        .iter()
        .map(|&w| if w.is_finite() { w.max(0.0) } else { 0.0 })
        .collect();
    let total: f64 = clean.iter().sum();
    let count = clean.len() as f64;

    let mut running = 0.0;
    clean
        .iter()
        .map(|&w| {
            running += if total > 0.0 { w / total } else { 1.0 / count };
            running
        })
        .collect()
}

/// First index whose cumulative value exceeds `draw`
///
/// Draws at or beyond the last boundary clamp to the last index; `None` only
/// for an empty table.
pub fn select_cumulative(cumulative: &[f64], draw: f64) -> Option<usize> {
    if cumulative.is_empty() {
        return None;
    }
    let index = cumulative.partition_point(|&c| c <= draw);
    Some(index.min(cumulative.len() - 1))
}

/// Candidate with its selection weight
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct WeightedCandidate<K> {
    /// The candidate
    pub candidate: K,
    /// Relative weight
    pub weight: f64,
}

/// Weights over a candidate set that follows the graph topology
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WeightTable<K> {
    entries: Vec<WeightedCandidate<K>>,
}

impl<K> Default for WeightTable<K> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<K: Copy + PartialEq> WeightTable<K> {
    /// Table from explicit pairs
    pub fn from_pairs(pairs: impl IntoIterator<Item = (K, f64)>) -> Self {
        Self {
            entries: pairs
                .into_iter()
                .map(|(candidate, weight)| WeightedCandidate { candidate, weight })
                .collect(),
        }
    }

    /// Number of candidates
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether there are no candidates
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in order
    pub fn entries(&self) -> &[WeightedCandidate<K>] {
        &self.entries
    }

    /// Candidates in order
    pub fn candidates(&self) -> Vec<K> {
        self.entries.iter().map(|e| e.candidate).collect()
    }

    /// Raw weights in order
    pub fn weights(&self) -> Vec<f64> {
        self.entries.iter().map(|e| e.weight).collect()
    }

    /// Weight of one candidate
    pub fn weight_of(&self, candidate: K) -> Option<f64> {
        self.entries
            .iter()
            .find(|e| e.candidate == candidate)
            .map(|e| e.weight)
    }

    /// Change one candidate's weight; `false` when it is not in the table
    pub fn set_weight(&mut self, candidate: K, weight: f64) -> bool {
        match self.entries.iter_mut().find(|e| e.candidate == candidate) {
            Some(entry) => {
                entry.weight = weight.max(0.0);
                true
            }
            None => false,
        }
    }

    /// Weights divided by their total
    pub fn normalized_weights(&self) -> Vec<f64> {
        let cumulative = self.cumulative();
        let mut previous = 0.0;
        cumulative
            .into_iter()
            .map(|c| {
                let w = c - previous;
                previous = c;
                w
            })
            .collect()
    }

    /// Normalized cumulative array
    pub fn cumulative(&self) -> Vec<f64> {
        cumulative_distribution(&self.weights())
    }

    /// Candidate chosen by a uniform `draw ∈ [0, 1)`
    pub fn select(&self, draw: f64) -> Option<K> {
        let index = select_cumulative(&self.cumulative(), draw)?;
        self.entries.get(index).map(|e| e.candidate)
    }

    /// Bring the candidate set in line with the current topology
    ///
    /// Order follows `current`. Surviving candidates keep their weight;
    /// new candidates each receive an equal share of the total, taken
    /// proportionally from the survivors so the total is unchanged.
    /// Candidates no longer present drop out.
    pub fn repair(&mut self, current: &[K]) {
        let survivors: Vec<WeightedCandidate<K>> = current
            .iter()
            .filter_map(|&candidate| {
                self.entries
                    .iter()
                    .find(|e| e.candidate == candidate)
                    .copied()
            })
            .collect();
        let new_count = current.len() - survivors.len();
        let total: f64 = survivors.iter().map(|e| e.weight.max(0.0)).sum();

        if survivors.is_empty() || total <= 0.0 {
            self.entries = current
                .iter()
                .map(|&candidate| WeightedCandidate {
                    candidate,
                    weight: 1.0,
                })
                .collect();
            return;
        }

        let share = total / current.len() as f64;
        let keep = 1.0 - new_count as f64 / current.len() as f64;
        self.entries = current
            .iter()
            .map(|&candidate| {
                let weight = survivors
                    .iter()
                    .find(|e| e.candidate == candidate)
                    .map_or(share, |e| e.weight.max(0.0) * keep);
                WeightedCandidate { candidate, weight }
            })
            .collect();
    }

    /// Rewrite candidates through `translate`, dropping those it rejects
    pub fn translate(&mut self, translate: impl Fn(K) -> Option<K>) {
        self.entries = self
            .entries
            .iter()
            .filter_map(|e| {
                translate(e.candidate).map(|candidate| WeightedCandidate {
                    candidate,
                    weight: e.weight,
                })
            })
            .collect();
    }
}
