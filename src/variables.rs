//! Variable pools for the sampling devices.
//!
//! Two pools exist side by side: the user-defined pool edited through the
//! add/remove controls (mixer and spinner devices), and the case-derived pool
//! filled from a host collection (collector device). Exactly one pool is
//! active at a time, selected by the current device.

use crate::experiment::Device;
use crate::sequence::Run;

/// Hard cap on the user-defined pool size.
pub const MAX_VARIABLES: usize = 119;

/// The variable pools and the active-pool binding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariableSet {
    user: Vec<String>,
    cases: Vec<String>,
    collector: bool,
}

impl Default for VariableSet {
    fn default() -> Self {
        Self {
            user: vec!["a".to_string(), "b".to_string(), "a".to_string()],
            cases: Vec::new(),
            collector: false,
        }
    }
}

impl VariableSet {
    /// Create the default pools: user pool `["a", "b", "a"]`, empty case pool.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The currently active pool.
    #[must_use]
    pub fn active(&self) -> &[String] {
        if self.collector {
            &self.cases
        } else {
            &self.user
        }
    }

    /// Length of the active pool.
    #[must_use]
    pub fn active_len(&self) -> usize {
        self.active().len()
    }

    /// Whether the case-derived pool is active.
    #[must_use]
    pub const fn is_collector(&self) -> bool {
        self.collector
    }

    /// Whether the user pool may still grow.
    #[must_use]
    pub fn can_grow(&self) -> bool {
        self.user.len() < MAX_VARIABLES
    }

    /// Whether the user pool may shrink. The pool never drops below one
    /// variable.
    #[must_use]
    pub fn can_shrink(&self) -> bool {
        self.user.len() > 1
    }

    /// Append an auto-generated label (`len + 1` as a string) to the user
    /// pool. Returns `false` without growing once the pool is at capacity.
    pub fn add_auto(&mut self) -> bool {
        if !self.can_grow() {
            return false;
        }
        self.user.push((self.user.len() + 1).to_string());
        true
    }

    /// Remove the last user-pool label. Returns `false` without shrinking when
    /// the pool holds a single variable.
    pub fn remove_last(&mut self) -> bool {
        if !self.can_shrink() {
            return false;
        }
        self.user.pop();
        true
    }

    /// Replace the user pool wholesale (snapshot restore).
    pub fn set_user(&mut self, labels: Vec<String>) {
        if !labels.is_empty() {
            self.user = labels;
        }
    }

    /// Replace the case-derived pool (collector device).
    pub fn set_cases(&mut self, cases: Vec<String>) {
        self.cases = cases;
    }

    /// Rebind the active pool for a device. Entering spinner mode groups the
    /// user pool so equal labels sit together.
    pub fn bind_device(&mut self, device: Device) {
        self.collector = device.is_collector();
        if device == Device::Spinner {
            group_by_first_occurrence(&mut self.user);
        }
    }

    /// Number of distinct labels in the active pool (spinner wedge count).
    #[must_use]
    pub fn unique_count(&self) -> usize {
        let pool = self.active();
        let mut seen: Vec<&str> = Vec::with_capacity(pool.len());
        for label in pool {
            if !seen.contains(&label.as_str()) {
                seen.push(label);
            }
        }
        seen.len()
    }

    /// Map a run's draw indices to the active pool's labels, in draw order.
    /// Out-of-range indices are skipped; they can only arise when the pool
    /// was edited under a live sequence, which the running guards forbid.
    #[must_use]
    pub fn labels_for(&self, run: &Run) -> Vec<String> {
        let pool = self.active();
        run.draws()
            .iter()
            .filter_map(|&i| pool.get(i).cloned())
            .collect()
    }
}

/// Stable first-occurrence grouping, in place.
///
/// Walk the pool in original order; if an equal element already appears in the
/// output, insert the new element immediately before that element's first
/// occurrence; otherwise append. Duplicates end up adjacent while the relative
/// order of first appearances is preserved: `["a", "b", "a"]` becomes
/// `["a", "a", "b"]`.
pub fn group_by_first_occurrence(pool: &mut Vec<String>) {
    let mut grouped: Vec<String> = Vec::with_capacity(pool.len());
    for label in pool.iter() {
        match grouped.iter().position(|g| g == label) {
            Some(first) => grouped.insert(first, label.clone()),
            None => grouped.push(label.clone()),
        }
    }
    *pool = grouped;
}
