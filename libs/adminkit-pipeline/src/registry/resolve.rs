//! Ordering of one phase's callbacks.
//!
//! Two passes. Placement walks entries in registration order and puts each
//! one immediately before or after its anchor, placing the anchor first;
//! unconstrained entries append. Placement never reorders entries already
//! placed, so a single constraint per entry always holds afterwards. A stable
//! topological pass then enforces every constraint (entries carrying both
//! `before` and `after`) and detects cycles, preferring placement order
//! whenever several entries are ready.

use std::collections::{BTreeSet, HashMap};

use tracing::warn;

use super::Entry;
use crate::callback::Phase;
use crate::error::RegistryError;

#[derive(Debug, Clone, Copy, Default)]
struct Anchors {
    before: Option<usize>,
    after: Option<usize>,
}

/// Indices into `entries` in execution order. Removed entries are included;
/// they order others but are filtered out by the caller.
pub(super) fn resolve(phase: Phase, entries: &[Entry]) -> Result<Vec<usize>, RegistryError> {
    let index: HashMap<&str, usize> = entries
        .iter()
        .enumerate()
        .map(|(i, e)| (e.processor.name.as_str(), i))
        .collect();

    let lookup = |owner: &Entry, anchor: Option<&String>| {
        let name = anchor?;
        let found = index.get(name.as_str()).copied();
        if found.is_none() {
            warn!(%phase, callback = %owner.processor.name, anchor = %name, "unknown callback anchor ignored");
        }
        found
    };
    let anchors: Vec<Anchors> = entries
        .iter()
        .map(|e| Anchors {
            before: lookup(e, e.processor.before.as_ref()),
            after: lookup(e, e.processor.after.as_ref()),
        })
        .collect();

    let mut placement = Placement {
        anchors: &anchors,
        order: Vec::with_capacity(entries.len()),
        placed: vec![false; entries.len()],
        visiting: vec![false; entries.len()],
    };
    for i in 0..entries.len() {
        placement.place(i);
    }

    stable_topological(phase, entries, &anchors, &placement.order)
}

struct Placement<'a> {
    anchors: &'a [Anchors],
    order: Vec<usize>,
    placed: Vec<bool>,
    visiting: Vec<bool>,
}

impl Placement<'_> {
    fn position(&self, i: usize) -> Option<usize> {
        self.order.iter().position(|&x| x == i)
    }

    fn place(&mut self, i: usize) {
        if self.placed[i] || self.visiting[i] {
            return;
        }
        self.visiting[i] = true;

        let Anchors { before, after } = self.anchors[i];
        if let Some(anchor) = before.or(after) {
            self.place(anchor);
        }
        // An anchor still unplaced here sits on a cycle; the topological pass
        // reports it.
        let at = match (before, after) {
            (Some(b), _) => self.position(b),
            (None, Some(a)) => self.position(a).map(|p| p + 1),
            (None, None) => None,
        };
        match at {
            Some(p) => self.order.insert(p, i),
            None => self.order.push(i),
        }
        self.placed[i] = true;
    }
}

fn stable_topological(
    phase: Phase,
    entries: &[Entry],
    anchors: &[Anchors],
    placement: &[usize],
) -> Result<Vec<usize>, RegistryError> {
    let n = entries.len();
    let mut rank = vec![0; n];
    for (r, &i) in placement.iter().enumerate() {
        rank[i] = r;
    }

    let mut successors: Vec<Vec<usize>> = vec![Vec::new(); n];
    let mut in_degree = vec![0usize; n];
    for (i, anchor) in anchors.iter().enumerate() {
        if let Some(b) = anchor.before {
            successors[i].push(b);
            in_degree[b] += 1;
        }
        if let Some(a) = anchor.after {
            successors[a].push(i);
            in_degree[i] += 1;
        }
    }

    let mut ready: BTreeSet<(usize, usize)> = (0..n)
        .filter(|&i| in_degree[i] == 0)
        .map(|i| (rank[i], i))
        .collect();
    let mut out = Vec::with_capacity(n);
    while let Some((_, i)) = ready.pop_first() {
        out.push(i);
        for &s in &successors[i] {
            in_degree[s] -= 1;
            if in_degree[s] == 0 {
                ready.insert((rank[s], s));
            }
        }
    }

    if out.len() < n {
        let names = (0..n)
            .filter(|&i| in_degree[i] > 0)
            .map(|i| entries[i].processor.name.clone())
            .collect();
        return Err(RegistryError::Cycle { phase, names });
    }
    Ok(out)
}
