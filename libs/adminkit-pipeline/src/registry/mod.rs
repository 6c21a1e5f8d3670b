//! Process-wide callback registry.
//!
//! Mutations (`register`, `replace`, `remove`) serialize on a write lock and
//! re-resolve the affected phase; the resolved chains are published through
//! `ArcSwap` so operations read them without locking. A mutation that would
//! create an ordering cycle is rejected and the previous chains stay in force.

mod resolve;

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;

use arc_swap::ArcSwap;
use parking_lot::RwLock;
use tracing::{debug, warn};

use crate::callback::{Callback, Phase, Processor};
use crate::error::RegistryError;

#[derive(Clone)]
struct Entry {
    processor: Processor,
    /// Excluded from execution; still usable as an anchor.
    removed: bool,
}

/// A callback of a resolved chain.
#[derive(Clone)]
pub struct ResolvedCallback {
    pub name: String,
    pub handler: Arc<dyn Callback>,
}

impl fmt::Debug for ResolvedCallback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolvedCallback")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

type Chains = BTreeMap<Phase, Arc<[ResolvedCallback]>>;

#[derive(Default)]
struct State {
    phases: BTreeMap<Phase, Vec<Entry>>,
    duplicates: BTreeSet<(Phase, String)>,
}

pub struct CallbackRegistry {
    state: RwLock<State>,
    chains: ArcSwap<Chains>,
}

impl Default for CallbackRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl CallbackRegistry {
    /// Empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: RwLock::new(State::default()),
            chains: ArcSwap::from_pointee(Chains::new()),
        }
    }

    /// Registry holding the built-in `adminkit:` callbacks of every phase.
    #[must_use]
    pub fn with_builtins() -> Self {
        let registry = Self::new();
        crate::builtin::register_all(&registry);
        registry
    }

    /// Register `processor`. Registering a name twice in a phase warns,
    /// records the name in [`CallbackRegistry::duplicates`] and replaces the
    /// earlier handler and constraints in place.
    ///
    /// # Errors
    /// [`RegistryError::EmptyName`] for a blank name, [`RegistryError::Cycle`]
    /// if the constraints cannot be satisfied.
    pub fn register(&self, processor: Processor) -> Result<(), RegistryError> {
        if processor.name.trim().is_empty() {
            return Err(RegistryError::EmptyName);
        }
        let phase = processor.phase;
        let name = processor.name.clone();
        let duplicate = self.mutate(phase, |entries| {
            if let Some(existing) = entries.iter_mut().find(|e| e.processor.name == name) {
                *existing = Entry {
                    processor,
                    removed: false,
                };
                true
            } else {
                entries.push(Entry {
                    processor,
                    removed: false,
                });
                false
            }
        })?;
        if duplicate {
            warn!(%phase, callback = %name, "duplicate callback registration; last one wins");
            self.state.write().duplicates.insert((phase, name));
        }
        Ok(())
    }

    /// Swap the handler of `name`, keeping its position and constraints. An
    /// unknown name is registered without constraints.
    ///
    /// # Errors
    /// [`RegistryError::EmptyName`] for a blank name.
    pub fn replace(
        &self,
        phase: Phase,
        name: &str,
        handler: Arc<dyn Callback>,
    ) -> Result<(), RegistryError> {
        if name.trim().is_empty() {
            return Err(RegistryError::EmptyName);
        }
        self.mutate(phase, |entries| {
            if let Some(existing) = entries.iter_mut().find(|e| e.processor.name == name) {
                existing.processor.handler = handler;
                existing.removed = false;
            } else {
                entries.push(Entry {
                    processor: Processor::new(phase, name, handler),
                    removed: false,
                });
            }
        })
    }

    /// Exclude `name` from execution. It keeps anchoring other callbacks.
    ///
    /// # Errors
    /// Never fails for a known name; kept fallible like the other mutations.
    pub fn remove(&self, phase: Phase, name: &str) -> Result<(), RegistryError> {
        self.mutate(phase, |entries| {
            match entries.iter_mut().find(|e| e.processor.name == name) {
                Some(existing) => existing.removed = true,
                None => warn!(%phase, callback = %name, "remove of unknown callback ignored"),
            }
        })
    }

    /// The resolved chain of `phase`.
    #[must_use]
    pub fn chain(&self, phase: Phase) -> Arc<[ResolvedCallback]> {
        self.chains
            .load()
            .get(&phase)
            .cloned()
            .unwrap_or_else(|| Arc::from(Vec::new()))
    }

    /// Names of the resolved chain of `phase`, in execution order.
    #[must_use]
    pub fn names(&self, phase: Phase) -> Vec<String> {
        self.chain(phase).iter().map(|c| c.name.clone()).collect()
    }

    /// Names registered more than once.
    #[must_use]
    pub fn duplicates(&self) -> Vec<(Phase, String)> {
        self.state.read().duplicates.iter().cloned().collect()
    }

    /// Apply `f` to a copy of the phase's entries, resolve, and publish.
    /// Nothing changes if resolution fails.
    fn mutate<T>(
        &self,
        phase: Phase,
        f: impl FnOnce(&mut Vec<Entry>) -> T,
    ) -> Result<T, RegistryError> {
        let mut state = self.state.write();
        let mut entries = state.phases.get(&phase).cloned().unwrap_or_default();
        let out = f(&mut entries);

        let order = resolve::resolve(phase, &entries)?;
        let chain: Arc<[ResolvedCallback]> = order
            .into_iter()
            .map(|i| &entries[i])
            .filter(|e| !e.removed)
            .map(|e| ResolvedCallback {
                name: e.processor.name.clone(),
                handler: e.processor.handler.clone(),
            })
            .collect();
        debug!(%phase, callbacks = chain.len(), "callback chain resolved");

        state.phases.insert(phase, entries);
        let mut chains = Chains::clone(&self.chains.load());
        chains.insert(phase, chain);
        self.chains.store(Arc::new(chains));
        Ok(out)
    }
}
