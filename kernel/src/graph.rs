//! Search-state graph: the structure a token-passing decoder walks.
//!
//! States live in an arena addressed by [`StateId`]. Each state is a closed
//! tagged variant ([`StateKindV1`]) plus explicit capability flags, so the
//! decoder dispatches by pattern matching instead of inspecting types.
//! Arc weights are already in the natural-log domain.
//!
//! Graphs are assembled with [`SearchGraphBuilder`]; `build()` is the only
//! place structural errors surface. A built graph is assumed well formed at
//! decode time.

use thiserror::Error;

use crate::proof::canon::{canonical_json_bytes, score_bits, CanonError};
use crate::proof::hash::{canonical_hash, ContentHash};
use crate::proof::hash_domain::HashDomain;
use crate::unit::UnitV1;

/// Index of a state in its [`SearchGraphV1`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StateId(pub u32);

impl StateId {
    /// The arena index as `usize`.
    #[must_use]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl std::fmt::Display for StateId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "s{}", self.0)
    }
}

/// What a state stands for in the recognition network.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StateKindV1 {
    /// Utterance entry point.
    Initial,
    /// Grammar node (pure structure).
    Grammar { label: String },
    /// Word boundary state.
    Word { spelling: String, is_filler: bool },
    /// Pronunciation of a word.
    Pronunciation { spelling: String },
    /// Phonetic unit entry.
    Unit(UnitV1),
    /// HMM state scored against audio frames via its senone.
    Hmm { senone: u32, unit_name: String },
    /// Utterance exit point.
    Final,
}

impl StateKindV1 {
    /// Stable lower-case name of the variant, used in exports.
    #[must_use]
    pub fn tag(&self) -> &'static str {
        match self {
            Self::Initial => "initial",
            Self::Grammar { .. } => "grammar",
            Self::Word { .. } => "word",
            Self::Pronunciation { .. } => "pronunciation",
            Self::Unit(_) => "unit",
            Self::Hmm { .. } => "hmm",
            Self::Final => "final",
        }
    }

    /// Whether states of this kind emit by default.
    #[must_use]
    pub fn emits_by_default(&self) -> bool {
        matches!(self, Self::Hmm { .. })
    }
}

/// How incoming paths into a state are merged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StateSemanticsV1 {
    /// Keep the best incoming path (Viterbi).
    #[default]
    Compete,
    /// Sum incoming path probabilities.
    Combine,
}

/// An outgoing transition with its pre-computed log weights.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchStateArcV1 {
    pub target: StateId,
    pub acoustic_log_prob: f32,
    pub language_log_prob: f32,
    pub insertion_log_prob: f32,
}

impl SearchStateArcV1 {
    /// Total log weight of the arc.
    #[must_use]
    pub fn log_prob(&self) -> f32 {
        self.acoustic_log_prob + self.language_log_prob + self.insertion_log_prob
    }
}

/// One state of the search graph.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchStateV1 {
    pub id: StateId,
    pub kind: StateKindV1,
    /// Must be scored against an audio frame.
    pub emitting: bool,
    /// Reaching this state completes an utterance.
    pub is_final: bool,
    /// Distinct incoming contexts are kept apart rather than merged.
    pub is_fan_in: bool,
    pub semantics: StateSemanticsV1,
    pub arcs: Vec<SearchStateArcV1>,
}

impl SearchStateV1 {
    /// The phonetic unit if this is a unit state.
    #[must_use]
    pub fn unit(&self) -> Option<&UnitV1> {
        match &self.kind {
            StateKindV1::Unit(unit) => Some(unit),
            _ => None,
        }
    }

    /// Whether this is a word state.
    #[must_use]
    pub fn is_word(&self) -> bool {
        matches!(self.kind, StateKindV1::Word { .. })
    }

    /// Whether this state merges incoming paths by summation.
    #[must_use]
    pub fn is_combine(&self) -> bool {
        self.semantics == StateSemanticsV1::Combine
    }
}

/// Structural failures detected while building a graph.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
    /// The graph has no states.
    #[error("search graph has no states")]
    Empty,
    /// A reference points past the end of the state arena.
    #[error("unknown state {state} referenced from {referenced_from}")]
    UnknownState {
        state: StateId,
        referenced_from: String,
    },
    /// An arc weight is NaN.
    #[error("arc {from} -> {to} has a NaN weight")]
    NanWeight { from: StateId, to: StateId },
    /// More states than a `StateId` can address.
    #[error("state arena overflow")]
    TooManyStates,
}

/// An immutable, validated search graph.
#[derive(Debug, Clone)]
pub struct SearchGraphV1 {
    states: Vec<SearchStateV1>,
    initial: StateId,
}

impl SearchGraphV1 {
    /// The utterance entry state.
    #[must_use]
    pub fn initial_state(&self) -> &SearchStateV1 {
        &self.states[self.initial.index()]
    }

    /// Look up a state. Returns `None` for ids from another graph.
    #[must_use]
    pub fn state(&self, id: StateId) -> Option<&SearchStateV1> {
        self.states.get(id.index())
    }

    /// All states in id order.
    #[must_use]
    pub fn states(&self) -> &[SearchStateV1] {
        &self.states
    }

    /// Number of states.
    #[must_use]
    pub fn len(&self) -> usize {
        self.states.len()
    }

    /// Always `false` for a built graph; present for API symmetry.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    /// JSON description of the graph. Arc weights are written as bits.
    #[must_use]
    pub fn to_json_value(&self) -> serde_json::Value {
        let states: Vec<serde_json::Value> = self.states.iter().map(state_json).collect();
        serde_json::json!({
            "initial": self.initial.0,
            "states": states,
        })
    }

    /// Content hash of the canonical graph description.
    ///
    /// # Errors
    ///
    /// Returns [`CanonError`] if canonicalization fails.
    pub fn digest(&self) -> Result<ContentHash, CanonError> {
        let bytes = canonical_json_bytes(&self.to_json_value())?;
        Ok(canonical_hash(HashDomain::SearchGraph, &bytes))
    }
}

fn state_json(state: &SearchStateV1) -> serde_json::Value {
    let arcs: Vec<serde_json::Value> = state
        .arcs
        .iter()
        .map(|a| {
            serde_json::json!({
                "acoustic_bits": score_bits(a.acoustic_log_prob),
                "insertion_bits": score_bits(a.insertion_log_prob),
                "language_bits": score_bits(a.language_log_prob),
                "target": a.target.0,
            })
        })
        .collect();
    let detail = match &state.kind {
        StateKindV1::Initial | StateKindV1::Final => serde_json::Value::Null,
        StateKindV1::Grammar { label } => serde_json::json!({ "label": label }),
        StateKindV1::Word {
            spelling,
            is_filler,
        } => serde_json::json!({ "is_filler": is_filler, "spelling": spelling }),
        StateKindV1::Pronunciation { spelling } => serde_json::json!({ "spelling": spelling }),
        StateKindV1::Unit(unit) => serde_json::json!({
            "left": unit.left_context,
            "name": unit.name,
            "right": unit.right_context,
        }),
        StateKindV1::Hmm { senone, unit_name } => {
            serde_json::json!({ "senone": senone, "unit": unit_name })
        }
    };
    serde_json::json!({
        "arcs": arcs,
        "combine": state.is_combine(),
        "detail": detail,
        "emitting": state.emitting,
        "fan_in": state.is_fan_in,
        "final": state.is_final,
        "id": state.id.0,
        "kind": state.kind.tag(),
    })
}

/// Incremental graph construction.
///
/// ```
/// use tokenpass_kernel::graph::{SearchGraphBuilder, StateKindV1};
///
/// let mut b = SearchGraphBuilder::new();
/// let start = b.add_state(StateKindV1::Initial);
/// let end = b.add_state(StateKindV1::Final);
/// b.mark_final(end);
/// b.add_arc(start, end, 0.0, -1.0, 0.0);
/// let graph = b.build().unwrap();
/// assert_eq!(graph.len(), 2);
/// ```
#[derive(Debug, Default)]
pub struct SearchGraphBuilder {
    states: Vec<SearchStateV1>,
    initial: Option<StateId>,
    dangling: Vec<(StateId, StateId)>,
    overflow: bool,
}

impl SearchGraphBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a state with the kind's default emitting flag.
    ///
    /// The first state added becomes the initial state unless
    /// [`Self::set_initial`] says otherwise.
    pub fn add_state(&mut self, kind: StateKindV1) -> StateId {
        let Ok(raw) = u32::try_from(self.states.len()) else {
            self.overflow = true;
            return StateId(u32::MAX);
        };
        let id = StateId(raw);
        let emitting = kind.emits_by_default();
        let is_final = matches!(kind, StateKindV1::Final);
        self.states.push(SearchStateV1 {
            id,
            kind,
            emitting,
            is_final,
            is_fan_in: false,
            semantics: StateSemanticsV1::Compete,
            arcs: Vec::new(),
        });
        if self.initial.is_none() {
            self.initial = Some(id);
        }
        id
    }

    /// Shorthand for an emitting HMM state.
    pub fn add_hmm(&mut self, senone: u32, unit_name: &str) -> StateId {
        self.add_state(StateKindV1::Hmm {
            senone,
            unit_name: unit_name.to_string(),
        })
    }

    pub fn set_initial(&mut self, id: StateId) -> &mut Self {
        self.initial = Some(id);
        self
    }

    pub fn set_emitting(&mut self, id: StateId, emitting: bool) -> &mut Self {
        if let Some(s) = self.states.get_mut(id.index()) {
            s.emitting = emitting;
        }
        self
    }

    pub fn mark_final(&mut self, id: StateId) -> &mut Self {
        if let Some(s) = self.states.get_mut(id.index()) {
            s.is_final = true;
        }
        self
    }

    pub fn mark_fan_in(&mut self, id: StateId) -> &mut Self {
        if let Some(s) = self.states.get_mut(id.index()) {
            s.is_fan_in = true;
        }
        self
    }

    pub fn set_semantics(&mut self, id: StateId, semantics: StateSemanticsV1) -> &mut Self {
        if let Some(s) = self.states.get_mut(id.index()) {
            s.semantics = semantics;
        }
        self
    }

    /// Add an arc. Unknown endpoints are reported by [`Self::build`].
    pub fn add_arc(
        &mut self,
        from: StateId,
        to: StateId,
        acoustic_log_prob: f32,
        language_log_prob: f32,
        insertion_log_prob: f32,
    ) -> &mut Self {
        let arc = SearchStateArcV1 {
            target: to,
            acoustic_log_prob,
            language_log_prob,
            insertion_log_prob,
        };
        match self.states.get_mut(from.index()) {
            Some(s) => s.arcs.push(arc),
            None => self.dangling.push((from, to)),
        }
        self
    }

    /// Validate and freeze the graph.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError`] when the graph is empty, overflows the id
    /// space, references an unknown state, or carries a NaN arc weight.
    pub fn build(self) -> Result<SearchGraphV1, GraphError> {
        if self.overflow {
            return Err(GraphError::TooManyStates);
        }
        let Some(initial) = self.initial else {
            return Err(GraphError::Empty);
        };
        if let Some(&(from, _)) = self.dangling.first() {
            return Err(GraphError::UnknownState {
                state: from,
                referenced_from: "arc source".into(),
            });
        }
        let count = self.states.len();
        if initial.index() >= count {
            return Err(GraphError::UnknownState {
                state: initial,
                referenced_from: "initial state".into(),
            });
        }
        for state in &self.states {
            for arc in &state.arcs {
                if arc.target.index() >= count {
                    return Err(GraphError::UnknownState {
                        state: arc.target,
                        referenced_from: state.id.to_string(),
                    });
                }
                if arc.acoustic_log_prob.is_nan()
                    || arc.language_log_prob.is_nan()
                    || arc.insertion_log_prob.is_nan()
                {
                    return Err(GraphError::NanWeight {
                        from: state.id,
                        to: arc.target,
                    });
                }
            }
        }
        Ok(SearchGraphV1 {
            states: self.states,
            initial,
        })
    }
}
