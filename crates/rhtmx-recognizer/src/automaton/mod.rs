//! Character-driven state graph
//!
//! States live in one arena and refer to each other by [`StateId`]. Every edge is
//! owned by its target state (the [`CharSpec`] it was entered through), so a state's
//! children are just indices. Variable-length captures are a single state listing
//! itself as a child; apart from those self loops the graph is acyclic.

use std::sync::Arc;

use regex::Regex;

use crate::route::Specificity;
use crate::Handler;

/// Index of a state inside the automaton arena
pub type StateId = usize;

/// The root state, entered through an empty allow-set
pub const ROOT: StateId = 0;

/// Set of characters an edge accepts
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CharClass {
    /// Only the listed characters
    Allow(String),
    /// Anything except the listed characters
    Deny(String),
}

/// Predicate over exactly one input character
///
/// Equality ignores `repeat`: two specs are the same edge when they accept the
/// same characters.
#[derive(Debug, Clone)]
pub struct CharSpec {
    class: CharClass,
    repeat: bool,
}

impl CharSpec {
    pub fn allow(chars: impl Into<String>) -> Self {
        Self {
            class: CharClass::Allow(chars.into()),
            repeat: false,
        }
    }

    pub fn deny(chars: impl Into<String>) -> Self {
        Self {
            class: CharClass::Deny(chars.into()),
            repeat: false,
        }
    }

    /// Marks the spec as self-looping: the created state may consume further
    /// characters of the same class
    pub fn repeating(mut self) -> Self {
        self.repeat = true;
        self
    }

    pub fn matches(&self, ch: char) -> bool {
        match &self.class {
            CharClass::Allow(chars) => chars.contains(ch),
            CharClass::Deny(chars) => !chars.contains(ch),
        }
    }
}

impl PartialEq for CharSpec {
    fn eq(&self, other: &Self) -> bool {
        self.class == other.class
    }
}

impl Eq for CharSpec {}

/// Data attached to a state that terminates one registered batch
#[derive(Debug)]
pub struct Accepting<H> {
    /// Anchored pattern with one capture group per parameter across all handlers
    pub pattern: Regex,
    pub handlers: Arc<[Handler<H>]>,
    pub specificity: Specificity,
}

#[derive(Debug)]
pub struct State<H> {
    spec: CharSpec,
    next: Vec<StateId>,
    accepting: Option<Accepting<H>>,
}

impl<H> State<H> {
    fn new(spec: CharSpec) -> Self {
        Self {
            spec,
            next: Vec::new(),
            accepting: None,
        }
    }

    pub fn accepting(&self) -> Option<&Accepting<H>> {
        self.accepting.as_ref()
    }
}

/// Arena of states built up by successive registrations
#[derive(Debug)]
pub struct Automaton<H> {
    states: Vec<State<H>>,
}

impl<H> Automaton<H> {
    pub fn new() -> Self {
        Self {
            states: vec![State::new(CharSpec::allow(""))],
        }
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn state(&self, id: StateId) -> &State<H> {
        &self.states[id]
    }

    /// Finds a child of `from` entered through an equal spec
    pub fn find(&self, from: StateId, spec: &CharSpec) -> Option<StateId> {
        self.states[from]
            .next
            .iter()
            .copied()
            .find(|&child| self.states[child].spec == *spec)
    }

    /// Returns the child of `from` for `spec`, creating it when no equal edge exists
    ///
    /// A newly created repeating state lists itself as its first child.
    pub fn put(&mut self, from: StateId, spec: CharSpec) -> StateId {
        if let Some(existing) = self.find(from, &spec) {
            return existing;
        }

        let id = self.states.len();
        let mut state = State::new(spec);
        if state.spec.repeat {
            state.next.push(id);
        }
        self.states.push(state);
        self.states[from].next.push(id);
        id
    }

    /// Advances every frontier state over `ch`, returning the de-duplicated union
    pub fn step(&self, frontier: &[StateId], ch: char) -> Vec<StateId> {
        let mut next = Vec::new();
        for &id in frontier {
            for &child in &self.states[id].next {
                if self.states[child].spec.matches(ch) && !next.contains(&child) {
                    next.push(child);
                }
            }
        }
        next
    }

    /// Runs the whole input from the root; an empty result means no path through the graph
    pub fn walk(&self, input: &str) -> Vec<StateId> {
        let mut frontier = vec![ROOT];
        for ch in input.chars() {
            frontier = self.step(&frontier, ch);
            if frontier.is_empty() {
                break;
            }
        }
        frontier
    }

    pub fn set_accepting(&mut self, id: StateId, accepting: Accepting<H>) {
        if self.states[id].accepting.is_some() {
            tracing::debug!("Replacing handlers on accepting state {}", id);
        }
        self.states[id].accepting = Some(accepting);
    }
}

impl<H> Default for Automaton<H> {
    fn default() -> Self {
        Self::new()
    }
}
