//! Route module for pattern parsing
//!
//! Splits route patterns into typed segments and scores their specificity.
//! Pure functions only; the automaton is grown by the recognizer.

pub mod parser;
pub mod segment;

pub use parser::{classify_segment, parse_route, ParsedRoute, Specificity};
pub use segment::{Segment, DYNAMIC_FRAGMENT, STAR_FRAGMENT};
