//! Client-side text helpers: math splitting for rendering and cleanup for speech.

pub mod math;
pub mod speech;

pub use math::{Segment, split_math};
pub use speech::{question_readout, speakable_text, verbalize_latex};
