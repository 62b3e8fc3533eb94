/// Ranking Module
///
/// Runs a configured set of scoring features over one candidate batch and
/// composes their outputs into a final score per candidate.
///
/// # Composition
/// - **Additive** features are summed into the base score (empty sum = 0)
/// - **Multiplicative** features are applied on top of it (empty product = 1)
///
/// Every candidate carries a rubric listing each feature's raw value, in
/// configured order, so the final score can be rebuilt from the rubric alone.
pub mod scorer;

pub use scorer::{compose, FeaturePipeline};
