// LLM filtering: criteria, prompt, per-candidate worker, and the bounded fan-out
// that partitions candidates into matched and rejected.
// All model calls go through llm_client via the Classifier trait.

pub mod criteria;
pub mod engine;
pub mod prompts;
pub mod verdict;
pub mod worker;
