// Candidate/job matching: qualitative evaluation, score combination, the
// analysis cache and the orchestrator that runs them per match request.

pub mod cache;
pub mod combiner;
pub mod evaluator;
pub mod handlers;
pub mod orchestrator;
pub mod prompts;

#[cfg(test)]
pub mod testing;
