//! Orchestrator scenario tests with in-process doubles.

mod doubles;
mod orchestrator;
