//! The request-routing pipeline.
//!
//! Every request goes through the same fixed stages:
//!
//! 1. **Classify** the message into an [`Intent`](wayfinder_core::Intent)
//!    (rule table first, language model only for ambiguous questions)
//! 2. **Plan** an ordered list of tool steps, after checking which source
//!    materials are ready
//! 3. **Dispatch** the current step's tool and record its result
//! 4. **Reflect**: the governor enforces budgets and decides whether to
//!    retry, continue, inject a research fallback, or stop
//!
//! Steps 3 and 4 repeat until the governor says to respond.

pub mod classifier;
pub mod governor;
pub mod loop_runner;
pub mod planner;

#[cfg(test)]
mod test_helpers;

pub use classifier::{Classification, IntentClassifier, parse_label};
pub use governor::{LoopDirective, Reflection, ReflectionGovernor};
pub use loop_runner::{Pipeline, PipelineOutcome};
pub use planner::PlanBuilder;
