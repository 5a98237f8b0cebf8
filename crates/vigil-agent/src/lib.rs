//! `vigil-agent` – the decision-and-action core.
//!
//! One externally-clocked cycle runs perception, priority decision and
//! execution in order:
//!
//! 1. **Drain** – due deferred tasks from the [`tasks::TaskQueue`] run first;
//!    started background work keeps going even while the agent is toggled
//!    off.
//! 2. **Observe/learn** – while the agent is off, idle motion is sampled by
//!    the [`learner::MovementLearner`].
//! 3. **Pre-empt** – the fall-damage override and the safety pauses can
//!    short-circuit the whole cycle.
//! 4. **Decide** – the [`planner::Planner`] scans the vicinity and vitals and
//!    emits exactly one [`Decision`][vigil_types::Decision].
//! 5. **Act** – the [`executor::ActionExecutor`] executes it under the global
//!    cooldown, the [`movement::MovementController`] synthesizes locomotion,
//!    and the [`automation::AutomationManager`] runs its own furnace
//!    schedule.
//!
//! The [`agent::Agent`] driver owns every component plus the world link; it
//! is the explicit context object – there are no ambient statics anywhere.

pub mod agent;
pub mod automation;
pub mod config;
pub mod executor;
pub mod learner;
pub mod movement;
pub mod planner;
pub mod tasks;

pub use agent::Agent;
pub use automation::AutomationManager;
pub use config::AgentConfig;
pub use executor::ActionExecutor;
pub use learner::MovementLearner;
pub use movement::MovementController;
pub use planner::Planner;
pub use tasks::{DeferredTask, TaskOutcome, TaskQueue};
