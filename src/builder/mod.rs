//! Build planning.
//!
//! Turns a resolved registry into the actions an external scheduler runs:
//! API dumps, their checks, and binding generation.

pub mod action;
pub mod plan;

pub use action::{Action, ActionError, ActionGraph, ActionKind};
pub use plan::{gen_flags, plan, Planner, FREEZE_ALL};
