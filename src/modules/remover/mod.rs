pub mod actions;
pub mod conflict;
pub mod execute;
pub mod models;
pub mod plan;
pub mod reboot;
pub mod safety;
pub mod store;

pub use actions::SystemRunner;
pub use execute::{execute_plan, ActionRunner, StepVault};
pub use models::{
    CancelFlag, PlanReport, PlanStatus, RemovalPlan, RemovalStep, StepAction, StepStatus,
};
pub use plan::build_plan;
pub use store::PlanStore;
