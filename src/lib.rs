pub mod commands;
pub mod modules;

pub use modules::backup::BackupVault;
pub use modules::common::config::SweeperConfig;
pub use modules::common::error::{ErrorClass, SweeperError};
pub use modules::diff::{ChangeSet, InstallRecord};
pub use modules::remover::{PlanReport, PlanStatus, RemovalPlan, StepAction, StepStatus};
pub use modules::scanner::{Fingerprint, Leftover, LeftoverKind};
pub use modules::snapshot::{Snapshot, SnapshotScope};
