//! Step catalog, transition resolution, and single and bulk step changes for
//! alerts and cases.

pub mod bulk;
pub mod catalog;
pub mod changer;
pub mod postgres;
pub mod steps;
pub mod store;

pub use bulk::{BulkOutcome, BulkStepChangeRequest, BulkStepChangeResponse, BulkStepChanger};
pub use catalog::StepCatalog;
pub use changer::StepChanger;
pub use store::{AuditSink, StepRepository, UserRepository, WorkItemStore};

pub use crate::models::work_item::{EntityId, EntityKind};
