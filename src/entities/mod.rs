//! Entity module - Contains all SeaORM entity definitions for the database.
//! These entities represent the database tables and their relationships.
//! Each entity has a Model struct for data and an Entity struct for operations.

pub mod admin_task;
pub mod admin_task_event;
pub mod deliverable;
pub mod document;
pub mod project;
pub mod project_member;
pub mod sprint_daily_update;
pub mod sprint_deliverable;
pub mod sprint_draft;
pub mod sprint_package;
pub mod sprint_package_deliverable;
pub mod user;

// Re-export specific types to avoid conflicts
pub use admin_task::{Column as AdminTaskColumn, Entity as AdminTask, Model as AdminTaskModel};
pub use admin_task_event::{
    Column as AdminTaskEventColumn, Entity as AdminTaskEvent, Model as AdminTaskEventModel,
};
pub use deliverable::{
    Column as DeliverableColumn, Entity as Deliverable, Model as DeliverableModel,
};
pub use document::{Column as DocumentColumn, Entity as Document, Model as DocumentModel};
pub use project::{Column as ProjectColumn, Entity as Project, Model as ProjectModel};
pub use project_member::{
    Column as ProjectMemberColumn, Entity as ProjectMember, Model as ProjectMemberModel,
};
pub use sprint_daily_update::{
    Column as SprintDailyUpdateColumn, Entity as SprintDailyUpdate,
    Model as SprintDailyUpdateModel,
};
pub use sprint_deliverable::{
    Column as SprintDeliverableColumn, Entity as SprintDeliverable,
    Model as SprintDeliverableModel,
};
pub use sprint_draft::{
    Column as SprintDraftColumn, Entity as SprintDraft, Model as SprintDraftModel,
};
pub use sprint_package::{
    Column as SprintPackageColumn, Entity as SprintPackage, Model as SprintPackageModel,
};
pub use sprint_package_deliverable::{
    Column as SprintPackageDeliverableColumn, Entity as SprintPackageDeliverable,
    Model as SprintPackageDeliverableModel,
};
pub use user::{Column as UserColumn, Entity as User, Model as UserModel};
