/// Deliverable catalog CRUD and config seeding
pub mod catalog;

/// Project membership, notifications and the access gate
pub mod member;

/// Package lookup and quotes
pub mod package;

/// Points, hours and price computation
pub mod pricing;

/// Projects, backing documents and access checks
pub mod project;

/// Package purchase flow
pub mod purchase;

/// Sprint drafts and daily updates
pub mod sprint;

/// AI-drafted daily sprint summary
pub mod summary;

/// Admin task board
pub mod task;
