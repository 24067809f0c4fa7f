//! Project tracker - console CRUD over a local SQLite store
//!
//! Track DIY projects with estimated and actual hours, a difficulty rating,
//! notes, and the materials, steps and categories that belong to them.
//!
//! # Layers
//!
//! | Layer | Module | Purpose |
//! |-------|--------|---------|
//! | Interactive shell | [`shell`] | Menu loop, prompts, selected-project session |
//! | Domain service | [`service`] | Turns missing rows into `NotFound` |
//! | Record access | [`db`] | Transactions, statements, row mapping |
//!
//! # Quick Start
//!
//! ```no_run
//! use project_tracker::{Database, Project, ProjectService};
//! use rust_decimal::Decimal;
//!
//! let db = Database::open_at("projects.db").unwrap();
//! let service = ProjectService::new(db);
//!
//! let created = service
//!     .add_project(&Project::new("Build deck").with_estimated_hours(Decimal::new(105, 1)))
//!     .unwrap();
//!
//! let project = service.fetch_project_by_id(created.project_id.unwrap()).unwrap();
//! println!("{}", project);
//! ```

pub mod config;
pub mod db;
pub mod model;
pub mod schema;
pub mod service;
pub mod shell;

pub use config::{Config, DatabaseConfig};
pub use db::{Database, DbError, WriteOutcome};
pub use model::{checked_round_amount, round_amount, Category, Material, Project, Step};
pub use service::{ProjectService, ServiceError};
pub use shell::{Session, Shell};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_public_exports() {
        // Verify core types are re-exported from crate root
        let _ = Session::default();
        let _ = Config::default();
        assert_eq!(WriteOutcome::Applied, db::WriteOutcome::Applied);
    }
}
