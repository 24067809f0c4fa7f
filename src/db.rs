//! SQLite record access with Diesel ORM
//!
//! Every public operation borrows one pooled connection for its own duration
//! and runs inside a transaction: commit on success, rollback on any error.
//! Rows are mapped to the plain records in [`crate::model`] field by field.

use crate::config::DatabaseConfig;
use crate::model::{checked_round_amount, round_amount, Category, Material, Project, Step};
use crate::schema;
use diesel::connection::SimpleConnection;
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, CustomizeConnection, Pool, PooledConnection};
use diesel::sqlite::SqliteConnection;
use rust_decimal::Decimal;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

// ============================================================================
// Diesel Models
// ============================================================================

/// Queryable project row
#[derive(Queryable, Selectable, Debug, Clone)]
#[diesel(table_name = schema::project)]
pub struct ProjectRow {
    pub project_id: i32,
    pub project_name: String,
    pub estimated_hours: Option<String>,
    pub actual_hours: Option<String>,
    pub difficulty: Option<i32>,
    pub notes: Option<String>,
}

/// The five scalar project columns, used for both insert and full-replace update.
/// `treat_none_as_null` makes an update clear a column rather than skip it.
#[derive(Insertable, AsChangeset)]
#[diesel(table_name = schema::project)]
#[diesel(treat_none_as_null = true)]
struct ProjectChanges<'a> {
    project_name: &'a str,
    estimated_hours: Option<String>,
    actual_hours: Option<String>,
    difficulty: Option<i32>,
    notes: Option<&'a str>,
}

impl<'a> TryFrom<&'a Project> for ProjectChanges<'a> {
    type Error = DbError;

    fn try_from(p: &'a Project) -> Result<Self> {
        Ok(Self {
            project_name: &p.project_name,
            estimated_hours: encode_amount("estimated_hours", p.estimated_hours)?,
            actual_hours: encode_amount("actual_hours", p.actual_hours)?,
            difficulty: p.difficulty,
            notes: p.notes.as_deref(),
        })
    }
}

/// Queryable material row
#[derive(Queryable, Selectable, Debug, Clone)]
#[diesel(table_name = schema::material)]
pub struct MaterialRow {
    pub material_id: i32,
    pub project_id: i32,
    pub material_name: String,
    pub num_required: Option<i32>,
    pub cost: Option<String>,
}

/// Insertable material row
#[derive(Insertable)]
#[diesel(table_name = schema::material)]
struct NewMaterial<'a> {
    project_id: i32,
    material_name: &'a str,
    num_required: Option<i32>,
    cost: Option<String>,
}

/// Queryable step row
#[derive(Queryable, Selectable, Debug, Clone)]
#[diesel(table_name = schema::step)]
pub struct StepRow {
    pub step_id: i32,
    pub project_id: i32,
    pub step_text: String,
    pub step_order: i32,
}

/// Insertable step row
#[derive(Insertable)]
#[diesel(table_name = schema::step)]
struct NewStep<'a> {
    project_id: i32,
    step_text: &'a str,
    step_order: i32,
}

/// Queryable category row
#[derive(Queryable, Selectable, Debug, Clone)]
#[diesel(table_name = schema::category)]
pub struct CategoryRow {
    pub category_id: i32,
    pub category_name: String,
}

/// Insertable category row
#[derive(Insertable)]
#[diesel(table_name = schema::category)]
struct NewCategory<'a> {
    category_name: &'a str,
}

/// Insertable join row
#[derive(Insertable)]
#[diesel(table_name = schema::project_category)]
struct NewProjectCategory {
    project_id: i32,
    category_id: i32,
}

// ============================================================================
// Row -> record mapping
// ============================================================================

fn encode_amount(column: &'static str, value: Option<Decimal>) -> Result<Option<String>> {
    value
        .map(|v| {
            checked_round_amount(v)
                .map(|rounded| rounded.to_string())
                .ok_or_else(|| DbError::Encode { column, value: v.to_string() })
        })
        .transpose()
}

fn decode_amount(column: &'static str, raw: Option<String>) -> Result<Option<Decimal>> {
    match raw {
        None => Ok(None),
        Some(raw) => match Decimal::from_str(raw.trim()) {
            Ok(value) => Ok(Some(round_amount(value))),
            Err(_) => Err(DbError::Decode { column, value: raw }),
        },
    }
}

impl TryFrom<ProjectRow> for Project {
    type Error = DbError;

    fn try_from(row: ProjectRow) -> Result<Self> {
        Ok(Project {
            project_id: Some(row.project_id),
            project_name: row.project_name,
            estimated_hours: decode_amount("estimated_hours", row.estimated_hours)?,
            actual_hours: decode_amount("actual_hours", row.actual_hours)?,
            difficulty: row.difficulty,
            notes: row.notes,
            materials: Vec::new(),
            steps: Vec::new(),
            categories: Vec::new(),
        })
    }
}

impl TryFrom<MaterialRow> for Material {
    type Error = DbError;

    fn try_from(row: MaterialRow) -> Result<Self> {
        Ok(Material {
            material_id: Some(row.material_id),
            project_id: Some(row.project_id),
            material_name: row.material_name,
            num_required: row.num_required,
            cost: decode_amount("cost", row.cost)?,
        })
    }
}

impl From<StepRow> for Step {
    fn from(row: StepRow) -> Self {
        Step {
            step_id: Some(row.step_id),
            project_id: Some(row.project_id),
            step_text: row.step_text,
            step_order: row.step_order,
        }
    }
}

impl From<CategoryRow> for Category {
    fn from(row: CategoryRow) -> Self {
        Category {
            category_id: Some(row.category_id),
            category_name: row.category_name,
        }
    }
}

// ============================================================================
// Errors and outcomes
// ============================================================================

/// Data-access fault: anything that went wrong at the storage boundary
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("Connection error: {0}")]
    Connection(String),
    #[error("Query error: {0}")]
    Query(#[from] diesel::result::Error),
    #[error("Pool error: {0}")]
    Pool(#[from] diesel::r2d2::PoolError),
    #[error("Stored {column} value '{value}' is not a valid decimal")]
    Decode { column: &'static str, value: String },
    #[error("{column} value {value} is too large to store with two decimal places")]
    Encode { column: &'static str, value: String },
}

pub type Result<T> = std::result::Result<T, DbError>;

/// Result of an identity-targeted write (update or delete)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    /// Exactly one row was affected
    Applied,
    /// No row has the given identity
    NotFound,
}

impl WriteOutcome {
    fn from_affected(rows: usize) -> Self {
        if rows == 1 {
            WriteOutcome::Applied
        } else {
            WriteOutcome::NotFound
        }
    }

    pub fn is_applied(self) -> bool {
        self == WriteOutcome::Applied
    }
}

// ============================================================================
// Database Connection
// ============================================================================

type DbPool = Pool<ConnectionManager<SqliteConnection>>;
type DbConn = PooledConnection<ConnectionManager<SqliteConnection>>;

/// Per-connection pragmas, applied whenever the pool opens a connection
#[derive(Debug)]
struct SqlitePragmas {
    busy_timeout_ms: u64,
}

impl CustomizeConnection<SqliteConnection, diesel::r2d2::Error> for SqlitePragmas {
    fn on_acquire(&self, conn: &mut SqliteConnection) -> std::result::Result<(), diesel::r2d2::Error> {
        conn.batch_execute(&format!(
            "PRAGMA foreign_keys = ON; PRAGMA busy_timeout = {};",
            self.busy_timeout_ms
        ))
        .map_err(diesel::r2d2::Error::QueryError)
    }
}

/// Database connection wrapper with connection pool
pub struct Database {
    pool: DbPool,
}

impl Database {
    /// Open database at specified path with default settings
    pub fn open_at<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::connect(&DatabaseConfig::at(path.as_ref()))
    }

    /// Open (creating if needed) the database described by `settings`
    pub fn connect(settings: &DatabaseConfig) -> Result<Self> {
        if let Some(parent) = settings.path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| DbError::Connection(format!("{}: {}", parent.display(), e)))?;
            }
        }

        let url = settings.path.to_string_lossy().to_string();
        let manager = ConnectionManager::<SqliteConnection>::new(&url);
        let pool = Pool::builder()
            .max_size(settings.pool_size.max(1))
            .connection_timeout(Duration::from_secs(5))
            .connection_customizer(Box::new(SqlitePragmas {
                busy_timeout_ms: settings.busy_timeout_ms,
            }))
            .build(manager)
            .map_err(|e| DbError::Connection(format!("unable to open {}: {}", url, e)))?;

        tracing::debug!(path = %url, "database opened");

        let db = Self { pool };
        db.init_schema()?;
        Ok(db)
    }

    fn get_conn(&self) -> Result<DbConn> {
        Ok(self.pool.get()?)
    }

    /// Run `f` inside a transaction on a freshly borrowed connection
    fn in_transaction<T, F>(&self, operation: &'static str, f: F) -> Result<T>
    where
        F: FnOnce(&mut SqliteConnection) -> Result<T>,
    {
        let mut pooled = self.get_conn()?;
        let conn: &mut SqliteConnection = &mut pooled;
        conn.transaction(f).map_err(|e| {
            tracing::warn!(operation, error = %e, "transaction rolled back");
            e
        })
    }

    fn init_schema(&self) -> Result<()> {
        self.in_transaction("init_schema", |conn| {
            diesel::sql_query(r#"
                CREATE TABLE IF NOT EXISTS project (
                    project_id INTEGER PRIMARY KEY AUTOINCREMENT NOT NULL,
                    project_name TEXT NOT NULL,
                    estimated_hours TEXT,
                    actual_hours TEXT,
                    difficulty INTEGER,
                    notes TEXT
                )
            "#).execute(conn)?;

            diesel::sql_query(r#"
                CREATE TABLE IF NOT EXISTS category (
                    category_id INTEGER PRIMARY KEY AUTOINCREMENT NOT NULL,
                    category_name TEXT NOT NULL UNIQUE
                )
            "#).execute(conn)?;

            diesel::sql_query(r#"
                CREATE TABLE IF NOT EXISTS material (
                    material_id INTEGER PRIMARY KEY AUTOINCREMENT NOT NULL,
                    project_id INTEGER NOT NULL,
                    material_name TEXT NOT NULL,
                    num_required INTEGER,
                    cost TEXT,
                    FOREIGN KEY (project_id) REFERENCES project(project_id) ON DELETE CASCADE
                )
            "#).execute(conn)?;

            diesel::sql_query(r#"
                CREATE TABLE IF NOT EXISTS step (
                    step_id INTEGER PRIMARY KEY AUTOINCREMENT NOT NULL,
                    project_id INTEGER NOT NULL,
                    step_text TEXT NOT NULL,
                    step_order INTEGER NOT NULL,
                    FOREIGN KEY (project_id) REFERENCES project(project_id) ON DELETE CASCADE
                )
            "#).execute(conn)?;

            diesel::sql_query(r#"
                CREATE TABLE IF NOT EXISTS project_category (
                    project_id INTEGER NOT NULL,
                    category_id INTEGER NOT NULL,
                    PRIMARY KEY (project_id, category_id),
                    FOREIGN KEY (project_id) REFERENCES project(project_id) ON DELETE CASCADE,
                    FOREIGN KEY (category_id) REFERENCES category(category_id) ON DELETE CASCADE
                )
            "#).execute(conn)?;

            diesel::sql_query("CREATE INDEX IF NOT EXISTS idx_material_project ON material(project_id)").execute(conn)?;
            diesel::sql_query("CREATE INDEX IF NOT EXISTS idx_step_project ON step(project_id)").execute(conn)?;
            diesel::sql_query("CREATE INDEX IF NOT EXISTS idx_project_category_category ON project_category(category_id)").execute(conn)?;
            Ok(())
        })
    }

    // ========================================================================
    // Project Operations
    // ========================================================================

    /// Insert a project row and return the project with its new ID.
    /// Hours come back rounded to two places, as stored.
    pub fn insert_project(&self, project: &Project) -> Result<Project> {
        let changes = ProjectChanges::try_from(project)?;

        let project_id = self.in_transaction("insert_project", |conn| {
            diesel::insert_into(schema::project::table)
                .values(&changes)
                .execute(conn)?;
            last_insert_id(conn)
        })?;

        tracing::info!(project_id, name = %project.project_name, "project created");

        let mut created = project.clone();
        created.project_id = Some(project_id);
        created.estimated_hours = project.estimated_hours.map(round_amount);
        created.actual_hours = project.actual_hours.map(round_amount);
        Ok(created)
    }

    /// All projects ordered by name. Child collections are left empty.
    pub fn fetch_all_projects(&self) -> Result<Vec<Project>> {
        self.in_transaction("fetch_all_projects", |conn| {
            let rows = schema::project::table
                .order(schema::project::project_name.asc())
                .select(ProjectRow::as_select())
                .load(conn)?;
            rows.into_iter().map(Project::try_from).collect()
        })
    }

    /// One project with its materials, steps and categories, or `None` if
    /// no row has that ID
    pub fn fetch_project_by_id(&self, project_id: i32) -> Result<Option<Project>> {
        self.in_transaction("fetch_project_by_id", |conn| {
            let row = schema::project::table
                .find(project_id)
                .select(ProjectRow::as_select())
                .first(conn)
                .optional()?;

            let Some(row) = row else {
                return Ok(None);
            };

            let mut project = Project::try_from(row)?;
            project.materials = fetch_materials_for_project(conn, project_id)?;
            project.steps = fetch_steps_for_project(conn, project_id)?;
            project.categories = fetch_categories_for_project(conn, project_id)?;
            Ok(Some(project))
        })
    }

    /// Replace the five scalar fields of the row matching `project.project_id`
    pub fn modify_project_details(&self, project: &Project) -> Result<WriteOutcome> {
        let Some(project_id) = project.project_id else {
            return Ok(WriteOutcome::NotFound);
        };
        let changes = ProjectChanges::try_from(project)?;

        let outcome = self.in_transaction("modify_project_details", |conn| {
            let affected = diesel::update(schema::project::table.find(project_id))
                .set(&changes)
                .execute(conn)?;
            Ok(WriteOutcome::from_affected(affected))
        })?;

        tracing::info!(project_id, ?outcome, "project update");
        Ok(outcome)
    }

    /// Delete the project row; children go with it via ON DELETE CASCADE
    pub fn delete_project(&self, project_id: i32) -> Result<WriteOutcome> {
        let outcome = self.in_transaction("delete_project", |conn| {
            let affected = diesel::delete(schema::project::table.find(project_id)).execute(conn)?;
            Ok(WriteOutcome::from_affected(affected))
        })?;

        tracing::info!(project_id, ?outcome, "project delete");
        Ok(outcome)
    }

    // ========================================================================
    // Child Record Operations
    // ========================================================================

    /// Add a material to a project. Fails if the project doesn't exist.
    pub fn insert_material(&self, project_id: i32, material: &Material) -> Result<Material> {
        let new_material = NewMaterial {
            project_id,
            material_name: &material.material_name,
            num_required: material.num_required,
            cost: encode_amount("cost", material.cost)?,
        };

        let material_id = self.in_transaction("insert_material", |conn| {
            diesel::insert_into(schema::material::table)
                .values(&new_material)
                .execute(conn)?;
            last_insert_id(conn)
        })?;

        Ok(Material {
            material_id: Some(material_id),
            project_id: Some(project_id),
            cost: material.cost.map(round_amount),
            ..material.clone()
        })
    }

    /// Add a step to a project. Fails if the project doesn't exist.
    pub fn insert_step(&self, project_id: i32, step: &Step) -> Result<Step> {
        let new_step = NewStep {
            project_id,
            step_text: &step.step_text,
            step_order: step.step_order,
        };

        let step_id = self.in_transaction("insert_step", |conn| {
            diesel::insert_into(schema::step::table)
                .values(&new_step)
                .execute(conn)?;
            last_insert_id(conn)
        })?;

        Ok(Step {
            step_id: Some(step_id),
            project_id: Some(project_id),
            ..step.clone()
        })
    }

    /// Create a category. Names are unique.
    pub fn insert_category(&self, category_name: &str) -> Result<Category> {
        let category_id = self.in_transaction("insert_category", |conn| {
            diesel::insert_into(schema::category::table)
                .values(&NewCategory { category_name })
                .execute(conn)?;
            last_insert_id(conn)
        })?;

        Ok(Category {
            category_id: Some(category_id),
            category_name: category_name.to_string(),
        })
    }

    /// Tag a project with a category
    pub fn link_category(&self, project_id: i32, category_id: i32) -> Result<()> {
        self.in_transaction("link_category", |conn| {
            diesel::insert_into(schema::project_category::table)
                .values(&NewProjectCategory { project_id, category_id })
                .execute(conn)?;
            Ok(())
        })
    }
}

fn last_insert_id(conn: &mut SqliteConnection) -> Result<i32> {
    let id: i32 = diesel::select(diesel::dsl::sql::<diesel::sql_types::Integer>("last_insert_rowid()"))
        .first(conn)?;
    Ok(id)
}

fn fetch_materials_for_project(conn: &mut SqliteConnection, project_id: i32) -> Result<Vec<Material>> {
    let rows = schema::material::table
        .filter(schema::material::project_id.eq(project_id))
        .order(schema::material::material_id.asc())
        .select(MaterialRow::as_select())
        .load(conn)?;
    rows.into_iter().map(Material::try_from).collect()
}

fn fetch_steps_for_project(conn: &mut SqliteConnection, project_id: i32) -> Result<Vec<Step>> {
    let rows = schema::step::table
        .filter(schema::step::project_id.eq(project_id))
        .order((schema::step::step_order.asc(), schema::step::step_id.asc()))
        .select(StepRow::as_select())
        .load(conn)?;
    Ok(rows.into_iter().map(Step::from).collect())
}

/// Categories reach a project only through the project_category join table
fn fetch_categories_for_project(conn: &mut SqliteConnection, project_id: i32) -> Result<Vec<Category>> {
    let rows = schema::category::table
        .inner_join(schema::project_category::table)
        .filter(schema::project_category::project_id.eq(project_id))
        .order(schema::category::category_name.asc())
        .select(CategoryRow::as_select())
        .load(conn)?;
    Ok(rows.into_iter().map(Category::from).collect())
}
