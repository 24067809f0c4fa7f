//! Plain records handed between the store, the service and the shell
//!
//! A `Project` owns its materials, steps and categories. Child collections are
//! only filled in by a by-ID fetch; listings leave them empty.

use rust_decimal::{Decimal, RoundingStrategy};
use std::fmt;

/// Number of decimal places kept for hours and costs
pub const DECIMAL_PLACES: u32 = 2;

/// Round a fixed-point amount to exactly two places (3.1 -> 3.10, 2.345 -> 2.35)
pub fn round_amount(value: Decimal) -> Decimal {
    let mut rounded = value.round_dp_with_strategy(DECIMAL_PLACES, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(DECIMAL_PLACES);
    rounded
}

/// Like [`round_amount`], but `None` when the value is too large to carry two
/// places (the 96-bit mantissa leaves no room for the extra digits)
pub fn checked_round_amount(value: Decimal) -> Option<Decimal> {
    let rounded = round_amount(value);
    (rounded.scale() == DECIMAL_PLACES).then_some(rounded)
}

/// A tracked project
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Project {
    /// Assigned by the store on insert; never changes afterwards
    pub project_id: Option<i32>,
    pub project_name: String,
    pub estimated_hours: Option<Decimal>,
    pub actual_hours: Option<Decimal>,
    /// 1 (easy) to 5 (hard); the store does not enforce the range
    pub difficulty: Option<i32>,
    pub notes: Option<String>,
    pub materials: Vec<Material>,
    pub steps: Vec<Step>,
    pub categories: Vec<Category>,
}

impl Project {
    /// New, unsaved project with only a name
    pub fn new(project_name: impl Into<String>) -> Self {
        Self {
            project_name: project_name.into(),
            ..Self::default()
        }
    }

    pub fn with_estimated_hours(mut self, hours: Decimal) -> Self {
        self.estimated_hours = Some(round_amount(hours));
        self
    }

    pub fn with_actual_hours(mut self, hours: Decimal) -> Self {
        self.actual_hours = Some(round_amount(hours));
        self
    }

    pub fn with_difficulty(mut self, difficulty: i32) -> Self {
        self.difficulty = Some(difficulty);
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }
}

/// Bill-of-materials entry, owned by exactly one project
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Material {
    pub material_id: Option<i32>,
    pub project_id: Option<i32>,
    pub material_name: String,
    pub num_required: Option<i32>,
    pub cost: Option<Decimal>,
}

impl Material {
    pub fn new(material_name: impl Into<String>, num_required: Option<i32>, cost: Option<Decimal>) -> Self {
        Self {
            material_name: material_name.into(),
            num_required,
            cost: cost.map(round_amount),
            ..Self::default()
        }
    }
}

/// One ordered instruction, owned by exactly one project
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Step {
    pub step_id: Option<i32>,
    pub project_id: Option<i32>,
    pub step_text: String,
    pub step_order: i32,
}

impl Step {
    pub fn new(step_order: i32, step_text: impl Into<String>) -> Self {
        Self {
            step_text: step_text.into(),
            step_order,
            ..Self::default()
        }
    }
}

/// Independent tag, linked to projects through `project_category`
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Category {
    pub category_id: Option<i32>,
    pub category_name: String,
}

// ============================================================================
// Display
// ============================================================================

fn or_dash<T: fmt::Display>(value: &Option<T>) -> String {
    value.as_ref().map(|v| v.to_string()).unwrap_or_else(|| "-".to_string())
}

impl fmt::Display for Project {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\n   ID={}", or_dash(&self.project_id))?;
        write!(f, "\n   name={}", self.project_name)?;
        write!(f, "\n   estimatedHours={}", or_dash(&self.estimated_hours))?;
        write!(f, "\n   actualHours={}", or_dash(&self.actual_hours))?;
        write!(f, "\n   difficulty={}", or_dash(&self.difficulty))?;
        write!(f, "\n   notes={}", or_dash(&self.notes))?;

        if !self.materials.is_empty() {
            write!(f, "\n   Materials:")?;
            for m in &self.materials {
                write!(f, "\n      {}", m)?;
            }
        }
        if !self.steps.is_empty() {
            write!(f, "\n   Steps:")?;
            for s in &self.steps {
                write!(f, "\n      {}", s)?;
            }
        }
        if !self.categories.is_empty() {
            write!(f, "\n   Categories:")?;
            for c in &self.categories {
                write!(f, "\n      {}", c)?;
            }
        }
        Ok(())
    }
}

impl fmt::Display for Material {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ID={}, name={}, numRequired={}, cost={}",
            or_dash(&self.material_id),
            self.material_name,
            or_dash(&self.num_required),
            or_dash(&self.cost)
        )
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}. {}", self.step_order, self.step_text)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ID={}, name={}", or_dash(&self.category_id), self.category_name)
    }
}
