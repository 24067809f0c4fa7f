//! Interactive menu loop
//!
//! Reads one selection at a time, runs it against the [`ProjectService`] and
//! goes around again. Any fault is printed and the loop continues; a blank
//! selection (or end of input) quits.
//!
//! The currently selected project lives in an explicit [`Session`] that is
//! passed to each command handler.

use crate::model::{checked_round_amount, Project};
use crate::service::{ProjectService, ServiceError};
use colored::Colorize;
use rust_decimal::Decimal;
use std::io::{self, BufRead, Write};
use std::str::FromStr;

/// Menu entries, in selection order
pub const OPERATIONS: &[&str] = &[
    "1) Add a project",
    "2) List projects",
    "3) Select a project",
    "4) Update project details",
    "5) Delete a project",
];

/// Problems with what the user typed
#[derive(Debug, thiserror::Error)]
pub enum InputError {
    #[error("{0} is not a valid number.")]
    InvalidNumber(String),
    #[error("{0} is not a valid decimal number.")]
    InvalidDecimal(String),
    #[error("Input was not valid UTF-8 text.")]
    NotText,
    #[error("Unable to read input: {0}")]
    Io(#[from] io::Error),
}

/// Anything a menu command can fail with
#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error(transparent)]
    Input(#[from] InputError),
    #[error(transparent)]
    Service(#[from] ServiceError),
    #[error("A project name is required.")]
    MissingName,
    #[error("Unable to write output: {0}")]
    Output(#[from] io::Error),
}

type CommandResult<T> = std::result::Result<T, CommandError>;

/// State carried between menu commands
#[derive(Debug, Default)]
pub struct Session {
    /// Project chosen with "Select a project", with full details
    pub current: Option<Project>,
}

enum Flow {
    Continue,
    Quit,
}

pub struct Shell<'a, R, W> {
    service: &'a ProjectService,
    input: R,
    output: W,
}

impl<'a, R: BufRead, W: Write> Shell<'a, R, W> {
    pub fn new(service: &'a ProjectService, input: R, output: W) -> Self {
        Self { service, input, output }
    }

    pub fn into_output(self) -> W {
        self.output
    }

    /// Process selections until the user quits. Only I/O failures on the
    /// terminal itself end the loop early.
    pub fn run(&mut self, session: &mut Session) -> io::Result<()> {
        loop {
            match self.process_selection(session) {
                Ok(Flow::Continue) => {}
                Ok(Flow::Quit) => break,
                Err(CommandError::Input(InputError::Io(e))) | Err(CommandError::Output(e)) => return Err(e),
                Err(e) => {
                    tracing::debug!(error = %e, "command failed");
                    writeln!(self.output, "\n{} {} Try again.", "Error:".red().bold(), e)?;
                }
            }
        }
        writeln!(self.output, "Exiting the menu.")?;
        Ok(())
    }

    fn process_selection(&mut self, session: &mut Session) -> CommandResult<Flow> {
        self.print_operations(session)?;

        let Some(selection) = self.read_int("Enter a menu selection")? else {
            return Ok(Flow::Quit);
        };
        tracing::debug!(selection, "menu selection");

        match selection {
            1 => self.create_project()?,
            2 => self.list_projects()?,
            3 => self.select_project(session)?,
            4 => self.update_project_details(session)?,
            5 => self.delete_project(session)?,
            other => writeln!(self.output, "\n{} is not a valid selection. Try again.", other)?,
        }
        Ok(Flow::Continue)
    }

    fn print_operations(&mut self, session: &Session) -> io::Result<()> {
        writeln!(self.output, "\nThese are available selections. Press the Enter key to quit:")?;
        for line in OPERATIONS {
            writeln!(self.output, "  {}", line)?;
        }

        match &session.current {
            None => writeln!(self.output, "\nYou are not working with a project."),
            Some(project) => writeln!(self.output, "\nYou are working with a project: {}", project),
        }
    }

    // ========================================================================
    // Commands
    // ========================================================================

    fn create_project(&mut self) -> CommandResult<()> {
        let name = self.read_string("Enter the project name")?;
        let estimated_hours = self.read_decimal("Enter the estimated hours")?;
        let actual_hours = self.read_decimal("Enter the actual hours")?;
        let difficulty = self.read_int("Enter the project difficulty (1-5)")?;
        let notes = self.read_string("Enter the project notes")?;

        let project = Project {
            project_name: name.ok_or(CommandError::MissingName)?,
            estimated_hours,
            actual_hours,
            difficulty,
            notes,
            ..Project::default()
        };

        let created = self.service.add_project(&project)?;
        writeln!(
            self.output,
            "{} {}",
            "You have successfully created project:".green(),
            created
        )?;
        Ok(())
    }

    fn list_projects(&mut self) -> CommandResult<()> {
        let projects = self.service.fetch_all_projects()?;

        writeln!(self.output, "\nProjects:")?;
        for p in &projects {
            writeln!(
                self.output,
                "   {}: {}",
                p.project_id.unwrap_or_default(),
                p.project_name
            )?;
        }
        Ok(())
    }

    fn select_project(&mut self, session: &mut Session) -> CommandResult<()> {
        self.list_projects()?;
        let project_id = self.read_int("Enter a project ID to select a project")?;

        session.current = None;
        if let Some(project_id) = project_id {
            session.current = Some(self.service.fetch_project_by_id(project_id)?);
        }
        Ok(())
    }

    fn update_project_details(&mut self, session: &mut Session) -> CommandResult<()> {
        let Some(current) = session.current.as_ref() else {
            writeln!(self.output, "\nPlease select a project.")?;
            return Ok(());
        };

        let name = self.read_string(&format!("Enter the project name [{}]", current.project_name))?;
        let estimated_hours =
            self.read_decimal(&format!("Enter the estimated hours [{}]", shown(&current.estimated_hours)))?;
        let actual_hours =
            self.read_decimal(&format!("Enter the actual hours [{}]", shown(&current.actual_hours)))?;
        let difficulty = self.read_int(&format!(
            "Enter the project difficulty (1-5) [{}]",
            shown(&current.difficulty)
        ))?;
        let notes = self.read_string(&format!("Enter the project notes [{}]", shown(&current.notes)))?;

        // blank input keeps the current value
        let project = Project {
            project_id: current.project_id,
            project_name: name.unwrap_or_else(|| current.project_name.clone()),
            estimated_hours: estimated_hours.or(current.estimated_hours),
            actual_hours: actual_hours.or(current.actual_hours),
            difficulty: difficulty.or(current.difficulty),
            notes: notes.or_else(|| current.notes.clone()),
            ..Project::default()
        };

        self.service.modify_project_details(&project)?;
        let project_id = project.project_id.unwrap_or_default();
        session.current = Some(self.service.fetch_project_by_id(project_id)?);
        Ok(())
    }

    fn delete_project(&mut self, session: &mut Session) -> CommandResult<()> {
        self.list_projects()?;
        let Some(project_id) = self.read_int("Enter the ID of the project to delete")? else {
            return Ok(());
        };

        self.service.delete_project(project_id)?;
        writeln!(
            self.output,
            "{}",
            format!("Project {} was deleted successfully.", project_id).green()
        )?;

        if session.current.as_ref().and_then(|p| p.project_id) == Some(project_id) {
            session.current = None;
        }
        Ok(())
    }

    // ========================================================================
    // Input
    // ========================================================================

    /// Prompt and read one line. Blank input (or end of input) is `None`,
    /// anything else comes back trimmed.
    fn read_string(&mut self, prompt: &str) -> Result<Option<String>, InputError> {
        write!(self.output, "{}: ", prompt)?;
        self.output.flush()?;

        // a non-UTF-8 line is a bad entry, not a terminal failure
        let mut raw = Vec::new();
        self.input.read_until(b'\n', &mut raw)?;
        let line = String::from_utf8(raw).map_err(|_| InputError::NotText)?;

        let trimmed = line.trim();
        Ok(if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        })
    }

    fn read_int(&mut self, prompt: &str) -> Result<Option<i32>, InputError> {
        match self.read_string(prompt)? {
            None => Ok(None),
            Some(s) => parse_int(&s).map(Some),
        }
    }

    fn read_decimal(&mut self, prompt: &str) -> Result<Option<Decimal>, InputError> {
        match self.read_string(prompt)? {
            None => Ok(None),
            Some(s) => parse_decimal(&s).map(Some),
        }
    }
}

fn shown<T: std::fmt::Display>(value: &Option<T>) -> String {
    value.as_ref().map(|v| v.to_string()).unwrap_or_else(|| "null".to_string())
}

/// Parse a whole number typed at a prompt
pub fn parse_int(input: &str) -> Result<i32, InputError> {
    input
        .parse::<i32>()
        .map_err(|_| InputError::InvalidNumber(input.to_string()))
}

/// Parse an amount typed at a prompt, rounded to two places.
/// `Decimal::from_str` tolerates digit separators, the prompt does not.
pub fn parse_decimal(input: &str) -> Result<Decimal, InputError> {
    let invalid = || InputError::InvalidDecimal(input.to_string());
    if input.contains('_') {
        return Err(invalid());
    }
    let value = Decimal::from_str(input).map_err(|_| invalid())?;
    checked_round_amount(value).ok_or_else(invalid)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use crate::model::{Material, Step};
    use std::io::Cursor;
    use tempfile::TempDir;

    fn test_service() -> (TempDir, ProjectService) {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let db = Database::open_at(temp_dir.path().join("test.db")).expect("Failed to open db");
        (temp_dir, ProjectService::new(db))
    }

    /// Run the shell over a scripted input and return (output, final session)
    fn run_script(service: &ProjectService, script: &str) -> (String, Session) {
        run_bytes(service, script.as_bytes())
    }

    fn run_bytes(service: &ProjectService, script: &[u8]) -> (String, Session) {
        let mut session = Session::default();
        let mut shell = Shell::new(service, Cursor::new(script.to_vec()), Vec::new());
        shell.run(&mut session).expect("shell should not fail on in-memory io");
        let out = String::from_utf8(shell.into_output()).unwrap();
        (out, session)
    }

    #[test]
    fn test_parse_int() {
        assert_eq!(parse_int("42").unwrap(), 42);
        assert_eq!(parse_int("-3").unwrap(), -3);
        assert!(matches!(parse_int("4.5"), Err(InputError::InvalidNumber(s)) if s == "4.5"));
        assert!(parse_int("five").is_err());
    }

    #[test]
    fn test_parse_decimal_rounds() {
        assert_eq!(parse_decimal("3.1").unwrap().to_string(), "3.10");
        assert_eq!(parse_decimal("7").unwrap().to_string(), "7.00");
        assert_eq!(parse_decimal("1.239").unwrap().to_string(), "1.24");
        assert_eq!(
            parse_decimal("ten").unwrap_err().to_string(),
            "ten is not a valid decimal number."
        );
    }

    #[test]
    fn test_parse_decimal_rejects_digit_separators() {
        assert!(matches!(parse_decimal("1_000"), Err(InputError::InvalidDecimal(s)) if s == "1_000"));
        assert!(parse_decimal("_5").is_err());
        assert!(parse_decimal("2.5_0").is_err());
    }

    #[test]
    fn test_parse_decimal_rejects_values_without_room_for_cents() {
        let err = parse_decimal("79228162514264337593543950335").unwrap_err();
        assert_eq!(
            err.to_string(),
            "79228162514264337593543950335 is not a valid decimal number."
        );
        assert!(parse_decimal("-79228162514264337593543950335").is_err());
        assert_eq!(parse_decimal("1000000").unwrap().to_string(), "1000000.00");
    }

    #[test]
    fn test_non_utf8_line_is_reported_and_loop_continues() {
        let (_dir, service) = test_service();
        let (out, _) = run_bytes(&service, b"1\n\xff\xfe name\n2\n\n");
        assert!(out.contains("Input was not valid UTF-8 text."));
        assert!(out.contains("Projects:"));
        assert!(out.contains("Exiting the menu."));
        assert!(service.fetch_all_projects().unwrap().is_empty());
    }

    #[test]
    fn test_non_utf8_selection_is_reported() {
        let (_dir, service) = test_service();
        let (out, _) = run_bytes(&service, b"\xc3\x28\n\n");
        assert!(out.contains("Error:"));
        assert!(out.contains("Input was not valid UTF-8 text."));
        assert!(out.contains("Exiting the menu."));
    }

    #[test]
    fn test_blank_selection_quits() {
        let (_dir, service) = test_service();
        let (out, session) = run_script(&service, "\n");
        assert!(out.contains("These are available selections"));
        assert!(out.contains("5) Delete a project"));
        assert!(out.contains("You are not working with a project."));
        assert!(out.contains("Exiting the menu."));
        assert!(session.current.is_none());
    }

    #[test]
    fn test_end_of_input_quits() {
        let (_dir, service) = test_service();
        let (out, _) = run_script(&service, "2\n");
        assert!(out.contains("Projects:"));
        assert!(out.contains("Exiting the menu."));
    }

    #[test]
    fn test_add_then_list() {
        let (_dir, service) = test_service();
        let (out, _) = run_script(&service, "1\nBuild deck\n10.5\n\n3\n\n2\n\n");

        assert!(out.contains("You have successfully created project:"));
        assert!(out.contains("estimatedHours=10.50"));
        assert!(out.contains("actualHours=-"));
        assert!(out.contains("   1: Build deck"));

        let all = service.fetch_all_projects().unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].difficulty, Some(3));
        assert_eq!(all[0].notes, None);
    }

    #[test]
    fn test_add_without_name_is_rejected() {
        let (_dir, service) = test_service();
        let (out, _) = run_script(&service, "1\n\n\n\n\n\n\n");
        assert!(out.contains("A project name is required."));
        assert!(service.fetch_all_projects().unwrap().is_empty());
    }

    #[test]
    fn test_invalid_numbers_reloop() {
        let (_dir, service) = test_service();
        let (out, _) = run_script(&service, "abc\n1\nShed\nlots\n\n");

        assert!(out.contains("abc is not a valid number."));
        assert!(out.contains("lots is not a valid decimal number."));
        assert!(out.contains("Exiting the menu."));
        assert!(service.fetch_all_projects().unwrap().is_empty());
    }

    #[test]
    fn test_unknown_selection() {
        let (_dir, service) = test_service();
        let (out, _) = run_script(&service, "9\n\n");
        assert!(out.contains("9 is not a valid selection. Try again."));
    }

    #[test]
    fn test_select_loads_details() {
        let (_dir, service) = test_service();
        let id = service.add_project(&Project::new("Bench")).unwrap().project_id.unwrap();
        service.database().insert_step(id, &Step::new(1, "Sand the slats")).unwrap();
        service.database().insert_material(id, &Material::new("Slats", Some(6), None)).unwrap();

        let (out, session) = run_script(&service, &format!("3\n{}\n\n", id));
        let current = session.current.expect("project should be selected");
        assert_eq!(current.project_name, "Bench");
        assert_eq!(current.steps.len(), 1);
        assert!(out.contains("You are working with a project:"));
        assert!(out.contains("1. Sand the slats"));
    }

    #[test]
    fn test_select_missing_reports_not_found() {
        let (_dir, service) = test_service();
        let (out, session) = run_script(&service, "3\n42\n\n");
        assert!(out.contains("Project with ID=42 does not exist."));
        assert!(session.current.is_none());
    }

    #[test]
    fn test_update_requires_selection() {
        let (_dir, service) = test_service();
        let (out, _) = run_script(&service, "4\n\n");
        assert!(out.contains("Please select a project."));
    }

    #[test]
    fn test_update_keeps_blank_fields() {
        let (_dir, service) = test_service();
        let created = service
            .add_project(
                &Project::new("Planter")
                    .with_estimated_hours(Decimal::new(4, 0))
                    .with_difficulty(2)
                    .with_notes("cedar"),
            )
            .unwrap();
        let id = created.project_id.unwrap();

        // select, then update: new name, keep estimate, set actual, keep difficulty and notes
        let script = format!("3\n{}\n4\nRaised planter\n\n5.5\n\n\n\n", id);
        let (out, session) = run_script(&service, &script);
        assert!(out.contains("Enter the project name [Planter]"));
        assert!(out.contains("Enter the estimated hours [4.00]"));
        assert!(out.contains("Enter the actual hours [null]"));

        let stored = service.fetch_project_by_id(id).unwrap();
        assert_eq!(stored.project_name, "Raised planter");
        assert_eq!(stored.estimated_hours.unwrap().to_string(), "4.00");
        assert_eq!(stored.actual_hours.unwrap().to_string(), "5.50");
        assert_eq!(stored.difficulty, Some(2));
        assert_eq!(stored.notes.as_deref(), Some("cedar"));
        assert_eq!(session.current.unwrap().project_name, "Raised planter");
    }

    #[test]
    fn test_update_after_external_delete_is_not_found() {
        let (_dir, service) = test_service();
        let id = service.add_project(&Project::new("Vanishing")).unwrap().project_id.unwrap();

        let mut session = Session {
            current: Some(service.fetch_project_by_id(id).unwrap()),
        };
        service.delete_project(id).unwrap();

        let mut shell = Shell::new(&service, Cursor::new(b"4\nNew name\n\n\n\n\n\n".to_vec()), Vec::new());
        shell.run(&mut session).unwrap();
        let out = String::from_utf8(shell.into_output()).unwrap();

        assert!(out.contains(&format!("Project with ID={} does not exist.", id)));
        assert!(service.fetch_all_projects().unwrap().is_empty());
    }

    #[test]
    fn test_delete_selected_clears_session() {
        let (_dir, service) = test_service();
        let keep = service.add_project(&Project::new("Keep")).unwrap().project_id.unwrap();
        let doomed = service.add_project(&Project::new("Drop")).unwrap().project_id.unwrap();

        let script = format!("3\n{}\n5\n{}\n\n", doomed, doomed);
        let (out, session) = run_script(&service, &script);

        assert!(out.contains(&format!("Project {} was deleted successfully.", doomed)));
        assert!(session.current.is_none());
        let after_delete = out.split("was deleted successfully.").nth(1).unwrap();
        assert!(after_delete.contains("You are not working with a project."));

        let remaining: Vec<i32> = service
            .fetch_all_projects()
            .unwrap()
            .iter()
            .filter_map(|p| p.project_id)
            .collect();
        assert_eq!(remaining, vec![keep]);
    }

    #[test]
    fn test_delete_other_keeps_session() {
        let (_dir, service) = test_service();
        let keep = service.add_project(&Project::new("Keep")).unwrap().project_id.unwrap();
        let other = service.add_project(&Project::new("Other")).unwrap().project_id.unwrap();

        let (_, session) = run_script(&service, &format!("3\n{}\n5\n{}\n\n", keep, other));
        assert_eq!(session.current.and_then(|p| p.project_id), Some(keep));
    }

    #[test]
    fn test_delete_missing_reports_not_found() {
        let (_dir, service) = test_service();
        let (out, _) = run_script(&service, "5\n31\n\n");
        assert!(out.contains("Project with ID=31 does not exist."));
    }
}
