//! Process environment and the shell variable store.

use std::env as stdenv;
use std::fmt;
use std::path::PathBuf;

/// Upper bound on the number of entries the variable store accepts.
pub const MAX_VARS: usize = 100;

/// A single name/value binding, local to the shell or exported to children.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Variable {
    pub name: String,
    pub value: String,
    pub exported: bool,
}

/// Error returned when the variable store is at capacity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableFull;

impl fmt::Display for TableFull {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "variable table is full (limit is {MAX_VARS})")
    }
}

impl std::error::Error for TableFull {}

/// Flat table of shell variables.
///
/// At most one entry exists per name: setting an existing name overwrites in
/// place, unsetting removes by swapping with the last entry (order is not
/// preserved across removals).
#[derive(Debug, Clone, Default)]
pub struct Vars {
    entries: Vec<Variable>,
}

impl Vars {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrite-or-insert a binding.
    pub fn set(&mut self, name: &str, value: &str, exported: bool) -> Result<(), TableFull> {
        if let Some(var) = self.entries.iter_mut().find(|v| v.name == name) {
            var.value = value.to_string();
            var.exported = exported;
            return Ok(());
        }
        if self.entries.len() == MAX_VARS {
            return Err(TableFull);
        }
        self.entries.push(Variable {
            name: name.to_string(),
            value: value.to_string(),
            exported,
        });
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|v| v.name == name)
            .map(|v| v.value.as_str())
    }

    /// Remove a binding. Returns false when the name was not set.
    pub fn unset(&mut self, name: &str) -> bool {
        match self.entries.iter().position(|v| v.name == name) {
            Some(i) => {
                self.entries.swap_remove(i);
                true
            }
            None => false,
        }
    }

    /// Re-flag an existing binding as exported and publish it to the process
    /// environment so spawned children inherit it. Returns false when the
    /// name was not set.
    pub fn export(&mut self, name: &str) -> bool {
        match self.entries.iter_mut().find(|v| v.name == name) {
            Some(var) => {
                var.exported = true;
                // Safety: the interpreter is single-threaded.
                unsafe { stdenv::set_var(&var.name, &var.value) };
                true
            }
            None => false,
        }
    }

    /// Entries not exported to children, in table order.
    pub fn locals(&self) -> impl Iterator<Item = &Variable> {
        self.entries.iter().filter(|v| !v.exported)
    }

    /// Exported entries, in table order.
    pub fn exported(&self) -> impl Iterator<Item = &Variable> {
        self.entries.iter().filter(|v| v.exported)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Mutable, user-level view of the process environment used by the
/// interpreter.
///
/// The environment contains:
/// - `vars`: the shell variable store, visible to builtins and (for exported
///   entries) to executed commands.
/// - `current_dir`: the working directory for command execution.
/// - `should_exit`: a flag the command loop checks to know when to terminate.
#[derive(Debug, Clone)]
pub struct Environment {
    /// Shell variable store.
    pub vars: Vars,
    /// The current working directory for command execution.
    pub current_dir: PathBuf,
    /// When set to true, indicates that the interactive loop should exit.
    pub should_exit: bool,
}

impl Environment {
    /// Capture the current process state into a new `Environment` instance.
    pub fn new() -> Self {
        let current_dir = stdenv::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        Self {
            vars: Vars::new(),
            current_dir,
            should_exit: false,
        }
    }
}

impl Default for Environment {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_then_get() {
        let mut vars = Vars::new();
        assert_eq!(vars.get("x"), None);
        vars.set("x", "1", false).unwrap();
        assert_eq!(vars.get("x"), Some("1"));
    }

    #[test]
    fn set_overwrites_in_place() {
        let mut vars = Vars::new();
        vars.set("x", "1", false).unwrap();
        vars.set("y", "2", false).unwrap();
        vars.set("x", "3", false).unwrap();
        assert_eq!(vars.get("x"), Some("3"));
        assert_eq!(vars.len(), 2);
    }

    #[test]
    fn unset_removes_by_swapping_with_last() {
        let mut vars = Vars::new();
        vars.set("a", "1", false).unwrap();
        vars.set("b", "2", false).unwrap();
        vars.set("c", "3", false).unwrap();
        assert!(vars.unset("a"));
        assert_eq!(vars.get("a"), None);
        let names: Vec<&str> = vars.locals().map(|v| v.name.as_str()).collect();
        assert_eq!(names, vec!["c", "b"]);
    }

    #[test]
    fn unset_of_unknown_name_is_a_noop() {
        let mut vars = Vars::new();
        vars.set("a", "1", false).unwrap();
        assert!(!vars.unset("zzz"));
        assert_eq!(vars.len(), 1);
    }

    #[test]
    fn capacity_is_enforced_for_new_names_only() {
        let mut vars = Vars::new();
        for i in 0..MAX_VARS {
            vars.set(&format!("v{i}"), "x", false).unwrap();
        }
        assert_eq!(vars.set("overflow", "x", false), Err(TableFull));
        // Overwriting an existing name still works at capacity.
        assert_eq!(vars.set("v0", "y", false), Ok(()));
        assert_eq!(vars.get("v0"), Some("y"));
    }

    #[test]
    fn export_publishes_to_the_process_environment() {
        let mut vars = Vars::new();
        vars.set("MINISH_TEST_EXPORTED_VAR", "42", false).unwrap();
        assert!(vars.export("MINISH_TEST_EXPORTED_VAR"));
        assert_eq!(
            stdenv::var("MINISH_TEST_EXPORTED_VAR").as_deref(),
            Ok("42")
        );
        assert_eq!(vars.locals().count(), 0);
        assert_eq!(vars.exported().count(), 1);
    }

    #[test]
    fn export_of_unknown_name_reports_false() {
        let mut vars = Vars::new();
        assert!(!vars.export("MINISH_TEST_NEVER_SET"));
    }

    #[test]
    fn locals_and_exported_partition_the_table() {
        let mut vars = Vars::new();
        vars.set("a", "1", false).unwrap();
        vars.set("b", "2", true).unwrap();
        vars.set("c", "3", false).unwrap();
        let locals: Vec<&str> = vars.locals().map(|v| v.name.as_str()).collect();
        let exported: Vec<&str> = vars.exported().map(|v| v.name.as_str()).collect();
        assert_eq!(locals, vec!["a", "c"]);
        assert_eq!(exported, vec!["b"]);
    }
}
