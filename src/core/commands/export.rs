use super::{Command, CommandError};
use std::env;
use std::io::Write;

/// `export NAME=VALUE...` sets variables for the shell and every child it
/// starts afterwards.
#[derive(Clone, Default)]
pub struct ExportCommand;

fn parse_assignment(arg: &str) -> Result<(&str, &str), CommandError> {
    let (name, value) = arg.split_once('=').ok_or_else(|| {
        CommandError::InvalidArguments("Export syntax: export NAME=VALUE".into())
    })?;

    let name = name.trim();
    if name.is_empty() || name.contains(|c: char| !(c.is_ascii_alphanumeric() || c == '_')) {
        return Err(CommandError::InvalidArguments(format!(
            "export: not a valid identifier: {}",
            name
        )));
    }

    let value = value.trim();
    let value = value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .or_else(|| value.strip_prefix('\'').and_then(|v| v.strip_suffix('\'')))
        .unwrap_or(value);

    Ok((name, value))
}

impl Command for ExportCommand {
    fn execute(&self, args: &[String], _out: &mut dyn Write) -> Result<(), CommandError> {
        if args.is_empty() {
            return Err(CommandError::InvalidArguments(
                "Export syntax: export NAME=VALUE".into(),
            ));
        }

        let assignments = args
            .iter()
            .map(|arg| parse_assignment(arg))
            .collect::<Result<Vec<_>, _>>()?;

        for (name, value) in assignments {
            tracing::debug!(name, value, "export");
            env::set_var(name, value);
        }
        Ok(())
    }
}
