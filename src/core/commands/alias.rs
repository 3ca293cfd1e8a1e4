use super::{Command, CommandError};
use crate::core::config::AliasManager;
use std::io::Write;
use std::sync::{Arc, Mutex, MutexGuard};

fn lock(aliases: &Mutex<AliasManager>) -> Result<MutexGuard<'_, AliasManager>, CommandError> {
    aliases
        .lock()
        .map_err(|e| CommandError::ExecutionError(format!("Failed to access aliases: {}", e)))
}

#[derive(Clone)]
pub struct AliasCommand {
    aliases: Arc<Mutex<AliasManager>>,
}

impl AliasCommand {
    pub fn new(aliases: Arc<Mutex<AliasManager>>) -> Self {
        Self { aliases }
    }
}

impl Command for AliasCommand {
    fn execute(&self, args: &[String], out: &mut dyn Write) -> Result<(), CommandError> {
        if args.is_empty() {
            let aliases = lock(&self.aliases)?;
            for (name, command) in aliases.iter() {
                writeln!(out, "alias {}='{}'", name, command)?;
            }
            return Ok(());
        }

        // `alias gs='git status'` may arrive as one argument or, unquoted,
        // as several.
        let definition = args.join(" ");
        let Some((name, value)) = definition.split_once('=') else {
            let aliases = lock(&self.aliases)?;
            return match aliases.get(definition.trim()) {
                Some(command) => {
                    writeln!(out, "alias {}='{}'", definition.trim(), command)?;
                    Ok(())
                }
                None => Err(CommandError::InvalidArguments(format!(
                    "alias: {}: not found",
                    definition.trim()
                ))),
            };
        };

        let name = name.trim();
        let value = value.trim().trim_matches(|c| c == '\'' || c == '"');
        if name.is_empty() || name.contains(char::is_whitespace) {
            return Err(CommandError::InvalidArguments(
                "Usage: alias name='command'".to_string(),
            ));
        }

        lock(&self.aliases)?.add(name, value);
        Ok(())
    }
}

#[derive(Clone)]
pub struct UnaliasCommand {
    aliases: Arc<Mutex<AliasManager>>,
}

impl UnaliasCommand {
    pub fn new(aliases: Arc<Mutex<AliasManager>>) -> Self {
        Self { aliases }
    }
}

impl Command for UnaliasCommand {
    fn execute(&self, args: &[String], _out: &mut dyn Write) -> Result<(), CommandError> {
        if args.is_empty() {
            return Err(CommandError::InvalidArguments(
                "Usage: unalias name".to_string(),
            ));
        }

        let mut aliases = lock(&self.aliases)?;
        for name in args {
            if !aliases.remove(name) {
                return Err(CommandError::InvalidArguments(format!(
                    "unalias: {}: not found",
                    name
                )));
            }
        }
        Ok(())
    }
}
