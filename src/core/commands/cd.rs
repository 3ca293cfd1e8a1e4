use super::{Command, CommandError};
use crate::path::expand_tilde;
use std::env;
use std::io::Write;
use std::path::PathBuf;

#[derive(Clone, Default)]
pub struct CdCommand;

impl CdCommand {
    pub fn new() -> Self {
        Self
    }

    /// Target directory for `args`, and whether it should be echoed back.
    fn target(&self, args: &[String]) -> Result<(PathBuf, bool), CommandError> {
        match args.first().map(String::as_str) {
            Some("-") => {
                let previous = env::var_os("OLDPWD").ok_or_else(|| {
                    CommandError::ExecutionError("cd: OLDPWD not set".to_string())
                })?;
                Ok((PathBuf::from(previous), true))
            }
            None | Some("~") => Ok((home()?, false)),
            Some(path) if path.starts_with("~/") => Ok((expand_tilde(path, &home()?), false)),
            Some(path) => Ok((PathBuf::from(path), false)),
        }
    }
}

fn home() -> Result<PathBuf, CommandError> {
    dirs::home_dir().ok_or(CommandError::HomeDirNotFound)
}

impl Command for CdCommand {
    fn execute(&self, args: &[String], out: &mut dyn Write) -> Result<(), CommandError> {
        let (target, announce) = self.target(args)?;
        let previous = env::current_dir().ok();

        env::set_current_dir(&target).map_err(|e| {
            CommandError::ExecutionError(format!("cd: {}: {}", target.display(), e))
        })?;

        if let Some(previous) = previous {
            env::set_var("OLDPWD", previous);
        }
        if let Ok(current) = env::current_dir() {
            env::set_var("PWD", &current);
        }
        if announce {
            writeln!(out, "{}", target.display())?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Changes the process-wide working directory, so every step lives in
    // one test.
    #[test]
    fn test_cd_round_trip() {
        let start_dir = env::current_dir().unwrap();
        let cmd = CdCommand::new();
        let first = tempfile::tempdir().unwrap();
        let second = tempfile::tempdir().unwrap();
        let first_path = first.path().canonicalize().unwrap();
        let second_path = second.path().canonicalize().unwrap();

        let mut out = Vec::new();
        cmd.execute(&[first_path.display().to_string()], &mut out)
            .unwrap();
        cmd.execute(&[second_path.display().to_string()], &mut out)
            .unwrap();
        assert_eq!(env::current_dir().unwrap(), second_path);
        assert!(out.is_empty());

        cmd.execute(&["-".to_string()], &mut out).unwrap();
        assert_eq!(env::current_dir().unwrap(), first_path);
        assert_eq!(
            String::from_utf8(out).unwrap(),
            format!("{}\n", first_path.display())
        );
        assert_eq!(env::var_os("OLDPWD").unwrap(), second_path.as_os_str());

        let missing = first_path.join("missing");
        assert!(cmd
            .execute(&[missing.display().to_string()], &mut Vec::new())
            .is_err());
        assert_eq!(env::current_dir().unwrap(), first_path);

        env::set_current_dir(start_dir).unwrap();
    }
}
