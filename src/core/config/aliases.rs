use std::collections::BTreeMap;

use crate::parser::Stage;

/// Name to replacement-text table consulted for the first word of a
/// single-stage command line.
#[derive(Debug, Clone, Default)]
pub struct AliasManager {
    aliases: BTreeMap<Box<str>, Box<str>>,
}

impl AliasManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_defaults() -> Self {
        let mut manager = Self::new();
        manager.add("ll", "ls -la");
        manager.add("la", "ls -a");
        manager.add("..", "cd ..");
        manager.add("...", "cd ../..");
        manager
    }

    pub fn add(&mut self, name: &str, command: &str) {
        self.aliases.insert(name.into(), command.into());
    }

    pub fn remove(&mut self, name: &str) -> bool {
        self.aliases.remove(name).is_some()
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.aliases.get(name).map(|s| &**s)
    }

    /// All aliases sorted by name.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.aliases.iter().map(|(k, v)| (&**k, &**v))
    }

    /// Replaces the first argument of `stage` with the words of its alias.
    /// The replacement is not expanded again.
    pub fn expand_stage(&self, mut stage: Stage) -> Stage {
        let Some(replacement) = stage.program().and_then(|name| self.get(name)) else {
            return stage;
        };

        let mut args: Vec<String> = replacement.split_whitespace().map(String::from).collect();
        args.extend(stage.args.drain(1..));
        tracing::debug!(?args, "expanded alias");
        stage.args = args;
        stage
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::{parse_stage, ParseMode};

    fn stage(text: &str) -> Stage {
        parse_stage(text, ParseMode::Permissive).unwrap()
    }

    #[test]
    fn test_add_and_get_alias() {
        let mut manager = AliasManager::new();
        manager.add("ll", "ls -la");
        assert_eq!(manager.get("ll"), Some("ls -la"));
        assert!(manager.remove("ll"));
        assert!(!manager.remove("ll"));
    }

    #[test]
    fn test_leading_token_keeps_remaining_args() {
        let manager = AliasManager::with_defaults();
        let expanded = manager.expand_stage(stage("ll /tmp extra"));
        assert_eq!(expanded.args, vec!["ls", "-la", "/tmp", "extra"]);
    }

    #[test]
    fn test_only_first_token_is_eligible() {
        let manager = AliasManager::with_defaults();
        let expanded = manager.expand_stage(stage("echo ll"));
        assert_eq!(expanded.args, vec!["echo", "ll"]);
    }

    #[test]
    fn test_no_recursive_expansion() {
        let mut manager = AliasManager::new();
        manager.add("a", "b x");
        manager.add("b", "c y");

        let expanded = manager.expand_stage(stage("a z"));
        assert_eq!(expanded.args, vec!["b", "x", "z"]);
    }

    #[test]
    fn test_redirections_survive_expansion() {
        let manager = AliasManager::with_defaults();
        let expanded = manager.expand_stage(stage("la > listing.txt"));
        assert_eq!(expanded.args, vec!["ls", "-a"]);
        assert_eq!(expanded.output.as_deref(), Some("listing.txt"));
    }

    #[test]
    fn test_iter_is_sorted() {
        let manager = AliasManager::with_defaults();
        let names: Vec<&str> = manager.iter().map(|(name, _)| name).collect();
        assert_eq!(names, vec!["..", "...", "la", "ll"]);
    }
}
