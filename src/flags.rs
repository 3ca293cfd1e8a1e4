use crate::error::ShellError;
use std::collections::BTreeMap;

#[derive(Debug, Clone)]
pub struct Flags {
    flags: BTreeMap<String, Flag>,
}

#[derive(Debug, Clone)]
pub struct Flag {
    pub short: String,
    pub long: String,
    pub description: String,
    pub takes_value: bool,
    pub value: Option<String>,
}

impl Flag {
    fn switch(short: &str, long: &str, description: &str) -> Self {
        Flag {
            short: short.to_string(),
            long: long.to_string(),
            description: description.to_string(),
            takes_value: false,
            value: None,
        }
    }

    fn option(short: &str, long: &str, description: &str) -> Self {
        Flag {
            takes_value: true,
            ..Flag::switch(short, long, description)
        }
    }
}

impl Default for Flags {
    fn default() -> Self {
        Self::new()
    }
}

impl Flags {
    pub fn new() -> Self {
        let mut flags = BTreeMap::new();

        flags.insert(
            "help".to_string(),
            Flag::switch("-h", "--help", "Print this help message"),
        );
        flags.insert(
            "version".to_string(),
            Flag::switch("-v", "--version", "Show version information"),
        );
        flags.insert(
            "quiet".to_string(),
            Flag::switch("-q", "--quiet", "Suppress notices and exit status reports"),
        );
        flags.insert(
            "debug".to_string(),
            Flag::switch("-d", "--debug", "Enable debug output on stderr"),
        );
        flags.insert(
            "strict".to_string(),
            Flag::switch("-s", "--strict", "Reject lines with unterminated quotes"),
        );
        flags.insert(
            "command".to_string(),
            Flag::option("-c", "--command", "Run a single command line and exit"),
        );

        Flags { flags }
    }

    pub fn parse(&mut self, args: &[String]) -> Result<(), ShellError> {
        let mut i = 0;
        while i < args.len() {
            let arg = &args[i];

            let flag = self
                .flags
                .values_mut()
                .find(|flag| arg == &flag.short || arg == &flag.long)
                .ok_or_else(|| ShellError::FlagError(format!("unknown option {}", arg)))?;

            if flag.takes_value {
                let value = args
                    .get(i + 1)
                    .ok_or_else(|| ShellError::FlagError(format!("Flag {} requires a value", arg)))?;
                flag.value = Some(value.clone());
                i += 1;
            } else {
                flag.value = Some("true".to_string());
            }
            i += 1;
        }
        Ok(())
    }

    pub fn is_set(&self, name: &str) -> bool {
        self.flags
            .get(name)
            .and_then(|f| f.value.as_ref())
            .is_some()
    }

    pub fn get_value(&self, name: &str) -> Option<&String> {
        self.flags.get(name).and_then(|f| f.value.as_ref())
    }

    pub fn print_help(&self) {
        println!("Usage: strand [OPTIONS]");
        println!("\nOptions:");
        for flag in self.flags.values() {
            let long = if flag.takes_value {
                format!("{} <line>", flag.long)
            } else {
                flag.long.clone()
            };
            println!("  {}, {:<18} {}", flag.short, long, flag.description);
        }
    }
}
