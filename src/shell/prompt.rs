use inksac::prelude::*;
use std::env;
use std::path::{Path, PathBuf};

use crate::path::display_dir;

/// Renders `user:dir$ `.
#[derive(Debug, Clone)]
pub struct Prompt {
    color_support: ColorSupport,
    home: Option<PathBuf>,
}

impl Prompt {
    pub fn new() -> Self {
        let support = check_color_support().unwrap_or(ColorSupport::NoColor);
        Self {
            color_support: support,
            home: dirs::home_dir(),
        }
    }

    pub fn plain(home: Option<PathBuf>) -> Self {
        Self {
            color_support: ColorSupport::NoColor,
            home,
        }
    }

    pub fn render(&self) -> String {
        match env::current_dir() {
            Ok(cwd) => self.render_in(&cwd),
            Err(_) => self.format(&user_name(), "?"),
        }
    }

    pub fn render_in(&self, cwd: &Path) -> String {
        self.format(&user_name(), &display_dir(cwd, self.home.as_deref()))
    }

    fn format(&self, user: &str, dir: &str) -> String {
        if matches!(self.color_support, ColorSupport::NoColor) {
            return format!("{}:{}$ ", user, dir);
        }

        let user_style = Style::builder().foreground(Color::Green).bold().build();
        let dir_style = Style::builder().foreground(Color::Blue).bold().build();
        format!(
            "{}:{}$ ",
            user.to_string().style(user_style),
            dir.to_string().style(dir_style)
        )
    }
}

impl Default for Prompt {
    fn default() -> Self {
        Self::new()
    }
}

fn user_name() -> String {
    env::var("USER")
        .or_else(|_| env::var("LOGNAME"))
        .unwrap_or_else(|_| "user".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_prompt_shape() {
        let prompt = Prompt::plain(None).render();
        assert!(prompt.ends_with("$ "));
        assert!(prompt.contains(':'));
        assert!(prompt.starts_with(&user_name()));
    }

    #[test]
    fn test_home_shown_as_tilde() {
        let prompt = Prompt::plain(Some(PathBuf::from("/home/ferris")));
        assert!(prompt.render_in(Path::new("/home/ferris")).ends_with(":~$ "));
        assert!(prompt
            .render_in(Path::new("/home/ferris/projects"))
            .ends_with(":projects$ "));
    }
}
