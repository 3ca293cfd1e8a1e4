//! Turns one command line into a [`Pipeline`] of [`Stage`]s.
//!
//! Parsing happens in two passes. [`split_stages`] cuts the line at unquoted
//! `|` characters and hands back the raw text of every stage, quotes intact.
//! [`parse_stage`] then re-scans each stage on its own, producing the argument
//! vector and the `<`, `>` and `>>` redirection targets.

mod expand;

pub use expand::{expand_vars, expand_vars_with};

use std::fmt;

/// How to treat a quote that is still open when the line ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ParseMode {
    /// Close it silently and keep whatever was buffered.
    #[default]
    Permissive,
    /// Reject the line with [`ParseError::UnterminatedQuote`].
    Strict,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    UnterminatedQuote(char),
    MissingRedirectTarget(char),
    EmptyStage,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseError::UnterminatedQuote(q) => write!(f, "unterminated quote ({})", q),
            ParseError::MissingRedirectTarget(op) => {
                write!(f, "missing file name after '{}'", op)
            }
            ParseError::EmptyStage => write!(f, "missing command around '|'"),
        }
    }
}

impl std::error::Error for ParseError {}

/// One command of a pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Stage {
    pub args: Vec<String>,
    pub input: Option<String>,
    pub output: Option<String>,
    /// `>>` rather than `>`.
    pub append: bool,
    /// Trimmed source text, used when the stage is shown back to the user.
    pub text: String,
}

impl Stage {
    pub fn program(&self) -> Option<&str> {
        self.args.first().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.args.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Pipeline {
    pub stages: Vec<Stage>,
    /// The line ended with `&`.
    pub background: bool,
}

impl Pipeline {
    pub fn single(stage: Stage, background: bool) -> Self {
        Pipeline {
            stages: vec![stage],
            background,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    /// Input file of the first stage. Input redirections on later stages are
    /// never honoured.
    pub fn input(&self) -> Option<&str> {
        self.stages.first().and_then(|s| s.input.as_deref())
    }

    /// Output file of the last stage and its append flag.
    pub fn output(&self) -> Option<(&str, bool)> {
        self.stages
            .last()
            .and_then(|s| s.output.as_deref().map(|path| (path, s.append)))
    }

    pub fn command_text(&self) -> String {
        self.stages
            .iter()
            .map(|s| s.text.as_str())
            .collect::<Vec<_>>()
            .join(" | ")
    }
}

/// Parses a full command line.
///
/// Blank lines and lines starting with `#` give an empty pipeline. A trailing
/// `&` marks the pipeline for background execution.
pub fn parse_line(line: &str, mode: ParseMode) -> Result<Pipeline, ParseError> {
    let mut line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(Pipeline::default());
    }

    let background = match line.strip_suffix('&') {
        Some(rest) => {
            line = rest.trim_end();
            true
        }
        None => false,
    };

    let segments = split_stages(line);
    if segments.len() > 1 && segments.iter().any(|s| s.is_empty()) {
        return Err(ParseError::EmptyStage);
    }

    let mut stages = segments
        .iter()
        .map(|segment| parse_stage(segment, mode))
        .collect::<Result<Vec<_>, _>>()?;

    if stages.len() > 1 && stages.iter().any(Stage::is_empty) {
        return Err(ParseError::EmptyStage);
    }
    stages.retain(|s| !s.is_empty());

    tracing::debug!(stages = stages.len(), background, "parsed line {:?}", line);
    Ok(Pipeline { stages, background })
}

/// Splits a line at every `|` outside quotes. Each piece is trimmed and keeps
/// its quote characters. A line that ends in `|` yields an empty last piece.
pub fn split_stages(line: &str) -> Vec<String> {
    let mut stages = Vec::new();
    let mut current = String::new();
    let mut quote: Option<char> = None;
    let mut saw_pipe = false;

    for c in line.chars() {
        match (quote, c) {
            (Some(q), c) if c == q => {
                quote = None;
                current.push(c);
            }
            (None, '"' | '\'') => {
                quote = Some(c);
                current.push(c);
            }
            (None, '|') => {
                saw_pipe = true;
                stages.push(current.trim().to_string());
                current.clear();
            }
            _ => current.push(c),
        }
    }

    if saw_pipe || !current.trim().is_empty() {
        stages.push(current.trim().to_string());
    }
    stages
}

/// Tokenizes the text of one stage.
///
/// Quotes group characters into a single argument and are removed. Outside
/// quotes, whitespace separates arguments, `<` takes the next word as input
/// file, and `>`/`>>` take the next word as output file. Every argument goes
/// through [`expand_vars`]; arguments that end up empty are dropped.
pub fn parse_stage(text: &str, mode: ParseMode) -> Result<Stage, ParseError> {
    let chars: Vec<char> = text.chars().collect();
    let mut stage = Stage {
        text: text.trim().to_string(),
        ..Stage::default()
    };
    let mut current = String::new();
    let mut quote: Option<char> = None;
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        i += 1;

        if let Some(q) = quote {
            if c == q {
                quote = None;
            } else {
                current.push(c);
            }
            continue;
        }

        match c {
            '"' | '\'' => quote = Some(c),
            '<' => {
                flush_arg(&mut current, &mut stage.args);
                let (target, next) = read_target(&chars, i);
                stage.input = Some(target.ok_or(ParseError::MissingRedirectTarget('<'))?);
                i = next;
            }
            '>' => {
                flush_arg(&mut current, &mut stage.args);
                stage.append = chars.get(i) == Some(&'>');
                if stage.append {
                    i += 1;
                }
                let (target, next) = read_target(&chars, i);
                stage.output = Some(target.ok_or(ParseError::MissingRedirectTarget('>'))?);
                i = next;
            }
            c if c.is_whitespace() => flush_arg(&mut current, &mut stage.args),
            _ => current.push(c),
        }
    }

    if let Some(q) = quote {
        if mode == ParseMode::Strict {
            return Err(ParseError::UnterminatedQuote(q));
        }
        tracing::debug!("closing unterminated {} quote", q);
    }
    flush_arg(&mut current, &mut stage.args);

    Ok(stage)
}

fn flush_arg(current: &mut String, args: &mut Vec<String>) {
    if current.is_empty() {
        return;
    }
    let expanded = expand_vars(current);
    if !expanded.is_empty() {
        args.push(expanded.into_owned());
    }
    current.clear();
}

/// Skips whitespace from `start`, then reads one run of non-whitespace.
fn read_target(chars: &[char], start: usize) -> (Option<String>, usize) {
    let mut i = start;
    while i < chars.len() && chars[i].is_whitespace() {
        i += 1;
    }
    let begin = i;
    while i < chars.len() && !chars[i].is_whitespace() {
        i += 1;
    }

    let target: String = chars[begin..i].iter().collect();
    if target.is_empty() {
        (None, i)
    } else {
        (Some(target), i)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(line: &str) -> Pipeline {
        parse_line(line, ParseMode::Permissive).unwrap()
    }

    fn args(stage: &Stage) -> Vec<&str> {
        stage.args.iter().map(String::as_str).collect()
    }

    #[test]
    fn test_blank_and_comment_lines() {
        assert!(parse("").is_empty());
        assert!(parse("   \t ").is_empty());
        assert!(parse("# echo hi | wc").is_empty());
    }

    #[test]
    fn test_three_stages_in_order() {
        let pipeline = parse("cmd1 | cmd2 -x | cmd3");
        assert_eq!(pipeline.len(), 3);
        assert_eq!(pipeline.stages[0].program(), Some("cmd1"));
        assert_eq!(args(&pipeline.stages[1]), vec!["cmd2", "-x"]);
        assert_eq!(pipeline.stages[2].program(), Some("cmd3"));
        assert_eq!(pipeline.command_text(), "cmd1 | cmd2 -x | cmd3");
    }

    #[test]
    fn test_quoted_pipe_stays_in_token() {
        let pipeline = parse(r#"echo "a|b""#);
        assert_eq!(pipeline.len(), 1);
        assert_eq!(args(&pipeline.stages[0]), vec!["echo", "a|b"]);
    }

    #[test]
    fn test_quoted_redirection_and_spaces_are_literal() {
        let pipeline = parse("echo 'x > y' \"<in\"");
        let stage = &pipeline.stages[0];
        assert_eq!(args(stage), vec!["echo", "x > y", "<in"]);
        assert!(stage.input.is_none());
        assert!(stage.output.is_none());
    }

    #[test]
    fn test_other_quote_inside_quotes() {
        let pipeline = parse(r#"echo "it's" 'say "hi"'"#);
        assert_eq!(args(&pipeline.stages[0]), vec!["echo", "it's", "say \"hi\""]);
    }

    #[test]
    fn test_output_redirection() {
        let stage = parse_stage("echo hi > out.txt", ParseMode::Permissive).unwrap();
        assert_eq!(args(&stage), vec!["echo", "hi"]);
        assert_eq!(stage.output.as_deref(), Some("out.txt"));
        assert!(!stage.append);

        let stage = parse_stage("echo bye>>out.txt", ParseMode::Permissive).unwrap();
        assert_eq!(args(&stage), vec!["echo", "bye"]);
        assert_eq!(stage.output.as_deref(), Some("out.txt"));
        assert!(stage.append);
    }

    #[test]
    fn test_input_redirection() {
        let stage = parse_stage("sort <   data.txt -r", ParseMode::Permissive).unwrap();
        assert_eq!(args(&stage), vec!["sort", "-r"]);
        assert_eq!(stage.input.as_deref(), Some("data.txt"));
    }

    #[test]
    fn test_pipeline_ends() {
        let pipeline = parse("cat < in.txt | sort | uniq >> out.txt");
        assert_eq!(pipeline.input(), Some("in.txt"));
        assert_eq!(pipeline.output(), Some(("out.txt", true)));
    }

    #[test]
    fn test_missing_redirect_target() {
        assert_eq!(
            parse_line("echo hi >", ParseMode::Permissive),
            Err(ParseError::MissingRedirectTarget('>'))
        );
        assert_eq!(
            parse_line("cat <  ", ParseMode::Permissive),
            Err(ParseError::MissingRedirectTarget('<'))
        );
    }

    #[test]
    fn test_empty_tokens_never_emitted() {
        let pipeline = parse("echo   ''   a\t\tb  ");
        assert_eq!(args(&pipeline.stages[0]), vec!["echo", "a", "b"]);
    }

    #[test]
    fn test_environment_expansion() {
        std::env::set_var("STRAND_PARSER_TEST", "expanded");
        let pipeline = parse("echo $STRAND_PARSER_TEST ${STRAND_PARSER_TEST}! $STRAND_PARSER_UNSET");
        assert_eq!(
            args(&pipeline.stages[0]),
            vec!["echo", "expanded", "expanded!"]
        );
    }

    #[test]
    fn test_background_suffix() {
        let pipeline = parse("sleep 5 | cat &");
        assert!(pipeline.background);
        assert_eq!(pipeline.len(), 2);
        assert_eq!(pipeline.command_text(), "sleep 5 | cat");

        assert!(!parse("sleep 5").background);
    }

    #[test]
    fn test_unterminated_quote_modes() {
        let pipeline = parse("echo \"open | still quoted");
        assert_eq!(pipeline.len(), 1);
        assert_eq!(
            args(&pipeline.stages[0]),
            vec!["echo", "open | still quoted"]
        );

        assert_eq!(
            parse_line("echo 'open", ParseMode::Strict),
            Err(ParseError::UnterminatedQuote('\''))
        );
    }

    #[test]
    fn test_empty_stage_is_rejected() {
        for line in ["ls |", "| wc", "ls || wc", "ls | > out | wc"] {
            assert_eq!(
                parse_line(line, ParseMode::Permissive),
                Err(ParseError::EmptyStage),
                "{}",
                line
            );
        }
    }

    #[test]
    fn test_split_keeps_quotes() {
        assert_eq!(
            split_stages(r#"grep "a|b" file | wc -l"#),
            vec![r#"grep "a|b" file"#, "wc -l"]
        );
    }
}
