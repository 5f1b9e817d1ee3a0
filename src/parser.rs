//! Resolution of a token sequence into an executable command description.
//!
//! The resolver recognizes a deliberately flat grammar: one command, or two
//! commands joined by a single pipe, with at most one input and one output
//! redirection per line and an optional trailing background marker. The
//! trailing `&` is stripped before anything else; `<` and `>` each consume
//! the token that follows them; the first `|` splits the token list and
//! terminates scanning, so everything after it lands verbatim in the right
//! command's argument list (a second `|` is an ordinary token). The input
//! redirection attaches to the left (or single) command, the output
//! redirection to the right command when a pipe was found.

use std::fmt;
use std::path::PathBuf;

/// One resolved executable invocation.
///
/// Built fresh per line, consumed by the orchestrator, then discarded.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CommandSpec {
    /// Program name as typed; resolution against PATH happens at spawn time.
    pub program: String,
    /// Argument tail, with control operators already stripped.
    pub args: Vec<String>,
    /// Path the child's standard input is redirected from, if any.
    pub stdin_file: Option<PathBuf>,
    /// Path the child's standard output is redirected to (create-truncate).
    pub stdout_file: Option<PathBuf>,
    /// Run without a foreground wait and register the pid as a job.
    pub background: bool,
}

/// Two commands joined by one unidirectional pipe.
///
/// The left command's standard output is forced to the pipe; the right
/// command's standard input is forced from it. Pipelines always run as a
/// synchronous foreground unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineSpec {
    pub left: CommandSpec,
    pub right: CommandSpec,
}

/// Result of resolving one non-empty token sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedLine {
    Single(CommandSpec),
    Pipeline(PipelineSpec),
}

impl ResolvedLine {
    /// The command whose name drives builtin dispatch: the single command,
    /// or the left stage of a pipeline.
    pub fn head(&self) -> &CommandSpec {
        match self {
            ResolvedLine::Single(spec) => spec,
            ResolvedLine::Pipeline(pipeline) => &pipeline.left,
        }
    }
}

/// Errors that can occur while resolving a token sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    /// A `<` or `>` operator with no following path token.
    DanglingRedirect(char),
    /// A command or pipeline stage with no program name.
    EmptyCommand,
    /// A trailing `&` combined with a pipe; not supported, rejected
    /// explicitly rather than silently ignored.
    BackgroundPipeline,
}

impl fmt::Display for ResolveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResolveError::DanglingRedirect(op) => {
                write!(f, "redirection `{op}` requires a file path")
            }
            ResolveError::EmptyCommand => write!(f, "missing command"),
            ResolveError::BackgroundPipeline => {
                write!(f, "pipelines cannot run in the background")
            }
        }
    }
}

/// Resolve a non-empty token sequence into a command or a pipeline.
pub fn resolve(mut tokens: Vec<String>) -> Result<ResolvedLine, ResolveError> {
    if tokens.is_empty() {
        return Err(ResolveError::EmptyCommand);
    }

    // Only the true last token qualifies as a background marker.
    let mut background = false;
    if tokens.last().map(String::as_str) == Some("&") {
        tokens.pop();
        background = true;
        if tokens.is_empty() {
            return Err(ResolveError::EmptyCommand);
        }
    }

    let mut stdin_file: Option<PathBuf> = None;
    let mut stdout_file: Option<PathBuf> = None;
    let mut left: Vec<String> = Vec::new();
    let mut right: Option<Vec<String>> = None;

    let mut it = tokens.into_iter();
    while let Some(token) = it.next() {
        match token.as_str() {
            "<" if stdin_file.is_none() => match it.next() {
                Some(path) => stdin_file = Some(PathBuf::from(path)),
                None => return Err(ResolveError::DanglingRedirect('<')),
            },
            ">" if stdout_file.is_none() => match it.next() {
                Some(path) => stdout_file = Some(PathBuf::from(path)),
                None => return Err(ResolveError::DanglingRedirect('>')),
            },
            "|" => {
                right = Some(it.collect());
                break;
            }
            _ => left.push(token),
        }
    }

    let (left_program, left_tail) = match split_program(left) {
        Some(parts) => parts,
        None => return Err(ResolveError::EmptyCommand),
    };

    match right {
        None => Ok(ResolvedLine::Single(CommandSpec {
            program: left_program,
            args: left_tail,
            stdin_file,
            stdout_file,
            background,
        })),
        Some(right_tokens) => {
            if background {
                return Err(ResolveError::BackgroundPipeline);
            }
            let (right_program, right_tail) = match split_program(right_tokens) {
                Some(parts) => parts,
                None => return Err(ResolveError::EmptyCommand),
            };
            Ok(ResolvedLine::Pipeline(PipelineSpec {
                left: CommandSpec {
                    program: left_program,
                    args: left_tail,
                    stdin_file,
                    stdout_file: None,
                    background: false,
                },
                right: CommandSpec {
                    program: right_program,
                    args: right_tail,
                    stdin_file: None,
                    stdout_file,
                    background: false,
                },
            }))
        }
    }
}

fn split_program(tokens: Vec<String>) -> Option<(String, Vec<String>)> {
    let mut it = tokens.into_iter();
    let program = it.next()?;
    Some((program, it.collect()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolved(line: &str) -> ResolvedLine {
        let tokens = line.split_whitespace().map(str::to_string).collect();
        resolve(tokens).unwrap()
    }

    fn resolve_err(line: &str) -> ResolveError {
        let tokens = line.split_whitespace().map(str::to_string).collect();
        resolve(tokens).unwrap_err()
    }

    #[test]
    fn plain_command_with_arguments() {
        let ResolvedLine::Single(spec) = resolved("ls -l /tmp") else {
            panic!("expected a single command");
        };
        assert_eq!(spec.program, "ls");
        assert_eq!(spec.args, vec!["-l", "/tmp"]);
        assert_eq!(spec.stdin_file, None);
        assert_eq!(spec.stdout_file, None);
        assert!(!spec.background);
    }

    #[test]
    fn both_redirections_on_a_single_command() {
        let ResolvedLine::Single(spec) = resolved("cat < in.txt > out.txt") else {
            panic!("expected a single command");
        };
        assert_eq!(spec.program, "cat");
        assert!(spec.args.is_empty());
        assert_eq!(spec.stdin_file, Some(PathBuf::from("in.txt")));
        assert_eq!(spec.stdout_file, Some(PathBuf::from("out.txt")));
    }

    #[test]
    fn pipe_splits_into_two_commands() {
        let ResolvedLine::Pipeline(p) = resolved("ls | wc -l") else {
            panic!("expected a pipeline");
        };
        assert_eq!(p.left.program, "ls");
        assert!(p.left.args.is_empty());
        assert_eq!(p.right.program, "wc");
        assert_eq!(p.right.args, vec!["-l"]);
    }

    #[test]
    fn trailing_ampersand_sets_background_and_is_stripped() {
        let ResolvedLine::Single(spec) = resolved("sleep 5 &") else {
            panic!("expected a single command");
        };
        assert!(spec.background);
        assert_eq!(spec.program, "sleep");
        assert_eq!(spec.args, vec!["5"]);
    }

    #[test]
    fn ampersand_in_the_middle_is_an_ordinary_token() {
        let ResolvedLine::Single(spec) = resolved("echo & done") else {
            panic!("expected a single command");
        };
        assert!(!spec.background);
        assert_eq!(spec.args, vec!["&", "done"]);
    }

    #[test]
    fn output_redirection_before_the_pipe_attaches_to_the_right_stage() {
        let ResolvedLine::Pipeline(p) = resolved("ls > out.txt | wc") else {
            panic!("expected a pipeline");
        };
        assert_eq!(p.left.stdout_file, None);
        assert_eq!(p.right.stdout_file, Some(PathBuf::from("out.txt")));
    }

    #[test]
    fn input_redirection_attaches_to_the_left_stage() {
        let ResolvedLine::Pipeline(p) = resolved("sort < data.txt | uniq") else {
            panic!("expected a pipeline");
        };
        assert_eq!(p.left.stdin_file, Some(PathBuf::from("data.txt")));
        assert_eq!(p.right.stdin_file, None);
    }

    #[test]
    fn tokens_after_the_pipe_are_not_rescanned() {
        let ResolvedLine::Pipeline(p) = resolved("a | b > out.txt c") else {
            panic!("expected a pipeline");
        };
        // Scanning stops at the pipe boundary, so the right stage keeps the
        // operator as a literal argument.
        assert_eq!(p.right.program, "b");
        assert_eq!(p.right.args, vec![">", "out.txt", "c"]);
        assert_eq!(p.right.stdout_file, None);
    }

    #[test]
    fn second_pipe_is_an_ordinary_token() {
        let ResolvedLine::Pipeline(p) = resolved("a | b | c") else {
            panic!("expected a pipeline");
        };
        assert_eq!(p.right.program, "b");
        assert_eq!(p.right.args, vec!["|", "c"]);
    }

    #[test]
    fn dangling_input_redirection_is_rejected() {
        assert_eq!(resolve_err("cat <"), ResolveError::DanglingRedirect('<'));
    }

    #[test]
    fn dangling_output_redirection_is_rejected() {
        assert_eq!(resolve_err("ls >"), ResolveError::DanglingRedirect('>'));
    }

    #[test]
    fn background_pipeline_is_rejected() {
        assert_eq!(resolve_err("ls | wc &"), ResolveError::BackgroundPipeline);
    }

    #[test]
    fn empty_pipeline_stage_is_rejected() {
        assert_eq!(resolve_err("ls |"), ResolveError::EmptyCommand);
        assert_eq!(resolve_err("| wc"), ResolveError::EmptyCommand);
    }

    #[test]
    fn lone_ampersand_is_rejected() {
        assert_eq!(resolve_err("&"), ResolveError::EmptyCommand);
    }
}
