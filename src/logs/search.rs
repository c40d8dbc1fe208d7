use std::{fmt, io, process::Stdio, time::Duration};

use tokio::{io::AsyncWriteExt, process::Command};

/// Longest a single search may run before it is abandoned.
const SEARCH_TIMEOUT: Duration = Duration::from_secs(30);

/// External text-search program run over a log buffer. The pattern is passed
/// as the last argument and the buffer on stdin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchTool {
    program: String,
    args: Vec<String>,
    /// Exit status the program uses for "ran fine, nothing matched".
    no_match_code: i32,
}

#[derive(Debug)]
pub enum SearchError {
    Launch { program: String, source: io::Error },
    Failed { code: Option<i32>, stderr: String },
    TimedOut(Duration),
}

impl fmt::Display for SearchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SearchError::Launch { program, source } => {
                write!(f, "failed to run {program}: {source}")
            }
            SearchError::Failed { code, stderr } => {
                match code {
                    Some(code) => write!(f, "search exited with status {code}")?,
                    None => write!(f, "search was terminated by a signal")?,
                }
                let stderr = stderr.trim();
                if !stderr.is_empty() {
                    write!(f, ": {stderr}")?;
                }
                Ok(())
            }
            SearchError::TimedOut(after) => {
                write!(f, "search did not finish within {}s", after.as_secs())
            }
        }
    }
}

impl std::error::Error for SearchError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SearchError::Launch { source, .. } => Some(source),
            SearchError::Failed { .. } | SearchError::TimedOut(_) => None,
        }
    }
}

impl Default for SearchTool {
    fn default() -> Self {
        Self::ripgrep()
    }
}

impl SearchTool {
    pub fn ripgrep() -> Self {
        Self::new("rg", ["--color", "never"], 1)
    }

    pub fn new<I, S>(program: impl Into<String>, args: I, no_match_code: i32) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
            no_match_code,
        }
    }

    /// A program name from the command line. `rg` and `grep` get their
    /// colour-free flags; anything else is run with just the pattern.
    pub fn from_program(program: &str) -> Self {
        match program {
            "rg" => Self::ripgrep(),
            "grep" => Self::new("grep", ["--color=never", "-E"], 1),
            other => Self::new(other, Vec::<String>::new(), 1),
        }
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    /// Lines of `input` matching `pattern`. No match is an empty success.
    pub async fn search(&self, pattern: &str, input: &str) -> Result<String, SearchError> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .arg(pattern)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| SearchError::Launch {
                program: self.program.clone(),
                source,
            })?;

        // Stdin is fed while stdout and stderr are drained.
        let writer = child.stdin.take().map(|mut stdin| {
            let input = input.to_owned();
            tokio::spawn(async move {
                // The program may exit before reading everything; its exit
                // status decides the outcome, not the broken pipe.
                if let Err(err) = stdin.write_all(input.as_bytes()).await {
                    tracing::debug!(error = %err, "search stdin closed early");
                }
            })
        });

        let finished = tokio::time::timeout(SEARCH_TIMEOUT, child.wait_with_output()).await;
        if let Some(writer) = writer {
            writer.abort();
        }
        let output = finished
            .map_err(|_| SearchError::TimedOut(SEARCH_TIMEOUT))?
            .map_err(|source| SearchError::Launch {
                program: self.program.clone(),
                source,
            })?;
        let code = output.status.code();
        tracing::debug!(program = %self.program, pattern = %pattern, ?code, "search finished");
        match code {
            Some(0) => Ok(String::from_utf8_lossy(&output.stdout).into_owned()),
            Some(code) if code == self.no_match_code => Ok(String::new()),
            _ => Err(SearchError::Failed {
                code,
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BUFFER: &str = "10:00:00.000 INFO start\n10:00:01.000 ERROR boom\n10:00:02.000 INFO end\n";

    #[tokio::test]
    async fn matching_lines_are_returned() {
        let tool = SearchTool::from_program("grep");
        let output = tool.search("ERROR", BUFFER).await.unwrap();
        assert_eq!(output, "10:00:01.000 ERROR boom\n");
    }

    #[tokio::test]
    async fn no_match_is_an_empty_success() {
        let tool = SearchTool::from_program("grep");
        let output = tool.search("WARN", BUFFER).await.unwrap();
        assert_eq!(output, "");
    }

    #[tokio::test]
    async fn large_buffer_where_every_line_matches() {
        let line = format!("10:00:00.000 INFO {}\n", "x".repeat(1000));
        let buffer = line.repeat(600);
        assert!(buffer.len() > 500 * 1024);
        let tool = SearchTool::from_program("grep");
        let output = tokio::time::timeout(Duration::from_secs(10), tool.search("INFO", &buffer))
            .await
            .expect("search finishes")
            .unwrap();
        assert_eq!(output.len(), buffer.len());
    }

    #[tokio::test]
    async fn other_exit_codes_are_errors() {
        let tool = SearchTool::new("sh", ["-c", "exit 3", "sh"], 1);
        let err = tool.search("anything", BUFFER).await.unwrap_err();
        assert!(matches!(err, SearchError::Failed { code: Some(3), .. }));
    }

    #[tokio::test]
    async fn missing_program_is_a_launch_error() {
        let tool = SearchTool::new("cirrus-no-such-search-tool", Vec::<String>::new(), 1);
        let err = tool.search("x", BUFFER).await.unwrap_err();
        assert!(matches!(err, SearchError::Launch { .. }));
    }
}
