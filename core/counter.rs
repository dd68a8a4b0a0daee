use crate::config::Config;
use crate::error::{AppError, Result};
use crate::rules::IgnoreRuleSet;
use indexmap::IndexMap;
use log;
use std::io::{ErrorKind, Read};
use std::path::Path;
use std::process::{Child, Command, ExitStatus, Output, Stdio};
use std::thread;
use std::time::{Duration, Instant};

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Raw per-file report from a line counter, keyed by path in the order the
/// tool emitted it. Aggregate keys (`header`, `SUM`) are still present.
pub type RawReport = IndexMap<String, serde_json::Value>;

#[derive(Debug, Clone, PartialEq)]
pub enum CountReport {
    Report(RawReport),
    /// The tool ran but found nothing it could count.
    NothingToCount,
}

/// Counts lines for every trackable file under a root, honoring the rules.
pub trait LineCounter {
    fn count(&self, root: &Path, rules: &IgnoreRuleSet) -> Result<CountReport>;
}

/// Runs `cloc` (or a compatible binary) as a subprocess.
#[derive(Debug, Clone)]
pub struct ClocCounter {
    command: String,
    use_vcs: bool,
    timeout: Option<Duration>,
}

impl ClocCounter {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            use_vcs: true,
            timeout: None,
        }
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self::new(config.counter.command.clone())
            .with_vcs(config.counter.use_gitignore)
            .with_timeout(config.get_counter_timeout()?))
    }

    pub fn with_vcs(mut self, use_vcs: bool) -> Self {
        self.use_vcs = use_vcs;
        self
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn build_args(&self, root: &Path, rules: &IgnoreRuleSet) -> Vec<String> {
        let mut args = vec![
            root.to_string_lossy().into_owned(),
            "--json".to_string(),
            "--by-file".to_string(),
            "--quiet".to_string(),
        ];
        if self.use_vcs {
            args.push("--vcs=git".to_string());
        }
        if let Some(dirs) = rules.exclude_dir_arg() {
            args.push(format!("--exclude-dir={}", dirs));
        }
        if let Some(exts) = rules.exclude_ext_arg() {
            args.push(format!("--exclude-ext={}", exts));
        }
        args
    }

    fn run(&self, root: &Path, args: &[String]) -> Result<Output> {
        log::debug!("Running line counter: {} {}", self.command, args.join(" "));
        let child = Command::new(&self.command)
            .args(args)
            .current_dir(root)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                if e.kind() == ErrorKind::NotFound {
                    AppError::CounterNotFound(self.command.clone())
                } else {
                    AppError::Counting(format!("Failed to start '{}': {}", self.command, e))
                }
            })?;

        match self.timeout {
            Some(limit) => wait_with_timeout(child, limit),
            None => child
                .wait_with_output()
                .map_err(|e| AppError::Counting(format!("Failed to wait for counter: {}", e))),
        }
    }
}

impl LineCounter for ClocCounter {
    fn count(&self, root: &Path, rules: &IgnoreRuleSet) -> Result<CountReport> {
        let args = self.build_args(root, rules);
        let output = self.run(root, &args)?;
        interpret_output(&output.status, &output.stdout, &output.stderr)
    }
}

/// Maps a finished counter process onto a report.
///
/// Blank output, or exit status 1 with output, means there was nothing to
/// count. Any other failure is a counting error.
pub fn interpret_output(status: &ExitStatus, stdout: &[u8], stderr: &[u8]) -> Result<CountReport> {
    let stdout_text = String::from_utf8_lossy(stdout);
    let stderr_text = String::from_utf8_lossy(stderr);

    if status.success() {
        if stdout_text.trim().is_empty() {
            log::info!("Line counter produced no output; nothing to count.");
            return Ok(CountReport::NothingToCount);
        }
        return parse_report(&stdout_text).map(CountReport::Report);
    }

    if status.code() == Some(1) && !stdout_text.trim().is_empty() {
        log::info!(
            "Line counter exited with status 1 and output; treating as nothing to count. stderr: {}",
            stderr_text.trim()
        );
        return Ok(CountReport::NothingToCount);
    }

    Err(AppError::Counting(format!(
        "counter exited with {}: {}",
        status,
        if stderr_text.trim().is_empty() {
            "(no error output)"
        } else {
            stderr_text.trim()
        }
    )))
}

pub fn parse_report(json: &str) -> Result<RawReport> {
    serde_json::from_str::<RawReport>(json).map_err(|e| {
        AppError::StatsParse(format!("Line counter output is not a JSON object: {}", e))
    })
}

fn wait_with_timeout(mut child: Child, limit: Duration) -> Result<Output> {
    let stdout_reader = spawn_reader(child.stdout.take());
    let stderr_reader = spawn_reader(child.stderr.take());
    let deadline = Instant::now() + limit;

    let status = loop {
        match child.try_wait() {
            Ok(Some(status)) => break status,
            Ok(None) if Instant::now() >= deadline => {
                log::warn!("Line counter exceeded {:?}, killing it.", limit);
                stop_child(&mut child);
                return Err(AppError::CounterTimeout(limit));
            }
            Ok(None) => thread::sleep(POLL_INTERVAL),
            Err(e) => {
                stop_child(&mut child);
                return Err(AppError::Counting(format!(
                    "Failed to wait for counter: {}",
                    e
                )));
            }
        }
    };

    Ok(Output {
        status,
        stdout: join_reader(stdout_reader),
        stderr: join_reader(stderr_reader),
    })
}

/// Kills the counter and reaps it so no zombie is left behind.
fn stop_child(child: &mut Child) {
    if let Err(e) = child.kill() {
        log::warn!("Failed to kill line counter: {}", e);
    }
    if let Err(e) = child.wait() {
        log::warn!("Failed to reap line counter: {}", e);
    }
}

fn spawn_reader<R: Read + Send + 'static>(pipe: Option<R>) -> Option<thread::JoinHandle<Vec<u8>>> {
    pipe.map(|mut pipe| {
        thread::spawn(move || {
            let mut buf = Vec::new();
            if let Err(e) = pipe.read_to_end(&mut buf) {
                log::warn!("Failed to read line counter output: {}", e);
            }
            buf
        })
    })
}

fn join_reader(handle: Option<thread::JoinHandle<Vec<u8>>>) -> Vec<u8> {
    handle
        .and_then(|h| h.join().ok())
        .unwrap_or_default()
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::os::unix::process::ExitStatusExt;
    use std::path::PathBuf;

    fn exit(code: i32) -> ExitStatus {
        ExitStatus::from_raw(code << 8)
    }

    fn rules() -> IgnoreRuleSet {
        IgnoreRuleSet {
            exclude_dir: ["node_modules", "target"].into_iter().map(String::from).collect(),
            exclude_ext: ["md"].into_iter().map(String::from).collect(),
        }
    }

    #[test]
    fn test_build_args() {
        let counter = ClocCounter::new("cloc");
        let args = counter.build_args(&PathBuf::from("/repo"), &rules());
        assert_eq!(
            args,
            vec![
                "/repo",
                "--json",
                "--by-file",
                "--quiet",
                "--vcs=git",
                "--exclude-dir=node_modules,target",
                "--exclude-ext=md",
            ]
        );

        let args = counter
            .with_vcs(false)
            .build_args(&PathBuf::from("/repo"), &IgnoreRuleSet::default());
        assert_eq!(args, vec!["/repo", "--json", "--by-file", "--quiet"]);
    }

    #[test]
    fn test_success_with_report_keeps_order() {
        let json = r#"{"header":{"cloc_version":"2.00"},"src/z.rs":{"blank":1,"comment":2,"code":3},"src/a.rs":{"blank":0,"comment":0,"code":9},"SUM":{"code":12}}"#;
        let report = interpret_output(&exit(0), json.as_bytes(), b"").unwrap();
        let CountReport::Report(raw) = report else {
            panic!("expected report");
        };
        let keys: Vec<&str> = raw.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["header", "src/z.rs", "src/a.rs", "SUM"]);
    }

    #[test]
    fn test_blank_output_is_nothing_to_count() {
        assert_eq!(
            interpret_output(&exit(0), b"  \n", b"").unwrap(),
            CountReport::NothingToCount
        );
    }

    #[test]
    fn test_status_one_with_output_is_nothing_to_count() {
        assert_eq!(
            interpret_output(&exit(1), b"{}", b"no files").unwrap(),
            CountReport::NothingToCount
        );
    }

    #[test]
    fn test_hard_failure_propagates() {
        let err = interpret_output(&exit(1), b"", b"not a git repository").unwrap_err();
        assert!(matches!(err, AppError::Counting(_)));
        assert!(err.to_string().contains("not a git repository"));

        let err = interpret_output(&exit(2), b"{}", b"").unwrap_err();
        assert!(matches!(err, AppError::Counting(_)));
    }

    #[test]
    fn test_invalid_json_is_parse_error() {
        let err = interpret_output(&exit(0), b"[1,2]", b"").unwrap_err();
        assert!(matches!(err, AppError::StatsParse(_)));
    }

    #[test]
    fn test_missing_binary_is_reported() {
        let counter = ClocCounter::new("code2doc-no-such-counter-binary");
        let dir = tempfile::TempDir::new().unwrap();
        let err = counter
            .count(dir.path(), &IgnoreRuleSet::default())
            .unwrap_err();
        assert!(matches!(err, AppError::CounterNotFound(_)));
    }

    #[test]
    fn test_timeout_kills_slow_counter() {
        // `sleep` ignores the cloc flags' meaning but accepts being killed.
        let dir = tempfile::TempDir::new().unwrap();
        let child = Command::new("sleep")
            .arg("5")
            .current_dir(dir.path())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .unwrap();
        let err = wait_with_timeout(child, Duration::from_millis(100)).unwrap_err();
        assert!(matches!(err, AppError::CounterTimeout(_)));
    }

    #[test]
    fn test_stop_child_kills_and_reaps() {
        let mut child = Command::new("sleep").arg("5").spawn().unwrap();
        stop_child(&mut child);
        let status = child.try_wait().unwrap().expect("child should be reaped");
        assert!(!status.success());
    }

    #[test]
    fn test_wait_with_timeout_collects_output() {
        let child = Command::new("sh")
            .args(["-c", "printf '{}'; printf 'warn' >&2"])
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .unwrap();
        let output = wait_with_timeout(child, Duration::from_secs(10)).unwrap();
        assert!(output.status.success());
        assert_eq!(output.stdout, b"{}");
        assert_eq!(output.stderr, b"warn");
    }
}
