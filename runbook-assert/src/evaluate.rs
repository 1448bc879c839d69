//! Per-type assertion evaluation (spec §4.5).

use std::process::Stdio;

use runbook_commons::resolve_within;
use runbook_config::plan::Assertion;
use tokio::io::AsyncReadExt;
use tokio::process::Command;

use crate::context::AssertionContext;

/// Outcome of one assertion (spec §3 "assertion results").
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssertionResult {
    pub kind: String,
    pub passed: bool,
    /// Non-empty iff `passed` is false — the specific, non-generic failure
    /// message spec §4.5 requires.
    pub message: String,
}

impl AssertionResult {
    fn pass(kind: &str) -> Self {
        Self {
            kind: kind.to_string(),
            passed: true,
            message: String::new(),
        }
    }

    fn fail(kind: &str, message: impl Into<String>) -> Self {
        Self {
            kind: kind.to_string(),
            passed: false,
            message: message.into(),
        }
    }
}

fn resolved_path(ctx: &AssertionContext, path: &str) -> std::path::PathBuf {
    resolve_within(&ctx.output_dir, std::path::Path::new(path))
        .unwrap_or_else(|_| ctx.output_dir.join(path))
}

pub async fn evaluate(assertion: &Assertion, ctx: &AssertionContext) -> AssertionResult {
    match assertion.kind.as_str() {
        "file_exists" => file_exists(assertion, ctx, true),
        "file_not_exists" => file_exists(assertion, ctx, false),
        "dir_exists" => dir_exists(assertion, ctx, true),
        "dir_not_exists" => dir_exists(assertion, ctx, false),
        "file_contains" => file_contains(assertion, ctx, true),
        "file_not_contains" => file_contains(assertion, ctx, false),
        "file_matches" => file_matches(assertion, ctx),
        "file_equals" => file_equals(assertion, ctx),
        "output_equals" => output_equals(assertion, ctx),
        "output_matches" => output_matches(assertion, ctx),
        "output_exists" => output_exists(assertion, ctx),
        "files_generated" => files_generated(assertion, ctx),
        "script" => script(assertion, ctx).await,
        other => AssertionResult::fail(other, format!("unknown assertion type `{other}`")),
    }
}

fn file_exists(assertion: &Assertion, ctx: &AssertionContext, expect_present: bool) -> AssertionResult {
    let kind = assertion.kind.as_str();
    let path = assertion.path.as_deref().unwrap_or_default();
    let resolved = resolved_path(ctx, path);
    let present = resolved.is_file();
    if present == expect_present {
        AssertionResult::pass(kind)
    } else if expect_present {
        AssertionResult::fail(kind, format!("file `{path}` does not exist"))
    } else {
        AssertionResult::fail(kind, format!("file `{path}` exists but was expected to be absent"))
    }
}

fn dir_exists(assertion: &Assertion, ctx: &AssertionContext, expect_present: bool) -> AssertionResult {
    let kind = assertion.kind.as_str();
    let path = assertion.path.as_deref().unwrap_or_default();
    let resolved = resolved_path(ctx, path);
    let present = resolved.is_dir();
    if present == expect_present {
        AssertionResult::pass(kind)
    } else if expect_present {
        AssertionResult::fail(kind, format!("directory `{path}` does not exist"))
    } else {
        AssertionResult::fail(kind, format!("directory `{path}` exists but was expected to be absent"))
    }
}

fn file_contains(assertion: &Assertion, ctx: &AssertionContext, expect_present: bool) -> AssertionResult {
    let kind = assertion.kind.as_str();
    let path = assertion.path.as_deref().unwrap_or_default();
    let contains = assertion.contains.as_deref().unwrap_or_default();
    let resolved = resolved_path(ctx, path);
    match std::fs::read_to_string(&resolved) {
        Ok(text) => {
            let present = text.contains(contains);
            if present == expect_present {
                AssertionResult::pass(kind)
            } else if expect_present {
                AssertionResult::fail(kind, format!("file `{path}` does not contain `{contains}`"))
            } else {
                AssertionResult::fail(kind, format!("file `{path}` unexpectedly contains `{contains}`"))
            }
        }
        Err(err) => AssertionResult::fail(kind, format!("file `{path}` is not readable: {err}")),
    }
}

fn file_matches(assertion: &Assertion, ctx: &AssertionContext) -> AssertionResult {
    let kind = assertion.kind.as_str();
    let path = assertion.path.as_deref().unwrap_or_default();
    let pattern = assertion.pattern.as_deref().unwrap_or_default();
    let resolved = resolved_path(ctx, path);
    let text = match std::fs::read_to_string(&resolved) {
        Ok(text) => text,
        Err(err) => return AssertionResult::fail(kind, format!("file `{path}` is not readable: {err}")),
    };
    match regex::Regex::new(pattern) {
        Ok(re) if re.is_match(&text) => AssertionResult::pass(kind),
        Ok(_) => AssertionResult::fail(kind, format!("file `{path}` does not match pattern `{pattern}`")),
        Err(err) => AssertionResult::fail(kind, format!("pattern `{pattern}` does not compile: {err}")),
    }
}

fn file_equals(assertion: &Assertion, ctx: &AssertionContext) -> AssertionResult {
    let kind = assertion.kind.as_str();
    let path = assertion.path.as_deref().unwrap_or_default();
    let expected = assertion.value.as_deref().unwrap_or_default();
    let resolved = resolved_path(ctx, path);
    match std::fs::read_to_string(&resolved) {
        Ok(text) if text == expected => AssertionResult::pass(kind),
        Ok(text) => AssertionResult::fail(
            kind,
            format!("file `{path}` content does not equal expected value (got {} bytes, expected {})", text.len(), expected.len()),
        ),
        Err(err) => AssertionResult::fail(kind, format!("file `{path}` is not readable: {err}")),
    }
}

fn output_equals(assertion: &Assertion, ctx: &AssertionContext) -> AssertionResult {
    let kind = assertion.kind.as_str();
    let block = assertion.block.as_deref().unwrap_or_default();
    let output = assertion.output.as_deref().unwrap_or_default();
    let expected = assertion.value.as_deref().unwrap_or_default();
    match ctx.output(block, output) {
        Some(actual) if actual == expected => AssertionResult::pass(kind),
        Some(actual) => AssertionResult::fail(
            kind,
            format!("output `{block}.{output}` is `{actual}`, expected `{expected}`"),
        ),
        None => AssertionResult::fail(kind, format!("output `{block}.{output}` is not present")),
    }
}

fn output_matches(assertion: &Assertion, ctx: &AssertionContext) -> AssertionResult {
    let kind = assertion.kind.as_str();
    let block = assertion.block.as_deref().unwrap_or_default();
    let output = assertion.output.as_deref().unwrap_or_default();
    let pattern = assertion.pattern.as_deref().unwrap_or_default();
    let Some(actual) = ctx.output(block, output) else {
        return AssertionResult::fail(kind, format!("output `{block}.{output}` is not present"));
    };
    match regex::Regex::new(pattern) {
        Ok(re) if re.is_match(actual) => AssertionResult::pass(kind),
        Ok(_) => AssertionResult::fail(
            kind,
            format!("output `{block}.{output}` value `{actual}` does not match pattern `{pattern}`"),
        ),
        Err(err) => AssertionResult::fail(kind, format!("pattern `{pattern}` does not compile: {err}")),
    }
}

fn output_exists(assertion: &Assertion, ctx: &AssertionContext) -> AssertionResult {
    let kind = assertion.kind.as_str();
    let block = assertion.block.as_deref().unwrap_or_default();
    let output = assertion.output.as_deref().unwrap_or_default();
    if ctx.output(block, output).is_some() {
        AssertionResult::pass(kind)
    } else {
        AssertionResult::fail(kind, format!("output `{block}.{output}` is not present"))
    }
}

fn files_generated(assertion: &Assertion, ctx: &AssertionContext) -> AssertionResult {
    let kind = assertion.kind.as_str();
    let min_count = assertion.min_count.unwrap_or(0);
    let actual = walkdir::WalkDir::new(&ctx.output_dir)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_file())
        .count();
    if actual >= min_count {
        AssertionResult::pass(kind)
    } else {
        AssertionResult::fail(
            kind,
            format!("found {actual} generated file(s), expected at least {min_count}"),
        )
    }
}

async fn script(assertion: &Assertion, ctx: &AssertionContext) -> AssertionResult {
    let kind = assertion.kind.as_str();
    let command = assertion.command.as_deref().unwrap_or_default();

    let mut child = match Command::new("bash")
        .arg("-c")
        .arg(command)
        .current_dir(&ctx.output_dir)
        .envs(ctx.env.iter().cloned())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
    {
        Ok(child) => child,
        Err(err) => return AssertionResult::fail(kind, format!("script `{command}` failed to spawn: {err}")),
    };

    let timeout = runbook_config::script_assertion_timeout(ctx.timeout);
    match tokio::time::timeout(timeout, child.wait()).await {
        Ok(Ok(status)) if status.success() => AssertionResult::pass(kind),
        Ok(Ok(status)) => {
            let mut output = String::new();
            if let Some(mut stderr) = child.stderr.take() {
                let _ = stderr.read_to_string(&mut output).await;
            }
            AssertionResult::fail(
                kind,
                format!("script `{command}` exited with {status}: {}", output.trim()),
            )
        }
        Ok(Err(err)) => AssertionResult::fail(kind, format!("script `{command}` failed: {err}")),
        Err(_) => {
            let _ = child.start_kill();
            AssertionResult::fail(kind, format!("script `{command}` timed out after {timeout:?}"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn assertion(kind: &str) -> Assertion {
        Assertion {
            kind: kind.to_string(),
            path: None,
            contains: None,
            pattern: None,
            value: None,
            block: None,
            output: None,
            min_count: None,
            command: None,
        }
    }

    #[tokio::test]
    async fn file_exists_passes_for_a_real_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("greeting.txt"), "Hello World").unwrap();
        let ctx = AssertionContext::new(dir.path().to_path_buf(), Duration::from_secs(5));
        let mut a = assertion("file_exists");
        a.path = Some("greeting.txt".to_string());
        let result = evaluate(&a, &ctx).await;
        assert!(result.passed);
    }

    #[tokio::test]
    async fn file_contains_reports_path_and_substring_on_failure() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("greeting.txt"), "Hello World").unwrap();
        let ctx = AssertionContext::new(dir.path().to_path_buf(), Duration::from_secs(5));
        let mut a = assertion("file_contains");
        a.path = Some("greeting.txt".to_string());
        a.contains = Some("Farewell".to_string());
        let result = evaluate(&a, &ctx).await;
        assert!(!result.passed);
        assert!(result.message.contains("greeting.txt"));
        assert!(result.message.contains("Farewell"));
    }

    #[tokio::test]
    async fn output_exists_checks_normalized_block_id() {
        let dir = tempfile::tempdir().unwrap();
        let mut ctx = AssertionContext::new(dir.path().to_path_buf(), Duration::from_secs(5));
        ctx.outputs
            .entry("gen_outputs".to_string())
            .or_default()
            .insert("foo".to_string(), "bar".to_string());
        let mut a = assertion("output_exists");
        a.block = Some("gen-outputs".to_string());
        a.output = Some("foo".to_string());
        let result = evaluate(&a, &ctx).await;
        assert!(result.passed);
    }

    #[tokio::test]
    async fn files_generated_with_zero_min_count_passes_on_empty_dir() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = AssertionContext::new(dir.path().to_path_buf(), Duration::from_secs(5));
        let mut a = assertion("files_generated");
        a.min_count = Some(0);
        let result = evaluate(&a, &ctx).await;
        assert!(result.passed);
    }

    #[tokio::test]
    async fn script_assertion_runs_and_captures_failure() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = AssertionContext::new(dir.path().to_path_buf(), Duration::from_secs(5));
        let mut a = assertion("script");
        a.command = Some("exit 1".to_string());
        let result = evaluate(&a, &ctx).await;
        assert!(!result.passed);
        assert!(result.message.contains("exit 1"));
    }
}
