//! Execution engine (spec §4.4): runs one test case's steps in order,
//! short-circuiting on the first failure, then always runs cleanup.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::{Duration, Instant};

use runbook_assert::{evaluate as evaluate_assertion, AssertionContext};
use runbook_commons::{normalize_id, resolve_within};
use runbook_config::duration::{parse_duration, CLEANUP_TIMEOUT, DEFAULT_CASE_TIMEOUT};
use runbook_config::plan::{CleanupAction, Settings, Step, TestCase};
use runbook_config::ExpectedStatus;
use runbook_core::block::{Block, BlockRegistry, BlockType};
use runbook_core::schema::InputSchema;
use runbook_core::{parse_document, ConfigError};
use runbook_fuzz::{resolve_and_validate, ResolvedInputs};
use tokio::io::AsyncReadExt;
use tokio::process::Command;

use crate::outputs::{missing_output_refs, parse_env_sidecar, parse_output_file, scan_output_refs};
use crate::result::{ActualStatus, CaseStatus, StepResult, TestResult};
use crate::scope::StepScope;
use crate::session::Session;
use crate::template::{MiniMustache, TemplateEngine};
use crate::vars::build_template_variables;

pub struct Executor {
    pub registry: BlockRegistry,
    pub schemas: HashMap<String, InputSchema>,
    pub config_errors: Vec<ConfigError>,
    pub runbook_dir: PathBuf,
    template_engine: Box<dyn TemplateEngine>,
}

impl Executor {
    /// Build the executor once per runbook (spec §3 "Lifecycle"): parse the
    /// document, load and validate every block's schema, and collect every
    /// config error discovered along the way. Never fails — config errors
    /// are data (spec §4.2 "Failure semantics").
    pub fn build(document_source: &str, runbook_dir: PathBuf) -> Self {
        let parsed = parse_document(document_source);
        let (schemas, block_errors) = runbook_config::validate_blocks(&parsed.registry, &runbook_dir);
        let mut config_errors = parsed.config_errors;
        config_errors.extend(block_errors);
        Self {
            registry: parsed.registry,
            schemas,
            config_errors,
            runbook_dir,
            template_engine: Box::new(MiniMustache),
        }
    }

    fn config_errors_for(&self, block_id: &str) -> Vec<&ConfigError> {
        let normalized = normalize_id(block_id);
        self.config_errors
            .iter()
            .filter(|e| e.block_id.as_deref().map(normalize_id).as_deref() == Some(normalized.as_str()))
            .collect()
    }

    /// Run one test case end to end (spec §4.4).
    pub async fn run_case(&self, settings: &Settings, case: &TestCase) -> TestResult {
        let start = Instant::now();
        let case_name = case.name.clone().unwrap_or_default();
        let case_timeout = parse_duration(&settings.timeout).unwrap_or(DEFAULT_CASE_TIMEOUT);

        let output_dir = match self.case_output_dir(settings, &case_name) {
            Ok(dir) => dir,
            Err(err) => {
                return TestResult {
                    name: case_name,
                    status: CaseStatus::Failed,
                    duration: start.elapsed(),
                    error: Some(format!("could not prepare output directory: {err}")),
                    steps: Vec::new(),
                    assertions: Vec::new(),
                }
            }
        };

        let resolved = match resolve_and_validate(&case_name, &case.inputs, &self.schemas) {
            Ok(resolved) => resolved,
            Err(validation_errors) => {
                return TestResult {
                    name: case_name,
                    status: CaseStatus::Failed,
                    duration: start.elapsed(),
                    error: Some(validation_errors.to_string()),
                    steps: Vec::new(),
                    assertions: Vec::new(),
                };
            }
        };

        let working_dir = settings
            .working_dir
            .as_ref()
            .map(PathBuf::from)
            .unwrap_or_else(|| std::env::current_dir().unwrap_or_default());
        let mut session = Session::new(working_dir, output_dir);

        let steps = self.select_steps(case);

        // Pre-flight: any selected step whose block carries a config error
        // gets a synthetic result instead of execution (spec §4.4
        // "Pre-flight validation results").
        let mut config_error_steps = Vec::new();
        for step in &steps {
            let Some(block_id) = &step.block else { continue };
            let errors = self.config_errors_for(block_id);
            if errors.is_empty() {
                continue;
            }
            let message = errors.iter().map(|e| e.message.clone()).collect::<Vec<_>>().join("; ");
            let expect = ExpectedStatus::parse(&step.expect);
            let passed = expect == Some(ExpectedStatus::ConfigError)
                && step.error_contains.as_deref().is_none_or(|needle| message.contains(needle));
            config_error_steps.push(StepResult {
                block_id: block_id.clone(),
                expected: step.expect.clone(),
                actual: ActualStatus::ConfigError,
                passed,
                exit_code: None,
                outputs: HashMap::new(),
                log: String::new(),
                duration: Duration::ZERO,
                assertions: Vec::new(),
                error: Some(message),
            });
        }

        if !config_error_steps.is_empty() {
            self.run_cleanup(&case.cleanup, &session, case_timeout).await;
            // A case made up entirely of `expect: config_error` steps is
            // exercising the config-error path on purpose (spec §7) — it
            // passes when every one of those steps matched its expectation.
            let all_matched = config_error_steps.iter().all(|s| s.passed);
            let error = if all_matched {
                None
            } else {
                Some("one or more blocks have unresolved configuration errors".to_string())
            };
            return TestResult {
                name: case_name,
                status: if all_matched { CaseStatus::Passed } else { CaseStatus::Failed },
                duration: start.elapsed(),
                error,
                steps: config_error_steps,
                assertions: Vec::new(),
            };
        }

        let mut step_results = Vec::new();
        let mut case_failed = false;
        let mut case_error = None;

        for step in &steps {
            let result = self.run_step(step, &resolved, &mut session, case_timeout).await;
            let failed_expectation = !result.passed;
            let mut assertion_failed = false;

            let mut result = result;
            if !failed_expectation {
                let ctx = AssertionContext {
                    output_dir: session.output_dir.clone(),
                    outputs: session.outputs.clone(),
                    env: session.env.clone(),
                    timeout: case_timeout,
                };
                // Spec: "Later assertions in the same case are not
                // evaluated" once one fails.
                for assertion in &step.assertions {
                    let outcome = evaluate_assertion(assertion, &ctx).await;
                    let failed = !outcome.passed;
                    result.assertions.push(outcome);
                    if failed {
                        assertion_failed = true;
                        break;
                    }
                }
            }

            let should_stop = failed_expectation || assertion_failed;
            if should_stop && case_error.is_none() {
                case_error = result.error.clone().or_else(|| {
                    result
                        .assertions
                        .iter()
                        .find(|a| !a.passed)
                        .map(|a| format!("{}: {}", a.kind, a.message))
                });
            }
            step_results.push(result);
            if should_stop {
                case_failed = true;
                break;
            }
        }

        let mut case_assertions = Vec::new();
        if !case_failed {
            let ctx = AssertionContext {
                output_dir: session.output_dir.clone(),
                outputs: session.outputs.clone(),
                env: session.env.clone(),
                timeout: case_timeout,
            };
            for assertion in &case.assertions {
                let outcome = evaluate_assertion(assertion, &ctx).await;
                let failed = !outcome.passed;
                if failed && case_error.is_none() {
                    case_error = Some(format!("{}: {}", outcome.kind, outcome.message));
                }
                case_failed |= failed;
                case_assertions.push(outcome);
                if failed {
                    break;
                }
            }
        }

        self.run_cleanup(&case.cleanup, &session, case_timeout).await;

        TestResult {
            name: case_name,
            status: if case_failed { CaseStatus::Failed } else { CaseStatus::Passed },
            duration: start.elapsed(),
            error: case_error,
            steps: step_results,
            assertions: case_assertions,
        }
    }

    fn case_output_dir(&self, settings: &Settings, case_name: &str) -> std::io::Result<PathBuf> {
        if settings.use_temp_output {
            let dir = tempfile::Builder::new().prefix("runbook-case-").tempdir()?;
            Ok(dir.keep())
        } else {
            let base = settings.working_dir.as_deref().unwrap_or(".");
            let dir = Path::new(base).join(normalize_id(case_name));
            std::fs::create_dir_all(&dir)?;
            Ok(dir)
        }
    }

    /// Step selection (spec §4.4): explicit steps if the case has them,
    /// otherwise every executable block in document order with a default
    /// `expect: success`.
    fn select_steps(&self, case: &TestCase) -> Vec<Step> {
        if let Some(steps) = &case.steps {
            return steps.clone();
        }
        self.registry
            .executable_blocks_in_order()
            .map(|block| Step {
                block: Some(block.id.clone()),
                expect: "success".to_string(),
                missing_outputs: Vec::new(),
                error_contains: None,
                assertions: Vec::new(),
            })
            .collect()
    }

    async fn run_step(
        &self,
        step: &Step,
        resolved: &ResolvedInputs,
        session: &mut Session,
        case_timeout: Duration,
    ) -> StepResult {
        let start = Instant::now();
        let block_id = step.block.clone().unwrap_or_default();
        let expect = ExpectedStatus::parse(&step.expect);

        let base = |actual: ActualStatus, passed: bool, error: Option<String>| StepResult {
            block_id: block_id.clone(),
            expected: step.expect.clone(),
            actual,
            passed,
            exit_code: None,
            outputs: HashMap::new(),
            log: String::new(),
            duration: start.elapsed(),
            assertions: Vec::new(),
            error,
        };

        match expect {
            Some(ExpectedStatus::Skip) => base(ActualStatus::Skipped, true, None),
            Some(ExpectedStatus::ConfigError) => {
                // Already handled in pre-flight; reaching here means the
                // block had no config error at all, so the assertion fails.
                base(
                    ActualStatus::ConfigError,
                    false,
                    Some(format!("block `{block_id}` has no configuration error")),
                )
            }
            Some(ExpectedStatus::Blocked) => {
                let all_absent = step.missing_outputs.iter().all(|path| {
                    let Some((id, name)) = parse_blocked_path(path) else {
                        return false;
                    };
                    session.output(&id, &name).is_none()
                });
                base(
                    ActualStatus::Blocked,
                    all_absent,
                    (!all_absent).then(|| format!("some listed outputs for `{block_id}` are already present")),
                )
            }
            Some(_) | None => {
                let Some(block) = self.registry.get(&block_id) else {
                    return base(ActualStatus::Error, false, Some(format!("block `{block_id}` is not registered")));
                };
                let (actual, outputs, log, exit_code, error) =
                    self.execute_block(block, resolved, session, case_timeout).await;
                let passed = expect.is_some_and(|e| actual.matches_expect(e));
                StepResult {
                    block_id,
                    expected: step.expect.clone(),
                    actual,
                    passed,
                    exit_code,
                    outputs,
                    log,
                    duration: start.elapsed(),
                    assertions: Vec::new(),
                    error,
                }
            }
        }
    }

    async fn execute_block(
        &self,
        block: &Block,
        resolved: &ResolvedInputs,
        session: &mut Session,
        case_timeout: Duration,
    ) -> (ActualStatus, HashMap<String, String>, String, Option<i32>, Option<String>) {
        match block.block_type {
            BlockType::Template => {
                let vars = build_template_variables(resolved, session);
                match self.run_template(block, &vars, &session.output_dir) {
                    Ok(()) => (ActualStatus::Success, HashMap::new(), String::new(), None, None),
                    Err(err) => (ActualStatus::Error, HashMap::new(), String::new(), None, Some(err)),
                }
            }
            BlockType::TemplateInline => {
                let refs = scan_output_refs(&block.content);
                let missing = missing_output_refs(&refs, &session.outputs);
                if !missing.is_empty() {
                    let list = missing
                        .iter()
                        .map(|r| format!("_blocks.{}.outputs.{}", r.block_id, r.output_name))
                        .collect::<Vec<_>>()
                        .join(", ");
                    return (
                        ActualStatus::Error,
                        HashMap::new(),
                        String::new(),
                        None,
                        Some(format!("missing output reference(s): {list}")),
                    );
                }
                let vars = build_template_variables(resolved, session);
                match self.template_engine.render_text(&block.content, &vars) {
                    Ok(rendered) => match self.write_inline_output(block, &rendered, &session.output_dir) {
                        Ok(()) => (ActualStatus::Success, HashMap::new(), String::new(), None, None),
                        Err(err) => (ActualStatus::Error, HashMap::new(), String::new(), None, Some(err)),
                    },
                    Err(err) => (ActualStatus::Error, HashMap::new(), String::new(), None, Some(err.to_string())),
                }
            }
            BlockType::Check | BlockType::Command => {
                self.run_command(block, resolved, session, case_timeout).await
            }
            _ => (
                ActualStatus::Error,
                HashMap::new(),
                String::new(),
                None,
                Some(format!("block `{}` is not executable", block.id)),
            ),
        }
    }

    fn run_template(&self, block: &Block, vars: &serde_json::Value, case_output_dir: &Path) -> Result<(), String> {
        let path = block.properties.get("path").map(String::as_str).unwrap_or_default();
        let template_dir = resolve_within(&self.runbook_dir, Path::new(path)).map_err(|e| e.to_string())?;
        let output_subdir = case_output_dir.join("generated").join(block.normalized_id());
        self.template_engine
            .render_directory(&template_dir, &output_subdir, vars)
            .map_err(|e| e.to_string())
    }

    fn write_inline_output(&self, block: &Block, rendered: &str, case_output_dir: &Path) -> Result<(), String> {
        let output_path = block.properties.get("outputPath").map(String::as_str).unwrap_or_default();
        let resolved = resolve_within(case_output_dir, Path::new(output_path)).map_err(|e| e.to_string())?;
        if let Some(parent) = resolved.parent() {
            std::fs::create_dir_all(parent).map_err(|e| e.to_string())?;
        }
        std::fs::write(&resolved, rendered).map_err(|e| e.to_string())
    }

    async fn run_command(
        &self,
        block: &Block,
        resolved: &ResolvedInputs,
        session: &mut Session,
        case_timeout: Duration,
    ) -> (ActualStatus, HashMap<String, String>, String, Option<i32>, Option<String>) {
        let refs = scan_output_refs(&block.content);
        let missing = missing_output_refs(&refs, &session.outputs);
        if !missing.is_empty() {
            let list = missing
                .iter()
                .map(|r| format!("_blocks.{}.outputs.{}", r.block_id, r.output_name))
                .collect::<Vec<_>>()
                .join(", ");
            return (
                ActualStatus::Error,
                HashMap::new(),
                String::new(),
                None,
                Some(format!("missing output reference(s): {list}")),
            );
        }

        let vars = build_template_variables(resolved, session);
        let rendered = match self.template_engine.render_text(&block.content, &vars) {
            Ok(text) => text,
            Err(err) => return (ActualStatus::Error, HashMap::new(), String::new(), None, Some(err.to_string())),
        };

        let scope = match StepScope::acquire() {
            Ok(scope) => scope,
            Err(err) => {
                return (
                    ActualStatus::Error,
                    HashMap::new(),
                    String::new(),
                    None,
                    Some(format!("failed to acquire step resources: {err}")),
                )
            }
        };

        let language = block.properties.get("language").map(String::as_str).unwrap_or("bash");
        let captures_env = matches!(language, "bash" | "sh");
        let script_body = if captures_env {
            format!(
                "{rendered}\n__runbook_exit=$?\ndeclare -px > \"$RUNBOOK_ENV_SIDECAR\" 2>/dev/null || true\nexit $__runbook_exit\n"
            )
        } else {
            rendered
        };
        if std::fs::write(scope.wrapped_script.path(), script_body).is_err() {
            return (
                ActualStatus::Error,
                HashMap::new(),
                String::new(),
                None,
                Some("failed to write wrapped script".to_string()),
            );
        }

        let program = match language {
            "python" => "python3",
            "node" => "node",
            "sh" => "sh",
            _ => "bash",
        };

        let mut command = Command::new(program);
        command
            .arg(scope.wrapped_script.path())
            .current_dir(&session.working_dir)
            .envs(session.env.iter().cloned())
            .env("RUNBOOK_OUTPUT", scope.output_file_path())
            .env("RUNBOOK_FILES", scope.output_dir_path())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if captures_env {
            command.env("RUNBOOK_ENV_SIDECAR", scope.env_sidecar.path());
        }

        let mut child = match command.spawn() {
            Ok(child) => child,
            Err(err) => {
                return (
                    ActualStatus::Error,
                    HashMap::new(),
                    String::new(),
                    None,
                    Some(format!("failed to spawn `{program}`: {err}")),
                )
            }
        };

        let mut stdout = child.stdout.take();
        let mut stderr = child.stderr.take();

        // Drain stdout/stderr concurrently with `wait()` so a chatty child
        // (more than a pipe buffer's worth of output) can't block `wait()`
        // from ever returning; the timeout covers the whole group so a
        // runaway child is killed instead of read to EOF that never comes.
        let drain = async {
            let mut out_buf = String::new();
            let mut err_buf = String::new();
            let wait_fut = child.wait();
            let out_fut = async {
                if let Some(out) = stdout.as_mut() {
                    let _ = out.read_to_string(&mut out_buf).await;
                }
            };
            let err_fut = async {
                if let Some(err) = stderr.as_mut() {
                    let _ = err.read_to_string(&mut err_buf).await;
                }
            };
            let (status_result, (), ()) = tokio::join!(wait_fut, out_fut, err_fut);
            (status_result, out_buf, err_buf)
        };

        let (status_result, mut log, err_text) = match tokio::time::timeout(case_timeout, drain).await {
            Ok(outcome) => outcome,
            Err(_) => {
                let _ = child.start_kill();
                return (
                    ActualStatus::Error,
                    HashMap::new(),
                    String::new(),
                    None,
                    Some(format!("block `{}` timed out after {case_timeout:?}", block.id)),
                );
            }
        };
        if !err_text.is_empty() {
            log.push('\n');
            log.push_str(&err_text);
        }

        let status = match status_result {
            Ok(status) => status,
            Err(err) => {
                return (
                    ActualStatus::Error,
                    HashMap::new(),
                    log,
                    None,
                    Some(format!("block `{}` process error: {err}", block.id)),
                )
            }
        };

        let exit_code = status.code().unwrap_or(-1);
        let actual = ActualStatus::from_exit_code(exit_code);

        if matches!(actual, ActualStatus::Success | ActualStatus::Warn) {
            let output_text = std::fs::read_to_string(scope.output_file_path()).unwrap_or_default();
            let parsed_outputs = parse_output_file(&output_text);
            session.record_outputs(&block.id, parsed_outputs.clone());

            if let Ok(sidecar_text) = std::fs::read_to_string(scope.env_sidecar.path()) {
                let env = parse_env_sidecar(&sidecar_text);
                if !env.is_empty() {
                    session.replace_env(env);
                }
            }

            copy_generated_files(scope.output_dir_path(), &session.output_dir);

            (actual, parsed_outputs, log, Some(exit_code), None)
        } else {
            (actual, HashMap::new(), log, Some(exit_code), None)
        }
    }

    async fn run_cleanup(&self, actions: &[CleanupAction], session: &Session, _case_timeout: Duration) {
        for action in actions {
            let command_text = if let Some(command) = &action.command {
                command.clone()
            } else if let Some(path) = &action.path {
                path.clone()
            } else {
                continue;
            };
            let result = tokio::time::timeout(
                CLEANUP_TIMEOUT,
                Command::new("bash")
                    .arg("-c")
                    .arg(&command_text)
                    .current_dir(&session.output_dir)
                    .envs(session.env.iter().cloned())
                    .status(),
            )
            .await;
            // Cleanup failures are logged, never alter the case result
            // (spec §4.4 "Cleanup", §7).
            match result {
                Ok(Ok(status)) if !status.success() => {
                    tracing::warn!(command = %command_text, %status, "cleanup action exited non-zero");
                }
                Ok(Err(err)) => tracing::warn!(command = %command_text, %err, "cleanup action failed to run"),
                Err(_) => tracing::warn!(command = %command_text, "cleanup action timed out"),
                _ => {}
            }
        }
    }
}

fn parse_blocked_path(path: &str) -> Option<(String, String)> {
    let rest = path.strip_prefix("_blocks.")?;
    let (block_id, rest) = rest.split_once(".outputs.")?;
    Some((block_id.to_string(), rest.to_string()))
}

fn copy_generated_files(from: &Path, to: &Path) {
    for entry in walkdir::WalkDir::new(from)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file())
    {
        let relative = entry.path().strip_prefix(from).unwrap_or(entry.path());
        let dest = to.join(relative);
        if let Some(parent) = dest.parent() {
            let _ = std::fs::create_dir_all(parent);
        }
        let _ = std::fs::copy(entry.path(), dest);
    }
}
