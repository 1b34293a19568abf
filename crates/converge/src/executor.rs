//! Executor - applies a resource's changeset through the OS facilities
//!
//! Operations run in order. A retryable operation backed by a retry
//! policy gets bounded exponential backoff; anything else fails on the
//! first error. Failures never roll back earlier operations in the same
//! changeset - partial application is visible in the outcome's error so
//! the operator can diagnose it.

use crate::context::ExecContext;
use crate::error::Error;
use crate::types::{ChangeSet, ExecMode, Op, Outcome, ResourceSpec, RetryPolicy};

/// Apply one resource's changeset and produce its outcome
///
/// An empty changeset yields `Unchanged` and issues zero operations.
pub fn execute(name: &str, spec: &ResourceSpec, changes: &ChangeSet, ctx: &ExecContext) -> Outcome {
    if changes.is_empty() {
        return Outcome::unchanged(name, spec);
    }

    let mode = ctx.mode_for(&spec.exec);
    let total = changes.len();
    for (position, op) in changes.iter().enumerate() {
        if let Err(reason) = apply_op(op, &mode, ctx, spec.retry.as_ref()) {
            let error = Error::Apply {
                index: position + 1,
                total,
                op: op.describe(),
                reason,
            };
            return Outcome::failed(name, spec, error);
        }
    }

    Outcome::changed(name, spec)
}

fn apply_op(
    op: &Op,
    mode: &ExecMode,
    ctx: &ExecContext,
    retry: Option<&RetryPolicy>,
) -> Result<(), String> {
    let attempts = match retry {
        Some(policy) if op.is_retryable() => policy.max_attempts.max(1),
        _ => 1,
    };

    let mut attempt = 1;
    loop {
        match apply_once(op, mode, ctx) {
            Ok(()) => return Ok(()),
            Err(reason) if attempt < attempts => {
                // attempts > 1 implies a policy is present
                let delay = retry.map(|p| p.delay_after(attempt)).unwrap_or_default();
                log::warn!(
                    "attempt {attempt}/{attempts} failed for {}: {reason}; retrying in {delay:?}",
                    op.describe()
                );
                std::thread::sleep(delay);
                attempt += 1;
            }
            Err(reason) => {
                return Err(if attempts > 1 {
                    format!("{reason} (after {attempts} attempts)")
                } else {
                    reason
                });
            }
        }
    }
}

fn apply_once(op: &Op, mode: &ExecMode, ctx: &ExecContext) -> Result<(), String> {
    match op {
        Op::WriteFile {
            path,
            content,
            mode: bits,
        } => ctx
            .fs
            .write_atomic(path, content, *bits)
            .map_err(|e| e.to_string()),
        Op::Shell { script, env, .. } => {
            let mut op_mode = mode.clone();
            op_mode
                .env
                .extend(env.iter().map(|(k, v)| (k.clone(), v.clone())));

            let output = ctx
                .runner
                .run(script, &op_mode)
                .map_err(|e| e.to_string())?;
            if output.success {
                Ok(())
            } else {
                let stderr = output.stderr_str();
                let stderr = stderr.trim();
                Err(if stderr.is_empty() {
                    "command exited with non-zero status".to_string()
                } else {
                    stderr.to_string()
                })
            }
        }
    }
}
