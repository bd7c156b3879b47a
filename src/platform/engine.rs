//! Script execution seam for signature transforms
//!
//! The cipher code only needs "compile this sandbox, then call its entry with
//! a string". [`ScriptEngine`] is that capability; [`DenoEngine`] provides it
//! with `deno_core`'s V8 runtime.
//!
//! `JsRuntime` is `!Send`, so each compiled transform owns a dedicated thread
//! holding its isolate. Calls are sent to that thread over a channel and the
//! thread exits once the last handle to the transform is dropped.

use crate::error::RyxError;
use crate::platform::sandbox::Sandbox;
use async_trait::async_trait;
use deno_core::{FastString, JsRuntime, RuntimeOptions};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};

/// A callable mapping a ciphertext signature to its plaintext
#[async_trait]
pub trait SignatureTransform: Send + Sync {
    async fn apply(&self, signature: &str) -> Result<String, RyxError>;
}

/// Shared handle to a compiled transform
pub type CompiledTransform = Arc<dyn SignatureTransform>;

/// Evaluates a [`Sandbox`] and returns its entry as a callable
#[async_trait]
pub trait ScriptEngine: Send + Sync {
    async fn compile(&self, sandbox: Sandbox) -> Result<CompiledTransform, RyxError>;
}

/// V8 engine via `deno_core`. No extensions are loaded, so sandboxed code has
/// no network, filesystem or timer access.
#[derive(Debug, Clone, Default)]
pub struct DenoEngine;

impl DenoEngine {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ScriptEngine for DenoEngine {
    async fn compile(&self, sandbox: Sandbox) -> Result<CompiledTransform, RyxError> {
        let (ready_tx, ready_rx) = oneshot::channel();
        let (call_tx, call_rx) = mpsc::unbounded_channel();

        debug!(
            function = %sandbox.function_name,
            source_len = sandbox.source.len(),
            "Starting sandbox isolate"
        );

        std::thread::Builder::new()
            .name(format!("ryx-sandbox-{}", sandbox.function_name))
            .spawn(move || run_isolate(sandbox, ready_tx, call_rx))
            .map_err(|e| RyxError::ExecutionEngineUnavailable(e.to_string()))?;

        ready_rx.await.map_err(|_| {
            RyxError::ExecutionEngineUnavailable("sandbox thread exited during start-up".to_string())
        })??;

        Ok(Arc::new(DenoTransform { calls: call_tx }))
    }
}

struct Call {
    signature: String,
    reply: oneshot::Sender<Result<String, RyxError>>,
}

/// Handle to a transform living in its own isolate thread
struct DenoTransform {
    calls: mpsc::UnboundedSender<Call>,
}

#[async_trait]
impl SignatureTransform for DenoTransform {
    async fn apply(&self, signature: &str) -> Result<String, RyxError> {
        let (reply, response) = oneshot::channel();
        self.calls
            .send(Call {
                signature: signature.to_string(),
                reply,
            })
            .map_err(|_| {
                RyxError::ExecutionEngineUnavailable("sandbox thread has terminated".to_string())
            })?;

        response.await.map_err(|_| {
            RyxError::ExecutionEngineUnavailable("sandbox thread dropped the call".to_string())
        })?
    }
}

fn run_isolate(
    sandbox: Sandbox,
    ready: oneshot::Sender<Result<(), RyxError>>,
    mut calls: mpsc::UnboundedReceiver<Call>,
) {
    let mut runtime = JsRuntime::new(RuntimeOptions::default());

    if let Err(e) = load_sandbox(&mut runtime, &sandbox) {
        let _ = ready.send(Err(e));
        return;
    }
    if ready.send(Ok(())).is_err() {
        return;
    }

    while let Some(call) = calls.blocking_recv() {
        let result = invoke_entry(&mut runtime, sandbox.entry, &call.signature);
        if let Err(e) = &result {
            warn!(function = %sandbox.function_name, "Signature transform failed: {}", e);
        }
        let _ = call.reply.send(result);
    }

    debug!(function = %sandbox.function_name, "Sandbox isolate shut down");
}

fn load_sandbox(runtime: &mut JsRuntime, sandbox: &Sandbox) -> Result<(), RyxError> {
    runtime
        .execute_script("<player>", FastString::from(sandbox.source.clone()))
        .map_err(|e| {
            RyxError::TransformLocationFailed(format!("player script evaluation failed: {e}"))
        })?;

    let check = format!("typeof {} === \"function\"", sandbox.entry);
    let is_function = runtime
        .execute_script("<entry>", FastString::from(check))
        .map_err(|e| RyxError::TransformLocationFailed(format!("entry lookup failed: {e}")))?;

    let scope = &mut runtime.handle_scope();
    if is_function.open(scope).is_true() {
        Ok(())
    } else {
        Err(RyxError::TransformLocationFailed(format!(
            "`{}` did not evaluate to a function",
            sandbox.entry
        )))
    }
}

fn invoke_entry(runtime: &mut JsRuntime, entry: &str, signature: &str) -> Result<String, RyxError> {
    let argument = serde_json::to_string(signature)?;
    let call = format!("{entry}({argument})");

    let result = runtime
        .execute_script("<signature>", FastString::from(call))
        .map_err(|e| RyxError::TransformInvocationFailed(e.to_string()))?;

    let scope = &mut runtime.handle_scope();
    let value = result.open(scope);
    if !value.is_string() {
        return Err(RyxError::TransformInvocationFailed(
            "transform did not return a string".to_string(),
        ));
    }
    Ok(value.to_rust_string_lossy(scope))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sandbox(source: &str) -> Sandbox {
        Sandbox {
            source: source.to_string(),
            entry: "_test_entry",
            function_name: "transform".to_string(),
        }
    }

    #[tokio::test]
    async fn test_compile_and_apply() {
        let engine = DenoEngine::new();
        let transform = engine
            .compile(sandbox(
                r#"var _test_entry = function(a){return a.split("").reverse().join("")};"#,
            ))
            .await
            .unwrap();

        assert_eq!(transform.apply("abc").await.unwrap(), "cba");
        assert_eq!(
            transform.apply("quote\"and\\slash").await.unwrap(),
            "hsals\\dna\"etouq"
        );
    }

    #[tokio::test]
    async fn test_missing_entry_is_location_failure() {
        let engine = DenoEngine::new();
        let result = engine.compile(sandbox("var somethingElse = 1;")).await;
        assert!(matches!(result, Err(RyxError::TransformLocationFailed(_))));
    }

    #[tokio::test]
    async fn test_syntax_error_is_location_failure() {
        let engine = DenoEngine::new();
        let result = engine.compile(sandbox("var _test_entry = function(a){")).await;
        assert!(matches!(result, Err(RyxError::TransformLocationFailed(_))));
    }

    #[tokio::test]
    async fn test_throwing_transform_is_invocation_failure() {
        let engine = DenoEngine::new();
        let transform = engine
            .compile(sandbox(
                r#"var _test_entry = function(a){ if (a === "boom") { throw new Error("bad"); } return a; };"#,
            ))
            .await
            .unwrap();

        assert!(matches!(
            transform.apply("boom").await,
            Err(RyxError::TransformInvocationFailed(_))
        ));
        assert_eq!(transform.apply("fine").await.unwrap(), "fine");
    }

    #[tokio::test]
    async fn test_non_string_result_is_invocation_failure() {
        let engine = DenoEngine::new();
        let transform = engine
            .compile(sandbox("var _test_entry = function(a){ return undefined; };"))
            .await
            .unwrap();

        assert!(matches!(
            transform.apply("x").await,
            Err(RyxError::TransformInvocationFailed(_))
        ));
    }

    #[tokio::test]
    async fn test_player_reading_browser_globals_compiles() {
        let player = concat!(
            "var _yt_player={};(function(g){var window=this;",
            "var h=window.location.hostname;var m=navigator.mediaCapabilities;",
            "var f=XMLHttpRequest.prototype.fetch;var d=document;",
            r#"Ab=function(a){a=a.split("");a.reverse();return a.join("")};"#,
            "})(_yt_player);",
        );
        let sandbox = crate::platform::sandbox::build_sandbox(player, "Ab").unwrap();

        let transform = DenoEngine::new().compile(sandbox).await.unwrap();
        assert_eq!(transform.apply("abc").await.unwrap(), "cba");
    }
}
