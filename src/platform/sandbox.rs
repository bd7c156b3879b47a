//! Rewriting of the player script into a self-contained sandbox unit

use crate::error::RyxError;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use tracing::debug;

/// Top-level name the rewritten player closure is bound to
pub const SANDBOX_ENTRY: &str = "_ryx_signature_entry";

/// Globals the player reads during start-up. Just enough shape for those
/// reads not to throw; none of them can reach the host.
const BROWSER_STUBS: &str = concat!(
    "var document = null;",
    "var XMLHttpRequest = { prototype: { fetch: null } };",
    "var navigator = { mediaCapabilities: null };",
    "var window = { location: { hostname: \"\" } }",
);

/// The player's closure ends with `})(_yt_player);`
static CLOSURE_END: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\}\s*\)\s*\(\s*_yt_player\s*\);\s*$").unwrap());

static WINDOW_ALIAS: Lazy<Regex> = Lazy::new(|| Regex::new(r"var\s+window\s*=\s*this").unwrap());

static NAMESPACE_AND_CLOSURE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(var\s+_yt_player\s*=\s*\{\s*\};\s*)(\(function\s*\()").unwrap()
});

/// Player script rewritten so that evaluating it binds the located signature
/// function to [`SANDBOX_ENTRY`]
#[derive(Debug, Clone)]
pub struct Sandbox {
    /// Rewritten script text
    pub source: String,
    /// Top-level name holding the callable after evaluation
    pub entry: &'static str,
    /// Transform name as it appears in the player script
    pub function_name: String,
}

/// Build the sandbox for `function_name` from the full player script.
///
/// Rewrites, each applied once:
/// 1. `return <name>;` before the closure's self-invocation
/// 2. drop `var window = this` aliases
/// 3. stub globals right after `var _yt_player = {};`
/// 4. bind the closure expression to [`SANDBOX_ENTRY`]
pub fn build_sandbox(player_js: &str, function_name: &str) -> Result<Sandbox, RyxError> {
    if !CLOSURE_END.is_match(player_js) {
        return Err(RyxError::TransformLocationFailed(
            "player closure terminator not found".to_string(),
        ));
    }
    let with_return = CLOSURE_END.replace(player_js, |caps: &Captures| {
        format!("return {};{}", function_name, &caps[0])
    });

    let without_alias = WINDOW_ALIAS.replace_all(&with_return, "");

    if !NAMESPACE_AND_CLOSURE.is_match(&without_alias) {
        return Err(RyxError::TransformLocationFailed(
            "player namespace declaration not found".to_string(),
        ));
    }
    let source = NAMESPACE_AND_CLOSURE
        .replace(&without_alias, |caps: &Captures| {
            format!(
                "{}{};var {} = {}",
                &caps[1], BROWSER_STUBS, SANDBOX_ENTRY, &caps[2]
            )
        })
        .into_owned();

    debug!(
        function = function_name,
        source_len = source.len(),
        "Built player sandbox"
    );

    Ok(Sandbox {
        source,
        entry: SANDBOX_ENTRY,
        function_name: function_name.to_string(),
    })
}
