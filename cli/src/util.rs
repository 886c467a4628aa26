use std::path::PathBuf;
use std::sync::Arc;

use grandmas_house_core::{EpisodeError, ErrorReport, Script, ScriptError};
use serde::Serialize;
use serde_json::json;

/// Exit code for a rejected episode call (step before reset / after done).
pub const EXIT_EPISODE_ERROR: i32 = 2;

pub fn exit_error(message: &str, docs_hint: Option<&str>) -> ! {
    let mut err = json!({
        "error": "cli_error",
        "message": message
    });
    if let Some(hint) = docs_hint {
        err["docs_hint"] = json!(hint);
    }
    eprintln!("{}", to_pretty(&err));
    std::process::exit(1);
}

/// Print a structured episode error to stderr and return its exit code.
pub fn report_episode_error(err: &EpisodeError) -> i32 {
    eprintln!("{}", to_pretty(&ErrorReport::from(err)));
    EXIT_EPISODE_ERROR
}

pub fn print_json<T: Serialize>(value: &T, raw: bool) {
    let formatted = if raw {
        serde_json::to_string(value).unwrap_or_else(|e| format!("{{\"raw_error\":\"{e}\"}}"))
    } else {
        to_pretty(value)
    };
    println!("{formatted}");
}

fn to_pretty<T: Serialize>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|e| format!("{{\"raw_error\":\"{e}\"}}"))
}

/// Default location of a user-supplied script.
pub fn config_path() -> PathBuf {
    let config_dir = dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("grandmas-house");
    config_dir.join("script.json")
}

/// Where the active script came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptSource {
    Explicit(String),
    Config(PathBuf),
    BuiltIn,
}

impl std::fmt::Display for ScriptSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScriptSource::Explicit(path) => write!(f, "{path}"),
            ScriptSource::Config(path) => write!(f, "{}", path.display()),
            ScriptSource::BuiltIn => write!(f, "built-in"),
        }
    }
}

/// Resolve the script to run (priority order):
/// 1. --script / GRANDMAS_HOUSE_SCRIPT
/// 2. ~/.config/grandmas-house/script.json, when it exists
/// 3. The built-in Grandma's House script
pub fn resolve_script(explicit: Option<&str>) -> Result<(Arc<Script>, ScriptSource), String> {
    if let Some(path) = explicit {
        let script = load_script(path)?;
        return Ok((Arc::new(script), ScriptSource::Explicit(path.to_string())));
    }

    let path = config_path();
    if path.exists() {
        let script = load_script(&path.to_string_lossy())?;
        return Ok((Arc::new(script), ScriptSource::Config(path)));
    }

    Ok((Arc::new(Script::grandmas_house()), ScriptSource::BuiltIn))
}

/// [`resolve_script`] for commands that cannot run without a script.
pub fn resolve_script_or_exit(explicit: Option<&str>) -> (Arc<Script>, ScriptSource) {
    match resolve_script(explicit) {
        Ok(resolved) => {
            tracing::debug!(script = %resolved.1, stages = resolved.0.stage_count(), "script resolved");
            resolved
        }
        Err(e) => exit_error(
            &e,
            Some("Check --script / GRANDMAS_HOUSE_SCRIPT, or run `grandmas-house script validate <path>`."),
        ),
    }
}

/// Load and validate a script from a file path or stdin (when path is "-").
pub fn load_script(path: &str) -> Result<Script, String> {
    let raw = read_text(path)?;
    Script::from_json(&raw).map_err(|e| describe_script_error(path, &e))
}

fn describe_script_error(path: &str, err: &ScriptError) -> String {
    format!("Script '{path}' rejected ({}): {err}", err.code())
}

/// Read a file path, or all of stdin when path is "-".
pub fn read_text(path: &str) -> Result<String, String> {
    if path == "-" {
        std::io::read_to_string(std::io::stdin()).map_err(|e| format!("Failed to read stdin: {e}"))
    } else {
        std::fs::read_to_string(path).map_err(|e| format!("Failed to read file '{path}': {e}"))
    }
}

/// Read JSON from a file path or stdin (when path is "-").
pub fn read_json_from_file(path: &str) -> Result<serde_json::Value, String> {
    let raw = read_text(path)?;
    serde_json::from_str(&raw).map_err(|e| format!("Invalid JSON in '{path}': {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_file(name: &str, contents: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!(
            "grandmas-house-{}-{name}",
            uuid::Uuid::now_v7()
        ));
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn config_path_ends_with_script_json() {
        let path = config_path();
        assert!(path.ends_with("grandmas-house/script.json"));
    }

    #[test]
    fn resolve_script_prefers_explicit_path() {
        let mut script = Script::grandmas_house();
        script.closing_line = "Grandma: Bye now!".to_string();
        let path = temp_file("script.json", &serde_json::to_string(&script).unwrap());
        let path_str = path.to_string_lossy().to_string();

        let (resolved, source) = resolve_script(Some(&path_str)).unwrap();
        assert_eq!(resolved.closing_line, "Grandma: Bye now!");
        assert_eq!(source, ScriptSource::Explicit(path_str));
        std::fs::remove_file(path).unwrap();
    }

    #[test]
    fn load_script_reports_invalid_scripts_with_code() {
        let path = temp_file(
            "empty.json",
            r#"{"stages":[],"closing_line":"bye","introspection_markers":[],"disallowed_terms":[]}"#,
        );
        let err = load_script(&path.to_string_lossy()).unwrap_err();
        assert!(err.contains("invalid_script"));
        assert!(err.contains("no stages"));
        std::fs::remove_file(path).unwrap();
    }

    #[test]
    fn read_text_reports_missing_file() {
        let err = read_text("/definitely/not/here.json").unwrap_err();
        assert!(err.starts_with("Failed to read file"));
    }

    #[test]
    fn script_source_display() {
        assert_eq!(ScriptSource::BuiltIn.to_string(), "built-in");
        assert_eq!(
            ScriptSource::Explicit("a.json".to_string()).to_string(),
            "a.json"
        );
    }
}
