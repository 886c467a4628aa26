use clap::Subcommand;
use grandmas_house_core::Script;
use serde_json::json;

use crate::util::{exit_error, load_script, print_json, resolve_script_or_exit};

#[derive(Subcommand)]
pub enum ScriptCommands {
    /// Print the active script as JSON (edit it and pass it back via --script)
    Show {
        /// Print compact JSON
        #[arg(long)]
        raw: bool,
    },
    /// Load a script file and check it can drive an episode
    Validate {
        /// Script JSON file (use '-' for stdin)
        path: String,
    },
}

/// `explicit` is the global --script value. Only `show` resolves it;
/// `validate` checks the given file alone, so a broken configured script
/// never blocks checking its replacement.
pub fn run(explicit: Option<&str>, command: ScriptCommands) -> i32 {
    match command {
        ScriptCommands::Show { raw } => {
            let (script, _) = resolve_script_or_exit(explicit);
            print_json(script.as_ref(), raw);
            0
        }
        ScriptCommands::Validate { path } => match load_script(&path) {
            Ok(loaded) => {
                print_json(&validation_summary(&loaded), false);
                0
            }
            Err(e) => exit_error(
                &e,
                Some("Run `grandmas-house script show` for a valid script layout."),
            ),
        },
    }
}

fn validation_summary(script: &Script) -> serde_json::Value {
    let labels: Vec<&str> = script.stages.iter().map(|s| s.label.as_str()).collect();
    json!({
        "valid": true,
        "stages": script.stage_count(),
        "labels": labels,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_file(name: &str, contents: &str) -> std::path::PathBuf {
        let path = std::env::temp_dir().join(format!(
            "grandmas-house-{}-{name}",
            uuid::Uuid::now_v7()
        ));
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn validate_ignores_broken_active_script() {
        let broken = temp_file(
            "broken.json",
            r#"{"stages":[],"closing_line":"bye","introspection_markers":[],"disallowed_terms":[]}"#,
        );
        let good = temp_file(
            "good.json",
            &serde_json::to_string(&Script::grandmas_house()).unwrap(),
        );

        let broken_path = broken.to_string_lossy().to_string();
        let code = run(
            Some(broken_path.as_str()),
            ScriptCommands::Validate {
                path: good.to_string_lossy().to_string(),
            },
        );
        assert_eq!(code, 0);

        std::fs::remove_file(broken).unwrap();
        std::fs::remove_file(good).unwrap();
    }

    #[test]
    fn validation_summary_lists_stage_labels() {
        let summary = validation_summary(&Script::grandmas_house());
        assert_eq!(summary["valid"], true);
        assert_eq!(summary["stages"], 3);
        assert_eq!(summary["labels"], json!(["Food", "Merch", "Money"]));
    }
}
