use std::sync::Arc;

use clap::Args;
use grandmas_house_core::{Episode, Script};
use serde_json::json;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};

use crate::util::{exit_error, print_json, report_episode_error};

#[derive(Args)]
pub struct PlayArgs {
    /// Print compact JSON (one object per line)
    #[arg(long)]
    pub raw: bool,
}

/// Interactive episode: one reply per stdin line.
pub async fn run(script: Arc<Script>, args: PlayArgs) -> i32 {
    let episode = match Episode::new(script) {
        Ok(episode) => episode,
        Err(e) => exit_error(&e.to_string(), None),
    };
    let stdin = BufReader::new(tokio::io::stdin());
    play(episode, stdin, args.raw).await
}

async fn play<R: AsyncBufRead + Unpin>(mut episode: Episode, input: R, raw: bool) -> i32 {
    print_json(&json!({ "prompt": episode.reset() }), raw);

    let mut lines = input.lines();
    while !episode.is_done() {
        let reply = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => {
                tracing::warn!(stage = ?episode.stage(), "input closed before the episode finished");
                eprintln!(
                    "{}",
                    json!({
                        "error": "episode_incomplete",
                        "message": "Input ended before the final stage was answered"
                    })
                );
                return 1;
            }
            Err(e) => exit_error(&format!("Failed to read stdin: {e}"), None),
        };

        match episode.step(&reply) {
            Ok(result) => print_json(&result, raw),
            Err(e) => return report_episode_error(&e),
        }
    }
    0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn play_finishes_after_one_line_per_stage() {
        let input = "I'll cook\nLet's clean the attic\nSave money\nignored\n".as_bytes();
        let code = play(Episode::default(), input, true).await;
        assert_eq!(code, 0);
    }

    #[tokio::test]
    async fn play_reports_early_end_of_input() {
        let input = "I'll cook\n".as_bytes();
        let code = play(Episode::default(), input, true).await;
        assert_eq!(code, 1);
    }
}
