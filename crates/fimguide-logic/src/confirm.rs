//! Interactive confirmation for irreversible actions
//!
//! Prints prompts to stderr so they don't mix with rendered output.

use anyhow::{anyhow, Result};
use std::io::{BufRead, IsTerminal, Write};

/// Prompt the user to confirm an action.
///
/// Reads from stdin. If stdin is not a terminal (piped/redirected), auto-declines.
/// Returns `Ok(())` if confirmed, `Err` if declined or non-interactive.
pub async fn confirm_action(action: &str, warning: &str) -> Result<()> {
    if !std::io::stdin().is_terminal() {
        return Err(anyhow!(
            "Non-interactive stdin, declining: {} (pass --yes to confirm)",
            action
        ));
    }

    let action = action.to_string();
    let warning = warning.to_string();

    tokio::task::spawn_blocking(move || {
        let mut stderr = std::io::stderr();
        write!(stderr, "\n{}\n  {} [y/N]: ", warning, action).ok();
        stderr.flush().ok();

        let mut input = String::new();
        std::io::stdin()
            .lock()
            .read_line(&mut input)
            .map_err(|e| anyhow!("Failed to read stdin: {}", e))?;

        if parse_answer(&input) {
            Ok(())
        } else {
            Err(anyhow!("Declined: {}", action))
        }
    })
    .await
    .map_err(|e| anyhow!("spawn_blocking failed: {}", e))?
}

fn parse_answer(input: &str) -> bool {
    matches!(input.trim().to_lowercase().as_str(), "y" | "yes")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_answer() {
        assert!(parse_answer("y\n"));
        assert!(parse_answer(" YES "));
        assert!(!parse_answer(""));
        assert!(!parse_answer("no"));
        assert!(!parse_answer("yep"));
    }
}
