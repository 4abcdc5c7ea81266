use crate::error::{PomupError, Result};
use crate::maven::UpdateKind;
use colored::{ColoredString, Colorize};
use std::io::{self, Write};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Answer {
    Yes,
    No,
    All,
    Quit,
}

fn parse_answer(input: &str) -> Option<Answer> {
    match input.trim().to_lowercase().as_str() {
        "" | "y" | "yes" => Some(Answer::Yes),
        "n" | "no" => Some(Answer::No),
        "a" | "all" => Some(Answer::All),
        "q" | "quit" => Some(Answer::Quit),
        _ => None,
    }
}

pub(crate) fn kind_label(kind: UpdateKind) -> ColoredString {
    let label = format!("[{}]", kind.to_string().to_uppercase());
    match kind {
        UpdateKind::Major => label.red().bold(),
        UpdateKind::Minor => label.yellow().bold(),
        UpdateKind::Patch => label.green().bold(),
        UpdateKind::UpToDate | UpdateKind::Unknown => label.dimmed(),
    }
}

/// Prompts for each proposed upgrade during `upgrade --interactive`.
pub struct UpgradeInteraction {
    enabled: bool,
    apply_all: bool,
}

impl UpgradeInteraction {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            apply_all: false,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Asks whether to upgrade `name`. Returns `UserCancelled` on quit.
    pub fn confirm(&mut self, name: &str, kind: UpdateKind, old: &str, new: &str) -> Result<bool> {
        if !self.enabled {
            return Ok(true);
        }

        println!(
            "\n{} {} {} {} to {}",
            kind_label(kind),
            name.white().bold(),
            "from".dimmed(),
            old.red(),
            new.green().bold()
        );

        if self.apply_all {
            println!("{}", "Auto-applying (previously selected 'all').".dimmed());
            return Ok(true);
        }

        loop {
            print!("{}", "Apply this upgrade? [Y/n/a/q]: ".bold());
            io::stdout().flush()?;

            let mut input = String::new();
            io::stdin().read_line(&mut input)?;

            match parse_answer(&input) {
                Some(Answer::Yes) => return Ok(true),
                Some(Answer::No) => {
                    println!("{}", "Skipping this upgrade.".dimmed());
                    return Ok(false);
                }
                Some(Answer::All) => {
                    println!(
                        "{}",
                        "Applying this and all remaining upgrades.".green().bold()
                    );
                    self.apply_all = true;
                    return Ok(true);
                }
                Some(Answer::Quit) => {
                    println!("{}", "Stopping at user request.".yellow());
                    return Err(PomupError::UserCancelled);
                }
                None => {
                    println!(
                        "{}",
                        "Please answer with y(es), n(o), a(ll), or q(uit).".red()
                    );
                }
            }
        }
    }

    /// Final confirmation before any file is written. Defaults to no.
    pub fn confirm_plan(&self, edits: usize, files: usize) -> Result<bool> {
        print!(
            "{}",
            format!("\nApply {edits} edit(s) to {files} file(s)? [y/N]: ").bold()
        );
        io::stdout().flush()?;

        let mut input = String::new();
        io::stdin().read_line(&mut input)?;
        Ok(matches!(
            parse_answer(&input),
            Some(Answer::Yes | Answer::All)
        ) && !input.trim().is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_answers() {
        assert_eq!(parse_answer("\n"), Some(Answer::Yes));
        assert_eq!(parse_answer("Y\n"), Some(Answer::Yes));
        assert_eq!(parse_answer("no"), Some(Answer::No));
        assert_eq!(parse_answer(" ALL "), Some(Answer::All));
        assert_eq!(parse_answer("q"), Some(Answer::Quit));
        assert_eq!(parse_answer("maybe"), None);
    }

    #[test]
    fn disabled_interaction_accepts_everything() {
        let mut interaction = UpgradeInteraction::new(false);
        assert!(!interaction.is_enabled());
        assert!(
            interaction
                .confirm("g:a", UpdateKind::Major, "1.0", "2.0")
                .unwrap()
        );
    }
}
