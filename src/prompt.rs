use dialoguer::{Confirm, Input, theme::ColorfulTheme};

/// Abstraction over a string input prompt.
///
/// Implementors define how string input is collected from the user.
/// This trait decouples user input from the logic that consumes it.
pub trait StringPrompter {
    /// Prompt the user for a string input, falling back to `default` on Enter.
    fn prompt(&mut self, prompt: &str, default: &str) -> Result<String, String>;
}

/// Abstraction over a boolean (yes/no) confirmation prompt.
pub trait ConfirmPrompter {
    /// Prompt the user for a yes/no confirmation.
    ///
    /// # Returns
    /// `Ok(true)` if confirmed, `Ok(false)` if declined, or `Err(String)` on input failure.
    fn confirm(&mut self, prompt: &str, default: bool) -> Result<bool, String>;
}

/// Default implementation of `StringPrompter` using `dialoguer::Input`.
pub struct DialoguerStringPrompter;

impl StringPrompter for DialoguerStringPrompter {
    fn prompt(&mut self, prompt: &str, default: &str) -> Result<String, String> {
        let theme = ColorfulTheme::default();
        let mut input = Input::<String>::with_theme(&theme).with_prompt(prompt);
        if !default.is_empty() {
            input = input.default(default.to_string());
        }
        match input.interact_text() {
            Ok(v) => Ok(v),
            Err(e) => Err(e.to_string()),
        }
    }
}

/// Default implementation of `ConfirmPrompter` using `dialoguer::Confirm`.
pub struct DialoguerConfirmPrompter;

impl ConfirmPrompter for DialoguerConfirmPrompter {
    fn confirm(&mut self, prompt: &str, default: bool) -> Result<bool, String> {
        let theme = ColorfulTheme::default();
        let confirm = Confirm::with_theme(&theme)
            .with_prompt(prompt)
            .default(default);
        match confirm.interact() {
            Ok(v) => Ok(v),
            Err(e) => Err(e.to_string()),
        }
    }
}

/// Asks for a value labelled for the target repository, e.g.
/// `"Author name for my-repo"`.
///
/// The answer is trimmed; an empty answer is an error since a commit
/// identity cannot be blank.
pub fn ask<P: StringPrompter>(
    prompter: &mut P,
    label: &str,
    repo_name: &str,
    default_value: &str,
) -> Result<String, String> {
    let prompt = format!("{} for {}", label, repo_name);
    let answer = prompter.prompt(&prompt, default_value)?;
    let answer = answer.trim();
    if answer.is_empty() {
        return Err(format!("{} must not be empty", label));
    }
    Ok(answer.to_string())
}

/// Asks the user to confirm writing `commits` fabricated commits.
pub fn confirm_start<P: ConfirmPrompter>(
    prompter: &mut P,
    commits: usize,
    repo_name: &str,
) -> Result<bool, String> {
    let prompt = format!("Write {} commit(s) to {} now?", commits, repo_name);
    prompter.confirm(&prompt, true)
}
