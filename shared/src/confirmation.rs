use crate::types::Result;
use dialoguer::{theme::ColorfulTheme, Confirm};

/// Yes/no prompt shared by every interactive command that discards state.
///
/// Falls back to `default_yes` when stdin is not a terminal.
pub fn ask_confirmation(prompt: &str, default_yes: bool) -> Result<bool> {
    let answer = Confirm::with_theme(&ColorfulTheme::default())
        .with_prompt(prompt)
        .default(default_yes)
        .show_default(true)
        .interact_opt();

    match answer {
        Ok(Some(choice)) => Ok(choice),
        Ok(None) => Ok(false),
        Err(dialoguer::Error::IO(e)) if e.kind() == std::io::ErrorKind::NotConnected => {
            Ok(default_yes)
        }
        Err(e) => Err(e.into()),
    }
}
