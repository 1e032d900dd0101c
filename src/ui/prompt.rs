//! Interactive prompts: passwords with confirmation, mode and file selection.

use anyhow::{Context, Result, ensure};
use inquire::validator::Validation;
use inquire::{Confirm, Password, PasswordDisplayMode, Select};
use vlock::file::File;
use vlock::secret::Secret;
use vlock::types::ProcessorMode;

pub struct Prompt {
    password_min_length: usize,
}

impl Prompt {
    pub fn new(password_min_length: usize) -> Self {
        Self { password_min_length }
    }

    /// Asks twice; the entries must match.
    pub fn encryption_password(&self) -> Result<Secret> {
        self.password("Enter encryption password", true)
    }

    /// Asks once. Only emptiness is checked: old envelopes may use short passwords.
    pub fn decryption_password(&self) -> Result<Secret> {
        self.password("Enter decryption password", false)
    }

    fn password(&self, message: &str, confirm: bool) -> Result<Secret> {
        let min_length = if confirm { self.password_min_length } else { 1 };

        let mut prompt = Password::new(message)
            .with_display_mode(PasswordDisplayMode::Masked)
            .with_validator(move |input: &str| {
                if input.trim().is_empty() {
                    return Ok(Validation::Invalid("password cannot be empty or whitespace only".into()));
                }
                if input.chars().count() < min_length {
                    return Ok(Validation::Invalid(format!("password must be at least {min_length} characters long").into()));
                }
                Ok(Validation::Valid)
            })
            .with_custom_confirmation_message("Confirm password")
            .with_custom_confirmation_error_message("passwords do not match");

        if !confirm {
            prompt = prompt.without_confirmation();
        }

        let password = prompt.prompt().context("password input failed")?;
        Ok(Secret::from_string(password))
    }

    pub fn select_processing_mode(&self) -> Result<ProcessorMode> {
        Select::new("Select operation", ProcessorMode::ALL.to_vec()).prompt().context("mode selection failed")
    }

    pub fn select_file(&self, files: &[File]) -> Result<File> {
        ensure!(!files.is_empty(), "no files available for selection");

        let names: Vec<String> = files.iter().map(|f| f.path().display().to_string()).collect();
        let choice = Select::new("Select file", names).raw_prompt().context("file selection failed")?;
        Ok(files[choice.index].clone())
    }

    pub fn confirm_overwrite(&self, file: &File) -> Result<bool> {
        Confirm::new(&format!("Output file {} already exists. Overwrite?", file.name())).with_default(false).prompt().context("confirmation failed")
    }
}
