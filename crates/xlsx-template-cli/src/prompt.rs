use std::io::{BufRead, Write};

use anyhow::{Context, Result};
use xlsx_template::{Placeholder, SubstitutionMap};

use crate::profile::Profile;

/// Line-oriented prompts over any reader/writer pair (stdin/stdout in the binary).
pub struct Prompter<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> Prompter<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    /// Ask for one value. An empty answer, or end of input, selects `default`.
    pub fn ask(&mut self, label: &str, default: &str) -> Result<String> {
        write!(self.output, "Please enter value for '{label}' [{default}]: ")?;
        self.output.flush()?;

        let mut line = String::new();
        let read = self
            .input
            .read_line(&mut line)
            .context("read answer from input")?;
        let answer = line.trim();
        if read == 0 {
            writeln!(self.output)?;
        }
        if answer.is_empty() {
            Ok(default.to_string())
        } else {
            Ok(answer.to_string())
        }
    }

    /// Prompt for every prompted variable of `profile` that `known` does not already cover.
    pub fn collect(
        &mut self,
        profile: &Profile,
        known: &SubstitutionMap,
    ) -> Result<SubstitutionMap> {
        let mut answers = SubstitutionMap::new();
        for var in profile.prompted().filter(|var| !known.contains(var.key)) {
            let value = self.ask(profile.label(var), profile.default_value(var))?;
            let key = Placeholder::new(var.key)?;
            answers.insert(key, value);
        }
        Ok(answers)
    }
}
