//! Console front end for `xlsx-template`: fill templates from JSON values, `--set` flags or
//! interactive prompts, and generate the demo template.

pub mod cli;
pub mod generate;
pub mod profile;
pub mod prompt;
pub mod values;
