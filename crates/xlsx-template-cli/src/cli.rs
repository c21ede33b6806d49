use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result};
use clap::{Args as ClapArgs, Parser, Subcommand, ValueEnum};
use serde::Serialize;
use xlsx_template::{placeholders, substitute_file, Placeholder, SubstitutionMap, XlsxTemplate};

use crate::generate::write_demo_template;
use crate::profile::{Locale, Profile};
use crate::prompt::Prompter;
use crate::values::{load_values, parse_assignment};

#[derive(Clone, Copy, Debug, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Parser)]
#[command(
    name = "xlsx-template",
    version,
    about = "Fill ##Name## placeholders in XLSX templates."
)]
pub struct Args {
    /// Log at debug level (overridden by RUST_LOG).
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Fill a template and write the result.
    Fill(FillArgs),
    /// Interactive demo: prompt for the demo variables and fill the demo template.
    Demo(DemoArgs),
    /// Write the demo template.
    GenerateTemplate {
        /// Destination `.xlsx` path.
        path: PathBuf,
    },
    /// List placeholder names found in a template's text cells.
    Placeholders {
        template: PathBuf,

        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },
}

#[derive(ClapArgs)]
struct FillArgs {
    /// Template workbook.
    template: PathBuf,

    /// Output workbook. Must differ from the template.
    #[arg(short, long)]
    output: PathBuf,

    /// JSON file with placeholder values.
    #[arg(long, value_name = "FILE")]
    values: Option<PathBuf>,

    /// Set one placeholder value (repeatable). Overrides `--values`.
    #[arg(long = "set", value_name = "KEY=VALUE", value_parser = parse_assignment)]
    set: Vec<(Placeholder, String)>,

    /// Locale for prompts and defaults. Defaults to the values file's locale, then `en`.
    #[arg(long, value_enum)]
    locale: Option<Locale>,

    /// Fill placeholders that have no value with the locale's demo defaults.
    #[arg(long)]
    defaults: bool,

    /// Prompt for the demo variables that have no value yet.
    #[arg(long)]
    interactive: bool,
}

#[derive(ClapArgs)]
struct DemoArgs {
    /// Template to fill; generated first if it does not exist.
    #[arg(long, default_value = "Assets/Template.xlsx")]
    template: PathBuf,

    /// Directory for the filled workbook.
    #[arg(long, default_value = ".")]
    out_dir: PathBuf,

    #[arg(long, value_enum, default_value_t = Locale::En)]
    locale: Locale,
}

#[derive(Serialize)]
struct JsonPlaceholders<'a> {
    template: &'a str,
    placeholders: Vec<&'a str>,
}

pub fn run_with_args(args: Args) -> Result<()> {
    match args.command {
        Command::Fill(fill) => run_fill(fill),
        Command::Demo(demo) => run_demo(demo),
        Command::GenerateTemplate { path } => {
            write_demo_template(&path)?;
            println!("Template written to {}", path.display());
            Ok(())
        }
        Command::Placeholders { template, format } => run_placeholders(&template, format),
    }
}

fn today() -> chrono::NaiveDate {
    chrono::Local::now().date_naive()
}

fn run_fill(args: FillArgs) -> Result<()> {
    let mut values = SubstitutionMap::new();
    let mut locale = args.locale;
    if let Some(path) = &args.values {
        let file = load_values(path)?;
        locale = locale.or(file.locale);
        values.extend(file.values);
    }
    for (key, value) in args.set {
        values.insert(key, value);
    }

    let profile = Profile::new(locale.unwrap_or_default());
    if args.interactive {
        let stdin = std::io::stdin();
        let answers = Prompter::new(stdin.lock(), std::io::stdout()).collect(&profile, &values)?;
        values.extend(answers);
    }
    if args.defaults {
        values = values.with_defaults(&profile.defaults(today()));
    }

    let report = substitute_file(&args.template, &args.output, &values).with_context(|| {
        format!(
            "fill {} into {}",
            args.template.display(),
            args.output.display()
        )
    })?;

    println!(
        "Wrote {}: {} of {} text value(s) filled",
        args.output.display(),
        report.text_cells_rewritten,
        report.text_cells_visited
    );
    if !report.is_complete() {
        let names: Vec<&str> = report.unresolved.iter().map(String::as_str).collect();
        println!("Unresolved placeholders: {}", names.join(", "));
    }
    Ok(())
}

fn run_demo(args: DemoArgs) -> Result<()> {
    println!("=== Excel Replacement Demo ===");
    println!();

    if !args.template.exists() {
        write_demo_template(&args.template)?;
        println!("Generated template {}", args.template.display());
    }

    let profile = Profile::new(args.locale);
    let stdin = std::io::stdin();
    let answers = Prompter::new(stdin.lock(), std::io::stdout())
        .collect(&profile, &SubstitutionMap::new())?;
    let values = answers.with_defaults(&profile.defaults(today()));

    let output = args
        .out_dir
        .join(format!("{}_filled.xlsx", uuid::Uuid::new_v4()));
    let started = Instant::now();
    let report = substitute_file(&args.template, &output, &values)
        .with_context(|| format!("fill {}", args.template.display()))?;
    let elapsed = started.elapsed();

    println!();
    println!("Demo completed!");
    println!("File generated: {}", output.display());
    println!(
        "{} text value(s) filled in {:.2} ms",
        report.text_cells_rewritten,
        elapsed.as_secs_f64() * 1000.0
    );
    Ok(())
}

fn run_placeholders(path: &Path, format: OutputFormat) -> Result<()> {
    let template = XlsxTemplate::open(path)
        .with_context(|| format!("open template {}", path.display()))?;
    let names = placeholders(&template);

    let stdout = std::io::stdout();
    let mut handle = stdout.lock();
    match format {
        OutputFormat::Text => {
            for name in &names {
                writeln!(handle, "{name}")?;
            }
        }
        OutputFormat::Json => {
            let template = path.to_string_lossy();
            let report = JsonPlaceholders {
                template: &template,
                placeholders: names.iter().map(String::as_str).collect(),
            };
            serde_json::to_writer(&mut handle, &report)?;
            handle.write_all(b"\n")?;
        }
    }
    Ok(())
}
