use std::error::Error;
use std::fs;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use lca_report::builder::{ReportBuilder, DEFAULT_TITLE};
use lca_report::model::InputRecord;
use lca_report::predict::{self, StaticPredictor};

/// Renders life-cycle-assessment reports from the command line.
///
/// The prediction model runs elsewhere; its raw output is read from a JSON array holding the
/// seven indicators in order (CO2, water, waste, recycled content, resource efficiency,
/// extended life, reuse potential).
#[derive(Parser)]
#[command(author, version, about = "LCA indicator reports")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render a PDF report for an input record and its model output.
    #[command(name = "report")]
    Report {
        /// JSON file holding the input record.
        #[arg(long)]
        input: PathBuf,
        /// JSON file holding the raw model output.
        #[arg(long)]
        prediction: PathBuf,
        /// Directory receiving the rendered PDF.
        #[arg(long, default_value = ".")]
        out_dir: PathBuf,
        /// Title printed at the top of the report.
        #[arg(long, default_value = DEFAULT_TITLE)]
        title: String,
    },

    /// Validate model output and print the indicators rounded to two decimals as JSON.
    #[command(name = "predict")]
    Predict {
        /// JSON file holding the input record.
        #[arg(long)]
        input: PathBuf,
        /// JSON file holding the raw model output.
        #[arg(long)]
        prediction: PathBuf,
    },

    /// Render the built-in steel sample report.
    #[command(name = "sample")]
    Sample {
        /// Directory receiving the rendered PDF.
        #[arg(long, default_value = ".")]
        out_dir: PathBuf,
    },
}

fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Report {
            input,
            prediction,
            out_dir,
            title,
        } => run_report(&input, &prediction, &out_dir, title),
        Commands::Predict { input, prediction } => run_predict(&input, &prediction),
        Commands::Sample { out_dir } => run_sample(&out_dir),
    };

    if let Err(err) = result {
        eprintln!("Error: {}", err);
        print_error_sources(err.as_ref());
        std::process::exit(1);
    }
}

fn read_input(path: &Path) -> Result<InputRecord, Box<dyn Error>> {
    let text = fs::read_to_string(path)
        .map_err(|err| format!("Failed to read input {}: {}", path.display(), err))?;
    Ok(serde_json::from_str(&text)?)
}

fn read_model_output(path: &Path) -> Result<StaticPredictor, Box<dyn Error>> {
    let text = fs::read_to_string(path)
        .map_err(|err| format!("Failed to read prediction {}: {}", path.display(), err))?;
    let values: Vec<f64> = serde_json::from_str(&text)?;
    Ok(StaticPredictor::new(values))
}

fn run_report(
    input: &Path,
    prediction: &Path,
    out_dir: &Path,
    title: String,
) -> Result<(), Box<dyn Error>> {
    let input = read_input(input)?;
    let predictor = read_model_output(prediction)?;
    let rendered = ReportBuilder::new()
        .with_title(title)
        .generate(&predictor, &input)?;
    let path = rendered.write_to_dir(out_dir)?;
    println!("Generated {} ({} bytes)", path.display(), rendered.bytes.len());
    Ok(())
}

fn run_predict(input: &Path, prediction: &Path) -> Result<(), Box<dyn Error>> {
    let input = read_input(input)?;
    let predictor = read_model_output(prediction)?;
    let result = predict::predict(&predictor, &input)?;
    println!("{}", serde_json::to_string_pretty(&result.rounded())?);
    Ok(())
}

fn run_sample(out_dir: &Path) -> Result<(), Box<dyn Error>> {
    let input = InputRecord::new("steel", "primary", 10.0, 5.0, 200.0, "recycle");
    let predictor = StaticPredictor::new(vec![6200.0, 1500.0, 300.0, 40.0, 45.0, 10.0, 60.0]);
    let rendered = ReportBuilder::new().generate(&predictor, &input)?;
    fs::create_dir_all(out_dir)?;
    let path = rendered.write_to_dir(out_dir)?;
    println!(
        "Generated {} ({} bytes) with {} recommendations",
        path.display(),
        rendered.bytes.len(),
        rendered
            .text_lines()
            .iter()
            .filter(|line| line.starts_with("- "))
            .count()
    );
    Ok(())
}

fn print_error_sources(mut error: &(dyn Error + 'static)) {
    while let Some(source) = error.source() {
        eprintln!("  caused by: {}", source);
        error = source;
    }
}
