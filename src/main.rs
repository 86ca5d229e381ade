use std::io;

use clap::{Parser, Subcommand};
use tracing::info;

use scriptkit::analysis::{self, AnalysisOptions};
use scriptkit::storage::{self, PageMode, S3Client};
use scriptkit::{utils, AppError, Config};

#[derive(Debug, Parser)]
#[command(name = "scriptkit", version, about = "CSV grade report and S3 bucket inspector")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print the students whose average grade is above a threshold
    Grades {
        /// CSV file with a header row and `name,age,grade...` rows
        #[arg(short, long)]
        file: Option<String>,

        /// Report rows whose average is strictly above this value
        #[arg(short, long)]
        threshold: Option<f64>,

        /// Field delimiter
        #[arg(short, long, default_value_t = ',')]
        delimiter: char,

        /// Warn about and skip malformed rows instead of failing
        #[arg(long)]
        skip_invalid: bool,

        /// Emit the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// List buckets, then count the objects in one of them
    Buckets {
        /// Bucket to count; prompts on stdin when omitted
        #[arg(short, long)]
        bucket: Option<String>,

        /// Follow continuation tokens instead of counting the first page only
        #[arg(long)]
        all_pages: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    utils::init_logger();

    let cli = Cli::parse();
    let config = Config::from_env()?;

    match cli.command {
        Command::Grades {
            file,
            threshold,
            delimiter,
            skip_invalid,
            json,
        } => {
            if !delimiter.is_ascii() {
                return Err(AppError::InvalidInput(format!("delimiter '{}' is not ASCII", delimiter)).into());
            }

            let path = file.unwrap_or(config.grades.csv_path);
            let options = AnalysisOptions {
                threshold: threshold.unwrap_or(config.grades.threshold),
                delimiter: delimiter as u8,
                skip_invalid,
            };
            info!("Analyzing {} with threshold {}", path, options.threshold);

            let report = analysis::analyze_with(&path, &options).map_err(AppError::from)?;

            let mut stdout = io::stdout().lock();
            if json {
                analysis::print_report_json(&report, &mut stdout)?;
            } else {
                analysis::print_report(&report, options.threshold, &mut stdout)?;
            }
        }
        Command::Buckets { bucket, all_pages } => {
            let client = S3Client::from_config(&config.storage)?;
            let mut stdout = io::stdout();

            storage::list_s3_buckets(&client, &mut stdout).await?;

            let bucket = match bucket {
                Some(name) => name,
                None => storage::prompt_bucket_name(&mut io::stdin().lock(), &mut stdout)?,
            };

            let mode = if all_pages { PageMode::AllPages } else { PageMode::FirstPage };
            storage::count_objects_in_bucket(&client, &bucket, mode, &mut stdout).await?;
        }
    }

    Ok(())
}
