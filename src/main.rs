//! Quick commandline utility to turn a 3D segmentation dataset into a 2D one.
//!
//! The dataset is downloaded and unpacked if needed, then for every training
//! volume the axial slice with the most labelled voxels is written out as an
//! image/label pair of nifti files.

use anyhow::Result;
use clap::Parser;
use env_logger::{Builder, Env};
use log::info;
use std::path::PathBuf;

use slicemax::dataset::prepare_dataset;
use slicemax::driver;
use slicemax::task::Task;

// use clap to create commandline interface
#[derive(Parser, Debug)]
#[command(author, about, version, long_about)]
struct Args {
    /// Task to generate the 2D dataset from.
    #[arg(short, long, value_enum, default_value_t = Task::BrainTumour)]
    task: Task,

    /// Path for downloading the full dataset.
    /// Falls back to a new temporary directory when neither this nor the
    /// environment variable is set.
    #[arg(short, long, visible_alias = "download_path", env = "MONAI_DATA_DIRECTORY")]
    download_path: Option<PathBuf>,

    /// Path for output. Default: <download_path>/<task>2D
    #[arg(short, long)]
    path: Option<PathBuf>,
}

/// Print the resolved arguments, sorted by name and aligned on the colon.
fn print_input_args(args: &mut [(&str, String)]) {
    args.sort_by_key(|(name, _)| *name);
    let col_width = args.iter().map(|(name, _)| name.len()).max().unwrap_or(0);
    for (name, value) in args.iter() {
        println!("\t{:<col_width$}: {}", name, value);
    }
}

fn run(cli: Args) -> Result<()> {
    let task = cli.task;
    let download_path = match cli.download_path {
        Some(path) => path,
        None => tempfile::Builder::new()
            .prefix("slicemax-")
            .tempdir()?
            .keep(),
    };
    let path = cli
        .path
        .unwrap_or_else(|| task.default_output_path(&download_path));

    print_input_args(&mut [
        ("task", task.to_string()),
        ("download_path", download_path.display().to_string()),
        ("path", path.display().to_string()),
    ]);

    let samples = prepare_dataset(task, &download_path)?;
    info!("Writing 2D slices to {}", path.display());
    driver::run(&samples, &path)?;
    Ok(())
}

/// Main function that parses commandline arguments and runs the program.
fn main() {
    let mut builder = Builder::from_env(Env::default().default_filter_or("info"));
    builder.format_timestamp_secs();
    builder.init();

    let cli = Args::parse();
    run(cli).unwrap_or_else(|e| {
        eprintln!("Error! {:#}", e);
        std::process::exit(-2);
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn download_path_accepts_both_spellings() {
        for flag in ["--download-path", "--download_path", "-d"] {
            let cli = Args::try_parse_from(["slicemax", flag, "/data"]).unwrap();
            assert_eq!(cli.download_path, Some(PathBuf::from("/data")));
        }
    }

    #[test]
    fn task_defaults_to_brain_tumour() {
        let cli = Args::try_parse_from(["slicemax", "-p", "/out"]).unwrap();
        assert_eq!(cli.task, Task::BrainTumour);
        assert_eq!(cli.path, Some(PathBuf::from("/out")));
    }
}
