//! Catalog of the datasets slicemax knows how to fetch.

use clap::ValueEnum;
use std::fmt;
use std::path::{Path, PathBuf};

/// A Medical Segmentation Decathlon task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Task {
    #[value(name = "Task01_BrainTumour")]
    BrainTumour,
}

impl Task {
    /// Directory name of the extracted dataset, also the archive stem.
    pub fn name(&self) -> &'static str {
        match self {
            Task::BrainTumour => "Task01_BrainTumour",
        }
    }

    pub fn url(&self) -> &'static str {
        match self {
            Task::BrainTumour => {
                "https://msd-for-monai.s3-us-west-2.amazonaws.com/Task01_BrainTumour.tar"
            }
        }
    }

    /// MD5 of the archive at [`Task::url`].
    pub fn md5(&self) -> &'static str {
        match self {
            Task::BrainTumour => "240a19d752f0d9e9101544901065d872",
        }
    }

    pub fn archive_name(&self) -> String {
        format!("{}.tar", self.name())
    }

    /// `<download_path>/<task>2D`, used when no output path is given.
    pub fn default_output_path(&self, download_path: &Path) -> PathBuf {
        download_path.join(format!("{}2D", self.name()))
    }
}

impl fmt::Display for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_name_matches_dataset_dir() {
        let task = Task::from_str("Task01_BrainTumour", false).unwrap();
        assert_eq!(task, Task::BrainTumour);
        assert_eq!(task.to_string(), "Task01_BrainTumour");
        assert_eq!(task.archive_name(), "Task01_BrainTumour.tar");
        assert!(task.url().ends_with(&task.archive_name()));
    }

    #[test]
    fn default_output_sits_next_to_dataset() {
        assert_eq!(
            Task::BrainTumour.default_output_path(Path::new("/data")),
            Path::new("/data/Task01_BrainTumour2D")
        );
    }
}
