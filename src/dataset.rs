//! Fetching a task's archive and listing its training pairs.
//!
//! The archive is only downloaded when the extracted task directory is
//! missing, and an archive left over from an earlier run is reused as long as
//! its checksum still matches.

use anyhow::{anyhow, bail, Context, Result};
use flate2::read::GzDecoder;
use futures_util::StreamExt;
use glob::{glob_with, MatchOptions, Pattern};
use indicatif::{ProgressBar, ProgressStyle};
use log::{info, warn};
use md5::{Digest, Md5};
use reqwest::Client;
use std::cmp::min;
use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{self, BufReader, Write};
use std::path::{Path, PathBuf};
use tar::Archive;
use tokio::runtime::Runtime;

use crate::common::Sample;
use crate::task::Task;

const IMAGES_DIR: &str = "imagesTr";
const LABELS_DIR: &str = "labelsTr";
const VOLUME_GLOB: &str = "*.nii.gz";

/// Downloads (if needed) and lists the training pairs of `task`.
pub fn prepare_dataset(task: Task, download_path: &Path) -> Result<Vec<Sample>> {
    let data_dir = ensure_dataset(task, download_path)?;
    list_samples(&data_dir)
}

/// Makes sure `<download_path>/<task>` exists, fetching and unpacking the
/// task archive when it does not.
pub fn ensure_dataset(task: Task, download_path: &Path) -> Result<PathBuf> {
    fetch_dataset(task.name(), task.url(), task.md5(), download_path)
}

fn fetch_dataset(name: &str, url: &str, md5: &str, download_path: &Path) -> Result<PathBuf> {
    let data_dir = download_path.join(name);
    if data_dir.exists() {
        info!("Using existing dataset at {}", data_dir.display());
        return Ok(data_dir);
    }

    let archive = download_path.join(format!("{}.tar", name));
    download_url(url, &archive, md5)?;

    info!("Extracting {} to {}", archive.display(), download_path.display());
    extract_archive(&archive, download_path)?;

    if !data_dir.is_dir() {
        bail!(
            "{} did not contain the expected directory {}",
            archive.display(),
            name
        );
    }
    Ok(data_dir)
}

/// Downloads `url` to `archive` and verifies it against `md5`.
///
/// An archive that is already on disk is kept when its checksum matches and
/// rejected otherwise. Fresh downloads go to a `.part` file first so an
/// interrupted transfer never looks complete.
pub fn download_url(url: &str, archive: &Path, md5: &str) -> Result<()> {
    if archive.exists() {
        if check_md5(archive, md5)? {
            info!("Archive {} already downloaded", archive.display());
            return Ok(());
        }
        bail!(
            "{} exists but does not match md5 {}. Remove it to download again.",
            archive.display(),
            md5
        );
    }

    if let Some(parent) = archive.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("could not create {}", parent.display()))?;
    }
    let partial = partial_path(archive);

    let client = Client::new();
    let rt = Runtime::new()?;
    rt.block_on(download_with_pb(&client, url, &partial))
        .with_context(|| format!("failed to download {}", url))?;

    if !check_md5(&partial, md5)? {
        fs::remove_file(&partial)?;
        bail!("md5 check of {} failed, expected {}", url, md5);
    }
    fs::rename(&partial, archive)
        .with_context(|| format!("could not move download to {}", archive.display()))?;
    Ok(())
}

fn partial_path(archive: &Path) -> PathBuf {
    let mut name = OsString::from(archive.as_os_str());
    name.push(".part");
    PathBuf::from(name)
}

async fn download_with_pb(client: &Client, url: &str, dest: &Path) -> Result<()> {
    info!("Downloading {} ...", url);

    let res = client.get(url).send().await?.error_for_status()?;
    let total_size = res.content_length().unwrap_or(0);

    let pb = ProgressBar::new(total_size);
    pb.set_style(ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{wide_bar:.green}] {bytes}/{total_bytes} ({bytes_per_sec}, {eta})")?
        .progress_chars("#>-"));

    let mut file = File::create(dest)
        .with_context(|| format!("could not create {}", dest.display()))?;
    let mut downloaded: u64 = 0;
    let mut stream = res.bytes_stream();

    while let Some(item) = stream.next().await {
        let chunk = item?;
        file.write_all(&chunk)?;
        downloaded += chunk.len() as u64;
        pb.set_position(min(downloaded, total_size));
    }
    file.flush()?;
    pb.finish_and_clear();

    info!("Downloaded {} bytes to {}", downloaded, dest.display());
    Ok(())
}

/// Compares the md5 digest of the file at `path` with a hex string.
pub fn check_md5<P: AsRef<Path>>(path: P, expected: &str) -> Result<bool> {
    let path = path.as_ref();
    let mut file =
        File::open(path).with_context(|| format!("could not open {}", path.display()))?;
    let mut hasher = Md5::new();
    io::copy(&mut file, &mut hasher)?;
    let digest = format!("{:x}", hasher.finalize());
    Ok(digest.eq_ignore_ascii_case(expected.trim()))
}

/// Unpacks a `.tar`, `.tar.gz` or `.tgz` archive into `dest`.
pub fn extract_archive(archive: &Path, dest: &Path) -> Result<()> {
    let name = archive
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| anyhow!("could not parse archive name {}", archive.display()))?;
    let file =
        File::open(archive).with_context(|| format!("could not open {}", archive.display()))?;
    let reader = BufReader::new(file);

    let unpacked = if name.ends_with(".tar.gz") || name.ends_with(".tgz") {
        Archive::new(GzDecoder::new(reader)).unpack(dest)
    } else if name.ends_with(".tar") {
        Archive::new(reader).unpack(dest)
    } else {
        bail!("unsupported archive format: {}", name);
    };
    unpacked.with_context(|| format!("failed to extract {}", archive.display()))
}

/// Pairs `imagesTr/*.nii.gz` with `labelsTr/*.nii.gz` by sorted order.
pub fn list_samples(data_dir: &Path) -> Result<Vec<Sample>> {
    let images = sorted_matches(data_dir, IMAGES_DIR)?;
    let labels = sorted_matches(data_dir, LABELS_DIR)?;
    if images.len() != labels.len() {
        warn!(
            "Found {} images but {} labels in {}, extra files are ignored",
            images.len(),
            labels.len(),
            data_dir.display()
        );
    }
    info!("Found {} image/label pairs", min(images.len(), labels.len()));

    Ok(images
        .into_iter()
        .zip(labels)
        .map(|(image, label)| Sample::new(image, label))
        .collect())
}

fn sorted_matches(data_dir: &Path, sub_dir: &str) -> Result<Vec<PathBuf>> {
    let dir = data_dir
        .to_str()
        .ok_or_else(|| anyhow!("non UTF-8 path {}", data_dir.display()))?;
    let pattern = format!("{}/{}/{}", Pattern::escape(dir), sub_dir, VOLUME_GLOB);
    // the task archives ship `._*` resource forks next to every volume
    let options = MatchOptions {
        require_literal_leading_dot: true,
        ..MatchOptions::new()
    };
    let mut paths = glob_with(&pattern, options)?.collect::<Result<Vec<_>, _>>()?;
    paths.sort();
    Ok(paths)
}
