//! The transform chain that turns a loaded volume pair into a slice pair.
//!
//! Every step takes the whole [`SampleData`] and hands back a new one, so steps
//! can be composed with [`Compose`] and run in order.

use anyhow::{bail, Context, Result};
use log::debug;
use ndarray::{Axis, IxDyn};
use nifti::{IntoNdArray, NiftiObject, ReaderOptions};
use std::path::Path;

use crate::common::{Key, Sample, SampleData, Volume};

/// A single step applied to a loaded sample.
pub trait Transform {
    fn apply(&self, data: SampleData) -> Result<SampleData>;
}

/// Runs a list of transforms one after the other.
pub struct Compose {
    transforms: Vec<Box<dyn Transform>>,
}

impl Compose {
    pub fn new(transforms: Vec<Box<dyn Transform>>) -> Self {
        Self { transforms }
    }
}

impl Transform for Compose {
    fn apply(&self, data: SampleData) -> Result<SampleData> {
        self.transforms
            .iter()
            .try_fold(data, |data, transform| transform.apply(data))
    }
}

/// The chain used for every sample: channel-first image, channel-added label,
/// then the slice with the most labelled voxels.
pub fn max_label_slice_chain() -> Compose {
    Compose::new(vec![
        Box::new(EnsureChannelFirst(Key::Image)),
        Box::new(AddChannel(Key::Label)),
        Box::new(SliceWithMaxLabels::new(Key::ALL.to_vec(), Key::Label)),
    ])
}

/// Reads one nifti volume (`.nii` or `.nii.gz`) as `f32`.
pub fn load_volume(path: &Path) -> Result<Volume> {
    let obj = ReaderOptions::new()
        .read_file(path)
        .with_context(|| format!("could not read {}", path.display()))?;
    let img = obj
        .into_volume()
        .into_ndarray::<f32>()
        .with_context(|| format!("could not convert {} to an array", path.display()))?;
    Ok(img)
}

pub fn load_sample(sample: &Sample) -> Result<SampleData> {
    let image = load_volume(&sample.image)?;
    let label = load_volume(&sample.label)?;
    Ok(SampleData::new(sample.clone(), image, label))
}

/// Moves the trailing channel axis of a 4D volume to the front,
/// `(x, y, z, c) -> (c, x, y, z)`. A 3D volume gets a leading singleton
/// channel instead.
pub struct EnsureChannelFirst(pub Key);

impl Transform for EnsureChannelFirst {
    fn apply(&self, mut data: SampleData) -> Result<SampleData> {
        let volume = data.get(self.0).clone();
        let volume = match volume.ndim() {
            3 => volume.insert_axis(Axis(0)),
            4 => {
                let last = volume.ndim() - 1;
                let mut order = vec![last];
                order.extend(0..last);
                volume.permuted_axes(IxDyn(&order))
            }
            n => bail!(
                "{} volume {} must be 3D or 4D, got {}D",
                self.0,
                data.source(self.0).display(),
                n
            ),
        };
        data.set(self.0, volume);
        Ok(data)
    }
}

/// Inserts a leading singleton channel axis.
pub struct AddChannel(pub Key);

impl Transform for AddChannel {
    fn apply(&self, mut data: SampleData) -> Result<SampleData> {
        let volume = data.get(self.0).clone().insert_axis(Axis(0));
        data.set(self.0, volume);
        Ok(data)
    }
}

/// Replaces every volume in `keys` with its cross-section at the last-axis
/// index holding the most positive voxels of `label_key`.
pub struct SliceWithMaxLabels {
    keys: Vec<Key>,
    label_key: Key,
}

impl SliceWithMaxLabels {
    pub fn new(keys: Vec<Key>, label_key: Key) -> Self {
        Self { keys, label_key }
    }
}

impl Transform for SliceWithMaxLabels {
    fn apply(&self, mut data: SampleData) -> Result<SampleData> {
        let label = data.get(self.label_key);
        let depth = label.shape().last().copied().unwrap_or(0);
        for &key in &self.keys {
            let len = data.get(key).shape().last().copied().unwrap_or(0);
            if len != depth {
                bail!(
                    "{} has {} slices but {} {} has {}",
                    data.source(key).display(),
                    len,
                    self.label_key,
                    data.source(self.label_key).display(),
                    depth
                );
            }
        }

        let index = select_slice_index(label).with_context(|| {
            format!(
                "no slice to select in {}",
                data.source(self.label_key).display()
            )
        })?;
        debug!(
            "Selected slice {} of {} for {}",
            index,
            depth,
            data.source(self.label_key).display()
        );

        for &key in &self.keys {
            let slice = take_slice(data.get(key), index)?;
            data.set(key, slice);
        }
        Ok(data)
    }
}

/// Number of strictly positive voxels at every index of the last axis.
pub fn count_labelled_per_slice(label: &Volume) -> Vec<usize> {
    if label.ndim() == 0 {
        return Vec::new();
    }
    let last = Axis(label.ndim() - 1);
    label
        .axis_iter(last)
        .map(|slice| slice.iter().filter(|&&v| v > 0.0).count())
        .collect()
}

/// Index along the last axis with the most labelled voxels.
///
/// Ties go to the lowest index, so an unlabelled volume selects slice 0.
///
/// # Arguments
///
/// * `label` - The label volume, slice axis last. Voxels above zero count as
///   labelled.
///
/// # Returns
///
/// The index of the first slice holding the maximum number of labelled voxels.
///
/// # Errors
///
/// Fails when `label` is 0D or its last axis is empty.
pub fn select_slice_index(label: &Volume) -> Result<usize> {
    let counts = count_labelled_per_slice(label);
    if counts.is_empty() {
        bail!("label of shape {:?} has no slices", label.shape());
    }
    // first maximum wins
    let mut best = 0;
    for (i, &count) in counts.iter().enumerate() {
        if count > counts[best] {
            best = i;
        }
    }
    Ok(best)
}

/// Cross-section of `volume` at `index` along its last axis.
///
/// # Errors
///
/// Fails when `volume` is 0D or `index` is past the end of the last axis.
pub fn take_slice(volume: &Volume, index: usize) -> Result<Volume> {
    let depth = match volume.shape().last() {
        Some(&depth) => depth,
        None => bail!("cannot slice a 0D volume"),
    };
    if index >= depth {
        bail!("slice {} out of range for shape {:?}", index, volume.shape());
    }
    Ok(volume
        .index_axis(Axis(volume.ndim() - 1), index)
        .to_owned())
}
