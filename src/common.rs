use ndarray::ArrayD;
use std::fmt;
use std::path::{Path, PathBuf};

/// Voxel data of a loaded volume. Labels are loaded as `f32` too.
pub type Volume = ArrayD<f32>;

// set up enums and structs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Image,
    Label,
}

impl Key {
    pub const ALL: [Key; 2] = [Key::Image, Key::Label];

    /// Name used for the output subdirectory of this key.
    pub fn as_str(&self) -> &'static str {
        match self {
            Key::Image => "image",
            Key::Label => "label",
        }
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A co-registered image/label pair on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sample {
    pub image: PathBuf,
    pub label: PathBuf,
}

impl Sample {
    pub fn new(image: PathBuf, label: PathBuf) -> Self {
        Self { image, label }
    }

    pub fn path(&self, key: Key) -> &Path {
        match key {
            Key::Image => &self.image,
            Key::Label => &self.label,
        }
    }
}

/// A sample while it moves through the transform chain: the arrays plus the
/// files they were read from.
#[derive(Debug, Clone)]
pub struct SampleData {
    pub sample: Sample,
    pub image: Volume,
    pub label: Volume,
}

impl SampleData {
    pub fn new(sample: Sample, image: Volume, label: Volume) -> Self {
        Self {
            sample,
            image,
            label,
        }
    }

    pub fn get(&self, key: Key) -> &Volume {
        match key {
            Key::Image => &self.image,
            Key::Label => &self.label,
        }
    }

    pub fn set(&mut self, key: Key, volume: Volume) {
        match key {
            Key::Image => self.image = volume,
            Key::Label => self.label = volume,
        }
    }

    /// Source file of `key`, used to name its output.
    pub fn source(&self, key: Key) -> &Path {
        self.sample.path(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::IxDyn;

    #[test]
    fn key_names_match_output_dirs() {
        assert_eq!(Key::Image.to_string(), "image");
        assert_eq!(Key::Label.as_str(), "label");
    }

    #[test]
    fn sample_data_get_and_set_by_key() {
        let sample = Sample::new("a/img.nii".into(), "b/lbl.nii".into());
        let mut data = SampleData::new(
            sample,
            Volume::zeros(IxDyn(&[2, 2])),
            Volume::zeros(IxDyn(&[2, 2])),
        );
        data.set(Key::Label, Volume::ones(IxDyn(&[3])));
        assert_eq!(data.get(Key::Label).shape(), &[3]);
        assert_eq!(data.get(Key::Image).shape(), &[2, 2]);
        assert_eq!(data.source(Key::Label), Path::new("b/lbl.nii"));
    }
}
