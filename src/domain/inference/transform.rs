//! Image pre-processing for the digit classifier endpoint

use image::imageops::FilterType;

use super::npy;
use crate::domain::DomainError;

pub const MNIST_WIDTH: u32 = 28;
pub const MNIST_HEIGHT: u32 = 28;

/// Row-major single-channel float32 image
#[derive(Debug, Clone, PartialEq)]
pub struct Grid {
    height: usize,
    width: usize,
    data: Vec<f32>,
}

impl Grid {
    pub fn new(height: usize, width: usize, data: Vec<f32>) -> Result<Self, DomainError> {
        if height * width != data.len() {
            return Err(DomainError::transform(format!(
                "Grid of {}x{} needs {} values, got {}",
                height,
                width,
                height * width,
                data.len()
            )));
        }

        Ok(Self {
            height,
            width,
            data,
        })
    }

    pub fn shape(&self) -> [usize; 2] {
        [self.height, self.width]
    }

    pub fn data(&self) -> &[f32] {
        &self.data
    }

    pub fn to_npy(&self) -> Result<Vec<u8>, DomainError> {
        npy::encode_f32(&self.shape(), &self.data)
    }
}

/// Decode → resize → grayscale → float32
#[derive(Debug, Clone, Copy)]
pub struct ImageTransform {
    width: u32,
    height: u32,
    filter: FilterType,
}

impl Default for ImageTransform {
    fn default() -> Self {
        Self::mnist()
    }
}

impl ImageTransform {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            filter: FilterType::Triangle,
        }
    }

    pub fn mnist() -> Self {
        Self::new(MNIST_WIDTH, MNIST_HEIGHT)
    }

    pub fn apply(&self, bytes: &[u8]) -> Result<Grid, DomainError> {
        let decoded = image::load_from_memory(bytes)
            .map_err(|e| DomainError::transform(format!("Failed to decode image: {}", e)))?;

        let luma = decoded
            .resize_exact(self.width, self.height, self.filter)
            .to_luma8();

        let data = luma.into_raw().into_iter().map(f32::from).collect();

        Grid::new(self.height as usize, self.width as usize, data)
    }
}
