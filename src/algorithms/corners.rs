//! Corner measures built on the local structure tensor
//! `M = sum_w [Ix*Ix Ix*Iy; Ix*Iy Iy*Iy]` of an image.

use image::GrayImage;
use imageproc::gradients::{horizontal_sobel, vertical_sobel};

/// Dense per pixel score map in row-major order.
pub struct ResponseMap {
    pub width: u32,
    pub height: u32,
    pub values: Vec<f32>,
}

impl ResponseMap {
    pub fn get(&self, x: u32, y: u32) -> f32 {
        self.values[(y * self.width + x) as usize]
    }

    pub fn max(&self) -> f32 {
        self.values.iter().copied().fold(f32::MIN, f32::max)
    }

    pub fn min(&self) -> f32 {
        self.values.iter().copied().fold(f32::MAX, f32::min)
    }

    /// True when no 8-neighbour is strictly stronger.
    pub fn is_local_max(&self, x: u32, y: u32) -> bool {
        let value = self.get(x, y);
        let (x, y) = (x as i64, y as i64);
        for ny in y - 1..=y + 1 {
            for nx in x - 1..=x + 1 {
                if nx < 0 || ny < 0 || nx >= self.width as i64 || ny >= self.height as i64 {
                    continue;
                }
                if self.get(nx as u32, ny as u32) > value {
                    return false;
                }
            }
        }
        true
    }
}

/// Structure tensor entries summed over a `block_size` window per pixel.
struct StructureTensor {
    width: u32,
    height: u32,
    xx: Vec<f32>,
    xy: Vec<f32>,
    yy: Vec<f32>,
}

impl StructureTensor {
    fn new(image: &GrayImage, block_size: u32) -> Self {
        let (width, height) = image.dimensions();
        let gx = horizontal_sobel(image);
        let gy = vertical_sobel(image);

        // normalizes the 3x3 Sobel on 8 bit input so the block sums stay small
        let scale = 1.0 / (4.0 * 255.0 * block_size as f32);

        let len = (width * height) as usize;
        let (mut xx, mut xy, mut yy) = (vec![0f32; len], vec![0f32; len], vec![0f32; len]);
        for (i, (dx, dy)) in gx.pixels().zip(gy.pixels()).enumerate() {
            let (dx, dy) = (dx.0[0] as f32 * scale, dy.0[0] as f32 * scale);
            xx[i] = dx * dx;
            xy[i] = dx * dy;
            yy[i] = dy * dy;
        }

        Self {
            width,
            height,
            xx: box_sum(&xx, width, height, block_size),
            xy: box_sum(&xy, width, height, block_size),
            yy: box_sum(&yy, width, height, block_size),
        }
    }

    fn map(&self, response: impl Fn(f32, f32, f32) -> f32) -> ResponseMap {
        let values = (0..self.xx.len())
            .map(|i| response(self.xx[i], self.xy[i], self.yy[i]))
            .collect();
        ResponseMap {
            width: self.width,
            height: self.height,
            values,
        }
    }
}

/// Harris corner response `det(M) - k * trace(M)^2`.
pub fn harris_response(image: &GrayImage, block_size: u32, k: f32) -> ResponseMap {
    StructureTensor::new(image, block_size).map(|a, b, c| a * c - b * b - k * (a + c) * (a + c))
}

/// Shi-Tomasi response, the smaller eigenvalue of `M`.
pub fn min_eigenvalue_response(image: &GrayImage, block_size: u32) -> ResponseMap {
    StructureTensor::new(image, block_size).map(|a, b, c| {
        let half_trace = (a + c) / 2.0;
        let half_diff = (a - c) / 2.0;
        half_trace - (half_diff * half_diff + b * b).sqrt()
    })
}

/// Sum over a `size x size` window anchored at the window centre, replicating
/// border pixels.
fn box_sum(values: &[f32], width: u32, height: u32, size: u32) -> Vec<f32> {
    let (w, h) = (width as i64, height as i64);
    let start = -(size as i64 / 2);
    let end = start + size as i64;
    let at = |x: i64, y: i64| values[(y.clamp(0, h - 1) * w + x.clamp(0, w - 1)) as usize];

    // separable: rows first, then columns
    let mut rows = vec![0f32; values.len()];
    for y in 0..h {
        for x in 0..w {
            rows[(y * w + x) as usize] = (start..end).map(|d| at(x + d, y)).sum();
        }
    }

    let mut sums = vec![0f32; values.len()];
    for y in 0..h {
        for x in 0..w {
            sums[(y * w + x) as usize] = (start..end)
                .map(|d| rows[((y + d).clamp(0, h - 1) * w + x) as usize])
                .sum();
        }
    }
    sums
}
