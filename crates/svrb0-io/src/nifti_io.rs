use anyhow::{Context, Result};
use burn::tensor::backend::Backend;
use burn::tensor::{Shape, Tensor, TensorData};
use nalgebra::{Matrix3, Vector3};
use nifti::{IntoNdArray, NiftiHeader, NiftiObject, ReaderOptions};
use svrb0_core::image::{Image, ImageMetadata, MultiChannelImage};
use svrb0_core::spatial::{Direction, Point, Spacing};
use std::path::Path;

/// Voxel-to-world affine stored in the header, row major.
fn header_affine(header: &NiftiHeader) -> [[f32; 4]; 4] {
    if header.sform_code > 0 {
        [header.srow_x, header.srow_y, header.srow_z, [0.0, 0.0, 0.0, 1.0]]
    } else if header.qform_code > 0 {
        // Quaternion form, see the NIfTI-1 standard
        let b = header.quatern_b;
        let c = header.quatern_c;
        let d = header.quatern_d;
        let a = (1.0 - (b * b + c * c + d * d).min(1.0)).sqrt();

        let qfac = if header.pixdim[0] == 0.0 { 1.0 } else { header.pixdim[0] };

        let r11 = a * a + b * b - c * c - d * d;
        let r12 = 2.0 * b * c - 2.0 * a * d;
        let r13 = 2.0 * b * d + 2.0 * a * c;

        let r21 = 2.0 * b * c + 2.0 * a * d;
        let r22 = a * a + c * c - b * b - d * d;
        let r23 = 2.0 * c * d - 2.0 * a * b;

        let r31 = 2.0 * b * d - 2.0 * a * c;
        let r32 = 2.0 * c * d + 2.0 * a * b;
        let r33 = a * a + d * d - c * c - b * b;

        let dx = header.pixdim[1];
        let dy = header.pixdim[2];
        let dz = header.pixdim[3] * qfac;

        [
            [r11 * dx, r12 * dy, r13 * dz, header.quatern_x],
            [r21 * dx, r22 * dy, r23 * dz, header.quatern_y],
            [r31 * dx, r32 * dy, r33 * dz, header.quatern_z],
            [0.0, 0.0, 0.0, 1.0],
        ]
    } else {
        // Fallback: pixdim scaling only
        [
            [header.pixdim[1], 0.0, 0.0, 0.0],
            [0.0, header.pixdim[2], 0.0, 0.0],
            [0.0, 0.0, header.pixdim[3], 0.0],
            [0.0, 0.0, 0.0, 1.0],
        ]
    }
}

/// Image geometry from a NIfTI header.
pub fn metadata_from_header(header: &NiftiHeader) -> ImageMetadata<3> {
    let affine = header_affine(header);
    let column = |c: usize| Vector3::new(affine[0][c] as f64, affine[1][c] as f64, affine[2][c] as f64);

    let origin = Point::new([affine[0][3] as f64, affine[1][3] as f64, affine[2][3] as f64]);

    let mut spacing = [1.0; 3];
    let mut axes = [Vector3::x(), Vector3::y(), Vector3::z()];
    for (c, axis) in axes.iter_mut().enumerate() {
        let col = column(c);
        let norm = col.norm();
        // Degenerate columns keep the unit axis
        if norm > 1e-9 {
            spacing[c] = norm;
            *axis = col / norm;
        }
    }

    ImageMetadata::new(origin, Spacing::new(spacing), Direction(Matrix3::from_columns(&axes)))
}

/// NIfTI header carrying `metadata` as an sform.
pub fn header_from_metadata(metadata: &ImageMetadata<3>) -> NiftiHeader {
    let spacing = metadata.spacing();
    let direction = metadata.direction();
    let origin = metadata.origin();

    let row = |r: usize| -> [f32; 4] {
        [
            (direction[(r, 0)] * spacing[0]) as f32,
            (direction[(r, 1)] * spacing[1]) as f32,
            (direction[(r, 2)] * spacing[2]) as f32,
            origin[r] as f32,
        ]
    };

    let mut header = NiftiHeader::default();
    header.pixdim = [
        1.0,
        spacing[0] as f32,
        spacing[1] as f32,
        spacing[2] as f32,
        1.0,
        1.0,
        1.0,
        1.0,
    ];
    header.qform_code = 0;
    header.sform_code = 1;
    header.srow_x = row(0);
    header.srow_y = row(1);
    header.srow_z = row(2);
    header.scl_slope = 1.0;
    header.scl_inter = 0.0;
    header
}

/// Read voxels as `f32` in C order of the NIfTI axes `(x, y, z[, t])`.
fn read_volume(path: &Path) -> Result<(NiftiHeader, Vec<usize>, Vec<f32>)> {
    let obj = ReaderOptions::new()
        .read_file(path)
        .with_context(|| format!("Failed to read NIfTI file {}", path.display()))?;
    let header = obj.header().clone();

    let volume = obj
        .into_volume()
        .into_ndarray::<f32>()
        .context("Failed to convert volume to ndarray")?;
    let shape = volume.shape().to_vec();
    let values: Vec<f32> = volume.as_standard_layout().iter().copied().collect();
    Ok((header, shape, values))
}

/// Read a 3D NIfTI file (`.nii` or `.nii.gz`).
pub fn read_nifti<B: Backend, P: AsRef<Path>>(path: P, device: &B::Device) -> Result<Image<B, 3>> {
    let (header, shape, values) = read_volume(path.as_ref())?;

    // Trailing singleton dimensions are allowed
    if shape.len() < 3 || shape[3..].iter().any(|&n| n != 1) {
        anyhow::bail!("Expected 3D NIfTI file, found shape {:?}", shape);
    }

    let tensor = Tensor::<B, 3>::from_data(
        TensorData::new(values, Shape::new([shape[0], shape[1], shape[2]])),
        device,
    );
    // NIfTI is [X, Y, Z]; images are [Z, Y, X]
    let tensor = tensor.permute([2, 1, 0]);

    Ok(Image::from_metadata(tensor, metadata_from_header(&header)))
}

/// Read a 4D NIfTI file as one channel per volume.
pub fn read_nifti_4d<B: Backend, P: AsRef<Path>>(
    path: P,
    device: &B::Device,
) -> Result<MultiChannelImage<B>> {
    let (header, shape, values) = read_volume(path.as_ref())?;

    let dims = match shape.len() {
        3 => [shape[0], shape[1], shape[2], 1],
        4 => [shape[0], shape[1], shape[2], shape[3]],
        _ => anyhow::bail!("Expected 3D or 4D NIfTI file, found shape {:?}", shape),
    };

    let tensor = Tensor::<B, 4>::from_data(TensorData::new(values, Shape::new(dims)), device);
    // [X, Y, Z, T] -> [T, Z, Y, X]
    let tensor = tensor.permute([3, 2, 1, 0]);

    Ok(MultiChannelImage::new(tensor, metadata_from_header(&header)))
}

fn tensor_values<B: Backend, const D: usize>(tensor: Tensor<B, D>) -> Result<Vec<f32>> {
    tensor
        .into_data()
        .convert::<f32>()
        .to_vec::<f32>()
        .map_err(|e| anyhow::anyhow!("Failed to get tensor data: {:?}", e))
}

/// Write an image to a NIfTI file, geometry included.
///
/// A `.gz` extension selects compressed output.
pub fn write_nifti<B: Backend, P: AsRef<Path>>(path: P, image: &Image<B, 3>) -> Result<()> {
    use ndarray::Array3;
    use nifti::writer::WriterOptions;

    let [nz, ny, nx] = image.shape();
    let values = tensor_values(image.data().clone().permute([2, 1, 0]))?;
    let array = Array3::from_shape_vec((nx, ny, nz), values)
        .context("Failed to create ndarray")?;

    let path = path.as_ref();
    let header = header_from_metadata(image.metadata());
    WriterOptions::new(path)
        .reference_header(&header)
        .write_nifti(&array)
        .with_context(|| format!("Failed to write NIfTI file {}", path.display()))?;

    Ok(())
}

/// Write a multi-channel image as a 4D NIfTI file.
pub fn write_nifti_4d<B: Backend, P: AsRef<Path>>(path: P, image: &MultiChannelImage<B>) -> Result<()> {
    use ndarray::Array4;
    use nifti::writer::WriterOptions;

    let [nc, nz, ny, nx] = image.data().dims();
    let values = tensor_values(image.data().clone().permute([3, 2, 1, 0]))?;
    let array = Array4::from_shape_vec((nx, ny, nz, nc), values)
        .context("Failed to create ndarray")?;

    let path = path.as_ref();
    let header = header_from_metadata(image.metadata());
    WriterOptions::new(path)
        .reference_header(&header)
        .write_nifti(&array)
        .with_context(|| format!("Failed to write NIfTI file {}", path.display()))?;

    Ok(())
}
