use anyhow::Result;
use burn::tensor::{Shape, Tensor, TensorData};
use burn_ndarray::NdArray;
use svrb0_core::image::{Image, MultiChannelImage};
use svrb0_core::spatial::{Direction, Point, Spacing, Vector};
use svrb0_io::{read_nifti, read_nifti_4d, write_nifti, write_nifti_4d};
use tempfile::tempdir;

type B = NdArray<f32>;

fn oblique_axes() -> Direction<3> {
    let s = std::f64::consts::FRAC_1_SQRT_2;
    Direction::from_axes(Vector::new([s, s, 0.0]), Vector::new([-s, s, 0.0]), Vector::new([0.0, 0.0, 1.0]))
}

#[test]
fn test_compressed_image_keeps_geometry() -> Result<()> {
    let dir = tempdir()?;
    let path = dir.path().join("stack.nii.gz");
    let device = Default::default();

    let values: Vec<f32> = (0..4 * 3 * 2).map(|v| v as f32 * 0.5).collect();
    let data = Tensor::<B, 3>::from_data(TensorData::new(values.clone(), Shape::new([2, 3, 4])), &device);
    let image = Image::new(data, Point::new([-12.0, 7.5, 30.0]), Spacing::new([1.25, 1.25, 4.0]), oblique_axes());

    write_nifti(&path, &image)?;
    let restored = read_nifti::<B, _>(&path, &device)?;

    assert_eq!(restored.shape(), [2, 3, 4]);
    assert_eq!(restored.data().to_data().to_vec::<f32>().unwrap(), values);

    let probe = Point::new([3.0, 1.0, 1.0]);
    let expected = image.transform_continuous_index_to_physical_point(&probe);
    let actual = restored.transform_continuous_index_to_physical_point(&probe);
    assert!(expected.distance(&actual) < 1e-4, "{:?} vs {:?}", expected, actual);
    Ok(())
}

#[test]
fn test_aggregate_channels_in_order() -> Result<()> {
    let dir = tempdir()?;
    let path = dir.path().join("fmstacks0.nii.gz");
    let device = Default::default();

    let channels: Vec<Tensor<B, 3>> = (0..3)
        .map(|c| Tensor::<B, 3>::ones([2, 2, 3], &device).mul_scalar(c as f32 + 1.0))
        .collect();
    let image = Image::new(channels[0].clone(), Point::origin(), Spacing::uniform(2.0), Direction::identity());
    let aggregate = MultiChannelImage::from_channels(*image.metadata(), channels);

    write_nifti_4d(&path, &aggregate)?;
    let restored = read_nifti_4d::<B, _>(&path, &device)?;

    assert_eq!(restored.data().dims(), [3, 2, 2, 3]);
    for c in 0..3 {
        let values = restored.channel(c).data().to_data().to_vec::<f32>().unwrap();
        assert!(values.iter().all(|v| *v == c as f32 + 1.0));
    }
    assert_eq!(restored.metadata().spacing()[0], 2.0);
    Ok(())
}
