use burn::tensor::{Shape, Tensor, TensorData};
use burn_ndarray::NdArray;
use svrb0_core::image::Image;
use svrb0_core::spatial::{Direction, Point, Spacing};
use svrb0_core::transform::RigidTransform;
use svrb0_distortion::{align_template, register_stacks, stack_volumes, DistortionError, Reconstruction};
use svrb0_registration::ImageRegistration;

type B = NdArray<f32>;

const D: usize = 20;

fn volume(center: [f32; 3], origin: [f64; 3]) -> Image<B, 3> {
    let mut values = Vec::with_capacity(D * D * D);
    for z in 0..D {
        for y in 0..D {
            for x in 0..D {
                let dx = x as f32 - center[0];
                let dy = y as f32 - center[1];
                let dz = z as f32 - center[2];
                values.push((-(dx * dx) / 18.0 - (dy * dy) / 12.5 - (dz * dz) / 8.0).exp());
            }
        }
    }
    let data = Tensor::<B, 3>::from_data(TensorData::new(values, Shape::new([D, D, D])), &Default::default());
    Image::new(data, Point::new(origin), Spacing::uniform(1.0), Direction::identity())
}

fn ones_mask(origin: [f64; 3]) -> Image<B, 3> {
    Image::new(
        Tensor::<B, 3>::ones([D, D, D], &Default::default()),
        Point::new(origin),
        Spacing::uniform(1.0),
        Direction::identity(),
    )
}

#[test]
fn test_stack_registration_recovers_translation() {
    let origin = [5.0, -3.0, 12.0];
    let recon = Reconstruction::new(volume([10.0, 10.0, 10.0], origin)).with_mask(ones_mask(origin));
    let stacks = vec![volume([12.0, 10.0, 10.0], origin), volume([10.0, 9.0, 10.0], origin)];
    let initial = vec![RigidTransform::identity(); 2];

    let mut solver = ImageRegistration::<B>::default();
    let refined = register_stacks(&mut solver, &recon, &stacks, &initial).unwrap();

    // Reconstruction positions map to stack positions.
    let expected = [[2.0, 0.0, 0.0], [0.0, -1.0, 0.0]];
    for (transform, want) in refined.iter().zip(expected.iter()) {
        for axis in 0..3 {
            assert!(
                (transform.parameter(axis) - want[axis]).abs() < 0.3,
                "t{} = {}",
                axis,
                transform.parameter(axis)
            );
        }
        assert_eq!(transform.center(), &Point::origin());
    }
}

#[test]
fn test_stack_registration_checks_transform_count() {
    let recon = Reconstruction::new(volume([10.0, 10.0, 10.0], [0.0; 3]));
    let stacks = vec![volume([10.0, 10.0, 10.0], [0.0; 3])];
    let mut solver = ImageRegistration::<B>::default();
    let result = register_stacks(&mut solver, &recon, &stacks, &[]);
    assert!(matches!(result, Err(DistortionError::Input(_))));
}

#[test]
fn test_template_alignment() {
    let recon = volume([10.0, 10.0, 10.0], [0.0; 3]);
    let template = volume([11.0, 10.0, 8.0], [0.0; 3]);

    let mut solver = ImageRegistration::<B>::default();
    let (aligned, transform) = align_template(&mut solver, &template, &recon, 0.0).unwrap();

    assert!((transform.parameter(0) - 1.0).abs() < 0.3, "tx = {}", transform.parameter(0));
    assert!((transform.parameter(2) + 2.0).abs() < 0.3, "tz = {}", transform.parameter(2));
    assert!(aligned.same_grid(&recon));

    let residual = aligned.sum_squared_difference(&recon);
    let before = template.sum_squared_difference(&recon);
    assert!(residual < 0.1 * before, "residual {} vs {}", residual, before);
}

#[test]
fn test_smoothed_template_lands_on_reconstruction_grid() {
    let recon = volume([10.0, 10.0, 10.0], [0.0; 3]);
    let template = volume([10.0, 10.0, 10.0], [0.0; 3]);

    let mut solver = ImageRegistration::<B>::default();
    let (aligned, transform) = align_template(&mut solver, &template, &recon, 1.0).unwrap();
    assert!(aligned.same_grid(&recon));
    for axis in 0..3 {
        assert!(transform.parameter(axis).abs() < 0.3);
    }
}

#[test]
fn test_stack_volumes_uses_first_grid() {
    let a = volume([10.0, 10.0, 10.0], [0.0; 3]);
    let b = volume([10.0, 10.0, 10.0], [1.0, 0.0, 0.0]);
    let stacked = stack_volumes(&[a.clone(), b]).unwrap();
    assert_eq!(stacked.num_channels(), 2);
    assert_eq!(stacked.metadata(), a.metadata());

    // x = 0 of the first grid lies before the second volume.
    let second = stacked.channel(1).into_data().into_data().to_vec::<f32>().unwrap();
    assert_eq!(second[0], 0.0);
}
