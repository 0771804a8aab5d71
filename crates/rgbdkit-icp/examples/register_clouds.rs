use rgbdkit_3d::linalg::transform_points3d;
use rgbdkit_3d::pointcloud::PointCloud;
use rgbdkit_3d::pose::RigidTransform;
use rgbdkit_3d::transforms::axis_angle_to_rotation_matrix;
use rgbdkit_icp::RelativePoseEstimatorIcp;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    // a synthetic scan: random points in a unit cube
    let points_src = (0..500)
        .map(|_| {
            [
                rand::random::<f64>(),
                rand::random::<f64>(),
                rand::random::<f64>(),
            ]
        })
        .collect::<Vec<_>>();

    // displace it by a known rigid transform
    let rotation = axis_angle_to_rotation_matrix(&[0.0, 0.0, 1.0], 0.05)?;
    let translation = [0.05, -0.02, 0.01];
    let mut points_dst = vec![[0.0; 3]; points_src.len()];
    transform_points3d(&points_src, &rotation, &translation, &mut points_dst)?;

    let source = PointCloud::new(points_src, None, None);
    let target = PointCloud::new(points_dst, None, None);

    let estimator = RelativePoseEstimatorIcp::new().with_max_iterations(100);
    let estimate = estimator.estimate_from_clouds(&source, &target, &RigidTransform::identity())?;

    println!("estimated pose: {:?}", estimate.pose);
    println!(
        "rmse: {:.6} after {} iterations",
        estimate.rmse, estimate.num_iterations
    );
    Ok(())
}
