//! Tests for the distortion kernel, shape models and shape building

#[cfg(test)]
mod tests {
    use glam::{DQuat, DVec3};
    use std::f64::consts::{FRAC_PI_2, PI};
    use treedecor::geometry::shape::{Distortion, Pose, ShapeModel, ShapeSpec};

    fn close(a: DVec3, b: DVec3) -> bool {
        a.distance(b) < 1e-9
    }

    // Tests that the identity deformation leaves points alone
    // Verified by applying the taper unconditionally
    #[test]
    fn test_identity_distortion() {
        let p = DVec3::new(0.3, 1.2, -0.4);
        assert!(Distortion::IDENTITY.is_identity());
        assert_eq!(Distortion::IDENTITY.apply(p, 2.0), p);
        assert_eq!(Distortion::new(1.0, 1.0, 0.5).apply(p, 0.0), p);
    }

    // Tests that taper shrinks the cross-section linearly with height
    // Verified by tapering the base instead of the top
    #[test]
    fn test_taper() {
        let taper = Distortion::new(0.0, 0.0, 0.5);
        assert!(close(taper.apply(DVec3::new(1.0, 0.0, 0.0), 2.0), DVec3::X));
        assert!(close(
            taper.apply(DVec3::new(1.0, 2.0, 1.0), 2.0),
            DVec3::new(0.5, 2.0, 0.5)
        ));
    }

    // Tests that twist turns the cross-section about the axis
    // Verified by twisting in the opposite direction
    #[test]
    fn test_twist() {
        let twist = Distortion::new(0.0, FRAC_PI_2, 0.0);
        let top = twist.apply(DVec3::new(1.0, 1.0, 0.0), 1.0);
        let expected = DQuat::from_rotation_y(FRAC_PI_2) * DVec3::X + DVec3::Y;
        assert!(close(top, expected));
    }

    // Tests that a quarter bend lays the axis tip on the arc of equal length
    // Verified by bending toward -X
    #[test]
    fn test_bend_keeps_axis_length() {
        let height = 3.0;
        let bend = Distortion::new(FRAC_PI_2, 0.0, 0.0);
        let radius = height / FRAC_PI_2;
        let tip = bend.apply(DVec3::new(0.0, height, 0.0), height);
        assert!(close(tip, DVec3::new(radius, radius, 0.0)));
        assert!(close(bend.apply(DVec3::ZERO, height), DVec3::ZERO));
    }

    // Tests that combining accumulates angles and compounds taper
    // Verified by adding the tapers
    #[test]
    fn test_combined() {
        let a = Distortion::new(0.1, 0.2, 0.5);
        let b = Distortion::new(0.3, -0.2, 0.5);
        let c = a.combined(&b);
        assert!((c.bend - 0.4).abs() < 1e-12);
        assert!(c.twist.abs() < 1e-12);
        assert!((c.taper - 0.75).abs() < 1e-12);
    }

    // Tests cylinder surface poses along height and around the axis
    // Verified by interpolating the radius from the top
    #[test]
    fn test_cylinder_model_position() {
        let model = ShapeModel::Cylinder {
            radius_bottom: 1.0,
            radius_top: 0.5,
            height: 4.0,
        };
        let base = model.position(0.0, 0.0, 1.0, false, DVec3::ONE, &Distortion::IDENTITY);
        assert!(close(base.translation, DVec3::X));
        assert_eq!(base.rotation, DQuat::IDENTITY);

        let middle = model.position(0.5, FRAC_PI_2, 1.0, false, DVec3::ONE, &Distortion::IDENTITY);
        assert!(close(middle.translation, DVec3::new(0.0, 2.0, 0.75)));

        let inner = model.position(1.0, PI, 0.0, false, DVec3::ONE, &Distortion::IDENTITY);
        assert!(close(inner.translation, DVec3::new(0.0, 4.0, 0.0)));
        assert!((model.height() - 4.0).abs() < f64::EPSILON);
        assert!((model.radius() - 1.0).abs() < f64::EPSILON);
    }

    // Tests that counter-action returns the frame change of the bend
    // Verified by ignoring the counter-action flag
    #[test]
    fn test_counter_action_rotation() {
        let model = ShapeModel::Cylinder {
            radius_bottom: 0.2,
            radius_top: 0.2,
            height: 2.0,
        };
        let bend = Distortion::new(0.8, 0.0, 0.0);
        let pose = model.position(0.5, 0.0, 1.0, true, DVec3::ONE, &bend);
        assert!(pose.rotation.angle_between(DQuat::from_rotation_z(-0.4)) < 1e-9);
        let plain = model.position(0.5, 0.0, 1.0, false, DVec3::ONE, &bend);
        assert_eq!(plain.rotation, DQuat::IDENTITY);
    }

    // Tests sphere poses at the poles and the equator, fractions rising from the base
    // Verified by measuring the polar angle from +Y
    #[test]
    fn test_sphere_model_position() {
        let model = ShapeModel::Sphere { radius: 2.0 };
        let bottom = model.position(0.0, 1.0, 1.0, false, DVec3::ONE, &Distortion::IDENTITY);
        assert!(close(bottom.translation, DVec3::new(0.0, -2.0, 0.0)));
        let top = model.position(1.0, 1.0, 1.0, false, DVec3::ONE, &Distortion::IDENTITY);
        assert!(close(top.translation, DVec3::new(0.0, 2.0, 0.0)));
        let lower = model.position(0.25, 0.0, 1.0, false, DVec3::ONE, &Distortion::IDENTITY);
        assert!(lower.translation.y < 0.0);
        let equator = model.position(0.5, 0.0, 1.0, false, DVec3::ONE, &Distortion::IDENTITY);
        assert!(close(equator.translation, DVec3::new(2.0, 0.0, 0.0)));
        assert!((model.height() - 4.0).abs() < f64::EPSILON);
    }

    // Tests that building a recipe keeps its name, material and model
    // Verified by building every recipe without a model
    #[test]
    fn test_shape_spec_build() {
        let cylinder = ShapeSpec::Cylinder {
            radius_bottom: 0.3,
            radius_top: 0.1,
            height: 2.0,
            segments: 6,
        }
        .build("trunk", None);
        assert_eq!(cylinder.name, "trunk");
        assert!(cylinder.model.is_some());
        assert!((cylinder.deform_height(2.0) - 4.0).abs() < 1e-12);

        let leaf = ShapeSpec::Leaf {
            width: 0.2,
            length: 0.5,
        }
        .build("leaf", None);
        assert!(leaf.model.is_none());
        assert!((leaf.deform_height(1.0) - 0.5).abs() < 1e-12);
    }

    // Tests that spheres ignore distortion when deforming vertices
    // Verified by bending sphere vertices
    #[test]
    fn test_sphere_vertices_ignore_distortion() {
        let sphere = ShapeSpec::Sphere {
            radius: 1.0,
            segments: 8,
            rings: 4,
        }
        .build("crown", None);
        let vertex = DVec3::new(0.0, 1.0, 0.0);
        let bent = sphere.deformed_vertex(vertex, DVec3::splat(2.0), &Distortion::new(1.0, 1.0, 0.5));
        assert!(close(bent, DVec3::new(0.0, 2.0, 0.0)));
    }

    // Tests the affine form of a pose
    // Verified by applying translation before rotation
    #[test]
    fn test_pose_to_affine() {
        let pose = Pose {
            translation: DVec3::new(1.0, 2.0, 3.0),
            rotation: DQuat::from_rotation_y(FRAC_PI_2),
        };
        let moved = pose.to_affine().transform_point3(DVec3::X);
        assert!(close(moved, DVec3::new(1.0, 2.0, 2.0)));
        assert_eq!(Pose::at(DVec3::ONE).rotation, DQuat::IDENTITY);
    }
}
