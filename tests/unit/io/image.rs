//! Tests for preview rendering and PNG export

#[cfg(test)]
mod tests {
    use std::rc::Rc;
    use treedecor::DecoratorError;
    use treedecor::geometry::collection::{GeometryCollection, Instance};
    use treedecor::geometry::shape::ShapeSpec;
    use treedecor::io::image::{export_preview, render_preview};

    fn leaf() -> GeometryCollection {
        let shape = Rc::new(
            ShapeSpec::Leaf {
                width: 1.0,
                length: 2.0,
            }
            .build("leaf", None),
        );
        GeometryCollection::single(Instance::new(shape))
    }

    // Tests that a leaf facing the viewer covers part of the image
    // Verified by skipping the triangle fill
    #[test]
    fn test_render_preview() {
        let image = render_preview(&leaf(), 64).expect("leaf has extent");
        assert_eq!(image.dimensions(), (64, 64));
        let covered = image.pixels().filter(|p| p.0[3] == 255).count();
        assert!(covered > 0);
        assert!(covered < 64 * 64);
        // Centre of the drawing lies inside the leaf
        assert_eq!(image.get_pixel(32, 32).0[3], 255);
    }

    // Tests that nothing is rendered for an empty collection
    // Verified by rendering a blank image
    #[test]
    fn test_render_empty() {
        assert!(render_preview(&GeometryCollection::new(), 64).is_none());
    }

    // Tests PNG file creation with its parent directory
    // Verified by disabling file save operation
    #[test]
    fn test_export_preview_creates_file() {
        let dir = tempfile::tempdir().expect("temporary directory");
        let path = dir.path().join("previews").join("leaf.png");
        export_preview(&leaf(), &path).expect("preview written");
        assert!(path.exists(), "PNG file should be created");
    }

    // Tests error when there is nothing to draw
    // Verified by writing an empty image
    #[test]
    fn test_export_preview_empty() {
        let dir = tempfile::tempdir().expect("temporary directory");
        let path = dir.path().join("empty.png");
        assert!(matches!(
            export_preview(&GeometryCollection::new(), &path),
            Err(DecoratorError::InvalidGraph { .. })
        ));
        assert!(!path.exists());
    }
}
