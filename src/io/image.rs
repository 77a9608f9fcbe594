//! Front-view PNG preview of a generated collection

use crate::geometry::collection::GeometryCollection;
use crate::io::configuration::{PREVIEW_MARGIN, PREVIEW_SIZE};
use crate::io::error::{DecoratorError, Result, file_system};
use glam::{DVec2, DVec3};
use image::{ImageBuffer, Rgba, RgbaImage};
use std::path::Path;

/// Fill colour per decoration level, cycling for deeper levels
const LEVEL_COLORS: [[u8; 3]; 6] = [
    [121, 85, 61],
    [92, 140, 64],
    [178, 196, 92],
    [214, 120, 150],
    [240, 200, 90],
    [120, 160, 210],
];

const BACKGROUND: Rgba<u8> = Rgba([0, 0, 0, 0]);

// Viewer sits on +Z looking toward -Z
fn light_direction() -> DVec3 {
    DVec3::new(0.3, 0.5, 1.0).normalize()
}

/// Maps collection XY coordinates onto square image pixels
#[derive(Clone, Copy, Debug)]
struct Viewport {
    origin: DVec2,
    scale: f64,
    offset: DVec2,
    size: u32,
}

impl Viewport {
    fn fit(collection: &GeometryCollection, size: u32) -> Option<Self> {
        let bounds = collection.bounds()?;
        let extent = bounds.size();
        let span = extent.x.max(extent.y);
        if span <= 0.0 {
            return None;
        }
        let usable = f64::from(size.saturating_sub(2 * PREVIEW_MARGIN).max(1));
        let scale = usable / span;
        let offset = DVec2::new(
            (usable - extent.x * scale) * 0.5 + f64::from(PREVIEW_MARGIN),
            (usable - extent.y * scale) * 0.5 + f64::from(PREVIEW_MARGIN),
        );
        Some(Self {
            origin: DVec2::new(bounds.min.x, bounds.min.y),
            scale,
            offset,
            size,
        })
    }

    fn project(&self, point: DVec3) -> DVec2 {
        let local = (DVec2::new(point.x, point.y) - self.origin) * self.scale + self.offset;
        DVec2::new(local.x, f64::from(self.size) - local.y)
    }
}

/// Render every instance as shaded triangles seen from +Z
///
/// Instances are coloured by decoration level; a depth buffer keeps the
/// nearest surface. `None` when the collection has no extent.
pub fn render_preview(collection: &GeometryCollection, size: u32) -> Option<RgbaImage> {
    let viewport = Viewport::fit(collection, size)?;
    let mut image: RgbaImage = ImageBuffer::from_pixel(size, size, BACKGROUND);
    let mut depth = vec![f64::NEG_INFINITY; (size as usize) * (size as usize)];
    let light = light_direction();

    for instance in collection {
        let mesh = instance.world_mesh();
        let base = LEVEL_COLORS
            .get(instance.level as usize % LEVEL_COLORS.len())
            .copied()
            .unwrap_or([128, 128, 128]);
        for face in 0..mesh.faces().len() {
            let (Some(corners), Some(normal)) = (mesh.face_corners(face), mesh.face_normal(face))
            else {
                continue;
            };
            let shade = 0.35 + 0.65 * normal.dot(light).abs();
            let [r, g, b] = base.map(|channel| (f64::from(channel) * shade) as u8);
            let color = Rgba([r, g, b, 255]);
            fill_triangle(&mut image, &mut depth, &viewport, corners, color);
        }
    }
    Some(image)
}

fn fill_triangle(
    image: &mut RgbaImage,
    depth: &mut [f64],
    viewport: &Viewport,
    corners: [DVec3; 3],
    color: Rgba<u8>,
) {
    let [pa, pb, pc] = corners;
    let [a, b, c] = corners.map(|p| viewport.project(p));
    let area = (b - a).perp_dot(c - a);
    if area.abs() <= f64::EPSILON {
        return;
    }
    let size = viewport.size;
    let min = a.min(b).min(c).floor().max(DVec2::ZERO);
    let max = a.max(b).max(c).ceil().min(DVec2::splat(f64::from(size) - 1.0));
    if max.x < min.x || max.y < min.y {
        return;
    }

    for py in (min.y as u32)..=(max.y as u32) {
        for px in (min.x as u32)..=(max.x as u32) {
            let p = DVec2::new(f64::from(px) + 0.5, f64::from(py) + 0.5);
            let w0 = (c - b).perp_dot(p - b) / area;
            let w1 = (a - c).perp_dot(p - c) / area;
            let w2 = 1.0 - w0 - w1;
            if w0 < 0.0 || w1 < 0.0 || w2 < 0.0 {
                continue;
            }
            let z = w0.mul_add(pa.z, w1.mul_add(pb.z, w2 * pc.z));
            let Some(slot) = depth.get_mut(py as usize * size as usize + px as usize) else {
                continue;
            };
            if z > *slot {
                *slot = z;
                image.put_pixel(px, py, color);
            }
        }
    }
}

/// Write a [`PREVIEW_SIZE`] square preview PNG
///
/// # Errors
///
/// Returns an error if:
/// - The collection is empty or has no extent
/// - The parent directory cannot be created
/// - The image cannot be saved to the specified path
pub fn export_preview(collection: &GeometryCollection, output_path: &Path) -> Result<()> {
    let image = render_preview(collection, PREVIEW_SIZE).ok_or_else(|| {
        DecoratorError::InvalidGraph {
            reason: "generated collection has nothing to draw".to_string(),
        }
    })?;

    if let Some(parent) = output_path.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| file_system(parent, "create directory", e))?;
    }

    image
        .save(output_path)
        .map_err(|e| DecoratorError::ImageExport {
            path: output_path.to_path_buf(),
            source: e,
        })
}
