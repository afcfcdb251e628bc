use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use nalgebra::Vector3;
use ndarray::Axis;
use ply_rs::ply::{
    Addable, DefaultElement, ElementDef, Encoding, Ply, Property, PropertyDef, PropertyType,
    ScalarType,
};
use ply_rs::writer::Writer;
use tracing::info;

use crate::{
    error::KinectError,
    image::{image_size, ColorImage, PointCloudImage},
    pointcloud::PointCloud,
};

/// Color given to context points by [`write_context_ply`].
pub const CONTEXT_HIGHLIGHT: [u8; 3] = [174, 1, 126];

/// Colors of cluster labels 0 to 8 in [`write_labeled_ply`]. Other labels are black.
pub const LABEL_PALETTE: [[u8; 3]; 9] = [
    [215, 48, 39],
    [116, 173, 209],
    [254, 224, 144],
    [69, 117, 180],
    [244, 109, 67],
    [253, 173, 97],
    [255, 255, 191],
    [224, 243, 248],
    [171, 217, 233],
];

/// One exported point.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PlyVertex {
    pub point: [f32; 3],
    pub color: [u8; 3],
}

fn make_ply(vertices: &[PlyVertex]) -> Result<Ply<DefaultElement>, KinectError> {
    let mut ply = Ply::<DefaultElement>::new();
    let mut vertex_element = ElementDef::new("vertex".to_string());
    ["x", "y", "z"].iter().for_each(|key| {
        vertex_element.properties.add(PropertyDef::new(
            key.to_string(),
            PropertyType::Scalar(ScalarType::Float),
        ));
    });
    ["red", "green", "blue"].iter().for_each(|key| {
        vertex_element.properties.add(PropertyDef::new(
            key.to_string(),
            PropertyType::Scalar(ScalarType::UChar),
        ));
    });

    let vertex_array: Vec<DefaultElement> = vertices
        .iter()
        .map(|vertex| {
            let mut elem = DefaultElement::new();
            elem.insert("x".to_string(), Property::Float(vertex.point[0]));
            elem.insert("y".to_string(), Property::Float(vertex.point[1]));
            elem.insert("z".to_string(), Property::Float(vertex.point[2]));
            elem.insert("red".to_string(), Property::UChar(vertex.color[0]));
            elem.insert("green".to_string(), Property::UChar(vertex.color[1]));
            elem.insert("blue".to_string(), Property::UChar(vertex.color[2]));
            elem
        })
        .collect();

    ply.header.elements.add(vertex_element);
    ply.payload.insert("vertex".to_string(), vertex_array);
    ply.make_consistent()
        .map_err(|err| KinectError::Export(format!("{err:?}")))?;
    ply.header.encoding = Encoding::Ascii;
    Ok(ply)
}

/// Writes the vertices as an ASCII PLY file.
pub fn write_vertices<P>(filepath: P, vertices: &[PlyVertex]) -> Result<(), KinectError>
where
    P: AsRef<Path>,
{
    let mut ply = make_ply(vertices)?;
    let mut buf = BufWriter::new(File::create(filepath.as_ref())?);
    Writer::new().write_ply(&mut buf, &mut ply)?;
    buf.flush()?;
    info!(path = %filepath.as_ref().display(), vertices = vertices.len(), "ply written");
    Ok(())
}

/// Exports a transformed frame. Pixels without depth and pixels whose BGRA
/// is all zero are left out.
///
/// # Arguments
///
/// * `filepath` - Output file.
/// * `point_cloud` - XYZ image, shape (height, width, 3).
/// * `color` - BGRA image on the same grid.
pub fn write_ply_image<P>(
    filepath: P,
    point_cloud: &PointCloudImage,
    color: &ColorImage,
) -> Result<(), KinectError>
where
    P: AsRef<Path>,
{
    if image_size(point_cloud) != image_size(color) {
        return Err(KinectError::invalid_parameter(format!(
            "point cloud {:?} and color {:?} are not on the same grid",
            point_cloud.shape(),
            color.shape()
        )));
    }

    let vertices: Vec<PlyVertex> = point_cloud
        .lanes(Axis(2))
        .into_iter()
        .zip(color.lanes(Axis(2)))
        .filter(|(xyz, bgra)| xyz[2] != 0 && bgra.iter().any(|c| *c != 0))
        .map(|(xyz, bgra)| PlyVertex {
            point: [xyz[0] as f32, xyz[1] as f32, xyz[2] as f32],
            color: [bgra[2], bgra[1], bgra[0]],
        })
        .collect();

    write_vertices(filepath, &vertices)
}

/// Exports the non-zero points of a cloud with their colors.
pub fn write_ply<P>(filepath: P, cloud: &PointCloud) -> Result<(), KinectError>
where
    P: AsRef<Path>,
{
    let vertices: Vec<PlyVertex> = cloud
        .iter_valid()
        .map(|(point, color)| PlyVertex {
            point: [point[0], point[1], point[2]],
            color,
        })
        .collect();
    write_vertices(filepath, &vertices)
}

/// Exports the full cloud with the context points painted in
/// [`CONTEXT_HIGHLIGHT`] and every other point in black.
pub fn write_context_ply<P>(
    filepath: P,
    full: &PointCloud,
    context: &PointCloud,
) -> Result<(), KinectError>
where
    P: AsRef<Path>,
{
    if full.len() != context.len() {
        return Err(KinectError::invalid_parameter(format!(
            "full cloud has {} points but context has {}",
            full.len(),
            context.len()
        )));
    }

    let vertices: Vec<PlyVertex> = (0..full.len())
        .filter(|i| !full.is_zero(*i))
        .map(|i| {
            let point = full.point(i);
            PlyVertex {
                point: [point[0], point[1], point[2]],
                color: if context.is_zero(i) {
                    [0, 0, 0]
                } else {
                    CONTEXT_HIGHLIGHT
                },
            }
        })
        .collect();
    write_vertices(filepath, &vertices)
}

/// Exports points colored by their cluster label with [`LABEL_PALETTE`].
pub fn write_labeled_ply<P>(filepath: P, points: &[(Vector3<f32>, usize)]) -> Result<(), KinectError>
where
    P: AsRef<Path>,
{
    let vertices: Vec<PlyVertex> = points
        .iter()
        .map(|(point, label)| PlyVertex {
            point: [point[0], point[1], point[2]],
            color: LABEL_PALETTE.get(*label).copied().unwrap_or([0, 0, 0]),
        })
        .collect();
    write_vertices(filepath, &vertices)
}
