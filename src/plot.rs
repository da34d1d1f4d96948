//! Legacy VTK output of the mesh state.

use std::path::{Path, PathBuf};

use tracing::debug;
use vtkio::model::*;

use crate::error::{Error, Result};
use crate::interface::PlotWriter;
use crate::mesh::Mesh;
use crate::prelude::*;
use crate::rigid::RigidBody;

/// Writes one `.vtk` file per call into a directory.
///
/// Solid elements are written as linear hexahedra through their corner nodes,
/// rigid body centers as vertex cells after the mesh nodes.
pub struct VtkPlotWriter {
    dir: PathBuf,
    prefix: String,
    times: Vec<f64>,
}

impl VtkPlotWriter {
    pub fn new(dir: impl AsRef<Path>, prefix: &str) -> Result<Self> {
        std::fs::create_dir_all(dir.as_ref())?;
        Ok(VtkPlotWriter {
            dir: dir.as_ref().to_path_buf(),
            prefix: prefix.to_string(),
            times: Vec::new(),
        })
    }

    /// Times of the states written so far
    pub fn times(&self) -> &[f64] {
        &self.times
    }

    pub fn path(&self, index: usize) -> PathBuf {
        self.dir.join(format!("{}_{:0>4}.vtk", self.prefix, index))
    }
}

impl PlotWriter for VtkPlotWriter {
    fn write(&mut self, mesh: &Mesh, bodies: &[RigidBody], time: f64) -> Result<()> {
        let path = self.path(self.times.len());
        model_vtk(mesh, bodies, time)
            .export_ascii(&path)
            .map_err(|e| Error::Plot(format!("{}: {}", path.display(), e)))?;
        debug!(time, path = %path.display(), "plot written");
        self.times.push(time);
        Ok(())
    }
}

fn vectors(name: &str, data: Vec<f64>) -> Attribute {
    Attribute::DataArray(DataArrayBase {
        name: name.to_string(),
        elem: ElementType::Vectors,
        data: IOBuffer::F64(data),
    })
}

fn scalars(name: &str, data: Vec<f64>) -> Attribute {
    Attribute::DataArray(DataArrayBase {
        name: name.to_string(),
        elem: ElementType::Scalars {
            num_comp: 1,
            lookup_table: None,
        },
        data: IOBuffer::F64(data),
    })
}

/// Build the VTK model of the current state
pub fn model_vtk(mesh: &Mesh, bodies: &[RigidBody], time: f64) -> Vtk {
    let num_nodes = mesh.num_nodes();

    let mut connectivity: Vec<u64> = Vec::new();
    let mut offsets: Vec<u64> = Vec::new();
    let mut types: Vec<CellType> = Vec::new();
    let mut stress: Vec<f64> = Vec::new();
    for dom in mesh.domains.iter() {
        let corners = dom.rule().shape.corners();
        for el in dom.elements() {
            connectivity.extend(corners.iter().map(|&c| el.nodes[c] as u64));
            offsets.push(connectivity.len() as u64);
            types.push(CellType::Hexahedron);
            let s = el.points.iter().map(|mp| mp.stress).sum::<Matrix3>()
                / el.points.len().max(1) as f64;
            stress.extend(voigt(&s).iter());
        }
    }
    for i in 0..bodies.len() {
        connectivity.push((num_nodes + i) as u64);
        offsets.push(connectivity.len() as u64);
        types.push(CellType::Vertex);
    }
    // Body cells carry no stress
    stress.resize(6 * types.len(), 0.);

    let positions = mesh
        .nodes
        .iter()
        .map(|n| n.rt)
        .chain(bodies.iter().map(|b| b.rt))
        .flat_map(|r| r.iter().copied().collect_vec())
        .collect_vec();
    let displacements = mesh
        .nodes
        .iter()
        .map(|n| n.rt - n.r0)
        .chain(bodies.iter().map(|b| b.rt - b.r0))
        .flat_map(|u| u.iter().copied().collect_vec())
        .collect_vec();
    let velocities = mesh
        .nodes
        .iter()
        .map(|n| n.vt)
        .chain(bodies.iter().map(|_| Vector3::zeros()))
        .flat_map(|v| v.iter().copied().collect_vec())
        .collect_vec();
    let pressures = mesh
        .nodes
        .iter()
        .map(|n| n.pt)
        .chain(bodies.iter().map(|_| 0.))
        .collect_vec();

    Vtk {
        version: Version { major: 4, minor: 2 },
        title: format!("t = {}", time),
        byte_order: ByteOrder::LittleEndian,
        file_path: None,
        data: DataSet::inline(UnstructuredGridPiece {
            points: IOBuffer::F64(positions),
            cells: Cells {
                cell_verts: VertexNumbers::XML {
                    connectivity,
                    offsets,
                },
                types,
            },
            data: Attributes {
                point: vec![
                    vectors("displacement", displacements),
                    vectors("velocity", velocities),
                    scalars("pressure", pressures),
                ],
                cell: vec![Attribute::DataArray(DataArrayBase {
                    name: "stress".to_string(),
                    elem: ElementType::Generic(6),
                    data: IOBuffer::F64(stress),
                })],
            },
        }),
    }
}
