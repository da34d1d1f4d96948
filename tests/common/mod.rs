#![allow(dead_code)]

use biofem::config::AnalysisConfig;
use biofem::domain::ElasticSolidDomain;
use biofem::element::shape::ElementRule;
use biofem::material::NeoHookean;
use biofem::mesh::Mesh;
use biofem::prelude::*;
use biofem::state::SimulationState;

/// Hex8 block of `n` elements per direction over `[0, size]`, with node sets
/// "x0", "x1", "y0", "y1", "z0", "z1" on its faces.
pub fn block(n: [usize; 3], size: Vector3, material: NeoHookean) -> Mesh {
    let [nx, ny, nz] = n;
    let id = |i: usize, j: usize, k: usize| i + (nx + 1) * (j + (ny + 1) * k);

    let mut positions = Vec::new();
    for k in 0..=nz {
        for j in 0..=ny {
            for i in 0..=nx {
                positions.push(Vector3::new(
                    size.x * i as f64 / nx as f64,
                    size.y * j as f64 / ny as f64,
                    size.z * k as f64 / nz as f64,
                ));
            }
        }
    }
    let mut mesh = Mesh::new(&positions);

    let mut connectivity = Vec::new();
    for k in 0..nz {
        for j in 0..ny {
            for i in 0..nx {
                let mut c = Vec::with_capacity(8);
                for kk in 0..2 {
                    for jj in 0..2 {
                        for ii in 0..2 {
                            c.push(id(i + ii, j + jj, k + kk));
                        }
                    }
                }
                connectivity.push(c);
            }
        }
    }
    let domain =
        ElasticSolidDomain::new("block", ElementRule::hex8(), Box::new(material), &connectivity)
            .unwrap();
    mesh.add_domain(Box::new(domain)).unwrap();

    for (axis, name) in ["x", "y", "z"].iter().enumerate() {
        let hi = size[axis];
        let lo_nodes = (0..positions.len())
            .filter(|&i| positions[i][axis].abs() < 1e-12)
            .collect_vec();
        let hi_nodes = (0..positions.len())
            .filter(|&i| (positions[i][axis] - hi).abs() < 1e-12)
            .collect_vec();
        mesh.add_node_set(&format!("{}0", name), &lo_nodes).unwrap();
        mesh.add_node_set(&format!("{}1", name), &hi_nodes).unwrap();
    }
    mesh
}

pub fn unit_cube(material: NeoHookean) -> Mesh {
    block([1, 1, 1], Vector3::new(1., 1., 1.), material)
}

pub fn rubber() -> NeoHookean {
    NeoHookean::new(100., 0.3).unwrap()
}

/// Tight tolerances so converged states can be compared closely
pub fn strict_config() -> AnalysisConfig {
    let mut config = AnalysisConfig::default();
    config.newton.dtol = 1e-8;
    config.newton.etol = 1e-12;
    config.newton.rtol = 0.;
    config.newton.max_iterations = 30;
    config.newton.max_reformations = 30;
    config.time_steps = 1;
    config.step_size = 1.;
    config
}

/// Symmetry conditions on the three coordinate planes
pub fn symmetry(state: &mut SimulationState) {
    use biofem::mesh::Dof;
    let mesh = &state.mesh;
    let bcs = &mut state.bcs;
    bcs.fix_node_set(mesh, "x0", &[Dof::X]).unwrap();
    bcs.fix_node_set(mesh, "y0", &[Dof::Y]).unwrap();
    bcs.fix_node_set(mesh, "z0", &[Dof::Z]).unwrap();
}
