use nalgebra::{Matrix3, Point3, Rotation3, Vector3};

const NORM_EPSILON: f64 = 1e-8;

/// Orthonormal frame attached to a residue backbone.
///
/// The origin sits on CA, the first axis points along CA→C, the second lies in
/// the N-CA-C plane and the third completes a right-handed basis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResidueFrame {
    pub origin: Point3<f64>,
    pub rotation: Rotation3<f64>,
}

impl ResidueFrame {
    pub fn to_local(&self, point: &Point3<f64>) -> Vector3<f64> {
        self.rotation.inverse() * (point - self.origin)
    }

    pub fn to_global(&self, local: &Vector3<f64>) -> Point3<f64> {
        self.origin + self.rotation * local
    }
}

pub fn residue_frame(
    n_pos: &Point3<f64>,
    ca_pos: &Point3<f64>,
    c_pos: &Point3<f64>,
) -> Option<ResidueFrame> {
    let e1 = (c_pos - ca_pos).try_normalize(NORM_EPSILON)?;
    let ca_n = n_pos - ca_pos;
    let e2 = (ca_n - e1 * e1.dot(&ca_n)).try_normalize(NORM_EPSILON)?;
    let e3 = e1.cross(&e2);
    Some(ResidueFrame {
        origin: *ca_pos,
        rotation: Rotation3::from_matrix_unchecked(Matrix3::from_columns(&[e1, e2, e3])),
    })
}

/// Places atom `d` from its three predecessors `a`, `b`, `c` given the bond
/// length `c-d`, the bond angle `b-c-d` and the torsion `a-b-c-d` (radians).
pub fn place_atom(
    a: &Point3<f64>,
    b: &Point3<f64>,
    c: &Point3<f64>,
    bond_length: f64,
    bond_angle: f64,
    torsion: f64,
) -> Point3<f64> {
    let bc = (c - b).normalize();
    let n = (b - a).cross(&bc).normalize();
    let m = n.cross(&bc);

    let (sin_theta, cos_theta) = bond_angle.sin_cos();
    let (sin_phi, cos_phi) = torsion.sin_cos();

    c + bc * (-bond_length * cos_theta)
        + m * (bond_length * sin_theta * cos_phi)
        + n * (bond_length * sin_theta * sin_phi)
}

/// Signed torsion angle `p0-p1-p2-p3` in radians, in `(-π, π]`.
pub fn dihedral_angle(
    p0: &Point3<f64>,
    p1: &Point3<f64>,
    p2: &Point3<f64>,
    p3: &Point3<f64>,
) -> f64 {
    let b0 = p0 - p1;
    let b1 = (p2 - p1).normalize();
    let b2 = p3 - p2;

    let v = b0 - b1 * b0.dot(&b1);
    let w = b2 - b1 * b2.dot(&b1);

    let x = v.dot(&w);
    let y = b1.cross(&v).dot(&w);
    y.atan2(x)
}

/// Angle `a-b-c` at vertex `b`, in radians.
pub fn bond_angle(a: &Point3<f64>, b: &Point3<f64>, c: &Point3<f64>) -> f64 {
    let ba = a - b;
    let bc = c - b;
    ba.angle(&bc)
}

/// Ideal CB position from the backbone N, CA and C atoms.
pub fn ideal_cb_position(
    n_pos: &Point3<f64>,
    ca_pos: &Point3<f64>,
    c_pos: &Point3<f64>,
) -> Point3<f64> {
    let b = ca_pos - n_pos;
    let c = c_pos - ca_pos;
    let a = b.cross(&c);
    ca_pos + a * -0.58273431 + b * 0.56802827 - c * 0.54067466
}

/// Wraps an angle into `(-π, π]`.
pub fn wrap_angle(angle: f64) -> f64 {
    let two_pi = std::f64::consts::TAU;
    let wrapped = (angle + std::f64::consts::PI).rem_euclid(two_pi) - std::f64::consts::PI;
    if wrapped <= -std::f64::consts::PI {
        wrapped + two_pi
    } else {
        wrapped
    }
}

/// Per-atom RMSD: mean squared distance over points, then the square root.
pub fn calculate_rmsd(coords1: &[Point3<f64>], coords2: &[Point3<f64>]) -> Option<f64> {
    if coords1.len() != coords2.len() || coords1.is_empty() {
        return None;
    }
    let n = coords1.len() as f64;
    let squared_dist_sum: f64 = coords1
        .iter()
        .zip(coords2.iter())
        .map(|(p1, p2)| (p1 - p2).norm_squared())
        .sum();
    Some((squared_dist_sum / n).sqrt())
}
