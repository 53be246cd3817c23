//! Collision response: inelastic impulses.
//!
//! For an analysed continuous-time collision with contact coefficients
//! `c_i` (see [`Coordinates::coefficients`]) the impulse that removes the
//! approaching normal velocity is
//!
//! ```text
//! J = −v_rel · n / Σ c_i² m_i⁻¹
//! ```
//!
//! and vertex `i` receives `Δv_i = c_i m_i⁻¹ J`. Fixed vertices have zero
//! inverse mass and never move.
//!
//! [`Coordinates::coefficients`]: crate::collision::Coordinates::coefficients

use weft_math::Vec3;
use weft_types::{WeftError, WeftResult};

use crate::collision::{ContinuousCollision, Impact};
use crate::geometry::{GeometryQuery, VelocityChange};

fn analysed(record: &ContinuousCollision) -> WeftResult<&Impact> {
    record.impact().ok_or(WeftError::NotAnalysed)
}

/// `Σ c_i² m_i⁻¹` over the participating points.
fn effective_inverse_mass<G: GeometryQuery + ?Sized>(
    record: &ContinuousCollision,
    impact: &Impact,
    geometry: &G,
) -> f64 {
    record
        .pair
        .vertices()
        .iter()
        .zip(impact.coords.coefficients())
        .map(|(&v, c)| c * c * geometry.inverse_mass(v))
        .sum()
}

/// Impulse that cancels the approaching normal velocity of an analysed collision.
///
/// Errors: [`WeftError::NotAnalysed`] for an unanalysed record,
/// [`WeftError::InvalidArgument`] when no participant can move.
pub fn compute_impulse<G: GeometryQuery + ?Sized>(
    record: &ContinuousCollision,
    geometry: &G,
) -> WeftResult<Vec3> {
    let impact = analysed(record)?;
    let denominator = effective_inverse_mass(record, impact, geometry);
    if !(denominator > 0.0) {
        return Err(WeftError::InvalidArgument(format!(
            "every point of {:?} is immovable",
            record.pair
        )));
    }
    Ok(impact.normal * (-impact.relative_velocity / denominator))
}

/// Per-vertex velocity corrections for an analysed collision.
///
/// The vertex / edge B side is pushed along the normal and the face /
/// edge A side against it. Fixed vertices receive no change.
pub fn velocity_changes<G: GeometryQuery + ?Sized>(
    record: &ContinuousCollision,
    geometry: &G,
) -> WeftResult<Vec<VelocityChange>> {
    let impulse = compute_impulse(record, geometry)?;
    let impact = analysed(record)?;

    Ok(record
        .pair
        .vertices()
        .iter()
        .zip(impact.coords.coefficients())
        .filter_map(|(&vertex, c)| {
            let inv_mass = geometry.inverse_mass(vertex);
            (inv_mass > 0.0 && c != 0.0).then(|| VelocityChange {
                vertex,
                delta: impulse * (c * inv_mass),
            })
        })
        .collect())
}

/// Current normal relative velocity of the contact points of an analysed
/// collision, using the stored normal and coordinates.
pub fn relative_normal_velocity<G: GeometryQuery + ?Sized>(
    record: &ContinuousCollision,
    geometry: &G,
) -> WeftResult<f64> {
    let impact = analysed(record)?;
    Ok(record
        .pair
        .vertices()
        .iter()
        .zip(impact.coords.coefficients())
        .map(|(&v, c)| c * geometry.velocity(v).dot(impact.normal))
        .sum())
}
