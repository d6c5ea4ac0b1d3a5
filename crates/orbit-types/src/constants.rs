// ─────────────────────────────────────────────────────────────────────
// SCPN Orbit Tracing — Constants
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
/// Elementary charge (C)
pub const Q_ELEMENTARY: f64 = 1.602176634e-19;

/// Proton mass (kg)
pub const M_PROTON: f64 = 1.67262192369e-27;

/// Deuterium mass (kg)
pub const M_DEUTERIUM: f64 = 3.3435837724e-27;

/// Alpha particle mass (kg)
pub const M_ALPHA: f64 = 6.6446573357e-27;

/// Fusion-born alpha kinetic energy (J) - 3.5 MeV
pub const E_ALPHA_BORN: f64 = 3.5e6 * Q_ELEMENTARY;
