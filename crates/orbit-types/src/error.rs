// ─────────────────────────────────────────────────────────────────────
// SCPN Orbit Tracing — Error
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TracingError {
    #[error("Unsupported tracing mode: {0}")]
    UnsupportedMode(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Numeric failure at t = {t}: {message}")]
    Numeric { t: f64, message: String },

    #[error("Field evaluator failure: {0}")]
    FieldEvaluator(String),
}

pub type TracingResult<T> = Result<T, TracingError>;
