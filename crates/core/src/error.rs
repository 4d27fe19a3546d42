//! Error types for the flowtrail core.

use thiserror::Error;

/// Errors produced by core operations.
///
/// Sampling outside the analysis raster and running without a video source
/// are expected steady states, not errors; they yield zero vectors instead.
#[derive(Debug, Error)]
pub enum FlowError {
    /// Width or height was zero when creating a raster or buffer.
    #[error("invalid dimensions: width and height must be non-zero")]
    InvalidDimensions,

    /// Two rasters or buffers had incompatible dimensions.
    #[error("dimension mismatch: ({lhs_w}, {lhs_h}) vs ({rhs_w}, {rhs_h})")]
    DimensionMismatch {
        lhs_w: usize,
        lhs_h: usize,
        rhs_w: usize,
        rhs_h: usize,
    },

    /// A configuration update named a parameter that is not declared.
    #[error("parameter not found: {0}")]
    ParamNotFound(String),

    /// A parameter update carried a value of the wrong kind.
    #[error("parameter type mismatch for '{name}': expected {expected}, got {got}")]
    ParamTypeMismatch {
        name: String,
        expected: String,
        got: String,
    },

    /// A numeric parameter update fell outside its declared range.
    #[error("parameter '{name}' = {value} outside valid range [{min}, {max}]")]
    ParamOutOfRange {
        name: String,
        value: f64,
        min: f64,
        max: f64,
    },

    /// The parameter is fixed for the session and cannot be updated.
    #[error("parameter '{0}' is fixed for the session")]
    ReadOnlyParam(String),

    /// The video source could not be acquired (permission denied, no device).
    #[error("video source unavailable: {0}")]
    SourceUnavailable(String),

    /// A GPU call failed (resource creation, incomplete framebuffer, readback).
    #[error("gpu error: {0}")]
    Gpu(String),

    /// A scene name was not recognized by the scene registry.
    #[error("unknown scene: {0}")]
    UnknownScene(String),

    /// A file could not be written.
    #[error("i/o error: {0}")]
    Io(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_dimensions_displays_readable_message() {
        let msg = FlowError::InvalidDimensions.to_string();
        assert!(
            msg.contains("width") && msg.contains("height"),
            "expected message mentioning width and height, got: {msg}"
        );
    }

    #[test]
    fn param_out_of_range_includes_name_value_and_bounds() {
        let err = FlowError::ParamOutOfRange {
            name: "flow_speed".into(),
            value: 99.0,
            min: 0.0,
            max: 40.0,
        };
        let msg = err.to_string();
        assert!(msg.contains("flow_speed"), "missing name in: {msg}");
        assert!(msg.contains("99"), "missing value in: {msg}");
        assert!(msg.contains("40"), "missing max in: {msg}");
    }

    #[test]
    fn param_type_mismatch_includes_all_fields() {
        let err = FlowError::ParamTypeMismatch {
            name: "show_arrows".into(),
            expected: "bool".into(),
            got: "number".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("show_arrows"), "missing name in: {msg}");
        assert!(msg.contains("bool"), "missing expected in: {msg}");
        assert!(msg.contains("number"), "missing got in: {msg}");
    }

    #[test]
    fn dimension_mismatch_includes_all_dimensions() {
        let err = FlowError::DimensionMismatch {
            lhs_w: 80,
            lhs_h: 60,
            rhs_w: 640,
            rhs_h: 480,
        };
        let msg = err.to_string();
        for part in ["80", "60", "640", "480"] {
            assert!(msg.contains(part), "missing {part} in: {msg}");
        }
    }

    #[test]
    fn source_unavailable_includes_reason() {
        let msg = FlowError::SourceUnavailable("permission denied".into()).to_string();
        assert!(msg.contains("permission denied"), "missing reason in: {msg}");
    }

    #[test]
    fn read_only_param_names_parameter() {
        let msg = FlowError::ReadOnlyParam("particle_count".into()).to_string();
        assert!(msg.contains("particle_count"), "missing name in: {msg}");
    }

    #[test]
    fn flow_error_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<FlowError>();
    }

    #[test]
    fn flow_error_implements_std_error() {
        fn assert_std_error<T: std::error::Error>() {}
        assert_std_error::<FlowError>();
    }
}
