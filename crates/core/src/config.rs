//! Session configuration, its schema, and the single update channel.
//!
//! [`FlowConfig`] is a statically declared schema. Whether the camera is part
//! of the session is a typed variant (`camera: Option<CameraConfig>`), not a
//! runtime probe for a key. A control surface mutates the configuration only
//! by sending [`ConfigUpdate`]s through a [`Controls`] handle; the simulation
//! drains the queue at the top of every tick, so a change always takes effect
//! at a tick boundary.

use crate::analysis::{AnalysisMode, KernelParams};
use crate::error::FlowError;
use crate::params::{param_bool, param_str, ParamSpec};
use crate::trail::{DecayCurve, PresentMode};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::sync::mpsc::{self, Receiver, Sender};

pub const PARTICLE_COUNT: ParamSpec = ParamSpec::integer(
    "particle_count",
    50_000.0,
    1.0,
    500_000.0,
    "Number of particles, fixed for the session",
);
pub const NOISE_SCALE: ParamSpec = ParamSpec::number(
    "noise_scale",
    0.007,
    0.001,
    0.01,
    "Spatial frequency of the noise flow",
);
pub const FLOW_SPEED: ParamSpec =
    ParamSpec::number("flow_speed", 20.0, 0.0, 40.0, "Displacement per tick per unit force");
pub const TRAIL_DECAY: ParamSpec = ParamSpec::number(
    "trail_decay",
    10.0,
    0.1,
    50.0,
    "How quickly trails fade; higher is shorter",
);
pub const PARTICLE_SIZE: ParamSpec =
    ParamSpec::number("particle_size", 2.0, 0.5, 5.0, "Rendered point size multiplier");
pub const CAMERA_INFLUENCE: ParamSpec = ParamSpec::number(
    "camera_influence",
    3.0,
    0.0,
    10.0,
    "Weight of the camera field relative to the noise flow",
);
pub const THRESHOLD: ParamSpec = ParamSpec::number(
    "threshold",
    0.1,
    0.0,
    1.0,
    "Vectors shorter than this are treated as sensor noise",
);
pub const EDGE_WIDTH: ParamSpec =
    ParamSpec::number("edge_width", 1.0, 0.5, 8.0, "Sobel neighbour distance in texels");
pub const ANALYSIS_WIDTH: ParamSpec = ParamSpec::integer(
    "analysis_width",
    80.0,
    8.0,
    640.0,
    "Analysis raster width, fixed for the session",
);
pub const ANALYSIS_HEIGHT: ParamSpec = ParamSpec::integer(
    "analysis_height",
    60.0,
    6.0,
    480.0,
    "Analysis raster height, fixed for the session",
);

/// Overlay glyph threshold when the session has no camera.
pub const DEFAULT_OVERLAY_THRESHOLD: f64 = 0.01;

/// Camera-related settings. Present only in camera-reactive sessions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CameraConfig {
    pub influence: f64,
    pub mode: AnalysisMode,
    pub threshold: f64,
    pub edge_width: f64,
    pub mirror: bool,
    pub analysis_width: usize,
    pub analysis_height: usize,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            influence: CAMERA_INFLUENCE.default,
            mode: AnalysisMode::Motion,
            threshold: THRESHOLD.default,
            edge_width: EDGE_WIDTH.default,
            mirror: true,
            analysis_width: ANALYSIS_WIDTH.default as usize,
            analysis_height: ANALYSIS_HEIGHT.default as usize,
        }
    }
}

impl CameraConfig {
    /// Extracts camera settings, falling back to defaults.
    pub fn from_json(params: &Value) -> Self {
        let mode = AnalysisMode::from_name(param_str(params, "analysis_mode", "motion"))
            .unwrap_or_default();
        Self {
            influence: CAMERA_INFLUENCE.extract(params),
            mode,
            threshold: THRESHOLD.extract(params),
            edge_width: EDGE_WIDTH.extract(params),
            mirror: param_bool(params, "mirror", true),
            analysis_width: ANALYSIS_WIDTH.extract(params) as usize,
            analysis_height: ANALYSIS_HEIGHT.extract(params) as usize,
        }
    }

    /// Uniforms for the analysis kernel.
    pub fn kernel_params(&self) -> KernelParams {
        KernelParams {
            mode: self.mode,
            threshold: self.threshold,
            edge_width: self.edge_width,
            mirror: self.mirror,
        }
    }
}

/// Full session configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowConfig {
    pub particle_count: usize,
    pub noise_scale: f64,
    pub flow_speed: f64,
    pub trail_decay: f64,
    pub decay_curve: DecayCurve,
    pub present: PresentMode,
    pub particle_size: f64,
    pub show_arrows: bool,
    pub camera: Option<CameraConfig>,
}

impl Default for FlowConfig {
    fn default() -> Self {
        Self {
            particle_count: PARTICLE_COUNT.default as usize,
            noise_scale: NOISE_SCALE.default,
            flow_speed: FLOW_SPEED.default,
            trail_decay: TRAIL_DECAY.default,
            decay_curve: DecayCurve::Fade,
            present: PresentMode::DoubleDecay,
            particle_size: PARTICLE_SIZE.default,
            show_arrows: false,
            camera: None,
        }
    }
}

impl FlowConfig {
    /// The default camera-reactive configuration.
    pub fn with_camera() -> Self {
        Self {
            camera: Some(CameraConfig::default()),
            ..Self::default()
        }
    }

    /// Builds a configuration from a JSON object, falling back to defaults
    /// for missing keys and clamping numbers into range.
    ///
    /// The camera variant is selected by a `"camera"` key holding either an
    /// object of camera settings or `true`.
    pub fn from_json(params: &Value) -> Self {
        let camera = match params.get("camera") {
            Some(Value::Bool(true)) => Some(CameraConfig::default()),
            Some(obj @ Value::Object(_)) => Some(CameraConfig::from_json(obj)),
            _ => None,
        };
        Self {
            particle_count: PARTICLE_COUNT.extract(params) as usize,
            noise_scale: NOISE_SCALE.extract(params),
            flow_speed: FLOW_SPEED.extract(params),
            trail_decay: TRAIL_DECAY.extract(params),
            decay_curve: DecayCurve::from_name(param_str(params, "decay_curve", "fade"))
                .unwrap_or_default(),
            present: PresentMode::from_name(param_str(params, "present", "double_decay"))
                .unwrap_or_default(),
            particle_size: PARTICLE_SIZE.extract(params),
            show_arrows: param_bool(params, "show_arrows", false),
            camera,
        }
    }

    /// Threshold below which overlay glyphs are suppressed.
    pub fn overlay_threshold(&self) -> f64 {
        self.camera
            .as_ref()
            .map_or(DEFAULT_OVERLAY_THRESHOLD, |c| c.threshold)
    }

    /// Current values as a flat JSON object keyed by parameter name.
    pub fn params(&self) -> Value {
        let mut out = json!({
            "particle_count": self.particle_count,
            "noise_scale": self.noise_scale,
            "flow_speed": self.flow_speed,
            "trail_decay": self.trail_decay,
            "decay_curve": self.decay_curve.name(),
            "present": self.present.name(),
            "particle_size": self.particle_size,
            "show_arrows": self.show_arrows,
        });
        if let (Some(cam), Some(map)) = (&self.camera, out.as_object_mut()) {
            map.insert("camera_influence".into(), json!(cam.influence));
            map.insert("analysis_mode".into(), json!(cam.mode.name()));
            map.insert("threshold".into(), json!(cam.threshold));
            map.insert("edge_width".into(), json!(cam.edge_width));
            map.insert("mirror".into(), json!(cam.mirror));
            map.insert("analysis_width".into(), json!(cam.analysis_width));
            map.insert("analysis_height".into(), json!(cam.analysis_height));
        }
        out
    }

    /// Schema of every parameter declared for this configuration's variant.
    pub fn param_schema(&self) -> Value {
        let mut schema = Map::new();
        for spec in [
            PARTICLE_COUNT,
            NOISE_SCALE,
            FLOW_SPEED,
            TRAIL_DECAY,
            PARTICLE_SIZE,
        ] {
            schema.insert(spec.name.into(), spec.schema());
        }
        schema.insert(
            "decay_curve".into(),
            choice_schema("fade", &["fade", "linear"], "Trail decay curve"),
        );
        schema.insert(
            "present".into(),
            choice_schema(
                "double_decay",
                &["double_decay", "direct"],
                "Decay again when presenting, or present the stored buffer",
            ),
        );
        schema.insert(
            "show_arrows".into(),
            json!({"type": "boolean", "default": false, "description": "Draw the vector field overlay"}),
        );
        if self.camera.is_some() {
            for spec in [
                CAMERA_INFLUENCE,
                THRESHOLD,
                EDGE_WIDTH,
                ANALYSIS_WIDTH,
                ANALYSIS_HEIGHT,
            ] {
                schema.insert(spec.name.into(), spec.schema());
            }
            schema.insert(
                "analysis_mode".into(),
                choice_schema("motion", &["motion", "edges"], "Camera analysis kernel"),
            );
            schema.insert(
                "mirror".into(),
                json!({"type": "boolean", "default": true, "description": "Mirror the camera horizontally"}),
            );
        }
        Value::Object(schema)
    }

    /// Validates and applies one update.
    ///
    /// Fails with `ReadOnlyParam` for session-fixed parameters,
    /// `ParamNotFound` for names not declared in this variant,
    /// `ParamTypeMismatch` for a value of the wrong kind and
    /// `ParamOutOfRange` for out-of-range numbers. On failure nothing changes.
    pub fn apply(&mut self, update: &ConfigUpdate) -> Result<(), FlowError> {
        let value = &update.value;
        match update.name.as_str() {
            "particle_count" | "analysis_width" | "analysis_height" => {
                Err(FlowError::ReadOnlyParam(update.name.clone()))
            }
            "noise_scale" => set_number(&mut self.noise_scale, NOISE_SCALE, value),
            "flow_speed" => set_number(&mut self.flow_speed, FLOW_SPEED, value),
            "trail_decay" => set_number(&mut self.trail_decay, TRAIL_DECAY, value),
            "particle_size" => set_number(&mut self.particle_size, PARTICLE_SIZE, value),
            "show_arrows" => set_bool(&mut self.show_arrows, "show_arrows", value),
            "decay_curve" => {
                self.decay_curve = parse_choice("decay_curve", value, DecayCurve::from_name)?;
                Ok(())
            }
            "present" => {
                self.present = parse_choice("present", value, PresentMode::from_name)?;
                Ok(())
            }
            name => {
                let Some(cam) = self.camera.as_mut() else {
                    return Err(FlowError::ParamNotFound(name.to_owned()));
                };
                match name {
                    "camera_influence" => set_number(&mut cam.influence, CAMERA_INFLUENCE, value),
                    "threshold" => set_number(&mut cam.threshold, THRESHOLD, value),
                    "edge_width" => set_number(&mut cam.edge_width, EDGE_WIDTH, value),
                    "mirror" => set_bool(&mut cam.mirror, "mirror", value),
                    "analysis_mode" => {
                        cam.mode = parse_choice("analysis_mode", value, AnalysisMode::from_name)?;
                        Ok(())
                    }
                    _ => Err(FlowError::ParamNotFound(name.to_owned())),
                }
            }
        }
    }
}

fn choice_schema(default: &str, options: &[&str], description: &str) -> Value {
    json!({
        "type": "string",
        "default": default,
        "options": options,
        "description": description,
    })
}

fn set_number(slot: &mut f64, spec: ParamSpec, value: &ParamValue) -> Result<(), FlowError> {
    match value {
        ParamValue::Number(v) => {
            *slot = spec.validate(*v)?;
            Ok(())
        }
        other => Err(mismatch(spec.name, "number", other)),
    }
}

fn set_bool(slot: &mut bool, name: &str, value: &ParamValue) -> Result<(), FlowError> {
    match value {
        ParamValue::Bool(b) => {
            *slot = *b;
            Ok(())
        }
        other => Err(mismatch(name, "bool", other)),
    }
}

fn parse_choice<T>(
    name: &str,
    value: &ParamValue,
    parse: impl Fn(&str) -> Option<T>,
) -> Result<T, FlowError> {
    match value {
        ParamValue::Text(s) => parse(s).ok_or_else(|| FlowError::ParamTypeMismatch {
            name: name.to_owned(),
            expected: "a declared option".into(),
            got: format!("'{s}'"),
        }),
        other => Err(mismatch(name, "string", other)),
    }
}

fn mismatch(name: &str, expected: &str, got: &ParamValue) -> FlowError {
    FlowError::ParamTypeMismatch {
        name: name.to_owned(),
        expected: expected.to_owned(),
        got: got.kind().to_owned(),
    }
}

/// A parameter value carried by an update.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    Number(f64),
    Bool(bool),
    Text(String),
}

impl ParamValue {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Number(_) => "number",
            Self::Bool(_) => "bool",
            Self::Text(_) => "string",
        }
    }

    /// Converts a JSON scalar. Arrays, objects and null have no counterpart.
    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::Number(n) => n.as_f64().map(Self::Number),
            Value::Bool(b) => Some(Self::Bool(*b)),
            Value::String(s) => Some(Self::Text(s.clone())),
            _ => None,
        }
    }
}

impl From<f64> for ParamValue {
    fn from(v: f64) -> Self {
        Self::Number(v)
    }
}

impl From<bool> for ParamValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<&str> for ParamValue {
    fn from(v: &str) -> Self {
        Self::Text(v.to_owned())
    }
}

/// A request to change one named parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigUpdate {
    pub name: String,
    pub value: ParamValue,
}

impl ConfigUpdate {
    pub fn new(name: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Sending half of the update channel, held by the control surface.
#[derive(Debug, Clone)]
pub struct Controls {
    tx: Sender<ConfigUpdate>,
}

/// Receiving half, drained by the simulation once per tick.
#[derive(Debug)]
pub struct UpdateQueue {
    rx: Receiver<ConfigUpdate>,
}

impl Controls {
    /// Creates a connected pair.
    pub fn channel() -> (Controls, UpdateQueue) {
        let (tx, rx) = mpsc::channel();
        (Controls { tx }, UpdateQueue { rx })
    }

    /// Queues an update for the next tick. Returns `false` once the session
    /// has ended.
    pub fn set(&self, name: impl Into<String>, value: impl Into<ParamValue>) -> bool {
        self.send(ConfigUpdate::new(name, value))
    }

    pub fn send(&self, update: ConfigUpdate) -> bool {
        self.tx.send(update).is_ok()
    }
}

impl UpdateQueue {
    /// Applies every queued update in arrival order. Rejected updates are
    /// logged and dropped. Returns the number applied.
    pub fn drain_into(&self, config: &mut FlowConfig) -> usize {
        let mut applied = 0;
        for update in self.rx.try_iter() {
            match config.apply(&update) {
                Ok(()) => applied += 1,
                Err(e) => log::warn!("rejected configuration update: {e}"),
            }
        }
        applied
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_declared_specs() {
        let c = FlowConfig::default();
        assert_eq!(c.particle_count, 50_000);
        assert!((c.noise_scale - 0.007).abs() < f64::EPSILON);
        assert!((c.flow_speed - 20.0).abs() < f64::EPSILON);
        assert!((c.trail_decay - 10.0).abs() < f64::EPSILON);
        assert_eq!(c.decay_curve, DecayCurve::Fade);
        assert_eq!(c.present, PresentMode::DoubleDecay);
        assert!(!c.show_arrows);
        assert!(c.camera.is_none());
    }

    #[test]
    fn camera_defaults() {
        let cam = FlowConfig::with_camera().camera.unwrap();
        assert!((cam.influence - 3.0).abs() < f64::EPSILON);
        assert!((cam.threshold - 0.1).abs() < f64::EPSILON);
        assert_eq!((cam.analysis_width, cam.analysis_height), (80, 60));
        assert!(cam.mirror);
        assert_eq!(cam.mode, AnalysisMode::Motion);
    }

    #[test]
    fn from_json_uses_defaults_for_empty_json() {
        assert_eq!(FlowConfig::from_json(&json!({})), FlowConfig::default());
    }

    #[test]
    fn from_json_extracts_and_clamps() {
        let c = FlowConfig::from_json(&json!({
            "particle_count": 1000,
            "flow_speed": 100.0,
            "decay_curve": "linear",
            "present": "direct",
            "show_arrows": true,
        }));
        assert_eq!(c.particle_count, 1000);
        assert!((c.flow_speed - 40.0).abs() < f64::EPSILON);
        assert_eq!(c.decay_curve, DecayCurve::Linear);
        assert_eq!(c.present, PresentMode::Direct);
        assert!(c.show_arrows);
    }

    #[test]
    fn from_json_camera_variant() {
        assert!(FlowConfig::from_json(&json!({"camera": false})).camera.is_none());
        assert_eq!(
            FlowConfig::from_json(&json!({"camera": true})).camera,
            Some(CameraConfig::default())
        );
        let cam = FlowConfig::from_json(&json!({
            "camera": {"camera_influence": 0.0, "analysis_mode": "edges", "mirror": false}
        }))
        .camera
        .unwrap();
        assert!(cam.influence.abs() < f64::EPSILON);
        assert_eq!(cam.mode, AnalysisMode::Edges);
        assert!(!cam.mirror);
    }

    #[test]
    fn schema_lists_camera_params_only_with_camera() {
        let plain = FlowConfig::default().param_schema();
        assert!(plain.get("flow_speed").is_some());
        assert!(plain.get("camera_influence").is_none());

        let cam = FlowConfig::with_camera().param_schema();
        for key in ["camera_influence", "threshold", "edge_width", "analysis_mode", "mirror"] {
            assert!(cam.get(key).is_some(), "missing {key}");
        }
        assert_eq!(cam["particle_count"]["type"], "integer");
        assert_eq!(cam["flow_speed"]["max"], 40.0);
    }

    #[test]
    fn params_reflect_current_values() {
        let mut c = FlowConfig::with_camera();
        c.flow_speed = 5.0;
        let p = c.params();
        assert_eq!(p["flow_speed"], 5.0);
        assert_eq!(p["analysis_mode"], "motion");
        assert!(FlowConfig::default().params().get("threshold").is_none());
    }

    #[test]
    fn apply_valid_updates() {
        let mut c = FlowConfig::with_camera();
        c.apply(&ConfigUpdate::new("flow_speed", 0.0)).unwrap();
        c.apply(&ConfigUpdate::new("show_arrows", true)).unwrap();
        c.apply(&ConfigUpdate::new("analysis_mode", "edges")).unwrap();
        c.apply(&ConfigUpdate::new("camera_influence", 0.5)).unwrap();
        assert!(c.flow_speed.abs() < f64::EPSILON);
        assert!(c.show_arrows);
        let cam = c.camera.unwrap();
        assert_eq!(cam.mode, AnalysisMode::Edges);
        assert!((cam.influence - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn apply_rejects_and_leaves_config_untouched() {
        let mut c = FlowConfig::default();
        let before = c.clone();
        assert!(matches!(
            c.apply(&ConfigUpdate::new("flow_speed", 41.0)),
            Err(FlowError::ParamOutOfRange { .. })
        ));
        assert!(matches!(
            c.apply(&ConfigUpdate::new("particle_count", 10.0)),
            Err(FlowError::ReadOnlyParam(_))
        ));
        assert!(matches!(
            c.apply(&ConfigUpdate::new("show_arrows", 1.0)),
            Err(FlowError::ParamTypeMismatch { .. })
        ));
        assert!(matches!(
            c.apply(&ConfigUpdate::new("present", "sometimes")),
            Err(FlowError::ParamTypeMismatch { .. })
        ));
        assert!(matches!(
            c.apply(&ConfigUpdate::new("camera_influence", 1.0)),
            Err(FlowError::ParamNotFound(_))
        ));
        assert!(matches!(
            c.apply(&ConfigUpdate::new("gravity", 1.0)),
            Err(FlowError::ParamNotFound(_))
        ));
        assert_eq!(c, before);
    }

    #[test]
    fn queue_applies_in_order_and_skips_rejected() {
        let (controls, queue) = Controls::channel();
        let mut c = FlowConfig::default();
        assert!(controls.set("flow_speed", 1.0));
        assert!(controls.set("flow_speed", 999.0));
        assert!(controls.set("flow_speed", 2.0));
        assert_eq!(queue.drain_into(&mut c), 2);
        assert!((c.flow_speed - 2.0).abs() < f64::EPSILON);
        assert_eq!(queue.drain_into(&mut c), 0);
    }

    #[test]
    fn controls_report_closed_session() {
        let (controls, queue) = Controls::channel();
        drop(queue);
        assert!(!controls.set("flow_speed", 1.0));
    }

    #[test]
    fn param_value_from_json_scalars() {
        assert_eq!(ParamValue::from_json(&json!(1.5)), Some(ParamValue::Number(1.5)));
        assert_eq!(ParamValue::from_json(&json!(true)), Some(ParamValue::Bool(true)));
        assert_eq!(
            ParamValue::from_json(&json!("edges")),
            Some(ParamValue::Text("edges".into()))
        );
        assert_eq!(ParamValue::from_json(&json!([1])), None);
    }

    #[test]
    fn config_serializes_through_serde() {
        let c = FlowConfig::with_camera();
        let text = serde_json::to_string(&c).unwrap();
        let back: FlowConfig = serde_json::from_str(&text).unwrap();
        assert_eq!(back, c);
    }
}
