use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::FingerprintError;

/// Identity tag every kogin pattern-data block carries.
pub const PATTERN_APPLICATION: &str = "kogin";

/// Pattern data embedded in a kogin SVG file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatternDocument {
    pub application: String,
    #[serde(default)]
    pub defs: Value,
    #[serde(default)]
    pub pivots: Value,
    pub data: Vec<PatternNode>,
    pub bbox: BoundingBox,
}

impl PatternDocument {
    pub fn from_json(raw: &str) -> Result<Self, FingerprintError> {
        let document = serde_json::from_str::<PatternDocument>(raw)?;
        document.ensure_pattern_data()?;
        Ok(document)
    }

    pub fn ensure_pattern_data(&self) -> Result<(), FingerprintError> {
        if self.application == PATTERN_APPLICATION {
            return Ok(());
        }
        Err(FingerprintError::NotPatternData(self.application.clone()))
    }

    pub fn has_pivots(&self) -> bool {
        match &self.pivots {
            Value::Null => false,
            Value::Array(items) => !items.is_empty(),
            Value::Object(map) => !map.is_empty(),
            _ => true,
        }
    }
}

/// A layer, group or stitch placement in the pattern tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawNode", into = "RawNode")]
pub enum PatternNode {
    /// One stitch definition placed at every listed coordinate.
    Leaf {
        reference: String,
        coords: Vec<Vec<i64>>,
    },
    /// Translated container of further nodes.
    Group {
        x: i64,
        y: i64,
        children: Vec<PatternNode>,
        layer: bool,
        name: Option<String>,
        visible: bool,
    },
}

impl PatternNode {
    pub fn leaf(reference: impl Into<String>, coords: &[(i64, i64)]) -> Self {
        PatternNode::Leaf {
            reference: reference.into(),
            coords: coords.iter().map(|&(x, y)| vec![x, y]).collect(),
        }
    }

    pub fn group(x: i64, y: i64, children: Vec<PatternNode>) -> Self {
        PatternNode::Group {
            x,
            y,
            children,
            layer: false,
            name: None,
            visible: true,
        }
    }

    pub fn layer(name: impl Into<String>, children: Vec<PatternNode>) -> Self {
        PatternNode::Group {
            x: 0,
            y: 0,
            children,
            layer: true,
            name: Some(name.into()),
            visible: true,
        }
    }
}

// Wire shape of a node: leaves carry `ref`, groups carry `children`.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct RawNode {
    #[serde(rename = "ref", default, skip_serializing_if = "Option::is_none")]
    reference: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    coords: Option<Vec<Vec<i64>>>,
    #[serde(default, skip_serializing_if = "is_zero")]
    x: i64,
    #[serde(default, skip_serializing_if = "is_zero")]
    y: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    children: Option<Vec<PatternNode>>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    layer: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    #[serde(default = "default_visible")]
    visible: bool,
}

fn default_visible() -> bool {
    true
}

fn is_zero(value: &i64) -> bool {
    *value == 0
}

impl From<RawNode> for PatternNode {
    fn from(raw: RawNode) -> Self {
        // An empty `ref` marks no stitch definition; the node is read as a
        // group and contributes only its children.
        match raw.reference.filter(|reference| !reference.is_empty()) {
            Some(reference) => PatternNode::Leaf {
                reference,
                coords: raw.coords.unwrap_or_default(),
            },
            None => PatternNode::Group {
                x: raw.x,
                y: raw.y,
                children: raw.children.unwrap_or_default(),
                layer: raw.layer,
                name: raw.name,
                visible: raw.visible,
            },
        }
    }
}

impl From<PatternNode> for RawNode {
    fn from(node: PatternNode) -> Self {
        match node {
            PatternNode::Leaf { reference, coords } => RawNode {
                reference: Some(reference),
                coords: Some(coords),
                x: 0,
                y: 0,
                children: None,
                layer: false,
                name: None,
                visible: true,
            },
            PatternNode::Group {
                x,
                y,
                children,
                layer,
                name,
                visible,
            } => RawNode {
                reference: None,
                coords: None,
                x,
                y,
                children: Some(children),
                layer,
                name,
                visible,
            },
        }
    }
}

/// Pattern extent in grid units, serialized as `[left, top, width, height]`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "[i64; 4]", into = "[i64; 4]")]
pub struct BoundingBox {
    pub left: i64,
    pub top: i64,
    pub width: i64,
    pub height: i64,
}

impl BoundingBox {
    pub fn new(left: i64, top: i64, width: i64, height: i64) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }

    pub fn translated(self, dx: i64, dy: i64) -> Self {
        Self {
            left: self.left + dx,
            top: self.top + dy,
            ..self
        }
    }
}

impl From<[i64; 4]> for BoundingBox {
    fn from([left, top, width, height]: [i64; 4]) -> Self {
        Self::new(left, top, width, height)
    }
}

impl From<BoundingBox> for [i64; 4] {
    fn from(bbox: BoundingBox) -> Self {
        [bbox.left, bbox.top, bbox.width, bbox.height]
    }
}

/// Longest stitch a reference may name; stitch ends are computed in `i64`.
pub const MAX_STITCH_LENGTH: usize = i64::MAX as usize;

/// Parsed `"<length>-<color>"` stitch definition reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StitchRef {
    pub length: usize,
    pub color: String,
}

impl StitchRef {
    pub fn parse(reference: &str) -> Result<Self, FingerprintError> {
        let invalid = |reason: String| FingerprintError::InvalidReference {
            reference: reference.to_string(),
            reason,
        };

        let (length, color) = reference
            .split_once('-')
            .ok_or_else(|| invalid("missing color tag".to_string()))?;
        let length = length
            .trim()
            .parse::<usize>()
            .map_err(|err| invalid(format!("length is not a non-negative integer: {err}")))?;
        if length > MAX_STITCH_LENGTH {
            return Err(invalid(format!(
                "length exceeds the largest grid span ({MAX_STITCH_LENGTH})"
            )));
        }

        Ok(Self {
            length,
            color: color.to_string(),
        })
    }
}
