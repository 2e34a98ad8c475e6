use crate::{
    core::geo::LatLng,
    layers::base::{LayerProperties, LayerType},
    overlay::style::StyleHandle,
    prelude::HashMap,
};
use geo::Contains;
use geo_types::{Coord, LineString, Polygon};
use serde::{Deserialize, Serialize};

/// Serializable RGBA color
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SerializableColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl SerializableColor {
    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    pub const fn with_alpha(self, a: u8) -> Self {
        Self { a, ..self }
    }

    /// Parses `#RRGGBB` or `#RRGGBBAA`
    pub fn from_hex(hex: &str) -> Option<Self> {
        let digits = hex.strip_prefix('#').unwrap_or(hex);
        let channel = |i: usize| u8::from_str_radix(digits.get(i..i + 2)?, 16).ok();
        match digits.len() {
            6 => Some(Self::rgb(channel(0)?, channel(2)?, channel(4)?)),
            8 => Some(Self::new(channel(0)?, channel(2)?, channel(4)?, channel(6)?)),
            _ => None,
        }
    }
}

impl Default for SerializableColor {
    fn default() -> Self {
        Self::rgb(0, 0, 0)
    }
}

/// A filled area drawn on a polygon layer
#[derive(Debug, Clone, PartialEq)]
pub struct PolygonShape {
    pub id: String,
    pub item_id: String,
    pub polygon: Polygon<f64>,
    pub style: StyleHandle,
}

impl PolygonShape {
    /// Builds a shape from an ordered ring; the ring is closed if needed
    pub fn from_ring(id: String, item_id: String, ring: &[LatLng], style: StyleHandle) -> Self {
        let coords: Vec<Coord<f64>> = ring.iter().copied().map(Coord::from).collect();
        Self {
            id,
            item_id,
            polygon: Polygon::new(LineString::from(coords), Vec::new()),
            style,
        }
    }

    pub fn contains(&self, point: &LatLng) -> bool {
        self.polygon.contains(&geo_types::Point::new(point.lng, point.lat))
    }
}

/// Layer holding polygon shapes keyed by id
pub struct PolygonLayer {
    properties: LayerProperties,
    shapes: Vec<PolygonShape>,
    index: HashMap<String, usize>,
}

impl PolygonLayer {
    pub fn new(id: String, name: String, z_index: i32) -> Self {
        Self {
            properties: LayerProperties::new(id, name, LayerType::Polygon).with_z_index(z_index),
            shapes: Vec::new(),
            index: HashMap::default(),
        }
    }

    pub fn add_shapes(&mut self, shapes: Vec<PolygonShape>) -> Vec<String> {
        let mut created = Vec::with_capacity(shapes.len());
        for shape in shapes {
            created.push(shape.id.clone());
            match self.index.get(&shape.id) {
                Some(&slot) => self.shapes[slot] = shape,
                None => {
                    self.index.insert(shape.id.clone(), self.shapes.len());
                    self.shapes.push(shape);
                }
            }
        }
        created
    }

    pub fn get(&self, id: &str) -> Option<&PolygonShape> {
        self.index.get(id).map(|&slot| &self.shapes[slot])
    }

    pub fn shapes(&self) -> &[PolygonShape] {
        &self.shapes
    }

    /// Returns the last-drawn shape containing `point`
    pub fn shape_at(&self, point: &LatLng) -> Option<&PolygonShape> {
        self.shapes.iter().rev().find(|shape| shape.contains(point))
    }
}

crate::impl_layer_trait!(PolygonLayer, props: properties, shapes: shapes, index: index);
