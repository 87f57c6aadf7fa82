//! Serialized view of the arena sent in `NEW_STATE` messages.

use crate::{TrailState, VehicleState};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct WorldSnapshot {
    #[serde(rename = "BIKES")]
    pub bikes: Vec<BikeSnapshot>,
    #[serde(rename = "TRAILS")]
    pub trails: Vec<TrailSnapshot>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BikeSnapshot {
    #[serde(rename = "STATE")]
    pub state: VehicleState,
    #[serde(rename = "NAME")]
    pub name: String,
    #[serde(rename = "COLOUR")]
    pub colour: String,
    #[serde(rename = "X")]
    pub x: f64,
    #[serde(rename = "Y")]
    pub y: f64,
    #[serde(rename = "ROT")]
    pub rot: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrailSnapshot {
    #[serde(rename = "STATE")]
    pub state: TrailState,
    #[serde(rename = "COLOUR")]
    pub colour: String,
    #[serde(rename = "STARTX")]
    pub start_x: f64,
    #[serde(rename = "STARTY")]
    pub start_y: f64,
    #[serde(rename = "VERTS")]
    pub verts: Vec<VertexSnapshot>,
    #[serde(rename = "ENDX")]
    pub end_x: f64,
    #[serde(rename = "ENDY")]
    pub end_y: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VertexSnapshot {
    #[serde(rename = "X")]
    pub x: f64,
    #[serde(rename = "Y")]
    pub y: f64,
}

impl WorldSnapshot {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn from_json(text: &str) -> Result<WorldSnapshot, serde_json::Error> {
        serde_json::from_str(text)
    }
}
