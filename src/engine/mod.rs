//! The CAD engine seam.
//!
//! The solid-modelling kernel belongs to the host application. This module
//! only describes the surface the bridge drives: an application that may have
//! an open [`Design`], whose root [`Component`] owns sketches and features.
//!
//! None of these handles are assumed to be thread-safe. The dispatch layer
//! guarantees that a [`Host`] is only ever touched from one execution context.
//!
//! [`MemoryHost`] is an in-memory implementation used by the standalone
//! server binary and the tests.

mod memory;

pub use memory::{Body, Curve, MemoryComponent, MemoryDesign, MemoryHost, SketchRecord};

use std::fmt;

use serde::{Deserialize, Serialize};

/// A point in model or sketch space, in centimetres.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point3 {
    /// X coordinate.
    pub x: f64,
    /// Y coordinate.
    pub y: f64,
    /// Z coordinate.
    pub z: f64,
}

impl Point3 {
    /// Creates a new point.
    #[must_use]
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }
}

/// The three fixed construction planes every component has.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaneKind {
    /// The XY plane.
    Xy,
    /// The YZ plane.
    Yz,
    /// The XZ plane.
    Xz,
}

impl PlaneKind {
    /// All planes, in canonical order.
    pub const ALL: [Self; 3] = [Self::Xy, Self::Yz, Self::Xz];

    /// Returns the lowercase wire name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Xy => "xy",
            Self::Yz => "yz",
            Self::Xz => "xz",
        }
    }
}

impl fmt::Display for PlaneKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A construction plane belonging to a specific component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConstructionPlane {
    /// Which of the fixed planes this is.
    pub kind: PlaneKind,
}

/// Opaque reference to a sketch in a component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SketchHandle(pub usize);

/// Opaque reference to a curve in a sketch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CurveHandle {
    /// Owning sketch.
    pub sketch: SketchHandle,
    /// Position of the curve in the sketch.
    pub index: usize,
}

/// Opaque reference to a closed profile of a sketch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProfileHandle {
    /// Owning sketch.
    pub sketch: SketchHandle,
    /// Position of the profile in the sketch.
    pub index: usize,
}

/// Opaque reference to a solid feature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FeatureHandle(pub usize);

/// A node of the design tree that owns sketches and features.
///
/// Creation methods return `None` when the engine yields no object; the
/// command layer reports that as an engine failure.
pub trait Component {
    /// Returns the component's construction plane of the given kind.
    fn construction_plane(&self, kind: PlaneKind) -> ConstructionPlane;

    /// Adds an empty sketch attached to `plane`.
    fn add_sketch(&mut self, plane: ConstructionPlane) -> Option<SketchHandle>;

    /// Returns the current sketches, in creation order.
    fn sketches(&self) -> Vec<SketchHandle>;

    /// Returns the name of a sketch.
    fn sketch_name(&self, sketch: SketchHandle) -> Option<&str>;

    /// Renames a sketch. Returns `false` if the sketch does not exist.
    fn set_sketch_name(&mut self, sketch: SketchHandle, name: &str) -> bool;

    /// Shows or hides a sketch.
    fn set_sketch_visible(&mut self, sketch: SketchHandle, visible: bool);

    /// Draws a circle of `radius` around `center`.
    fn add_circle(&mut self, sketch: SketchHandle, center: Point3, radius: f64)
        -> Option<CurveHandle>;

    /// Draws an axis-aligned rectangle with opposite corners `p1` and `p2`.
    fn add_two_point_rectangle(
        &mut self,
        sketch: SketchHandle,
        p1: Point3,
        p2: Point3,
    ) -> Option<CurveHandle>;

    /// Returns the profile at `index`, if the sketch has that many.
    fn profile(&self, sketch: SketchHandle, index: usize) -> Option<ProfileHandle>;

    /// Extrudes `profile` one-sided by `distance` into a new body.
    fn extrude_new_body(&mut self, profile: ProfileHandle, distance: f64)
        -> Option<FeatureHandle>;

    /// Returns the number of solid bodies in the component.
    fn body_count(&self) -> usize;
}

/// An open design document.
pub trait Design {
    /// Returns the root component of the design.
    fn root_component(&mut self) -> &mut dyn Component;
}

/// The host application that owns the design session.
pub trait Host {
    /// Returns the active design, or `None` if no design is open.
    fn active_design(&mut self) -> Option<&mut dyn Design>;
}
