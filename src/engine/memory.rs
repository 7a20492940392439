//! In-memory reference engine.
//!
//! Keeps just enough of a design tree to exercise the bridge: named sketches
//! with their curves, the closed profiles those curves form, and the bodies
//! created by extrusion. No real geometry kernel is involved.

use super::{
    Component, ConstructionPlane, CurveHandle, Design, FeatureHandle, Host, PlaneKind, Point3,
    ProfileHandle, SketchHandle,
};

/// A curve drawn in a sketch.
#[derive(Debug, Clone, PartialEq)]
pub enum Curve {
    /// Circle by centre and radius.
    Circle {
        /// Centre point.
        center: Point3,
        /// Radius.
        radius: f64,
    },
    /// Axis-aligned rectangle by two opposite corners.
    Rectangle {
        /// First corner.
        p1: Point3,
        /// Opposite corner.
        p2: Point3,
    },
}

impl Curve {
    /// Area enclosed by the curve, or `None` if it does not close a region.
    fn enclosed_area(&self) -> Option<f64> {
        let area = match self {
            Self::Circle { radius, .. } => std::f64::consts::PI * radius * radius,
            Self::Rectangle { p1, p2 } => ((p2.x - p1.x) * (p2.y - p1.y)).abs(),
        };
        let closes = match self {
            Self::Circle { radius, .. } => *radius > 0.0,
            Self::Rectangle { .. } => area > 0.0,
        };
        closes.then_some(area)
    }
}

/// A sketch as stored by the memory engine.
#[derive(Debug, Clone)]
pub struct SketchRecord {
    /// Sketch name.
    pub name: String,
    /// Plane the sketch is attached to.
    pub plane: PlaneKind,
    /// Visibility flag.
    pub visible: bool,
    /// Curves in drawing order.
    pub curves: Vec<Curve>,
}

impl SketchRecord {
    /// Areas of the closed profiles, in drawing order.
    #[must_use]
    pub fn profile_areas(&self) -> Vec<f64> {
        self.curves.iter().filter_map(Curve::enclosed_area).collect()
    }
}

/// A solid body created by extrusion.
#[derive(Debug, Clone)]
pub struct Body {
    /// Body name, `Body<N>`.
    pub name: String,
    /// Name of the sketch the profile came from.
    pub sketch: String,
    /// Signed extrusion distance.
    pub distance: f64,
    /// Enclosed volume.
    pub volume: f64,
}

/// Root component of a [`MemoryDesign`].
#[derive(Debug, Default)]
pub struct MemoryComponent {
    sketches: Vec<SketchRecord>,
    bodies: Vec<Body>,
}

impl MemoryComponent {
    /// Returns the stored sketches.
    #[must_use]
    pub fn sketch_records(&self) -> &[SketchRecord] {
        &self.sketches
    }

    /// Returns the stored bodies.
    #[must_use]
    pub fn bodies(&self) -> &[Body] {
        &self.bodies
    }

    fn record_mut(&mut self, sketch: SketchHandle) -> Option<&mut SketchRecord> {
        self.sketches.get_mut(sketch.0)
    }

    fn push_curve(&mut self, sketch: SketchHandle, curve: Curve) -> Option<CurveHandle> {
        let record = self.record_mut(sketch)?;
        record.curves.push(curve);
        Some(CurveHandle {
            sketch,
            index: record.curves.len() - 1,
        })
    }
}

impl Component for MemoryComponent {
    fn construction_plane(&self, kind: PlaneKind) -> ConstructionPlane {
        ConstructionPlane { kind }
    }

    fn add_sketch(&mut self, plane: ConstructionPlane) -> Option<SketchHandle> {
        let index = self.sketches.len();
        self.sketches.push(SketchRecord {
            name: format!("Sketch{}", index + 1),
            plane: plane.kind,
            visible: true,
            curves: Vec::new(),
        });
        Some(SketchHandle(index))
    }

    fn sketches(&self) -> Vec<SketchHandle> {
        (0..self.sketches.len()).map(SketchHandle).collect()
    }

    fn sketch_name(&self, sketch: SketchHandle) -> Option<&str> {
        self.sketches.get(sketch.0).map(|s| s.name.as_str())
    }

    fn set_sketch_name(&mut self, sketch: SketchHandle, name: &str) -> bool {
        let Some(record) = self.record_mut(sketch) else {
            return false;
        };
        record.name = name.to_string();
        true
    }

    fn set_sketch_visible(&mut self, sketch: SketchHandle, visible: bool) {
        if let Some(record) = self.record_mut(sketch) {
            record.visible = visible;
        }
    }

    fn add_circle(
        &mut self,
        sketch: SketchHandle,
        center: Point3,
        radius: f64,
    ) -> Option<CurveHandle> {
        self.push_curve(sketch, Curve::Circle { center, radius })
    }

    fn add_two_point_rectangle(
        &mut self,
        sketch: SketchHandle,
        p1: Point3,
        p2: Point3,
    ) -> Option<CurveHandle> {
        self.push_curve(sketch, Curve::Rectangle { p1, p2 })
    }

    fn profile(&self, sketch: SketchHandle, index: usize) -> Option<ProfileHandle> {
        let record = self.sketches.get(sketch.0)?;
        (index < record.profile_areas().len()).then_some(ProfileHandle { sketch, index })
    }

    fn extrude_new_body(
        &mut self,
        profile: ProfileHandle,
        distance: f64,
    ) -> Option<FeatureHandle> {
        let record = self.sketches.get(profile.sketch.0)?;
        let area = *record.profile_areas().get(profile.index)?;
        let body = Body {
            name: format!("Body{}", self.bodies.len() + 1),
            sketch: record.name.clone(),
            distance,
            volume: area * distance.abs(),
        };
        self.bodies.push(body);
        Some(FeatureHandle(self.bodies.len() - 1))
    }

    fn body_count(&self) -> usize {
        self.bodies.len()
    }
}

/// An open in-memory design.
#[derive(Debug, Default)]
pub struct MemoryDesign {
    root: MemoryComponent,
}

impl MemoryDesign {
    /// Creates an empty design.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the root component for inspection.
    #[must_use]
    pub const fn root(&self) -> &MemoryComponent {
        &self.root
    }
}

impl Design for MemoryDesign {
    fn root_component(&mut self) -> &mut dyn Component {
        &mut self.root
    }
}

/// An application host that may or may not have a design open.
#[derive(Debug, Default)]
pub struct MemoryHost {
    design: Option<MemoryDesign>,
}

impl MemoryHost {
    /// Creates a host with one empty design open.
    #[must_use]
    pub fn with_empty_design() -> Self {
        Self {
            design: Some(MemoryDesign::new()),
        }
    }

    /// Creates a host with no design open.
    #[must_use]
    pub fn without_design() -> Self {
        Self { design: None }
    }

    /// Returns the open design for inspection.
    #[must_use]
    pub const fn design(&self) -> Option<&MemoryDesign> {
        self.design.as_ref()
    }
}

impl Host for MemoryHost {
    fn active_design(&mut self) -> Option<&mut dyn Design> {
        self.design.as_mut().map(|d| d as &mut dyn Design)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn xy(component: &MemoryComponent) -> ConstructionPlane {
        component.construction_plane(PlaneKind::Xy)
    }

    #[test]
    fn new_sketch_has_default_name_and_is_visible() {
        let mut component = MemoryComponent::default();
        let plane = xy(&component);
        let sketch = component.add_sketch(plane).unwrap();

        assert_eq!(component.sketch_name(sketch), Some("Sketch1"));
        assert!(component.sketch_records()[0].visible);
        assert_eq!(component.sketch_records()[0].plane, PlaneKind::Xy);
    }

    #[test]
    fn empty_sketch_has_no_profile() {
        let mut component = MemoryComponent::default();
        let plane = xy(&component);
        let sketch = component.add_sketch(plane).unwrap();

        assert!(component.profile(sketch, 0).is_none());
    }

    #[test]
    fn degenerate_rectangle_has_no_profile() {
        let mut component = MemoryComponent::default();
        let plane = xy(&component);
        let sketch = component.add_sketch(plane).unwrap();
        component
            .add_two_point_rectangle(sketch, Point3::new(1.0, 1.0, 0.0), Point3::new(1.0, 4.0, 0.0))
            .unwrap();

        assert!(component.profile(sketch, 0).is_none());
    }

    #[test]
    fn extrude_records_body_volume() {
        let mut component = MemoryComponent::default();
        let plane = xy(&component);
        let sketch = component.add_sketch(plane).unwrap();
        component
            .add_two_point_rectangle(sketch, Point3::new(0.0, 0.0, 0.0), Point3::new(2.0, 3.0, 0.0))
            .unwrap();
        let profile = component.profile(sketch, 0).unwrap();

        component.extrude_new_body(profile, -4.0).unwrap();

        assert_eq!(component.body_count(), 1);
        let body = &component.bodies()[0];
        assert_eq!(body.name, "Body1");
        assert_eq!(body.sketch, "Sketch1");
        assert!((body.distance + 4.0).abs() < f64::EPSILON);
        assert!((body.volume - 24.0).abs() < 1e-9);
    }

    #[test]
    fn host_without_design() {
        let mut host = MemoryHost::without_design();
        assert!(host.active_design().is_none());

        let mut host = MemoryHost::with_empty_design();
        assert!(host.active_design().is_some());
    }
}
