//! Geometry command set.
//!
//! Each function takes the component it mutates explicitly. Validation happens
//! before the first engine call, so a rejected argument never leaves a
//! half-built object behind. A failure after a successful step does leave
//! that step in place: nothing here rolls back.

use uuid::Uuid;

use crate::engine::{
    Component, ConstructionPlane, CurveHandle, FeatureHandle, PlaneKind, Point3, SketchHandle,
};
use crate::error::{CommandError, CommandResult};

/// Index of the profile that [`extrude`] always uses.
pub const EXTRUDE_PROFILE_INDEX: usize = 0;

/// A sketch together with the name it ended up with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SketchRef {
    /// Engine handle.
    pub handle: SketchHandle,
    /// Sketch name.
    pub name: String,
}

/// Generates a sketch name that cannot collide with another generated name.
#[must_use]
pub fn generate_sketch_name() -> String {
    Uuid::new_v4().to_string()
}

/// Checks that a size argument is strictly positive.
///
/// # Errors
///
/// Returns a validation error naming `field` otherwise.
pub fn require_positive(field: &'static str, value: f64) -> CommandResult<()> {
    if value > 0.0 {
        Ok(())
    } else {
        Err(CommandError::validation(
            field,
            format!("must be greater than 0, got {value}"),
        ))
    }
}

/// Checks that a caller-supplied sketch name is usable and free.
///
/// # Errors
///
/// Returns a validation error for an empty name and
/// [`CommandError::DuplicateSketch`] for a taken one.
pub fn require_free_name(component: &dyn Component, name: &str) -> CommandResult<()> {
    if name.trim().is_empty() {
        return Err(CommandError::validation("name", "must not be empty"));
    }
    if crate::bridge::resolve::find_sketch(component, name).is_some() {
        return Err(CommandError::DuplicateSketch {
            name: name.to_string(),
        });
    }
    Ok(())
}

/// Creates a visible sketch on `plane`, named `name` or a generated id.
///
/// # Errors
///
/// Returns a validation error if `name` is empty or already used, and an
/// engine failure if the engine does not create or rename the sketch.
pub fn create_sketch(
    component: &mut dyn Component,
    plane: ConstructionPlane,
    name: Option<&str>,
) -> CommandResult<SketchRef> {
    if let Some(name) = name {
        require_free_name(component, name)?;
    }

    let handle = component
        .add_sketch(plane)
        .ok_or_else(|| CommandError::engine("create sketch"))?;

    let name = name.map_or_else(generate_sketch_name, ToString::to_string);
    if !component.set_sketch_name(handle, &name) {
        return Err(CommandError::engine("name sketch"));
    }
    component.set_sketch_visible(handle, true);

    tracing::debug!(sketch = %name, plane = %plane.kind, "Sketch created");
    Ok(SketchRef { handle, name })
}

/// Draws a circle into `sketch`.
///
/// # Errors
///
/// Returns a validation error for a non-positive radius (nothing is drawn)
/// and an engine failure if the engine rejects the curve.
pub fn add_circle_to_sketch(
    component: &mut dyn Component,
    sketch: SketchHandle,
    center: Point3,
    radius: f64,
) -> CommandResult<CurveHandle> {
    require_positive("radius", radius)?;
    component
        .add_circle(sketch, center, radius)
        .ok_or_else(|| CommandError::engine("create sketch circle"))
}

/// Draws a two-point rectangle spanning `p1`..`p2` into `sketch`.
///
/// # Errors
///
/// Returns an engine failure if the engine rejects the curve.
pub fn add_rectangle_to_sketch(
    component: &mut dyn Component,
    sketch: SketchHandle,
    p1: Point3,
    p2: Point3,
) -> CommandResult<CurveHandle> {
    component
        .add_two_point_rectangle(sketch, p1, p2)
        .ok_or_else(|| CommandError::engine("create sketch rectangle"))
}

/// Extrudes the first profile of `sketch` into a new body.
///
/// The sign of `distance` picks the direction. Zero is passed through.
///
/// # Errors
///
/// Returns [`CommandError::ProfileNotFound`] if the sketch has no profile and
/// an engine failure if the extrusion yields no feature.
pub fn extrude(
    component: &mut dyn Component,
    sketch: SketchHandle,
    distance: f64,
) -> CommandResult<FeatureHandle> {
    let profile = component
        .profile(sketch, EXTRUDE_PROFILE_INDEX)
        .ok_or_else(|| CommandError::ProfileNotFound {
            sketch: component.sketch_name(sketch).unwrap_or_default().to_string(),
            index: EXTRUDE_PROFILE_INDEX,
        })?;

    let feature = component
        .extrude_new_body(profile, distance)
        .ok_or_else(|| CommandError::engine("extrude the profile"))?;

    tracing::debug!(distance, bodies = component.body_count(), "Profile extruded");
    Ok(feature)
}

/// Creates a cylinder: an XY sketch with one circle, extruded by `height`.
///
/// # Errors
///
/// Returns a validation error for a non-positive radius or height before
/// anything is created, or the first error of the composed steps.
pub fn create_cylinder(
    component: &mut dyn Component,
    center: Point3,
    radius: f64,
    height: f64,
) -> CommandResult<SketchRef> {
    require_positive("radius", radius)?;
    require_positive("height", height)?;

    let plane = component.construction_plane(PlaneKind::Xy);
    let sketch = create_sketch(component, plane, None)?;
    add_circle_to_sketch(component, sketch.handle, center, radius)?;
    extrude(component, sketch.handle, height)?;

    Ok(sketch)
}
