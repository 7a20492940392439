//! Maps symbolic names from the wire to live objects of the active component.

use crate::engine::{Component, ConstructionPlane, PlaneKind, SketchHandle};
use crate::error::{CommandError, CommandResult};

/// Parses a plane name, ignoring case and surrounding whitespace.
///
/// # Errors
///
/// Returns [`CommandError::InvalidPlane`] for anything but xy, yz or xz.
pub fn parse_plane(name: &str) -> CommandResult<PlaneKind> {
    let normalised = name.trim().to_ascii_lowercase();
    PlaneKind::ALL
        .into_iter()
        .find(|kind| kind.as_str() == normalised)
        .ok_or_else(|| CommandError::InvalidPlane {
            name: name.to_string(),
        })
}

/// Resolves a plane name to the component's construction plane.
///
/// # Errors
///
/// Returns [`CommandError::InvalidPlane`] for an unknown plane name.
pub fn resolve_plane(component: &dyn Component, name: &str) -> CommandResult<ConstructionPlane> {
    let kind = parse_plane(name)?;
    Ok(component.construction_plane(kind))
}

/// Finds a sketch of the component by exact name.
///
/// # Errors
///
/// Returns [`CommandError::SketchNotFound`] if no sketch has that name.
pub fn resolve_sketch(component: &dyn Component, name: &str) -> CommandResult<SketchHandle> {
    find_sketch(component, name).ok_or_else(|| CommandError::SketchNotFound {
        name: name.to_string(),
    })
}

/// Finds a sketch of the component by exact name, if present.
#[must_use]
pub fn find_sketch(component: &dyn Component, name: &str) -> Option<SketchHandle> {
    component
        .sketches()
        .into_iter()
        .find(|&sketch| component.sketch_name(sketch) == Some(name))
}
