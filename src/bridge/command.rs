//! The fixed method table as a typed request union.
//!
//! A wire call (method name + positional arguments) is decoded into a
//! [`Command`] at the transport boundary. Unknown names and ill-typed
//! argument lists are rejected there as [`CallError`]s. Everything that
//! decodes is executed against the host and answers with an [`Outcome`] or
//! a [`CommandError`].

use std::fmt;
use std::str::FromStr;

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::bridge::envelope::Message;
use crate::bridge::{geometry, resolve};
use crate::engine::{Component, Host, Point3};
use crate::error::{CallError, CommandError, CommandResult};

/// The methods the bridge answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    /// Liveness check.
    Ping,
    /// Sketch with one circle.
    CreateSketchCircle,
    /// Sketch with one two-point rectangle.
    CreateSketchRectangle,
    /// Extrude the first profile of a named sketch.
    ExtrudeProfile,
    /// Sketch + circle + extrude in one call.
    CreateCylinder,
}

impl Method {
    /// Every registered method.
    pub const ALL: [Self; 5] = [
        Self::Ping,
        Self::CreateSketchCircle,
        Self::CreateSketchRectangle,
        Self::ExtrudeProfile,
        Self::CreateCylinder,
    ];

    /// Returns the wire name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ping => "ping",
            Self::CreateSketchCircle => "create_sketch_circle",
            Self::CreateSketchRectangle => "create_sketch_rectangle",
            Self::ExtrudeProfile => "extrude_profile",
            Self::CreateCylinder => "create_cylinder",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Method {
    type Err = CallError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|m| m.as_str() == name)
            .ok_or_else(|| CallError::UnknownMethod(name.to_string()))
    }
}

/// A decoded call, one variant per method.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// `ping()`
    Ping,
    /// `create_sketch_circle(plane, [x, y, z], radius, name?)`
    CreateSketchCircle {
        /// Plane name as sent.
        plane: String,
        /// Centre coordinates as sent.
        coords: Vec<f64>,
        /// Circle radius.
        radius: f64,
        /// Optional sketch name.
        name: Option<String>,
    },
    /// `create_sketch_rectangle(plane, [x, y], [x, y], name?)`
    CreateSketchRectangle {
        /// Plane name as sent.
        plane: String,
        /// First corner as sent.
        point_one: Vec<f64>,
        /// Opposite corner as sent.
        point_two: Vec<f64>,
        /// Optional sketch name.
        name: Option<String>,
    },
    /// `extrude_profile(sketch_name, distance)`
    ExtrudeProfile {
        /// Sketch to extrude.
        sketch_name: String,
        /// Signed extrusion distance.
        distance: f64,
    },
    /// `create_cylinder(x, y, z, radius, height)`
    CreateCylinder {
        /// Base centre.
        center: Point3,
        /// Cylinder radius.
        radius: f64,
        /// Cylinder height.
        height: f64,
    },
}

/// Positional argument reader for one call.
struct Args {
    method: Method,
    values: Vec<Value>,
}

impl Args {
    fn new(method: Method, params: Option<Value>) -> Result<Self, CallError> {
        let values = match params {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::Array(values)) => values,
            Some(_) => return Err(Self::invalid(method, "expected a positional argument list")),
        };
        Ok(Self { method, values })
    }

    fn invalid(method: Method, message: impl Into<String>) -> CallError {
        CallError::InvalidParams {
            method: method.as_str(),
            message: message.into(),
        }
    }

    fn expect_at_most(&self, max: usize) -> Result<(), CallError> {
        if self.values.len() > max {
            return Err(Self::invalid(
                self.method,
                format!("expected at most {max} arguments, got {}", self.values.len()),
            ));
        }
        Ok(())
    }

    fn required<T: DeserializeOwned>(&self, index: usize, name: &str) -> Result<T, CallError> {
        let value = self.values.get(index).ok_or_else(|| {
            Self::invalid(self.method, format!("missing argument {index} ({name})"))
        })?;
        serde_json::from_value(value.clone()).map_err(|e| {
            Self::invalid(self.method, format!("argument {index} ({name}): {e}"))
        })
    }

    fn optional<T: DeserializeOwned>(
        &self,
        index: usize,
        name: &str,
    ) -> Result<Option<T>, CallError> {
        match self.values.get(index) {
            None | Some(Value::Null) => Ok(None),
            Some(_) => self.required(index, name).map(Some),
        }
    }
}

impl Command {
    /// Decodes a wire call.
    ///
    /// # Errors
    ///
    /// Returns [`CallError::UnknownMethod`] for a name outside the method
    /// table and [`CallError::InvalidParams`] for a wrong argument count or
    /// argument types.
    pub fn decode(method: &str, params: Option<Value>) -> Result<Self, CallError> {
        let method: Method = method.parse()?;
        let args = Args::new(method, params)?;

        let command = match method {
            Method::Ping => {
                args.expect_at_most(0)?;
                Self::Ping
            }
            Method::CreateSketchCircle => {
                args.expect_at_most(4)?;
                Self::CreateSketchCircle {
                    plane: args.required(0, "plane")?,
                    coords: args.required(1, "coords")?,
                    radius: args.required(2, "radius")?,
                    name: args.optional(3, "name")?,
                }
            }
            Method::CreateSketchRectangle => {
                args.expect_at_most(4)?;
                Self::CreateSketchRectangle {
                    plane: args.required(0, "plane")?,
                    point_one: args.required(1, "point_one")?,
                    point_two: args.required(2, "point_two")?,
                    name: args.optional(3, "name")?,
                }
            }
            Method::ExtrudeProfile => {
                args.expect_at_most(2)?;
                Self::ExtrudeProfile {
                    sketch_name: args.required(0, "sketch_name")?,
                    distance: args.required(1, "distance")?,
                }
            }
            Method::CreateCylinder => {
                args.expect_at_most(5)?;
                Self::CreateCylinder {
                    center: Point3::new(
                        args.required(0, "x")?,
                        args.required(1, "y")?,
                        args.required(2, "z")?,
                    ),
                    radius: args.required(3, "radius")?,
                    height: args.required(4, "height")?,
                }
            }
        };
        Ok(command)
    }

    /// Returns the method this command was decoded from.
    #[must_use]
    pub const fn method(&self) -> Method {
        match self {
            Self::Ping => Method::Ping,
            Self::CreateSketchCircle { .. } => Method::CreateSketchCircle,
            Self::CreateSketchRectangle { .. } => Method::CreateSketchRectangle,
            Self::ExtrudeProfile { .. } => Method::ExtrudeProfile,
            Self::CreateCylinder { .. } => Method::CreateCylinder,
        }
    }

    /// Runs the command against the host's active design.
    ///
    /// # Errors
    ///
    /// Returns the first [`CommandError`] raised. Steps completed before the
    /// failure are not undone.
    pub fn execute(self, host: &mut dyn Host) -> CommandResult<Outcome> {
        if matches!(self, Self::Ping) {
            return Ok(Outcome::Pong);
        }

        let design = host.active_design().ok_or(CommandError::NoActiveDesign)?;
        let component = design.root_component();

        match self {
            Self::Ping => Ok(Outcome::Pong),
            Self::CreateSketchCircle {
                plane,
                coords,
                radius,
                name,
            } => {
                let plane = resolve::resolve_plane(component, &plane)?;
                let center = point3(&coords, "coords")?;
                geometry::require_positive("radius", radius)?;

                let sketch = geometry::create_sketch(component, plane, name.as_deref())?;
                geometry::add_circle_to_sketch(component, sketch.handle, center, radius)?;
                Ok(Outcome::SketchCircleCreated { name: sketch.name })
            }
            Self::CreateSketchRectangle {
                plane,
                point_one,
                point_two,
                name,
            } => {
                let plane = resolve::resolve_plane(component, &plane)?;
                let p1 = point2(&point_one, "point_one")?;
                let p2 = point2(&point_two, "point_two")?;

                let sketch = geometry::create_sketch(component, plane, name.as_deref())?;
                geometry::add_rectangle_to_sketch(component, sketch.handle, p1, p2)?;
                Ok(Outcome::SketchRectangleCreated { name: sketch.name })
            }
            Self::ExtrudeProfile {
                sketch_name,
                distance,
            } => extrude_named(component, &sketch_name, distance),
            Self::CreateCylinder {
                center,
                radius,
                height,
            } => {
                let sketch = geometry::create_cylinder(component, center, radius, height)?;
                Ok(Outcome::CylinderCreated { sketch: sketch.name })
            }
        }
    }
}

fn extrude_named(
    component: &mut dyn Component,
    sketch_name: &str,
    distance: f64,
) -> CommandResult<Outcome> {
    let sketch = resolve::resolve_sketch(component, sketch_name)?;
    geometry::extrude(component, sketch, distance)?;
    Ok(Outcome::ProfileExtruded {
        sketch: sketch_name.to_string(),
    })
}

fn point3(coords: &[f64], field: &'static str) -> CommandResult<Point3> {
    match *coords {
        [x, y, z] => Ok(Point3::new(x, y, z)),
        _ => Err(CommandError::validation(
            field,
            format!("expected [x, y, z], got {} values", coords.len()),
        )),
    }
}

fn point2(coords: &[f64], field: &'static str) -> CommandResult<Point3> {
    match *coords {
        [x, y] => Ok(Point3::new(x, y, 0.0)),
        _ => Err(CommandError::validation(
            field,
            format!("expected [x, y], got {} values", coords.len()),
        )),
    }
}

/// Successful result of a command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Answer to ping.
    Pong,
    /// A circle sketch exists under `name`.
    SketchCircleCreated {
        /// Sketch name.
        name: String,
    },
    /// A rectangle sketch exists under `name`.
    SketchRectangleCreated {
        /// Sketch name.
        name: String,
    },
    /// A new body was extruded from `sketch`.
    ProfileExtruded {
        /// Sketch name.
        sketch: String,
    },
    /// A cylinder was built on `sketch`.
    CylinderCreated {
        /// Base sketch name.
        sketch: String,
    },
}

impl Outcome {
    /// Converts the outcome into envelope message text.
    #[must_use]
    pub fn into_message(self) -> Message {
        match self {
            Self::Pong => "Pong".into(),
            Self::SketchCircleCreated { name } => Message::Lines(vec![
                "Sketch circle created successfully".to_string(),
                format!("name: {name}"),
            ]),
            Self::SketchRectangleCreated { name } => Message::Lines(vec![
                "Sketch rectangle created successfully".to_string(),
                format!("name: {name}"),
            ]),
            Self::ProfileExtruded { .. } => "Profile extruded successfully".into(),
            Self::CylinderCreated { sketch } => Message::Lines(vec![
                "Cylinder created successfully".to_string(),
                format!("sketch: {sketch}"),
            ]),
        }
    }
}
