#![warn(missing_docs)]

//! STEP export for brepify shapes.
//!
//! Writes ISO 10303-21 files using the AP214 (automotive design) schema:
//! straight `EDGE_CURVE`s over `LINE`s, and `ADVANCED_FACE`s on `PLANE`,
//! `CYLINDRICAL_SURFACE`, `CONICAL_SURFACE` and `SPHERICAL_SURFACE`.
//! Closed shells become a `MANIFOLD_SOLID_BREP`; open shells a
//! `SHELL_BASED_SURFACE_MODEL`. Output is a pure function of the shape,
//! so identical topology produces identical bytes.
//!
//! # Example
//!
//! ```no_run
//! use brepify_kernel::{BRepKernel, Shape};
//! use brepify_step::write_step;
//!
//! # fn demo(kernel: &BRepKernel, shape: Shape) -> Result<(), brepify_step::StepError> {
//! write_step(kernel, shape, "part.step")?;
//! # Ok(())
//! # }
//! ```

mod error;
mod writer;

pub use error::StepError;
pub use writer::{write_step, write_step_to_buffer};
