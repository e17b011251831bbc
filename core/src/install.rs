//! Placing re-encoded code into the object that holds it.
//!
//! Encoding produces a free-standing [`RawCode`]. Where that code ends up is
//! up to the host: a function's code attribute, a module's constant pool, a
//! file on disk. [`CodeInstaller`] is the seam for that step.

use tracing::debug;

use crate::String;
use crate::code::{Constant, RawCode};
use crate::error::InstallError;

/// Installs encoded code into a container.
pub trait CodeInstaller {
    type Target;
    type Error;

    fn install(&mut self, target: &mut Self::Target, code: RawCode) -> Result<(), Self::Error>;
}

/// Replaces a nested code constant, found by name, inside a parent code
/// object.
///
/// Function bodies live in the constant pool of the code that defines them,
/// so swapping `f` inside a module means replacing the `Code` constant named
/// `f`. The search is depth-first through nested code constants and stops at
/// the first match.
#[derive(Debug, Clone)]
pub struct NestedCodeInstaller {
    name: String,
}

impl NestedCodeInstaller {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl CodeInstaller for NestedCodeInstaller {
    type Target = RawCode;
    type Error = InstallError;

    fn install(&mut self, target: &mut RawCode, code: RawCode) -> Result<(), InstallError> {
        let slot = find_slot(&mut target.constants, &self.name).ok_or_else(|| InstallError::NotFound {
            name: self.name.clone(),
        })?;
        debug!(name = %self.name, bytes = code.code.len(), "installing nested code object");
        *slot = code;
        Ok(())
    }
}

/// The nested code object named `name`, searched depth-first.
pub fn find_nested<'a>(parent: &'a RawCode, name: &str) -> Option<&'a RawCode> {
    parent.constants.iter().find_map(|constant| match constant {
        Constant::Code(code) if code.name == name => Some(&**code),
        Constant::Code(code) => find_nested(code, name),
        _ => None,
    })
}

fn find_slot<'a>(constants: &'a mut [Constant], name: &str) -> Option<&'a mut RawCode> {
    // Locate the branch holding the match first, then borrow only that one.
    let index = constants.iter().position(|constant| match constant {
        Constant::Code(code) => code.name == name || find_nested(code, name).is_some(),
        _ => false,
    })?;
    match &mut constants[index] {
        Constant::Code(code) => {
            if code.name == name {
                Some(&mut **code)
            } else {
                find_slot(&mut code.constants, name)
            }
        }
        _ => None,
    }
}
