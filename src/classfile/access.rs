//! Access flag sets of classes and methods.
//!
//! - [`ClassAccessFlags`], [`MethodAccessFlags`]: raw `access_flags` of the class file
//! - [`Visibility`]: the single visibility level a member's flags resolve to

use bitflags::bitflags;
use strum::{Display, EnumIter};

/// Bitmask for the visibility bits of a member's access flags
pub const VISIBILITY_MASK: u16 = 0x0007;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    /// Class and interface access flags
    pub struct ClassAccessFlags: u16 {
        /// Declared public
        const PUBLIC = 0x0001;
        /// Declared final, no subclasses allowed
        const FINAL = 0x0010;
        /// Treat superclass methods specially when invoked by `invokespecial`
        const SUPER = 0x0020;
        /// Is an interface, not a class
        const INTERFACE = 0x0200;
        /// Declared abstract, must not be instantiated
        const ABSTRACT = 0x0400;
        /// Not present in source code
        const SYNTHETIC = 0x1000;
        /// Declared as an annotation interface
        const ANNOTATION = 0x2000;
        /// Declared as an enum class
        const ENUM = 0x4000;
        /// Is a module, not a class or interface
        const MODULE = 0x8000;
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    /// Method access flags
    pub struct MethodAccessFlags: u16 {
        /// Declared public, may be accessed from outside its package
        const PUBLIC = 0x0001;
        /// Declared private, accessible only within the defining class
        const PRIVATE = 0x0002;
        /// Declared protected, may be accessed within subclasses
        const PROTECTED = 0x0004;
        /// Declared static
        const STATIC = 0x0008;
        /// Declared final, must not be overridden
        const FINAL = 0x0010;
        /// Declared synchronized
        const SYNCHRONIZED = 0x0020;
        /// A bridge method, generated by the compiler
        const BRIDGE = 0x0040;
        /// Declared with variable number of arguments
        const VARARGS = 0x0080;
        /// Declared native
        const NATIVE = 0x0100;
        /// Declared abstract, no implementation is provided
        const ABSTRACT = 0x0400;
        /// Floating-point mode is FP-strict
        const STRICT = 0x0800;
        /// Not present in source code
        const SYNTHETIC = 0x1000;
    }
}

/// Visibility of a member, derived from the low three access bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter)]
#[strum(serialize_all = "lowercase")]
pub enum Visibility {
    /// `ACC_PUBLIC`
    Public,
    /// `ACC_PROTECTED`
    Protected,
    /// `ACC_PRIVATE`
    Private,
    /// None of the visibility bits set
    Package,
}

impl Visibility {
    /// Resolve the visibility encoded in raw access bits.
    ///
    /// Only the public/protected/private bits are consulted. Should more than one be set (which
    /// the JVM rejects), the most restrictive one wins.
    #[must_use]
    pub fn from_access(access: u16) -> Self {
        let flags = MethodAccessFlags::from_bits_truncate(access & VISIBILITY_MASK);
        if flags.contains(MethodAccessFlags::PRIVATE) {
            Visibility::Private
        } else if flags.contains(MethodAccessFlags::PROTECTED) {
            Visibility::Protected
        } else if flags.contains(MethodAccessFlags::PUBLIC) {
            Visibility::Public
        } else {
            Visibility::Package
        }
    }

    /// Returns `true` for members callable from any archive.
    #[must_use]
    pub fn is_public(self) -> bool {
        self == Visibility::Public
    }
}
