//! Structural model of compiled JVM classes.
//!
//! A [`ClassDescriptor`] keeps exactly what the call-graph search needs from a class file:
//! its name, the explicit adjacency to its supertype and interfaces, its access flags, and per
//! method the name, descriptor, access flags and the ordered call instructions of its body.
//!
//! # Key Components
//!
//! - [`ClassDescriptor`] / [`MethodDescriptor`] - Immutable parsed classes and methods
//! - [`Supertype`] - Superclass link with an explicit `Root` sentinel
//! - [`ConstantPool`] - Constant pool decoding and method reference resolution
//! - [`ClassAccessFlags`], [`MethodAccessFlags`], [`Visibility`] - Access flag handling
//! - [`parameter_count`] - Descriptor shape inspection
//!
//! # Examples
//!
//! ```rust,no_run
//! use jarscope::classfile::ClassDescriptor;
//!
//! let bytes = std::fs::read("ModuleA.class")?;
//! let class = ClassDescriptor::parse(&bytes)?;
//!
//! for method in &class.methods {
//!     for call in &method.calls {
//!         println!("{}#{} -> {}#{}", class.name, method.name, call.owner, call.name);
//!     }
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod access;
mod constant_pool;
mod descriptor;
mod reader;

pub use access::{ClassAccessFlags, MethodAccessFlags, Visibility, VISIBILITY_MASK};
pub use constant_pool::{decode_modified_utf8, Constant, ConstantPool, MethodRef};
pub use descriptor::{parameter_count, takes_no_arguments};
pub use reader::CLASS_MAGIC;

use std::sync::Arc;

use crate::{bytecode::CallInstruction, signature::MethodType, Result};

/// The root of the class hierarchy.
pub const ROOT_CLASS: &str = "java.lang.Object";

/// Reference counted [`ClassDescriptor`], as handed out by the store.
pub type ClassDescriptorRc = Arc<ClassDescriptor>;

/// Superclass link of a class.
///
/// `java.lang.Object` is never stored by name: classes extending it directly, interfaces, and
/// `java.lang.Object` itself all carry [`Supertype::Root`]. Hierarchy walks stop there.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Supertype {
    /// No supertype worth following
    Root,
    /// A named superclass other than the root
    Class(String),
}

impl Supertype {
    /// Build the link for a dotted superclass name.
    #[must_use]
    pub fn from_name(name: String) -> Self {
        if name == ROOT_CLASS {
            Supertype::Root
        } else {
            Supertype::Class(name)
        }
    }

    /// The superclass name unless this is the root sentinel.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        match self {
            Supertype::Root => None,
            Supertype::Class(name) => Some(name),
        }
    }
}

/// One parsed class or interface.
#[derive(Debug, Clone)]
pub struct ClassDescriptor {
    /// Dotted fully-qualified name
    pub name: String,
    /// Superclass link
    pub supertype: Supertype,
    /// Directly implemented (or, for interfaces, extended) interfaces in declaration order
    pub interfaces: Vec<String>,
    /// Class access flags
    pub access: ClassAccessFlags,
    /// Declared methods in class-file order
    pub methods: Vec<MethodDescriptor>,
    /// `(major, minor)` class-file version
    pub version: (u16, u16),
}

impl ClassDescriptor {
    /// Parse a class file.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] or [`crate::Error::OutOfBounds`] if the bytes are not a
    /// structurally valid class file.
    pub fn parse(data: &[u8]) -> Result<Self> {
        reader::read_class(data)
    }

    /// Returns `true` for interfaces (and annotation interfaces).
    #[must_use]
    pub fn is_interface(&self) -> bool {
        self.access.contains(ClassAccessFlags::INTERFACE)
    }

    /// Superclass name, `None` for the root sentinel.
    #[must_use]
    pub fn super_name(&self) -> Option<&str> {
        self.supertype.name()
    }

    /// Dotted package of this class, empty for the default package.
    #[must_use]
    pub fn package(&self) -> &str {
        package_of(&self.name)
    }

    /// Returns `true` if a method with this name and type is declared here.
    #[must_use]
    pub fn declares(&self, name: &str, method_type: &MethodType) -> bool {
        self.methods
            .iter()
            .any(|method| method.name == name && method_type.matches(&method.descriptor))
    }

    /// Declared methods with the given name.
    pub fn methods_named<'a>(
        &'a self,
        name: &str,
    ) -> impl Iterator<Item = &'a MethodDescriptor> + 'a {
        let name = name.to_string();
        self.methods.iter().filter(move |method| method.name == name)
    }
}

/// One declared method.
#[derive(Debug, Clone)]
pub struct MethodDescriptor {
    /// Method name, `<init>` and `<clinit>` included
    pub name: String,
    /// Method descriptor, e.g. `(Ljava/lang/String;)V`
    pub descriptor: String,
    /// Method access flags
    pub access: MethodAccessFlags,
    /// Static call sites of the body, in bytecode order
    pub calls: Vec<CallInstruction>,
}

impl MethodDescriptor {
    /// Visibility level of the method.
    #[must_use]
    pub fn visibility(&self) -> Visibility {
        Visibility::from_access(self.access.bits())
    }

    /// Number of declared parameters, `None` if the descriptor is malformed.
    #[must_use]
    pub fn parameter_count(&self) -> Option<usize> {
        parameter_count(&self.descriptor)
    }
}

/// Dotted package part of a dotted class name.
#[must_use]
pub fn package_of(class_name: &str) -> &str {
    class_name
        .rfind('.')
        .map_or("", |index| &class_name[..index])
}
