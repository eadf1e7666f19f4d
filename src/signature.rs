//! Call signatures, the identity of a method to search for or attribute a call to.
//!
//! The textual form is exactly four `#`-separated fields:
//!
//! ```text
//! java.io.File#renameTo#(Ljava/io/File;)Z#1
//! ^ owner      ^ name   ^ descriptor      ^ access flags (decimal)
//! ```
//!
//! The descriptor field may be the literal `null`, a wildcard that matches every overload of
//! the name. Of the access flags only the public/protected/private bits are consulted, but the
//! full value is kept so that signatures render back unchanged.

use std::{fmt, str::FromStr};

use crate::{
    classfile::{parameter_count, takes_no_arguments, Visibility},
    Error, Result,
};

/// Literal used in place of a descriptor to match any overload.
pub const WILDCARD: &str = "null";

const SEPARATOR: char = '#';

/// Parameter/return encoding of a call signature.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MethodType {
    /// Any overload of the method name
    Wildcard,
    /// One exact descriptor such as `(Ljava/io/File;)Z`
    Descriptor(String),
}

impl MethodType {
    /// Exact descriptor.
    pub fn descriptor(descriptor: impl Into<String>) -> Self {
        MethodType::Descriptor(descriptor.into())
    }

    /// Returns `true` for [`MethodType::Wildcard`].
    #[must_use]
    pub fn is_wildcard(&self) -> bool {
        matches!(self, MethodType::Wildcard)
    }

    /// The exact descriptor, if any.
    #[must_use]
    pub fn as_descriptor(&self) -> Option<&str> {
        match self {
            MethodType::Wildcard => None,
            MethodType::Descriptor(descriptor) => Some(descriptor),
        }
    }

    /// Returns `true` if a method with `descriptor` is covered by this type.
    #[must_use]
    pub fn matches(&self, descriptor: &str) -> bool {
        match self {
            MethodType::Wildcard => true,
            MethodType::Descriptor(own) => own == descriptor,
        }
    }

    /// Returns `true` for exact descriptors of the empty-parameter form `()…`.
    #[must_use]
    pub fn takes_no_arguments(&self) -> bool {
        self.as_descriptor().is_some_and(takes_no_arguments)
    }

    /// Number of declared parameters. `None` for wildcards and malformed descriptors.
    #[must_use]
    pub fn parameter_count(&self) -> Option<usize> {
        self.as_descriptor().and_then(parameter_count)
    }
}

impl fmt::Display for MethodType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MethodType::Wildcard => f.write_str(WILDCARD),
            MethodType::Descriptor(descriptor) => f.write_str(descriptor),
        }
    }
}

/// Identity of a method: owner, name, descriptor or wildcard, and access flags.
///
/// # Examples
///
/// ```rust
/// use jarscope::{CallSignature, MethodType};
///
/// let sink: CallSignature = "java.io.File#renameTo#(Ljava/io/File;)Z#1".parse()?;
/// assert_eq!(sink.owner, "java.io.File");
/// assert_eq!(sink.method_type, MethodType::descriptor("(Ljava/io/File;)Z"));
/// assert!(sink.visibility().is_public());
/// assert_eq!(sink.to_string(), "java.io.File#renameTo#(Ljava/io/File;)Z#1");
/// # Ok::<(), jarscope::Error>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CallSignature {
    /// Dotted owner type name
    pub owner: String,
    /// Method name
    pub name: String,
    /// Descriptor or wildcard
    pub method_type: MethodType,
    /// Raw access flags
    pub access: u16,
}

impl CallSignature {
    /// Create a new signature.
    pub fn new(
        owner: impl Into<String>,
        name: impl Into<String>,
        method_type: MethodType,
        access: u16,
    ) -> Self {
        CallSignature {
            owner: owner.into(),
            name: name.into(),
            method_type,
            access,
        }
    }

    /// Parse the `owner#name#descriptor-or-null#access` form.
    ///
    /// # Errors
    /// Returns [`crate::Error::InvalidSignature`] if there are not exactly four fields, a field
    /// is empty, the descriptor is neither `null` nor starts with `(`, or the access field is not
    /// a 16-bit decimal number.
    pub fn parse(value: &str) -> Result<Self> {
        let invalid = |reason: &str| Error::InvalidSignature(format!("{value:?}: {reason}"));

        let fields: Vec<&str> = value.split(SEPARATOR).collect();
        let [owner, name, descriptor, access] = fields.as_slice() else {
            return Err(invalid("expected four '#'-separated fields"));
        };

        if owner.is_empty() || name.is_empty() || descriptor.is_empty() {
            return Err(invalid("empty field"));
        }

        let method_type = if *descriptor == WILDCARD {
            MethodType::Wildcard
        } else if descriptor.starts_with('(') {
            MethodType::descriptor(*descriptor)
        } else {
            return Err(invalid("descriptor must be 'null' or start with '('"));
        };

        let access = access
            .trim()
            .parse::<u16>()
            .map_err(|_| invalid("access flags are not a 16-bit number"))?;

        Ok(CallSignature::new(*owner, *name, method_type, access))
    }

    /// Visibility derived from the access flags.
    #[must_use]
    pub fn visibility(&self) -> Visibility {
        Visibility::from_access(self.access)
    }

    /// The same method attributed to another owner type.
    #[must_use]
    pub fn with_owner(&self, owner: impl Into<String>) -> Self {
        CallSignature {
            owner: owner.into(),
            ..self.clone()
        }
    }

    /// Returns `true` if this signature names the given method of the given class.
    #[must_use]
    pub fn is_method(&self, owner: &str, name: &str, descriptor: &str) -> bool {
        self.owner == owner && self.name == name && self.method_type.matches(descriptor)
    }
}

impl fmt::Display for CallSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{SEPARATOR}{}{SEPARATOR}{}{SEPARATOR}{}",
            self.owner, self.name, self.method_type, self.access
        )
    }
}

impl FromStr for CallSignature {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self> {
        CallSignature::parse(value)
    }
}
