//! Method descriptor inspection.
//!
//! Only the shape of a descriptor matters for caller attribution: how many parameters it
//! takes and whether it takes none at all.

/// Count the parameters of a method descriptor such as `(I[JLjava/lang/String;)V`.
///
/// Returns `None` if the descriptor is not well-formed.
///
/// ```rust
/// use jarscope::classfile::parameter_count;
///
/// assert_eq!(parameter_count("()V"), Some(0));
/// assert_eq!(parameter_count("(I[[JLjava/lang/String;)V"), Some(3));
/// assert_eq!(parameter_count("I"), None);
/// ```
#[must_use]
pub fn parameter_count(descriptor: &str) -> Option<usize> {
    let params = parameter_section(descriptor)?;
    let bytes = params.as_bytes();

    let mut count = 0;
    let mut pos = 0;
    while pos < bytes.len() {
        while bytes.get(pos) == Some(&b'[') {
            pos += 1;
        }
        match bytes.get(pos)? {
            b'B' | b'C' | b'D' | b'F' | b'I' | b'J' | b'S' | b'Z' => pos += 1,
            b'L' => {
                let end = params[pos..].find(';')?;
                pos += end + 1;
            }
            _ => return None,
        }
        count += 1;
    }

    Some(count)
}

/// Returns `true` for descriptors of the empty-parameter form `()…`.
#[must_use]
pub fn takes_no_arguments(descriptor: &str) -> bool {
    descriptor.starts_with("()")
}

fn parameter_section(descriptor: &str) -> Option<&str> {
    let rest = descriptor.strip_prefix('(')?;
    let end = rest.find(')')?;
    Some(&rest[..end])
}
