//! Which classes and methods may be rewritten at all
//!
//! Anything rejected here is passed through untouched. That is never an error.

use crate::jvm::{
    BinaryName, ClassAccessFlags, FieldType, MethodAccessFlags, MethodDescriptor, Name,
    UnqualifiedName,
};

/// Can the methods of this class be instrumented?
///
/// Interfaces, compiler-generated classes, `java.lang.Object`, dynamic proxies, and
/// `package-info` placeholders are all left alone.
pub fn is_instrumentable_class(access_flags: ClassAccessFlags, name: &BinaryName) -> bool {
    if access_flags.intersects(ClassAccessFlags::INTERFACE | ClassAccessFlags::SYNTHETIC) {
        return false;
    }
    if name == &BinaryName::OBJECT {
        return false;
    }
    let name = name.as_str();
    !(name.contains("$Proxy") || name.ends_with("package-info"))
}

/// Can this method be instrumented?
///
/// Methods without a body (abstract, native) and compiler-generated methods are skipped, as are
/// `toString()` and `hashCode()` since trace output renders objects through them.
pub fn is_instrumentable_method(
    access_flags: MethodAccessFlags,
    name: &UnqualifiedName,
    descriptor: &MethodDescriptor,
) -> bool {
    if access_flags.intersects(
        MethodAccessFlags::SYNTHETIC | MethodAccessFlags::NATIVE | MethodAccessFlags::ABSTRACT,
    ) {
        return false;
    }
    let no_parameters = descriptor.parameters.is_empty();
    let is_to_string = name == &UnqualifiedName::TOSTRING
        && no_parameters
        && descriptor.return_type == Some(FieldType::object(BinaryName::STRING));
    let is_hash_code = name == &UnqualifiedName::HASHCODE
        && no_parameters
        && descriptor.return_type == Some(FieldType::int());
    !(is_to_string || is_hash_code)
}
