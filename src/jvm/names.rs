use std::borrow::Cow;
use std::fmt::{Debug, Display, Error as FmtError, Formatter};

/// Names of methods, fields
///
/// See <https://docs.oracle.com/javase/specs/jvms/se16/html/jvms-4.html#jvms-4.2.2>
#[derive(Clone, Hash, Eq, PartialEq, PartialOrd, Ord)]
pub struct UnqualifiedName(Cow<'static, str>);

/// Names of classes and interfaces, in their internal form (`java/lang/Object`)
///
/// See <https://docs.oracle.com/javase/specs/jvms/se16/html/jvms-4.html#jvms-4.2.1>
#[derive(Clone, Hash, Eq, PartialEq, PartialOrd, Ord)]
pub struct BinaryName(Cow<'static, str>);

/// Extracts the raw underlying string name
impl AsRef<str> for UnqualifiedName {
    fn as_ref(&self) -> &str {
        self.0.as_ref()
    }
}

/// Extracts the raw underlying string name
impl AsRef<str> for BinaryName {
    fn as_ref(&self) -> &str {
        self.0.as_ref()
    }
}

pub trait Name: Sized {
    /// Check if a string would be a valid name
    fn check_valid(name: impl AsRef<str>) -> Result<(), String>;

    /// Extact the raw underlying string data:
    fn as_cow(&self) -> &Cow<'static, str>;

    /// Extact the raw underlying string name
    fn as_str(&self) -> &str {
        self.as_cow().as_ref()
    }

    /// Try to construct a name from a string
    fn from_string(name: String) -> Result<Self, String>;
}

impl Name for UnqualifiedName {
    fn check_valid(name: impl AsRef<str>) -> Result<(), String> {
        let name = name.as_ref();
        if name.contains(&['.', ';', '[', '/'][..]) {
            Err(format!(
                "Unqualified name '{}' contains an illegal character",
                name
            ))
        } else if name.is_empty() {
            Err(format!("Unqualified name '{}' is empty", name))
        } else {
            Ok(())
        }
    }

    fn as_cow(&self) -> &Cow<'static, str> {
        &self.0
    }

    fn from_string(name: String) -> Result<Self, String> {
        Self::check_valid(&name)?;
        Ok(UnqualifiedName(Cow::Owned(name)))
    }
}

impl Name for BinaryName {
    fn check_valid(name: impl AsRef<str>) -> Result<(), String> {
        let name = name.as_ref();
        if name.is_empty() {
            Err(format!("Binary name '{}' is empty", name))
        } else {
            name.split('/').map(UnqualifiedName::check_valid).collect()
        }
    }

    fn as_cow(&self) -> &Cow<'static, str> {
        &self.0
    }

    fn from_string(name: String) -> Result<Self, String> {
        Self::check_valid(&name)?;
        Ok(BinaryName(Cow::Owned(name)))
    }
}

impl Debug for UnqualifiedName {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), FmtError> {
        f.write_str(self.0.as_ref())
    }
}
impl Debug for BinaryName {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), FmtError> {
        f.write_str(self.0.as_ref())
    }
}
impl Display for UnqualifiedName {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), FmtError> {
        f.write_str(self.0.as_ref())
    }
}
impl Display for BinaryName {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), FmtError> {
        f.write_str(self.0.as_ref())
    }
}

impl UnqualifiedName {
    const fn name(value: &'static str) -> UnqualifiedName {
        UnqualifiedName(Cow::Borrowed(value))
    }

    /// Is this one of the two names that the JVM gives special meaning to?
    pub fn is_special(&self) -> bool {
        self == &UnqualifiedName::INIT || self == &UnqualifiedName::CLINIT
    }

    // JDK names
    pub const FINER: Self = Self::name("FINER");
    pub const GETLOGGER: Self = Self::name("getLogger");
    pub const HASHCODE: Self = Self::name("hashCode");
    pub const ISLOGGABLE: Self = Self::name("isLoggable");
    pub const ENTERING: Self = Self::name("entering");
    pub const EXITING: Self = Self::name("exiting");
    pub const LOGP: Self = Self::name("logp");
    pub const THROWING: Self = Self::name("throwing");
    pub const TOSTRING: Self = Self::name("toString");
    pub const VALUEOF: Self = Self::name("valueOf");

    // Trace component and FFDC names
    pub const ENTRY: Self = Self::name("entry");
    pub const EVENT: Self = Self::name("event");
    pub const EXIT: Self = Self::name("exit");
    pub const ISANYTRACINGENABLED: Self = Self::name("isAnyTracingEnabled");
    pub const ISENTRYENABLED: Self = Self::name("isEntryEnabled");
    pub const ISEVENTENABLED: Self = Self::name("isEventEnabled");
    pub const PROCESSEXCEPTION: Self = Self::name("processException");
    pub const REGISTER: Self = Self::name("register");

    // Special unqualified names - only these are allowed to have angle brackets in them
    pub const INIT: Self = Self::name("<init>");
    pub const CLINIT: Self = Self::name("<clinit>");

    // Names we generate
    pub const LOGGER_FIELD: Self = Self::name("$$$logger$$$");
    pub const TRACE_COMPONENT_FIELD: Self = Self::name("$$$tc$$$");
}

impl BinaryName {
    const fn name(value: &'static str) -> BinaryName {
        BinaryName(Cow::Borrowed(value))
    }

    /// Dotted form of the name, as used in Java source and as a trace source identifier
    pub fn java_name(&self) -> String {
        self.as_str().replace('/', ".")
    }

    /// Package portion of the name (empty for classes in the default package)
    pub fn package(&self) -> &str {
        match self.as_str().rfind('/') {
            Some(idx) => &self.as_str()[..idx],
            None => "",
        }
    }

    /// Last segment of the name
    pub fn simple_name(&self) -> &str {
        match self.as_str().rfind('/') {
            Some(idx) => &self.as_str()[idx + 1..],
            None => self.as_str(),
        }
    }

    // JDK names
    pub const BOOLEAN: Self = Self::name("java/lang/Boolean");
    pub const BYTE: Self = Self::name("java/lang/Byte");
    pub const CHARACTER: Self = Self::name("java/lang/Character");
    pub const CLASS: Self = Self::name("java/lang/Class");
    pub const DOUBLE: Self = Self::name("java/lang/Double");
    pub const FLOAT: Self = Self::name("java/lang/Float");
    pub const INTEGER: Self = Self::name("java/lang/Integer");
    pub const LEVEL: Self = Self::name("java/util/logging/Level");
    pub const LOGGER: Self = Self::name("java/util/logging/Logger");
    pub const LONG: Self = Self::name("java/lang/Long");
    pub const OBJECT: Self = Self::name("java/lang/Object");
    pub const SHORT: Self = Self::name("java/lang/Short");
    pub const STRING: Self = Self::name("java/lang/String");
    pub const THROWABLE: Self = Self::name("java/lang/Throwable");

    // Trace APIs
    pub const WEBSPHERE_TR: Self = Self::name("com/ibm/ejs/ras/Tr");
    pub const WEBSPHERE_TRACE_COMPONENT: Self = Self::name("com/ibm/ejs/ras/TraceComponent");
    pub const LIBERTY_TR: Self = Self::name("com/ibm/websphere/ras/Tr");
    pub const LIBERTY_TRACE_COMPONENT: Self = Self::name("com/ibm/websphere/ras/TraceComponent");
    pub const FFDC_FILTER: Self = Self::name("com/ibm/ws/ffdc/FFDCFilter");

    // Annotations that steer instrumentation
    pub const FFDC_IGNORE: Self = Self::name("com/ibm/ws/ffdc/annotation/FFDCIgnore");
    pub const INJECTED_TRACE: Self =
        Self::name("com/ibm/websphere/ras/annotation/InjectedTrace");
    pub const MANUAL_TRACE: Self = Self::name("com/ibm/websphere/ras/annotation/ManualTrace");
    pub const SENSITIVE: Self = Self::name("com/ibm/websphere/ras/annotation/Sensitive");
    pub const TRACE_OPTIONS: Self = Self::name("com/ibm/websphere/ras/annotation/TraceOptions");
    pub const TRIVIAL: Self = Self::name("com/ibm/websphere/ras/annotation/Trivial");
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn validation() {
        assert!(UnqualifiedName::from_string(String::from("doWork")).is_ok());
        assert!(UnqualifiedName::from_string(String::from("a/b")).is_err());
        assert!(UnqualifiedName::from_string(String::new()).is_err());
        assert!(BinaryName::from_string(String::from("com/acme/Widget$Inner")).is_ok());
        assert!(BinaryName::from_string(String::from("com//Widget")).is_err());
        assert!(BinaryName::from_string(String::from("[I")).is_err());
    }

    #[test]
    fn name_parts() {
        let name = BinaryName::from_string(String::from("com/acme/Widget")).unwrap();
        assert_eq!(name.java_name(), "com.acme.Widget");
        assert_eq!(name.package(), "com/acme");
        assert_eq!(name.simple_name(), "Widget");
        assert_eq!(BinaryName::OBJECT.simple_name(), "Object");
    }
}
