/// Elements that occupy a number of JVM stack or local variable slots
///
/// `long` and `double` values take two slots, everything else takes one.
pub trait Width {
    fn width(&self) -> usize;
}
