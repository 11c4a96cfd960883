//! A trivial tracing facility.

use bitmask_enum::bitmask;

#[bitmask]
pub enum Trace {
    Parse,
    Filter,
    Join,
    Rewrite,
    Emit,
}

impl Trace {
    /// Every trace level at once.
    pub fn everything() -> Self {
        Self::Parse | Self::Filter | Self::Join | Self::Rewrite | Self::Emit
    }
}

#[macro_export]
macro_rules! trace {
    ($trace:expr, $level:ident, $fmt:literal $(,)? $($arg:expr),* $(,)?) => {
        if $trace.intersects(Trace::$level) {
            eprintln!($fmt, $($arg),*);
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn levels() {
        let trace = Trace::Filter | Trace::Join;
        assert!(trace.intersects(Trace::Join));
        assert!(!trace.intersects(Trace::Parse));
        assert!(Trace::everything().contains(trace));
        assert!(!Trace::none().intersects(Trace::everything()));
    }
}
