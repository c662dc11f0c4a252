#[cfg(feature = "log")]
macro_rules! trace {
    ($($tt:tt)*) => {
        ::log::trace!($($tt)*)
    };
}

#[cfg(not(feature = "log"))]
macro_rules! trace {
    ($($tt:tt)*) => {
        if false {
            let _ = ::core::format_args!($($tt)*);
        }
    };
}

#[cfg(feature = "log")]
macro_rules! debug {
    ($($tt:tt)*) => {
        ::log::debug!($($tt)*)
    };
}

#[cfg(not(feature = "log"))]
macro_rules! debug {
    ($($tt:tt)*) => {
        if false {
            let _ = ::core::format_args!($($tt)*);
        }
    };
}
