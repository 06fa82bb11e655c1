//! Terminal coloring for progress reports.
//!
//! Coloring uses the [Colored crate](https://docs.rs/colored/latest/colored/)
//!     and is behind the `color` Cargo feature.
//! When the feature is disabled the methods of [Colorize] return the text unchanged,
//!     so downstream code can call them unconditionally:
//!
//! ```
//! use texpack::color::Colorize;
//! println!["{}", "[texpack]".bold().bright_green()];
//! ```

#[cfg(feature = "color")]
pub type ColoredString = colored::ColoredString;

#[cfg(not(feature = "color"))]
pub type ColoredString = String;

macro_rules! colorize_impl {
    ( $( $method_name: ident, )+ ) => {
        /// Trait that provides coloring methods on strings.
        ///
        /// See the module documentation for information.
        pub trait Colorize {
            $(
                fn $method_name(self) -> ColoredString;
            )+
        }
        #[cfg(feature="color")]
        impl Colorize for ColoredString {
            $(
                fn $method_name(self) -> ColoredString {
                    colored::Colorize::$method_name(self)
                }
            )+
        }
        #[cfg(feature="color")]
        impl Colorize for &str {
            $(
                fn $method_name(self) -> ColoredString {
                    colored::Colorize::$method_name(self)
                }
            )+
        }
        #[cfg(not(feature="color"))]
        impl Colorize for ColoredString {
            $(
                fn $method_name(self) -> ColoredString {
                    self
                }
            )+
        }
        #[cfg(not(feature="color"))]
        impl Colorize for &str {
            $(
                fn $method_name(self) -> ColoredString {
                    self.to_string()
                }
            )+
        }
    };
}

colorize_impl!(
    bold,
    dimmed,
    bright_green,
    bright_red,
    bright_yellow,
);
