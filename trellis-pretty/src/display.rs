use core::fmt;

use trellis_core::Value;

use crate::PrettyPrinter;

/// Displays a value through a [`PrettyPrinter`].
///
/// Returned by [`TrellisPretty::pretty`] and [`TrellisPretty::pretty_with`].
pub struct PrettyDisplay<'a> {
    value: &'a dyn Value,
    printer: PrettyPrinter,
}

impl fmt::Display for PrettyDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.printer.format_to(self.value, f)
    }
}

impl fmt::Debug for PrettyDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

/// Adds `.pretty()` to every trellis value.
pub trait TrellisPretty {
    /// Displays this value with the default printer.
    fn pretty(&self) -> PrettyDisplay<'_>;

    /// Displays this value with `printer`.
    fn pretty_with(&self, printer: PrettyPrinter) -> PrettyDisplay<'_>;
}

impl<V: Value> TrellisPretty for V {
    fn pretty(&self) -> PrettyDisplay<'_> {
        self.pretty_with(PrettyPrinter::new())
    }

    fn pretty_with(&self, printer: PrettyPrinter) -> PrettyDisplay<'_> {
        PrettyDisplay {
            value: self,
            printer,
        }
    }
}

impl TrellisPretty for dyn Value {
    fn pretty(&self) -> PrettyDisplay<'_> {
        self.pretty_with(PrettyPrinter::new())
    }

    fn pretty_with(&self, printer: PrettyPrinter) -> PrettyDisplay<'_> {
        PrettyDisplay {
            value: self,
            printer,
        }
    }
}
