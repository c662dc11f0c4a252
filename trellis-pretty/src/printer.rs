use alloc::string::{String, ToString};
use core::fmt::{self, Write};

use trellis_core::{Def, Node, ScalarRef, Value, Visit};
use yansi::{Paint, Style};

use crate::color;

/// Formats values as indented trees.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PrettyPrinter {
    indent_size: usize,
    max_depth: Option<usize>,
    use_colors: bool,
}

impl Default for PrettyPrinter {
    fn default() -> Self {
        Self {
            indent_size: 2,
            max_depth: None,
            use_colors: std::env::var_os("NO_COLOR").is_none(),
        }
    }
}

impl PrettyPrinter {
    /// Two-space indentation, no depth limit, colors unless `NO_COLOR` is set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the number of spaces per nesting level.
    pub fn with_indent_size(mut self, size: usize) -> Self {
        self.indent_size = size;
        self
    }

    /// Elides the contents of nodes nested deeper than `depth`. The value
    /// being formatted is at depth 0.
    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = Some(depth);
        self
    }

    /// Turns ANSI colors on or off.
    pub fn with_colors(mut self, use_colors: bool) -> Self {
        self.use_colors = use_colors;
        self
    }

    /// Formats `value` into a new string.
    pub fn format(&self, value: &dyn Value) -> String {
        let mut out = String::new();
        // Writing into a String does not fail.
        let _ = self.format_to(value, &mut out);
        out
    }

    /// Formats `value` into `f`.
    pub fn format_to(&self, value: &dyn Value, f: &mut dyn Write) -> fmt::Result {
        self.write_value(f, value, 0)
    }

    fn write_value(&self, f: &mut dyn Write, value: &dyn Value, depth: usize) -> fmt::Result {
        value.visit(|visit| match visit {
            Visit::Invalid => self.write_styled(f, "<invalid>", color::invalid()),
            Visit::Scalar(scalar) => self.write_scalar(f, scalar),
            Visit::Node(node) => self.write_node(f, node, depth),
        })
    }

    fn write_scalar(&self, f: &mut dyn Write, scalar: ScalarRef<'_>) -> fmt::Result {
        let text = match scalar {
            ScalarRef::String(s) => format!("{s:?}"),
            ScalarRef::Path(path) => format!("{:?}", path.to_string()),
            ScalarRef::I8(v) => v.to_string(),
            ScalarRef::I16(v) => v.to_string(),
            ScalarRef::I32(v) => v.to_string(),
            ScalarRef::I64(v) => v.to_string(),
            ScalarRef::F32(v) => format!("{v:?}"),
            ScalarRef::F64(v) => format!("{v:?}"),
            ScalarRef::Bool(v) => v.to_string(),
        };
        self.write_styled(f, text, color::scalar())
    }

    fn write_node(&self, f: &mut dyn Write, node: &dyn Node, depth: usize) -> fmt::Result {
        let meta = node.as_value().meta_type();
        let def = meta.def();
        let (open, close) = match def {
            Def::Array(_) => ("[", "]"),
            _ => ("{", "}"),
        };

        if let Def::Record(_) = def {
            let short = meta.type_name().rsplit("::").next().unwrap_or(meta.type_name());
            self.write_styled(f, short, color::type_name())?;
            f.write_char(' ')?;
        }
        self.write_styled(f, open, color::punctuation())?;

        let fields = node.fields();
        if fields.is_empty() {
            return self.write_styled(f, close, color::punctuation());
        }
        if self.max_depth.is_some_and(|max| depth >= max) {
            f.write_char(' ')?;
            self.write_styled(f, "...", color::punctuation())?;
            f.write_char(' ')?;
            return self.write_styled(f, close, color::punctuation());
        }

        f.write_char('\n')?;
        for field in fields {
            self.indent(f, depth + 1)?;
            match def {
                Def::Record(_) => {
                    self.write_styled(f, field.name(), color::field_name())?;
                    f.write_str(": ")?;
                }
                Def::Map(_) => {
                    self.write_styled(f, format!("{:?}", field.name()), color::key())?;
                    f.write_str(": ")?;
                }
                _ => {}
            }
            self.write_value(f, field, depth + 1)?;
            f.write_str(",\n")?;
        }
        self.indent(f, depth)?;
        self.write_styled(f, close, color::punctuation())
    }

    fn indent(&self, f: &mut dyn Write, depth: usize) -> fmt::Result {
        write!(f, "{:width$}", "", width = depth * self.indent_size)
    }

    fn write_styled<T: fmt::Display>(&self, f: &mut dyn Write, value: T, style: Style) -> fmt::Result {
        if self.use_colors {
            write!(f, "{}", value.paint(style))
        } else {
            write!(f, "{value}")
        }
    }
}
