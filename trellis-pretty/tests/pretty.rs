use core::fmt::Write;
use insta::assert_snapshot;
use trellis::{INVALID, KeyedCollection, Leaf, Path, Record, Sequence, StructNode, Value};
use trellis_pretty::{PrettyPrinter, TrellisPretty};
use trellis_testhelpers::test;

#[derive(Clone, Default, PartialEq, Debug, Record)]
struct Point {
    x: Leaf<f32>,
    y: Leaf<f32>,
}

#[derive(Clone, Default, PartialEq, Debug, Record)]
struct Layer {
    name: Leaf<String>,
    source: Leaf<Path>,
    points: Sequence<Point>,
    tags: KeyedCollection<i32>,
    hidden: Leaf<bool>,
}

#[derive(Clone, Default, PartialEq, Debug, Record)]
struct Nothing {}

fn plain() -> PrettyPrinter {
    PrettyPrinter::new().with_colors(false)
}

fn layer() -> StructNode<Layer> {
    let mut layer = StructNode::new(Layer::default());
    layer.name.set(String::from("outline"));
    layer.source.set(Path::parse("assets/outline"));
    layer.points.add_element(Point {
        x: 1.0.into(),
        y: 2.0.into(),
    });
    layer.points.add_element(Point {
        x: (-0.5).into(),
        y: 4.25.into(),
    });
    layer.tags.add_element("z-index", 3);
    layer
}

#[test]
fn record() {
    let point = StructNode::new(Point {
        x: 1.0.into(),
        y: 2.0.into(),
    });
    assert_eq!(plain().format(&point), "Point {\n  x: 1.0,\n  y: 2.0,\n}");
}

#[test]
fn nested_containers() {
    assert_snapshot!(plain().format(&layer()), @r#"
    Layer {
      name: "outline",
      source: "assets/outline",
      points: [
        Point {
          x: 1.0,
          y: 2.0,
        },
        Point {
          x: -0.5,
          y: 4.25,
        },
      ],
      tags: {
        "z-index": 3,
      },
      hidden: false,
    }
    "#);
}

#[test]
fn indent_size() {
    let point = StructNode::new(Point::default());
    assert_eq!(
        plain().with_indent_size(4).format(&point),
        "Point {\n    x: 0.0,\n    y: 0.0,\n}"
    );
}

#[test]
fn max_depth_elides_deeper_nodes() {
    assert_snapshot!(plain().with_max_depth(1).format(&layer()), @r#"
    Layer {
      name: "outline",
      source: "assets/outline",
      points: [ ... ],
      tags: { ... },
      hidden: false,
    }
    "#);

    assert_eq!(plain().with_max_depth(0).format(&layer()), "Layer { ... }");
}

#[test]
fn empty_nodes_and_scalars() {
    assert_eq!(plain().format(&StructNode::new(Nothing {})), "Nothing {}");
    assert_eq!(plain().format(&Sequence::<i32>::new()), "[]");
    assert_eq!(plain().format(&KeyedCollection::<i32>::new()), "{}");
    assert_eq!(plain().format(&Leaf::new(String::from("a \"b\""))), r#""a \"b\"""#);
    assert_eq!(plain().format(&Leaf::new(-7i64)), "-7");
    assert_eq!(plain().format(&INVALID), "<invalid>");
}

#[test]
fn pretty_trait() {
    let layer = layer();
    let mut buffer = String::new();
    write!(buffer, "{}", layer.pretty_with(plain()))?;
    assert_eq!(buffer, plain().format(&layer));

    let child: &dyn Value = &layer.points[1];
    assert_eq!(
        child.pretty_with(plain()).to_string(),
        "Point {\n  x: -0.5,\n  y: 4.25,\n}"
    );
}

#[test]
fn colors() {
    let point = StructNode::new(Point::default());
    let colored = PrettyPrinter::new().with_colors(true).format(&point);
    assert!(colored.contains('\u{1b}'), "{colored:?}");
    assert_ne!(colored, plain().format(&point));

    // Colored output is still the same text once the escapes are removed.
    let mut stripped = String::new();
    let mut chars = colored.chars();
    while let Some(c) = chars.next() {
        if c == '\u{1b}' {
            chars.by_ref().find(|&c| c == 'm');
        } else {
            stripped.push(c);
        }
    }
    assert_eq!(stripped, plain().format(&point));
}
