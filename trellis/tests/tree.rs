use trellis::static_assertions::assert_not_impl_any;
use trellis::{
    AccessError, INVALID, KeyedCollection, Leaf, Node, Path, Record, ScalarRef, Sequence,
    StructNode, Value, Visit, meta_type_of,
};
use trellis_testhelpers::test;

#[derive(Clone, Default, PartialEq, Debug, Record)]
struct Inner {
    c: Leaf<i32>,
}

#[derive(Clone, Default, PartialEq, Debug, Record)]
struct Outer {
    a: Leaf<bool>,
    b: StructNode<Inner>,
    list: Sequence<f64>,
    map: KeyedCollection<Inner>,
}

assert_not_impl_any!(Leaf<i32>: Send, Sync);
assert_not_impl_any!(StructNode<Outer>: Send, Sync);
assert_not_impl_any!(Sequence<f64>: Send, Sync);
assert_not_impl_any!(KeyedCollection<Inner>: Send, Sync);

fn outer() -> StructNode<Outer> {
    let mut outer = StructNode::new(Outer::default());
    outer.b.c.set(7);
    outer.list.extend([1.5, 2.5]);
    outer.map.add_element(
        "first",
        Inner {
            c: Leaf::new(11),
        },
    );
    outer
}

#[test]
fn path_lookup_matches_stepwise_lookup() {
    let outer = outer();

    let direct = outer.get_child(&Path::from(["b", "c"]));
    let stepwise = outer.child("b").as_node().unwrap().child("c");
    assert!(core::ptr::eq(
        direct as *const dyn Value as *const (),
        stepwise as *const dyn Value as *const ()
    ));
    assert_eq!(direct.get::<i32>(), Some(7));

    let itself = outer.get_child(&Path::new());
    assert!(core::ptr::eq(
        itself as *const dyn Value as *const (),
        &outer as *const StructNode<Outer> as *const ()
    ));

    assert!(!outer.get_child(&Path::from(["missing"])).is_valid());
    assert!(!outer.get_child(&Path::from(["a", "deeper"])).is_valid());
    assert_eq!(outer.get_child(&Path::parse("list/1")).get::<f64>(), Some(2.5));
    assert_eq!(outer.get_child(&Path::parse("map/first/c")).get::<i32>(), Some(11));
}

#[test]
fn failed_lookups_explain_themselves() {
    let outer = outer();

    let err = outer.try_get_child(&Path::parse("b/d")).unwrap_err();
    assert_eq!(
        err,
        AccessError::NoSuchChild {
            path: Path::parse("b"),
            segment: String::from("d"),
        }
    );

    let err = outer.try_get_child(&Path::parse("a/x")).unwrap_err();
    assert_eq!(err, AccessError::NotANode { path: Path::parse("a") });

    assert!(outer.try_get_child(&Path::parse("list/0")).is_ok());
}

#[test]
fn assignment_through_the_tree() {
    let mut outer = outer();

    assert!(outer.assign_child("a", &Leaf::new(true)));
    assert!(outer.a.get());
    assert!(!outer.assign_child("a", &Leaf::new(1i32)));
    assert!(!outer.assign_child("nope", &Leaf::new(true)));
    assert!(!outer.remove_child("a"));

    let list = outer.get_child_mut(&Path::parse("list")).as_node_mut().unwrap();
    assert!(list.assign_child("3", &Leaf::new(9.0f64)));
    assert_eq!(outer.list.len(), 4);
    assert_eq!(outer.list[2].get(), 0.0);
    assert_eq!(outer.list[3].get(), 9.0);

    let map = outer.child_mut("map").as_node_mut().unwrap();
    let inner = StructNode::new(Inner { c: Leaf::new(3) });
    assert!(map.assign_child("second", &inner));
    assert!(map.remove_child("first"));
    assert_eq!(outer.map.keys().collect::<Vec<_>>(), ["second"]);

    let mut invalid = INVALID;
    assert!(!invalid.assign(&Leaf::new(true)));
}

#[test]
fn visiting_dispatches_once() {
    let outer = outer();

    let kinds: Vec<&str> = outer
        .fields()
        .into_iter()
        .map(|field| {
            field.visit(|visit| match visit {
                Visit::Invalid => "invalid",
                Visit::Node(_) => "node",
                Visit::Scalar(ScalarRef::Bool(_)) => "bool",
                Visit::Scalar(_) => "other scalar",
            })
        })
        .collect();
    assert_eq!(kinds, ["bool", "node", "node", "node"]);

    let c = outer.get_child(&Path::parse("b/c"));
    assert_eq!(c.visit_as::<i32, _>(|c| c * 2), 14);
    assert!(c.try_visit_as::<f32, _>(|c| *c).is_err());
    let invalid: &dyn Value = &INVALID;
    assert!(invalid.visit(|visit| matches!(visit, Visit::Invalid)));
}

#[test]
fn mutable_visits_notify_like_set() {
    let mut outer = outer();
    let recorder = trellis_testhelpers::Recorder::new();
    let _token = trellis::NodeExt::add_child_listener(&outer, {
        let recorder = recorder.clone();
        move |path, op, _, value| recorder.record(path, op, value)
    });

    outer
        .get_child_mut(&Path::parse("b/c"))
        .visit_mut_as::<i32, _>(|c| *c += 1);
    outer
        .get_child_mut(&Path::parse("b/c"))
        .visit_mut_as::<i32, _>(|_| ());

    assert_eq!(recorder.lines(), ["modify b/c 8"]);
    assert_eq!(outer.b.c.get(), 8);
}

#[test]
fn display_prints_nested_fields() {
    let outer = outer();
    let value: &dyn Value = &outer;
    assert_eq!(
        value.to_string(),
        "{ .a = false, .b = { .c = 7 }, .list = { .0 = 1.5, .1 = 2.5 }, .map = { .first = { .c = 11 } } }"
    );
}

#[test]
fn equality_of_containers() {
    let left: Sequence<i32> = vec![1, 2, 3].into();
    let right: Sequence<i32> = [1, 2, 3].into_iter().collect();
    assert_eq!(left, right);

    let forward: KeyedCollection<i32> = [("a", 1), ("b", 2)].into_iter().collect();
    let backward: KeyedCollection<i32> = [("b", 2), ("a", 1)].into_iter().collect();
    assert_ne!(forward, backward);
    assert_eq!(forward, forward.clone());
}

#[test]
fn sequence_removal_renumbers() {
    let mut outer = outer();
    outer.list.add_element(3.5);
    outer.list.remove_element(1);

    assert_eq!(outer.list.len(), 2);
    assert_eq!(outer.list[0].get(), 1.5);
    assert_eq!(outer.list[1].get(), 3.5);
    assert_eq!(outer.list.child_names(), ["0", "1"]);
    assert_eq!(outer.list[1].path(), Path::parse("list/1"));
}

#[test]
fn meta_types_are_singletons() {
    assert!(core::ptr::eq(meta_type_of::<Outer>(), meta_type_of::<Outer>()));
    assert!(core::ptr::eq(
        meta_type_of::<Sequence<f64>>(),
        outer().list.meta_type()
    ));
    assert!(core::ptr::eq(
        meta_type_of::<KeyedCollection<Inner>>().element_meta_type().unwrap(),
        meta_type_of::<Inner>()
    ));
}

#[test]
fn paths_round_trip() {
    for segments in [
        vec![],
        vec!["a"],
        vec!["shapes", "square", "points", "0", "x"],
        vec!["with space", "ünïcode", "dots.and-dashes"],
    ] {
        let path: Path = segments.iter().copied().collect();
        let text = path.to_string();
        assert_eq!(text, segments.join("/"));
        assert_eq!(Path::parse(&text), path);
    }
}
