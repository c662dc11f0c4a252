use std::cell::Cell;
use std::rc::Rc;

use trellis::{
    KeyedCollection, Leaf, ListenerToken, Node, NodeExt, Operation, Record, Sequence, StructNode,
    Value,
};
use trellis_testhelpers::{Recorder, test};

#[derive(Clone, Default, PartialEq, Debug, Record)]
struct Point {
    x: Leaf<f32>,
    y: Leaf<f32>,
}

#[derive(Clone, Default, PartialEq, Debug, Record)]
struct Shape {
    name: Leaf<String>,
    points: Sequence<Point>,
    tags: KeyedCollection<String>,
}

#[derive(Clone, Default, PartialEq, Debug, Record)]
struct Scene {
    title: Leaf<String>,
    origin: StructNode<Point>,
    shapes: KeyedCollection<Shape>,
    visible: Leaf<bool>,
}

fn point(x: f32, y: f32) -> Point {
    Point {
        x: x.into(),
        y: y.into(),
    }
}

fn shape(name: &str) -> Shape {
    Shape {
        name: Leaf::new(String::from(name)),
        ..Shape::default()
    }
}

fn recorder_on(node: &dyn Node) -> (Recorder, ListenerToken) {
    let recorder = Recorder::new();
    let token = node.add_child_listener({
        let recorder = recorder.clone();
        move |path, op, _, value| recorder.record(path, op, value)
    });
    (recorder, token)
}

#[test]
fn changes_report_paths_from_the_listening_node() {
    let mut scene = StructNode::new(Scene::default());
    let (recorder, _token) = recorder_on(&scene);

    scene.shapes.add_element("square", shape("square"));
    scene.shapes["square"].points.add_element(point(1.0, 2.0));
    scene.shapes["square"].points[0].x.set(5.0);
    scene.shapes["square"].tags.add_element("fill", String::from("red"));
    scene.origin.y.set(-1.0);
    scene.visible.set(true);

    assert_eq!(
        recorder.paths(),
        [
            "shapes/square",
            "shapes/square/points/0",
            "shapes/square/points/0/x",
            "shapes/square/tags/fill",
            "origin/y",
            "visible",
        ]
    );
    let lines = recorder.lines();
    assert_eq!(lines[1], "add shapes/square/points/0 { .x = 1, .y = 2 }");
    assert_eq!(lines[2], "modify shapes/square/points/0/x 5");
    assert_eq!(lines[3], "add shapes/square/tags/fill red");
}

#[test]
fn listeners_on_inner_nodes_see_relative_paths() {
    let mut scene = StructNode::new(Scene::default());
    scene.shapes.add_element("square", shape("square"));
    scene.shapes["square"].points.add_element(point(0.0, 0.0));

    let (outer, _outer_token) = recorder_on(&scene);
    let (inner, _inner_token) = recorder_on(&scene.shapes["square"]);

    scene.shapes["square"].points[0].y.set(8.0);

    assert_eq!(inner.paths(), ["points/0/y"]);
    assert_eq!(outer.paths(), ["shapes/square/points/0/y"]);
}

#[test]
fn owner_is_the_node_holding_the_changed_value() {
    let mut scene = StructNode::new(Scene::default());
    scene.shapes.add_element("square", shape("square"));
    scene.shapes["square"].points.add_element(point(0.0, 0.0));

    let owners = Recorder::new();
    let _token = scene.add_child_listener({
        let owners = owners.clone();
        move |path, op, owner, _| owners.record(path, op, owner.path())
    });

    scene.shapes["square"].points[0].x.set(1.0);
    scene.shapes["square"].points.add_element(point(2.0, 2.0));
    scene.title.set(String::from("sketch"));

    assert_eq!(
        owners.lines(),
        [
            "modify shapes/square/points/0/x shapes/square/points/0",
            "add shapes/square/points/1 shapes/square/points",
            "modify title ",
        ]
    );

    // The owner's path resolves back to the owning node.
    let owner = scene.get_child(&trellis::Path::parse("shapes/square/points"));
    assert_eq!(owner.as_node().map(|node| node.fields().len()), Some(2));
}

#[test]
fn listeners_run_before_the_change_is_committed() {
    let scene = Rc::new(StructNode::new(Scene::default()));
    scene.origin.x.set(1.0);

    let seen = Rc::new(Cell::new(f32::NAN));
    let _token = scene.add_child_listener({
        let scene = Rc::downgrade(&scene);
        let seen = seen.clone();
        move |_, _, _, _| {
            if let Some(scene) = scene.upgrade() {
                seen.set(scene.origin.x.get());
            }
        }
    });

    scene.origin.x.set(2.0);
    assert_eq!(seen.get(), 1.0);
    assert_eq!(scene.origin.x.get(), 2.0);
}

#[test]
fn containers_notify_before_mutating() {
    let mut scene = StructNode::new(Scene::default());
    scene.shapes.add_element("square", shape("square"));

    let lengths = Rc::new(Cell::new(usize::MAX));
    let _token = scene.shapes["square"].points.add_listener({
        let lengths = lengths.clone();
        move |_, points, _, _| lengths.set(points.len())
    });

    scene.shapes["square"].points.add_element(point(1.0, 1.0));
    assert_eq!(lengths.get(), 0);
    scene.shapes["square"].points.remove_element(0);
    assert_eq!(lengths.get(), 1);
    assert!(scene.shapes["square"].points.is_empty());
}

#[test]
fn dropped_tokens_stop_notifications() {
    let scene = StructNode::new(Scene::default());
    let count = Rc::new(Cell::new(0));
    let token = scene.add_child_listener({
        let count = count.clone();
        move |_, _, _, _| count.set(count.get() + 1)
    });

    scene.title.set(String::from("first"));
    assert_eq!(count.get(), 1);
    drop(token);
    scene.title.set(String::from("second"));
    assert_eq!(count.get(), 1);
}

#[test]
fn context_listeners_expire_with_their_context() {
    struct Panel;

    let scene = StructNode::new(Scene::default());
    let panel = Rc::new(Panel);
    let count = Rc::new(Cell::new(0));
    scene.add_child_listener_with(&panel, {
        let count = count.clone();
        move |_, _, _, _| count.set(count.get() + 1)
    });

    scene.visible.set(true);
    assert_eq!(count.get(), 1);
    drop(panel);
    scene.visible.set(false);
    assert_eq!(count.get(), 1);
}

#[test]
fn changes_made_by_listeners_commit_silently() {
    let scene = Rc::new(StructNode::new(Scene::default()));
    let (recorder, _token) = recorder_on(&*scene);

    // Mirror the title into the origin, from inside a listener.
    let _mirror = scene.title.add_listener({
        let scene = Rc::downgrade(&scene);
        move |_, title| {
            if let Some(scene) = scene.upgrade() {
                scene.origin.x.set(title.len() as f32);
            }
        }
    });

    scene.title.set(String::from("four"));
    assert_eq!(recorder.lines(), ["modify title four"]);
    assert_eq!(scene.origin.x.get(), 4.0);

    // Outside a pass, the same change notifies as usual.
    scene.origin.x.set(5.0);
    assert_eq!(recorder.count(), 2);
}

#[test]
fn re_adding_a_key_overwrites_without_notifying() {
    let mut scene = StructNode::new(Scene::default());
    let (recorder, _token) = recorder_on(&scene);

    scene.shapes.add_element("k", shape("first"));
    scene.shapes.add_element("k", shape("second"));

    assert_eq!(scene.shapes.len(), 1);
    assert_eq!(scene.shapes["k"].name.get(), "second");
    assert_eq!(recorder.count(), 1);
    assert_eq!(recorder.events()[0].operation, Operation::Add.to_string());
}

#[test]
fn clones_are_quiet_and_detached() {
    let mut scene = StructNode::new(Scene::default());
    scene.shapes.add_element("square", shape("square"));
    let (recorder, _token) = recorder_on(&scene);

    let copy = scene.clone();
    assert_eq!(copy, scene);
    copy.shapes["square"].name.set(String::from("circle"));
    copy.title.set(String::from("copy"));

    assert_eq!(recorder.count(), 0);
    assert_ne!(copy, scene);
    assert_eq!(scene.shapes["square"].name.get(), "square");
}

#[test]
fn values_moved_out_of_the_tree_stop_reporting_to_it() {
    let mut scene = StructNode::new(Scene::default());
    scene.shapes.add_element("square", shape("square"));
    scene.shapes["square"].points.add_element(point(1.0, 1.0));
    let (recorder, _token) = recorder_on(&scene);

    let origin = std::mem::replace(&mut scene.origin, StructNode::new(point(0.0, 0.0)));
    origin.x.set(99.0);
    assert_eq!(origin.x.path(), trellis::Path::parse("x"));

    let title = std::mem::replace(&mut scene.title, Leaf::new(String::from("new")));
    title.set(String::from("ghost"));
    assert!(title.path().is_empty());

    let first = std::mem::take(&mut scene.shapes["square"].points[0]);
    first.y.set(5.0);
    assert_eq!(first.y.path(), trellis::Path::parse("y"));

    let mut points = std::mem::take(&mut scene.shapes["square"].points);
    points.add_element(point(2.0, 2.0));
    assert_eq!(points[0].path(), trellis::Path::parse("0"));

    assert_eq!(recorder.count(), 0);

    // What took their places reports as usual.
    scene.origin.x.set(1.0);
    scene.title.set(String::from("kept"));
    scene.shapes["square"].points.add_element(point(3.0, 3.0));
    assert_eq!(
        recorder.paths(),
        ["origin/x", "title", "shapes/square/points/0"]
    );
}

#[test]
fn added_elements_know_their_path_while_being_announced() {
    let mut scene = StructNode::new(Scene::default());
    scene.shapes.add_element("square", shape("square"));

    let paths = Recorder::new();
    let _points_token = scene.shapes["square"].points.add_listener({
        let paths = paths.clone();
        move |op, _, node, _| paths.record(node.path(), op, node.y.path())
    });
    let _shapes_token = scene.shapes.add_listener({
        let paths = paths.clone();
        move |op, _, node, _| paths.record(node.path(), op, node.name.path())
    });

    scene.shapes["square"].points.add_element(point(1.0, 1.0));
    scene.shapes.add_element("circle", shape("circle"));

    assert_eq!(
        paths.lines(),
        [
            "add shapes/square/points/0 shapes/square/points/0/y",
            "add shapes/circle shapes/circle/name",
        ]
    );
}
