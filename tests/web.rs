//! Browser tests for the wasm-bindgen facade.
//!
//! Run with `wasm-pack test --headless --firefox`.

#![cfg(target_arch = "wasm32")]

use std::cell::RefCell;
use std::rc::Rc;

use multiverse_map_wasm::MultiverseMapWasm;
use multiverse_map_wasm::graph::{BleedEdge, EmbassyEdge, GraphSnapshot, WorldNode};
use wasm_bindgen::JsValue;
use wasm_bindgen::closure::Closure;
use wasm_bindgen::JsCast;
use wasm_bindgen_test::*;

wasm_bindgen_test_configure!(run_in_browser);

fn snapshot() -> JsValue {
    let snapshot = GraphSnapshot::new(
        vec![
            WorldNode::new("a").with_name("Aurelia"),
            WorldNode::new("b").with_name("Brume"),
            WorldNode::new("c").with_name("Cinder"),
        ],
        vec![BleedEdge::new("a", "b", 0.9), BleedEdge::new("b", "ghost", 0.4)],
        vec![EmbassyEdge::new("b", "c")],
    );
    serde_wasm_bindgen::to_value(&snapshot).unwrap()
}

#[wasm_bindgen_test]
fn rejects_invalid_dimensions() {
    assert!(MultiverseMapWasm::new(-1.0, 600.0).is_err());
    assert!(MultiverseMapWasm::new(800.0, 600.0).is_ok());
}

#[wasm_bindgen_test]
fn rejects_malformed_snapshot() {
    let map = MultiverseMapWasm::new(800.0, 600.0).unwrap();
    assert!(map.set_snapshot(JsValue::from_str("not a graph")).is_err());
    assert_eq!(map.node_count(), 0);
}

#[wasm_bindgen_test]
fn snapshot_settles_and_reports() {
    let map = MultiverseMapWasm::new(800.0, 600.0).unwrap();
    map.set_snapshot(snapshot()).unwrap();
    assert_eq!(map.node_count(), 3);
    assert_eq!(map.link_count(), 2);
    assert_eq!(map.skipped_links(), 1);
    assert_eq!(map.phase(), "settling");

    let events = Rc::new(RefCell::new(0u32));
    let counter = Rc::clone(&events);
    let callback = Closure::<dyn FnMut(JsValue)>::new(move |_event: JsValue| {
        *counter.borrow_mut() += 1;
    });
    map.on_layout(Some(callback.as_ref().unchecked_ref::<js_sys::Function>().clone()));

    map.settle().unwrap();
    assert!(map.is_settled());
    assert_eq!(map.phase(), "drifting");
    assert_eq!(*events.borrow(), 1);

    assert_eq!(map.positions().length(), 6);
    assert_eq!(map.edge_curves().length(), 12);
    assert_eq!(map.edge_kinds(), vec![0, 1]);
    assert!(map.advance_frame(0.0));
}

#[wasm_bindgen_test]
fn click_fires_select_callback() {
    let map = MultiverseMapWasm::new(800.0, 600.0).unwrap();
    map.set_snapshot(snapshot()).unwrap();
    map.settle().unwrap();

    let selected = Rc::new(RefCell::new(None::<String>));
    let sink = Rc::clone(&selected);
    let callback = Closure::<dyn FnMut(JsValue)>::new(move |event: JsValue| {
        let kind = js_sys::Reflect::get(&event, &JsValue::from_str("type"))
            .ok()
            .and_then(|v| v.as_string());
        *sink.borrow_mut() = kind;
    });
    map.on_select(Some(callback.as_ref().unchecked_ref::<js_sys::Function>().clone()));

    let slot = map.slot_of("a").unwrap() as usize;
    let positions = map.committed_positions().to_vec();
    let screen = map.model_to_screen(positions[slot * 2], positions[slot * 2 + 1]);
    assert!(map.click(screen[0], screen[1]));
    assert_eq!(selected.borrow().as_deref(), Some("nodeSelected"));
}

#[wasm_bindgen_test]
fn dispose_goes_idle() {
    let map = MultiverseMapWasm::new(800.0, 600.0).unwrap();
    map.set_snapshot(snapshot()).unwrap();
    map.start().unwrap();
    map.dispose();
    assert_eq!(map.phase(), "idle");
    assert!(!map.advance_frame(0.0));
}

#[wasm_bindgen_test]
fn viewport_round_trip() {
    let map = MultiverseMapWasm::new(800.0, 600.0).unwrap();
    map.pan(20.0, 10.0);
    let zoom = map.zoom_at(-1.0, 400.0, 300.0);
    assert!(zoom > 1.0);
    let model = map.screen_to_model(120.0, 80.0);
    let screen = map.model_to_screen(model[0], model[1]);
    assert!((screen[0] - 120.0).abs() < 1e-3);
    assert!((screen[1] - 80.0).abs() < 1e-3);
    assert!(map.stars().length() > 0);
}
