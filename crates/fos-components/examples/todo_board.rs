//! Example: a todo board driven by a data hub
//!
//! Run with `RUST_LOG=debug` to watch bindings come and go.

use std::cell::RefCell;

use fos_components::{ClassDef, Component, ComponentHost, Document, Event, EventTarget, On, Runtime};
use serde_json::json;
use tracing_subscriber::EnvFilter;

struct TodoBoard {
    host: ComponentHost,
    tasks: RefCell<Vec<String>>,
}

impl TodoBoard {
    fn render(&self) {
        println!("board: {:?}", self.tasks.borrow());
    }
}

impl Component for TodoBoard {
    fn class() -> ClassDef<Self> {
        ClassDef::new("todo-board")
            .on_hub("add_task", "dataHub", "Task", Some("create"), |board: &Self, payload, _info| {
                if let Some(title) = payload.as_str() {
                    board.tasks.borrow_mut().push(title.to_string());
                    board.render();
                }
            })
            .on_event("clear", On::element("click").selector(".clear"), |board: &Self, _evt| {
                board.tasks.borrow_mut().clear();
                board.render();
            })
            .on_event("escape", On::document("keydown"), |board: &Self, _evt| {
                println!("board {}: keydown on document", board.host.uid());
            })
            .pre_display(|board: &Self, first_call| println!("pre-display (first: {first_call}) for {}", board.host.uid()))
    }

    fn create(host: ComponentHost) -> Self {
        Self { host, tasks: RefCell::default() }
    }

    fn host(&self) -> &ComponentHost {
        &self.host
    }

    fn init(&self) {
        println!("board {} initialized", self.host.uid());
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let doc = Document::new("about:blank");
    let runtime = Runtime::new(&doc);
    runtime.define::<TodoBoard>("todo-board")?;

    let board = runtime.create::<TodoBoard>("todo-board")?;
    let clear = doc.create_element("button");
    doc.set_attribute(clear, "class", "clear")?;
    doc.append_child(board.host().node(), clear)?;
    doc.append_child(doc.body(), board.host().node())?;
    doc.run_animation_frame();

    let data = fos_hub::hub("dataHub")?;
    data.publish("Task", Some("create"), &json!("write the docs"));
    data.publish("Task", Some("create"), &json!("ship it"));
    doc.dispatch_event(EventTarget::DOCUMENT, Event::bubbling("keydown"));
    doc.dispatch_event(clear, Event::bubbling("click"));

    doc.remove(board.host().node())?;
    data.publish("Task", Some("create"), &json!("ignored while detached"));
    doc.run_animation_frame();

    for message in doc.take_uncaught_errors() {
        eprintln!("uncaught: {message}");
    }
    Ok(())
}
