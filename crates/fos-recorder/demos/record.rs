//! Example: record a few page mutations
//!
//! Run with `RUST_LOG=fos_recorder=debug` to see the lifecycle.

use fos_html::HtmlParser;
use fos_recorder::{Recorder, RecorderConfig};
use tracing_subscriber::EnvFilter;

const PAGE: &str = r#"<!DOCTYPE html>
<html>
<head><title>Todo</title></head>
<body><ul id="list"><li>milk</li></ul><input id="new"></body>
</html>"#;

fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let config = match std::env::args().nth(1) {
        Some(json) => RecorderConfig::from_json(&json)?,
        None => RecorderConfig::default(),
    };

    let mut doc = HtmlParser::new().parse_with_url(PAGE, "https://todo.example/")?;
    let mut recorder = Recorder::new(config);
    recorder.start(&mut doc)?;
    println!("snapshot: {}", recorder.snapshot().unwrap_or_default());

    let list = doc
        .tree()
        .descendant_elements(doc.tree().root())
        .into_iter()
        .find(|&e| doc.tree().get_attribute(e, "id") == Some("list"))
        .ok_or_else(|| anyhow::anyhow!("no #list in page"))?;

    // The user adds an item, then ticks the first one off
    let items = HtmlParser::new().parse_fragment_into(doc.tree_mut(), "<li>eggs</li>")?;
    for item in items {
        doc.tree_mut().append_child(list, item)?;
    }
    let first = doc.tree().element_children(list)[0];
    doc.tree_mut().set_attribute(first, "class", "done")?;

    recorder.pump(&mut doc, |event| println!("{}", event.to_json()))?;
    recorder.stop(&mut doc);
    Ok(())
}
