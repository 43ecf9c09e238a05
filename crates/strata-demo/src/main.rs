//! Headless walkthrough of the canvas runtime: ingest a raw model graph,
//! lay it out, collapse a subtree, and print what a renderer would draw.

use anyhow::{Context, Result};

use strata_model::RawGraphInput;
use strata_runtime::{
    CanvasRuntime, GraphLens, PointerEvent, RecordingRenderer, RunLayoutRequest,
};
use strata_state::{store_canvas, MemoryStore};

const SAMPLE: &str = r#"{
    "entities": [
        {"id": "app", "name": "app", "properties": {"GUID": "app", "type": "container"}},
        {"id": "core", "name": "core", "properties": {"GUID": "core", "type": "container"}},
        {"id": "parser", "name": "parser", "properties": {"GUID": "parser", "type": "node"}},
        {"id": "lexer", "name": "lexer", "properties": {"GUID": "lexer", "type": "component"}},
        {"id": "render", "name": "render", "properties": {"GUID": "render", "type": "node"}}
    ],
    "relationships": [
        {"type": "CONTAINS", "fromGUID": "app", "toGUID": "core"},
        {"type": "CONTAINS", "fromGUID": "app", "toGUID": "render"},
        {"type": "HAS_COMPONENT", "fromGUID": "core", "toGUID": "parser"},
        {"type": "HAS_COMPONENT", "fromGUID": "core", "toGUID": "lexer"},
        {"type": "CALLS", "fromGUID": "parser", "toGUID": "render"}
    ]
}"#;

fn main() -> Result<()> {
    strata_runtime::init_tracing();

    let input: RawGraphInput =
        serde_json::from_str(SAMPLE).context("parsing sample graph payload")?;

    let mut runtime = CanvasRuntime::with_worker("demo");
    runtime.set_raw_data(input, false)?;
    runtime.run_layout(RunLayoutRequest::initial())?;

    let mut renderer = RecordingRenderer::new();
    runtime.render(&mut renderer);
    println!("== initial layout ({} nodes, {} edges)", renderer.nodes.len(), renderer.edges.len());
    for op in &renderer.nodes {
        println!(
            "  {:<8} {:>7.1},{:>7.1}  {:>6.1}x{:<6.1} {}",
            op.guid,
            op.screen_rect.min.x,
            op.screen_rect.min.y,
            op.screen_rect.width(),
            op.screen_rect.height(),
            if op.collapsed { "[collapsed]" } else { "" },
        );
    }

    // Collapse `core`; its parser -> render edge rewires to the container.
    // Aim at the header band so the hit lands on the container itself.
    let core_header = runtime
        .view()
        .data()
        .find_node("core")
        .context("core vanished")?
        .world_rect()
        .min
        + egui::Vec2::new(10.0, 10.0);
    runtime.pointer(PointerEvent::DoubleClick { world: core_header });
    runtime.tick();

    runtime.render(&mut renderer);
    println!("== after collapsing core ({} edges)", renderer.edges.len());
    for op in &renderer.edges {
        println!("  {} ({} pts)", op.guid, op.points.len());
    }

    // Narrow to the selection neighborhood.
    runtime.pointer(PointerEvent::Select { world: core_header });
    runtime.set_lens(GraphLens::SelectedRootNeighborhood);
    runtime.render(&mut renderer);
    println!("== lens {} ({} nodes)", runtime.lens().id(), renderer.nodes.len());

    // Persist the result the way a host would.
    let mut store = MemoryStore::new();
    store_canvas(&mut store, "demo", &runtime.view().snapshot())?;
    println!("saved layout payloads: {}", store.len());

    Ok(())
}
