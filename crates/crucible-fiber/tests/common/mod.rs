#![allow(dead_code)]

use crucible_fiber::{
    driver, make_node, Child, CommitSummary, Description, Engine, EngineConfig, ExpiredDeadline,
    ManualIdle, MemoryHost, Props,
};

pub type TestEngine = Engine<MemoryHost, ManualIdle>;

pub fn engine() -> TestEngine {
    Engine::new(MemoryHost::new(), ManualIdle::new())
}

pub fn engine_with(config: EngineConfig) -> TestEngine {
    Engine::with_config(MemoryHost::new(), ManualIdle::new(), config)
}

/// Render and drive to completion in unbounded slices.
pub fn commit(engine: &mut TestEngine, tree: Description) -> CommitSummary {
    let container = engine.host().container();
    engine.render(tree, container).expect("render accepted");
    let report = driver::run_with(engine, || crucible_fiber::UnboundedDeadline)
        .expect("render committed");
    *report.commits.last().expect("one commit")
}

/// Render and drive to completion one unit per slice.
pub fn commit_sliced(engine: &mut TestEngine, tree: Description) -> CommitSummary {
    let container = engine.host().container();
    engine.render(tree, container).expect("render accepted");
    let report = driver::run_with(engine, || ExpiredDeadline).expect("render committed");
    *report.commits.last().expect("one commit")
}

/// `ul` holding one childless node per kind.
pub fn list(kinds: &[&str]) -> Description {
    make_node(
        "ul",
        None,
        kinds.iter().map(|k| make_node(*k, None, Vec::<Child>::new())),
    )
}

pub fn with_props(kind: &str, props: Props) -> Description {
    make_node(kind, Some(props), Vec::<Child>::new())
}

pub fn tree(engine: &TestEngine) -> String {
    engine.host().render_tree(engine.host().container())
}
