use anyhow::Result;
use flowdraw::script::run_script;
use flowdraw::{
    DiagramDocument, Editor, EditorConfig, EditorError, GraphStore, NewNode, NodeKind, Point,
};

#[test]
fn start_process_layout_then_remove() -> Result<()> {
    let mut editor = Editor::default();
    editor.add_node(NewNode::new("Start").kind(NodeKind::Start))?;
    editor.add_node(NewNode::new("Process"))?;
    assert_eq!(editor.connections().len(), 1);

    editor.auto_layout_within(800.0);
    let positions: Vec<Point> = editor.nodes().iter().map(|node| node.position()).collect();
    assert_eq!(
        positions,
        vec![Point::new(50.0, 50.0), Point::new(250.0, 50.0)]
    );

    assert!(editor.remove_node(0).is_some());
    assert_eq!(editor.nodes().len(), 1);
    assert!(editor.connections().is_empty());

    Ok(())
}

#[test]
fn random_edits_never_leave_dangling_connections() -> Result<()> {
    let mut store = GraphStore::new();
    let mut seed: u64 = 0x2545_f491_4f6c_dd1d;
    let mut next = move |bound: u64| {
        seed = seed
            .wrapping_mul(6_364_136_223_846_793_005)
            .wrapping_add(1_442_695_040_888_963_407);
        (seed >> 33) % bound.max(1)
    };

    for step in 0..400 {
        match next(4) {
            0 => {
                store.create_node(NewNode::new(format!("n{step}")), next(2) == 0)?;
            }
            1 => {
                let upper = store.next_node_id();
                store.remove_node(next(upper));
            }
            2 => {
                let upper = store.next_node_id();
                // Missing endpoints, self-loops and repeats are all rejected.
                let _ = store.create_connection(next(upper), next(upper));
            }
            _ => {
                let upper = store.next_connection_id();
                store.remove_connection(next(upper));
            }
        }
        assert_eq!(store.dangling_connections().count(), 0, "step {step}");
    }

    Ok(())
}

#[test]
fn reverse_connection_is_ignored() -> Result<()> {
    let mut editor = Editor::default();
    editor.set_connect_mode(true);
    let a = editor.add_node(NewNode::new("a"))?;
    let b = editor.add_node(NewNode::new("b"))?;

    assert!(editor.connect(a.id, b.id)?.is_some());
    assert!(editor.connect(b.id, a.id)?.is_none());
    assert_eq!(editor.connections().len(), 1);

    Ok(())
}

#[test]
fn undo_restores_and_redo_reapplies() -> Result<()> {
    let mut editor = Editor::default();
    editor.add_node(NewNode::new("a"))?;
    editor.add_node(NewNode::new("b"))?;
    let before = editor.snapshot();

    editor.duplicate_node(0)?;
    let after = editor.snapshot();
    assert_ne!(before, after);

    assert!(editor.undo());
    assert_eq!(editor.snapshot(), before);
    assert!(editor.redo());
    assert_eq!(editor.snapshot(), after);

    Ok(())
}

#[test]
fn history_stays_bounded() -> Result<()> {
    let mut editor = Editor::default();
    for i in 0..100 {
        editor.add_node(NewNode::new(format!("node {i}")))?;
    }
    assert_eq!(editor.history().len(), 50);

    let mut undone = 0;
    while editor.undo() {
        undone += 1;
    }
    assert_eq!(undone, 49);
    assert_eq!(editor.nodes().len(), 51);

    Ok(())
}

#[test]
fn orphaned_document_is_rejected_without_side_effects() -> Result<()> {
    let mut editor = Editor::default();
    editor.add_node(NewNode::new("existing"))?;
    let before = editor.snapshot();

    let err = editor
        .load_json(r#"{ "nodes": [], "connections": [ { "id": 0, "from": 5, "to": 6 } ] }"#)
        .unwrap_err();
    assert!(matches!(err, EditorError::InvalidDocument { .. }));
    assert_eq!(editor.snapshot(), before);

    Ok(())
}

#[test]
fn scripted_session_survives_a_save() -> Result<()> {
    let mut editor = Editor::new(EditorConfig::default());
    run_script(
        &mut editor,
        "# build a small flow\n\
         add type=start Begin\n\
         add type=decision Check\n\
         add type=end Done\n\
         rename 1 Is it valid?\n\
         layout\n\
         theme dark\n",
    )?;

    let json = editor.to_json()?;
    let document = DiagramDocument::from_json(&json)?;
    let reopened = Editor::open(EditorConfig::default(), &document)?;

    assert_eq!(reopened.snapshot(), editor.snapshot());
    assert_eq!(reopened.theme(), "dark");
    assert_eq!(reopened.nodes()[1].text, "Is it valid?");
    assert_eq!(reopened.nodes()[2].position(), Point::new(450.0, 50.0));

    Ok(())
}
