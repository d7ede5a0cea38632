use std::fs;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::tempdir;

#[test]
fn new_writes_an_empty_document() -> Result<(), Box<dyn std::error::Error>> {
    let tmp = tempdir()?;
    let path = tmp.path().join("diagram.json");

    let mut cmd = Command::cargo_bin("flowdraw")?;
    cmd.arg("new").arg("-o").arg(&path).arg("--theme").arg("dark");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("Saved diagram"));

    let value: serde_json::Value = serde_json::from_str(&fs::read_to_string(&path)?)?;
    assert_eq!(value["nodes"].as_array().map(Vec::len), Some(0));
    assert_eq!(value["connections"].as_array().map(Vec::len), Some(0));
    assert_eq!(value["theme"], "dark");
    assert_eq!(value["nodeIdCounter"], 0);

    let mut again = Command::cargo_bin("flowdraw")?;
    again.arg("new").arg("-o").arg(&path);
    again
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));

    Ok(())
}

#[test]
fn apply_runs_a_script_and_show_lists_the_result() -> Result<(), Box<dyn std::error::Error>> {
    let tmp = tempdir()?;
    let diagram = tmp.path().join("flow.json");
    let script = tmp.path().join("edits.txt");

    Command::cargo_bin("flowdraw")?
        .arg("new")
        .arg("-o")
        .arg(&diagram)
        .arg("-q")
        .assert()
        .success()
        .stdout(predicate::str::is_empty());

    fs::write(
        &script,
        "add type=start Start\nadd Process\nlayout 800\nremove 42\n",
    )?;

    Command::cargo_bin("flowdraw")?
        .arg("apply")
        .arg("-i")
        .arg(&diagram)
        .arg("-s")
        .arg(&script)
        .assert()
        .success()
        .stdout(predicate::str::contains("skipped 1"))
        .stdout(predicate::str::contains("line 4"));

    Command::cargo_bin("flowdraw")?
        .arg("show")
        .arg("-i")
        .arg(&diagram)
        .assert()
        .success()
        .stdout(predicate::str::contains("2 node(s), 1 connection(s)"))
        .stdout(predicate::str::contains("\"Start\" at (50, 50)"))
        .stdout(predicate::str::contains("0 -> 1 (right)"));

    Ok(())
}

#[test]
fn apply_reads_the_script_from_stdin_and_writes_stdout() -> Result<(), Box<dyn std::error::Error>> {
    let tmp = tempdir()?;
    let diagram = tmp.path().join("flow.json");
    fs::write(&diagram, r#"{ "nodes": [], "connections": [] }"#)?;

    let output = Command::cargo_bin("flowdraw")?
        .arg("apply")
        .arg("-i")
        .arg(&diagram)
        .arg("-s")
        .arg("-")
        .arg("-o")
        .arg("-")
        .write_stdin("add a\nadd b\nundo\n")
        .output()?;
    assert!(output.status.success());

    let value: serde_json::Value = serde_json::from_slice(&output.stdout)?;
    assert_eq!(value["nodes"].as_array().map(Vec::len), Some(1));
    assert_eq!(value["nodes"][0]["text"], "a");

    let untouched = fs::read_to_string(&diagram)?;
    assert!(untouched.contains(r#""nodes": []"#));

    Ok(())
}

#[test]
fn invalid_inputs_fail_cleanly() -> Result<(), Box<dyn std::error::Error>> {
    let tmp = tempdir()?;
    let orphaned = tmp.path().join("orphaned.json");
    fs::write(
        &orphaned,
        r#"{ "nodes": [], "connections": [ { "id": 0, "from": 5, "to": 6 } ] }"#,
    )?;

    Command::cargo_bin("flowdraw")?
        .arg("show")
        .arg("-i")
        .arg(&orphaned)
        .assert()
        .failure()
        .stderr(predicate::str::contains("missing node"));

    let diagram = tmp.path().join("flow.json");
    fs::write(&diagram, r#"{ "nodes": [], "connections": [] }"#)?;
    Command::cargo_bin("flowdraw")?
        .arg("apply")
        .arg("-i")
        .arg(&diagram)
        .arg("-s")
        .arg("-")
        .write_stdin("add ok\nwobble 3\n")
        .assert()
        .failure()
        .stderr(predicate::str::contains("line 2"));

    Command::cargo_bin("flowdraw")?
        .arg("show")
        .arg("-i")
        .arg(tmp.path().join("missing.json"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("does not exist"));

    Ok(())
}
