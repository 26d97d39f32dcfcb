//! End-to-end tests: argument parsing through command execution.

use core_types::{DeviceClass, DeviceNumber};
use devmm2name::{
    CommandError, CommandParser, DeviceRuntime, RuntimeConfig, EXIT_NO_MATCH, EXIT_OK,
};
use services_node_materializer::NodeFactory;
use std::fs;
use std::io;
use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};
use std::path::Path;
use tempfile::{tempdir, TempDir};

/// Writes a regular file standing in for the node.
struct StubFactory;

impl NodeFactory for StubFactory {
    fn create_node(
        &self,
        path: &Path,
        class: DeviceClass,
        number: DeviceNumber,
        mode: u32,
    ) -> io::Result<()> {
        fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .mode(mode)
            .open(path)?;
        fs::write(path, format!("{} {}", class.letter(), number))
    }
}

fn runtime(dir: &TempDir) -> DeviceRuntime<StubFactory> {
    let config = RuntimeConfig {
        sysfs_root: dir.path().join("sys"),
        dev_root: dir.path().join("root"),
        ..RuntimeConfig::default()
    };
    DeviceRuntime::with_factory(&config, StubFactory)
}

fn run(runtime: &mut DeviceRuntime<StubFactory>, args: &[&str]) -> (i32, String) {
    let command = CommandParser::parse(args).unwrap();
    let mut out = Vec::new();
    let code = runtime.execute(command, &mut out);
    (code, String::from_utf8(out).unwrap())
}

#[test]
fn test_lookup_forms_print_path() {
    let dir = tempdir().unwrap();
    let mut runtime = runtime(&dir);

    assert_eq!(run(&mut runtime, &["char", "4:64"]), (EXIT_OK, "/dev/ttyS0\n".into()));
    assert_eq!(run(&mut runtime, &["b", "179", "1"]), (EXIT_OK, "/dev/mmcblk0p1\n".into()));
    assert_eq!(run(&mut runtime, &["block", "8:16"]), (EXIT_OK, "/dev/sdb\n".into()));
}

#[test]
fn test_lookup_no_match() {
    let dir = tempdir().unwrap();
    let mut runtime = runtime(&dir);

    assert_eq!(run(&mut runtime, &["char", "600:0"]), (EXIT_NO_MATCH, String::new()));
    assert_eq!(run(&mut runtime, &["disk", "8:1"]), (EXIT_NO_MATCH, String::new()));
}

#[test]
fn test_make_node_creates_file() {
    let dir = tempdir().unwrap();
    let mut runtime = runtime(&dir);

    let (code, out) = run(&mut runtime, &["mkblock", "8", "2"]);
    assert_eq!(code, EXIT_OK);
    assert!(out.is_empty());

    let node = dir.path().join("root/dev/sda2");
    assert_eq!(fs::read_to_string(&node).unwrap(), "b 8:2");
    assert_eq!(fs::metadata(&node).unwrap().permissions().mode() & 0o777, 0o660);
}

#[test]
fn test_make_node_replaces_existing_entry() {
    let dir = tempdir().unwrap();
    let node = dir.path().join("root/dev/null");
    fs::create_dir_all(node.parent().unwrap()).unwrap();
    fs::write(&node, "stale").unwrap();

    let mut runtime = runtime(&dir);
    assert_eq!(run(&mut runtime, &["mkchar", "1:3"]).0, EXIT_OK);
    assert_eq!(fs::read_to_string(&node).unwrap(), "c 1:3");
}

#[test]
fn test_make_node_unknown_class() {
    let dir = tempdir().unwrap();
    let mut runtime = runtime(&dir);

    assert_eq!(run(&mut runtime, &["mkx", "1:3"]).0, EXIT_NO_MATCH);
    assert!(!dir.path().join("root").exists());
}

#[test]
fn test_scan_command_creates_live_nodes() {
    let dir = tempdir().unwrap();
    let block = dir.path().join("sys/dev/block");
    fs::create_dir_all(&block).unwrap();
    fs::write(block.join("8:0"), "").unwrap();
    fs::write(block.join("7:1"), "").unwrap();

    let mut runtime = runtime(&dir);
    assert_eq!(run(&mut runtime, &["scan"]), (EXIT_OK, String::new()));

    assert_eq!(
        fs::read_to_string(dir.path().join("root/dev/sda")).unwrap(),
        "b 8:0"
    );
    assert_eq!(
        fs::read_to_string(dir.path().join("root/dev/loop1")).unwrap(),
        "b 7:1"
    );
}

#[test]
fn test_bad_arguments_are_usage_errors() {
    assert!(matches!(
        CommandParser::parse(&["char", "41"]),
        Err(CommandError::InvalidDeviceNumber(_))
    ));
    assert!(matches!(
        CommandParser::parse(&["watch", "soon"]),
        Err(CommandError::InvalidInterval(_))
    ));
}
