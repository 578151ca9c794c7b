//! Integration tests for leviso-relink against an in-memory toolchain.

use anyhow::Result;
use leviso_relink::{
    get_library_dependencies, get_library_id, normalize, BinaryTools, Candidate, Relinker,
    RewritePlan, SystemTools, Verbosity,
};
use std::cell::RefCell;
use std::collections::HashMap;
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Answers otool queries from a table and records every call.
#[derive(Default)]
struct FakeTools {
    binaries: HashMap<PathBuf, (Option<String>, Vec<String>)>,
    queried: RefCell<Vec<PathBuf>>,
    applied: RefCell<Vec<(PathBuf, RewritePlan)>>,
}

impl FakeTools {
    fn add(&mut self, path: &Path, id: Option<String>, refs: Vec<String>) {
        self.binaries.insert(path.to_path_buf(), (id, refs));
    }

    fn plan_for(&self, path: &Path) -> Option<RewritePlan> {
        self.applied
            .borrow()
            .iter()
            .find(|(p, _)| p == path)
            .map(|(_, plan)| plan.clone())
    }
}

impl BinaryTools for FakeTools {
    fn library_id(&self, path: &Path) -> Result<Option<String>> {
        Ok(self
            .binaries
            .get(path)
            .and_then(|(id, _)| id.clone()))
    }

    fn library_dependencies(&self, path: &Path) -> Result<Vec<String>> {
        self.queried.borrow_mut().push(path.to_path_buf());
        Ok(self
            .binaries
            .get(path)
            .map(|(_, refs)| refs.clone())
            .unwrap_or_default())
    }

    fn apply(&self, path: &Path, plan: &RewritePlan) -> Result<()> {
        self.applied
            .borrow_mut()
            .push((path.to_path_buf(), plan.clone()));
        Ok(())
    }
}

fn create_file(path: &Path, mode: u32) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, "mock\n").unwrap();
    let mut perms = fs::metadata(path).unwrap().permissions();
    perms.set_mode(mode);
    fs::set_permissions(path, perms).unwrap();
}

fn s(path: &Path) -> String {
    path.to_str().unwrap().to_string()
}

struct Bundle {
    _temp: TempDir,
    root: PathBuf,
    qwt: PathBuf,
    opengl: PathBuf,
    tool: PathBuf,
    script: PathBuf,
    data: PathBuf,
}

fn create_bundle() -> Bundle {
    let temp = TempDir::new().unwrap();
    let root = temp.path().join("GNURadio.app/Contents/MacOS");
    let qwt = root.join("usr/lib/bob/jack/libqwt.6.dylib");
    let opengl = root.join("usr/lib/jill/libQtOpenGL.4.dylib");
    let tool = root.join("usr/bin/gnuradio-companion");
    let script = root.join("usr/bin/run.sh");
    let data = root.join("usr/share/readme.txt");

    create_file(&qwt, 0o644);
    create_file(&opengl, 0o644);
    create_file(&tool, 0o755);
    create_file(&script, 0o755);
    create_file(&data, 0o644);
    std::os::unix::fs::symlink("libqwt.6.dylib", root.join("usr/lib/bob/jack/libqwt.dylib"))
        .unwrap();

    Bundle {
        _temp: temp,
        root,
        qwt,
        opengl,
        tool,
        script,
        data,
    }
}

#[test]
fn test_relink_bundle() {
    let bundle = create_bundle();
    let mut tools = FakeTools::default();
    tools.add(
        &bundle.qwt,
        Some(s(&bundle.qwt)),
        vec![
            s(&bundle.qwt),
            s(&bundle.opengl),
            "/opt/X11/lib/libSM.6.dylib".to_string(),
            "/usr/lib/libSystem.B.dylib".to_string(),
        ],
    );
    tools.add(
        &bundle.opengl,
        Some("libQtOpenGL.4.dylib".to_string()),
        vec![
            "libQtOpenGL.4.dylib".to_string(),
            "/usr/lib/libSystem.B.dylib".to_string(),
        ],
    );
    tools.add(
        &bundle.tool,
        None,
        vec![s(&bundle.qwt), "@rpath/libpython2.7.dylib".to_string()],
    );

    let relinker = Relinker::new(&tools, Verbosity::new(2));
    let summary = relinker.relink_tree(&bundle.root).unwrap();
    assert_eq!(summary.candidates, 4);
    assert_eq!(summary.inspected, 3);
    assert_eq!(summary.rewritten, 2);

    let qwt_plan = tools.plan_for(&bundle.qwt).unwrap();
    assert_eq!(qwt_plan.new_id.as_deref(), Some("libqwt.6.dylib"));
    assert_eq!(
        qwt_plan.change_refs,
        vec![(
            s(&bundle.opengl),
            "@loader_path/../../jill/libQtOpenGL.4.dylib".to_string()
        )]
    );

    let tool_plan = tools.plan_for(&bundle.tool).unwrap();
    assert_eq!(tool_plan.new_id, None);
    assert_eq!(
        tool_plan.change_refs,
        vec![(
            s(&bundle.qwt),
            "@loader_path/../lib/bob/jack/libqwt.6.dylib".to_string()
        )]
    );

    // A bare install name is already in final form.
    assert_eq!(tools.plan_for(&bundle.opengl), Some(RewritePlan::default()));
}

#[test]
fn test_files_without_references_are_not_rewritten() {
    let bundle = create_bundle();
    let tools = FakeTools::default();

    let relinker = Relinker::new(&tools, Verbosity::default());
    let summary = relinker.relink_tree(&bundle.root).unwrap();
    assert_eq!(summary.candidates, 4);
    assert_eq!(summary.inspected, 0);
    assert!(tools.applied.borrow().is_empty());
}

#[test]
fn test_only_candidates_are_inspected() {
    let bundle = create_bundle();
    let tools = FakeTools::default();

    Relinker::new(&tools, Verbosity::default())
        .relink_tree(&bundle.root)
        .unwrap();

    let queried = tools.queried.borrow();
    assert_eq!(
        *queried,
        vec![
            bundle.tool.clone(),
            bundle.script.clone(),
            bundle.qwt.clone(),
            bundle.opengl.clone(),
        ]
    );
    assert!(!queried.contains(&bundle.data));
    assert!(!queried.contains(&bundle.root.join("usr/lib/bob/jack/libqwt.dylib")));
}

#[test]
fn test_already_relative_references_are_stable() {
    let bundle = create_bundle();
    let mut tools = FakeTools::default();
    tools.add(
        &bundle.qwt,
        Some("libqwt.6.dylib".to_string()),
        vec![
            "libqwt.6.dylib".to_string(),
            "@loader_path/../../jill/libQtOpenGL.4.dylib".to_string(),
        ],
    );

    Relinker::new(&tools, Verbosity::new(1))
        .relink_tree(&bundle.root)
        .unwrap();
    assert_eq!(tools.plan_for(&bundle.qwt), Some(RewritePlan::default()));
}

#[test]
fn test_file_outside_root_is_fatal() {
    let bundle = create_bundle();
    let mut tools = FakeTools::default();
    tools.add(&bundle.qwt, Some(s(&bundle.qwt)), Vec::new());

    let other_root = normalize(&s(&bundle.root.join("usr/bin")));
    let candidate = Candidate {
        path: bundle.qwt.clone(),
        executable: false,
    };
    let err = Relinker::new(&tools, Verbosity::default())
        .process_file(&other_root, &candidate)
        .unwrap_err();
    assert!(
        err.to_string().contains("is not under its root"),
        "unexpected error: {err}"
    );
    assert!(tools.applied.borrow().is_empty());
}

#[test]
fn test_self_reference_aborts_run() {
    let bundle = create_bundle();
    let mut tools = FakeTools::default();
    // Not first in the list, so it is not taken for the install name.
    tools.add(
        &bundle.opengl,
        None,
        vec!["/usr/lib/libSystem.B.dylib".to_string(), s(&bundle.opengl)],
    );

    let result = Relinker::new(&tools, Verbosity::default()).relink_tree(&bundle.root);
    assert!(result.is_err());
    assert!(tools.applied.borrow().is_empty());
}

#[test]
fn test_system_tools_missing_otool() {
    let tools = SystemTools::new("/nonexistent/otool", "/nonexistent/install_name_tool");
    let err = tools
        .library_dependencies(Path::new("/bin/sh"))
        .unwrap_err();
    assert!(
        err.to_string().contains("/nonexistent/otool"),
        "unexpected error: {err}"
    );
}

#[test]
fn test_failing_otool_means_nothing_to_report() {
    // `false` exits unsuccessfully, as otool does for non Mach-O files.
    let Ok(otool) = which::which("false") else {
        return;
    };
    let path = Path::new("/etc/passwd");
    assert_eq!(get_library_id(&otool, path).unwrap(), None);
    assert!(get_library_dependencies(&otool, path).unwrap().is_empty());
}

#[test]
fn test_failing_install_name_tool_is_fatal() {
    let Ok(install_name_tool) = which::which("false") else {
        return;
    };
    let tools = SystemTools::new("otool", install_name_tool);
    let plan = RewritePlan {
        new_id: Some("libfoo.dylib".to_string()),
        ..Default::default()
    };
    let err = tools
        .apply(Path::new("/nonexistent/libfoo.dylib"), &plan)
        .unwrap_err();
    assert!(
        err.to_string().contains("exited with"),
        "unexpected error: {err}"
    );
}
