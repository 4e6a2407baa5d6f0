//! End-to-end vendoring over fake `node_modules` trees.
//!
//! A copying bundler stands in for esbuild: it emits the entry file as is,
//! so every specifier in the output is one the pipeline rewrote itself.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use stabilizer_core::config::{
    load_config, DepEntry, FailurePolicy, Mode, PatchHook, StabilizerConfig, UserDepConfig,
};
use stabilizer_core::vendor::{codes, Asset, BundleOutput, BundleRequest, Bundler, Vendorer};
use stabilizer_core::{Error, ExternalsMap, Result, RunReport};
use tempfile::{tempdir, TempDir};
use walkdir::WalkDir;

#[derive(Debug, Clone)]
struct BundleCall {
    name: String,
    output: PathBuf,
    externals: ExternalsMap,
}

#[derive(Default)]
struct CopyBundler {
    calls: Mutex<Vec<BundleCall>>,
    assets: Vec<Asset>,
    fail: Option<String>,
}

impl CopyBundler {
    fn failing(name: &str) -> Self {
        Self {
            fail: Some(name.to_string()),
            ..Self::default()
        }
    }

    fn call(&self, name: &str) -> BundleCall {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .find(|c| c.name == name)
            .cloned()
            .unwrap_or_else(|| panic!("no bundle call for {name}"))
    }
}

impl Bundler for CopyBundler {
    fn name(&self) -> &'static str {
        "copy"
    }

    fn bundle(&self, request: &BundleRequest<'_>) -> Result<BundleOutput> {
        if self.fail.as_deref() == Some(request.name) {
            return Err(Error::bundle(request.name, "forced failure"));
        }
        self.calls.lock().unwrap().push(BundleCall {
            name: request.name.to_string(),
            output: request.output.to_path_buf(),
            externals: request.externals.clone(),
        });
        Ok(BundleOutput {
            code: fs::read_to_string(request.entry)?,
            assets: self.assets.clone(),
        })
    }
}

struct Fixture {
    dir: TempDir,
}

impl Fixture {
    fn new() -> Self {
        let dir = tempdir().unwrap();
        write(&dir.path().join("package.json"), r#"{"name":"app","version":"1.0.0"}"#);
        Self { dir }
    }

    fn root(&self) -> &Path {
        self.dir.path()
    }

    /// Install `name` under the root `node_modules`.
    fn package(&self, name: &str, manifest: &str, files: &[(&str, &str)]) {
        let dir = self.root().join("node_modules").join(name);
        write(&dir.join("package.json"), manifest);
        for (path, content) in files {
            write(&dir.join(path), content);
        }
    }

    fn config(&self, deps: Vec<DepEntry>) -> StabilizerConfig {
        StabilizerConfig {
            cwd: self.root().to_path_buf(),
            deps,
            ..StabilizerConfig::default()
        }
    }

    fn out(&self, path: &str) -> PathBuf {
        self.root().join("compiled").join(path)
    }

    fn run(&self, config: StabilizerConfig, bundler: &Arc<CopyBundler>) -> RunReport {
        Vendorer::new(config)
            .with_bundler(Arc::clone(bundler) as Arc<dyn Bundler>)
            .run()
            .unwrap()
    }
}

fn write(path: &Path, content: &str) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

fn read(path: &Path) -> String {
    fs::read_to_string(path).unwrap_or_else(|e| panic!("{}: {e}", path.display()))
}

fn runtime_only(name: &str) -> DepEntry {
    DepEntry::Config(UserDepConfig {
        dts: Some(false),
        ..UserDepConfig::new(name)
    })
}

fn left_pad_fixture(left_pad_version: &str) -> Fixture {
    let fx = Fixture::new();
    fx.package(
        "demo",
        r#"{"name":"demo","version":"2.0.0","main":"index.js","dependencies":{"left-pad":"^1.0.0"}}"#,
        &[("index.js", "const pad = require('left-pad');\nmodule.exports = pad;\n")],
    );
    fx.package(
        "left-pad",
        &format!(r#"{{"name":"left-pad","version":"{left_pad_version}","main":"index.js"}}"#),
        &[("index.js", "module.exports = function pad() {};\n")],
    );
    fx
}

#[test]
fn test_satisfied_sibling_alias_is_kept() {
    let fx = left_pad_fixture("1.3.0");
    let bundler = Arc::new(CopyBundler::default());
    let report = fx.run(
        fx.config(vec![runtime_only("demo"), runtime_only("left-pad")]),
        &bundler,
    );

    assert!(report.is_success(), "{:?}", report.failed);
    let demo = report.succeeded.iter().find(|r| r.name == "demo").unwrap();
    assert!(demo.conflicts.is_empty());
    assert_eq!(demo.version, "2.0.0");
    assert_eq!(bundler.call("demo").externals.get("left-pad"), Some("../left-pad"));
    assert!(read(&fx.out("demo/index.js")).contains("require('../left-pad')"));
    assert!(fx.out("left-pad/index.js").is_file());

    let manifest: serde_json::Value = serde_json::from_str(&read(&fx.out("demo/package.json"))).unwrap();
    assert_eq!(manifest["name"], "demo");
    assert_eq!(manifest["version"], "2.0.0");
}

#[test]
fn test_violated_sibling_alias_is_dropped_and_inlined() {
    let fx = left_pad_fixture("0.9.0");
    let bundler = Arc::new(CopyBundler::default());
    let report = fx.run(
        fx.config(vec![runtime_only("demo"), runtime_only("left-pad")]),
        &bundler,
    );

    assert!(report.is_success(), "{:?}", report.failed);
    let demo = report.succeeded.iter().find(|r| r.name == "demo").unwrap();
    assert_eq!(demo.conflicts.len(), 1);
    assert_eq!(demo.conflicts[0].name, "left-pad");
    assert_eq!(demo.conflicts[0].actual_version, "0.9.0");
    assert_eq!(demo.conflicts[0].violated_ranges, vec!["^1.0.0".to_string()]);
    assert!(demo
        .warnings
        .iter()
        .any(|w| w.code == codes::EXTERNAL_VERSION_CONFLICT));

    // Not external any more, so the bundler inlines it.
    assert!(!bundler.call("demo").externals.contains("left-pad"));
    assert!(read(&fx.out("demo/index.js")).contains("require('left-pad')"));
}

#[test]
fn test_subpath_of_aliased_package_gets_its_own_artifact() {
    let fx = Fixture::new();
    fx.package(
        "demo",
        r#"{"name":"demo","version":"1.0.0","main":"index.js","dependencies":{"lodash":"^4.0.0"}}"#,
        &[(
            "index.js",
            "const throttle = require('lodash/throttle');\nconst _ = require('lodash');\nconst meta = require('lodash/package.json');\n",
        )],
    );
    fx.package(
        "lodash",
        r#"{"name":"lodash","version":"4.17.21","main":"index.js"}"#,
        &[
            ("index.js", "module.exports = {};\n"),
            ("throttle.js", "const debounce = require('lodash');\nmodule.exports = debounce;\n"),
        ],
    );

    let mut config = fx.config(vec![runtime_only("demo")]);
    config.externals.insert("lodash", "../lodash");
    let bundler = Arc::new(CopyBundler::default());
    let report = fx.run(config, &bundler);

    assert!(report.is_success(), "{:?}", report.failed);
    let demo = &report.succeeded[0];
    assert_eq!(demo.subpaths, vec!["lodash/throttle".to_string()]);
    assert!(demo.files.contains(&PathBuf::from("lodash/throttle.js")));

    let code = read(&fx.out("demo/index.js"));
    assert!(code.contains("require('./lodash/throttle')"));
    assert!(code.contains("require('../lodash')"));
    assert!(code.contains("require('../lodash/package.json')"));

    let call = bundler.call("lodash/throttle");
    assert_eq!(call.output, fx.out("demo/lodash/throttle.js"));
    assert_eq!(call.externals.get("lodash"), Some("../../lodash"));
    assert!(read(&fx.out("demo/lodash/throttle.js")).contains("require('../../lodash')"));
}

#[test]
fn test_bundle_less_copies_tree_and_compiles_own_dependencies() {
    let fx = Fixture::new();
    fx.package(
        "demo",
        r#"{"name":"demo","version":"1.0.0","main":"index.js","dependencies":{"ms":"^2.0.0","@types/node":"*"}}"#,
        &[
            ("index.js", "const ms = require('ms');\nconst util = require('./lib/util');\nmodule.exports = { ms, util };\n"),
            ("lib/util.js", "const ms = require('ms');\nmodule.exports = ms;\n"),
            ("README.md", "# demo\n"),
            ("node_modules/.cache/state.js", "module.exports = 'cached';\n"),
        ],
    );
    fx.package(
        "ms",
        r#"{"name":"ms","version":"2.1.3","main":"index.js"}"#,
        &[("index.js", "module.exports = function ms() {};\n")],
    );

    let config = fx.config(vec![DepEntry::Config(UserDepConfig {
        mode: Some(Mode::BundleLess),
        dts: Some(false),
        ..UserDepConfig::new("demo")
    })]);
    let bundler = Arc::new(CopyBundler::default());
    let report = fx.run(config, &bundler);

    assert!(report.is_success(), "{:?}", report.failed);
    let index = read(&fx.out("demo/index.js"));
    assert!(index.contains("require('./ms')"));
    assert!(index.contains("require('./lib/util')"));
    assert!(read(&fx.out("demo/lib/util.js")).contains("require('../ms')"));

    assert!(fx.out("demo/ms/index.js").is_file());
    assert!(!fx.out("demo/README.md").exists());
    assert!(!fx.out("demo/node_modules").exists());
    assert!(!fx.out("demo/@types").exists());

    let manifest: serde_json::Value = serde_json::from_str(&read(&fx.out("demo/package.json"))).unwrap();
    assert_eq!(manifest["main"], "index.js");
    assert_eq!(bundler.call("ms").output, fx.out("demo/ms/index.js"));
}

#[test]
fn test_declarations_follow_aliases_and_dts_only_siblings() {
    let fx = Fixture::new();
    fx.package(
        "demo",
        r#"{"name":"demo","version":"1.0.0","main":"index.js","types":"index.d.ts","dependencies":{"other-pkg":"^1.0.0"}}"#,
        &[
            ("index.js", "module.exports = {};\n"),
            (
                "index.d.ts",
                "/// <reference types=\"node\" />\nimport { X } from 'other-pkg';\nexport declare const a: X;\n",
            ),
        ],
    );
    fx.package(
        "other-pkg",
        r#"{"name":"other-pkg","version":"1.0.0","types":"index.d.ts"}"#,
        &[("index.d.ts", "export interface X { n: number }\n")],
    );

    let config = fx.config(vec![
        DepEntry::Name("demo".into()),
        DepEntry::Config(UserDepConfig {
            dts_only: true,
            ..UserDepConfig::new("other-pkg")
        }),
    ]);
    let bundler = Arc::new(CopyBundler::default());
    let report = fx.run(config, &bundler);

    assert!(report.is_success(), "{:?}", report.failed);
    let dts = read(&fx.out("demo/index.d.ts"));
    assert!(dts.contains("/// <reference types=\"node\" />"));
    assert!(dts.contains("from '../other-pkg'"));

    // Declarations-only siblings have no runtime artifact to point at.
    assert!(!bundler.call("demo").externals.contains("other-pkg"));
    assert!(fx.out("other-pkg/index.d.ts").is_file());
    assert!(fx.out("other-pkg/package.json").is_file());
    assert!(!fx.out("other-pkg/index.js").exists());
}

#[test]
fn test_missing_declarations_warn_and_keep_runtime_output() {
    let fx = left_pad_fixture("1.3.0");
    let bundler = Arc::new(CopyBundler::default());
    let report = fx.run(fx.config(vec![DepEntry::Name("left-pad".into())]), &bundler);

    assert!(report.is_success());
    let warnings = &report.succeeded[0].warnings;
    assert_eq!(warnings.len(), 1);
    assert_eq!(warnings[0].code, codes::DTS_NOT_FOUND);
    assert!(fx.out("left-pad/index.js").is_file());
}

#[test]
fn test_patch_hook_sees_declaration_output_and_failure_is_a_warning() {
    let fx = Fixture::new();
    fx.package(
        "demo",
        r#"{"name":"demo","version":"1.0.0","main":"lib/index.js"}"#,
        &[
            ("lib/index.js", "module.exports = {};\n"),
            ("lib/index.d.ts", "export declare const a: number;\n"),
        ],
    );

    let seen: Arc<Mutex<Vec<Option<PathBuf>>>> = Arc::default();
    let sink = Arc::clone(&seen);
    let hook = PatchHook::new(move |ctx| {
        sink.lock().unwrap().push(ctx.out_dts_path.map(Path::to_path_buf));
        Err("patch exploded".to_string())
    });
    let config = fx.config(vec![DepEntry::Config(UserDepConfig {
        patch: Some(hook),
        ..UserDepConfig::new("demo")
    })]);
    let report = fx.run(config, &Arc::new(CopyBundler::default()));

    assert!(report.is_success());
    assert_eq!(*seen.lock().unwrap(), vec![Some(fx.out("demo/lib/index.d.ts"))]);
    let warnings = &report.succeeded[0].warnings;
    assert!(warnings.iter().any(|w| w.code == codes::PATCH_FAILED && w.message == "patch exploded"));

    // Found next to the entry, so the vendored manifest must point at it.
    let manifest: serde_json::Value = serde_json::from_str(&read(&fx.out("demo/package.json"))).unwrap();
    assert_eq!(manifest["types"], "lib/index.d.ts");
}

#[test]
fn test_missing_package_fails_only_that_dependency() {
    let fx = left_pad_fixture("1.3.0");
    let bundler = Arc::new(CopyBundler::default());
    let report = fx.run(
        fx.config(vec![runtime_only("nope"), runtime_only("left-pad")]),
        &bundler,
    );

    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].name, "nope");
    assert_eq!(report.failed[0].code, "PACKAGE_NOT_FOUND");
    assert_eq!(report.succeeded.len(), 1);
    assert!(fx.out("left-pad/index.js").is_file());
}

#[test]
fn test_fail_fast_reports_the_failure() {
    let fx = left_pad_fixture("1.3.0");
    let mut config = fx.config(vec![runtime_only("demo"), runtime_only("left-pad")]);
    config.failure_policy = FailurePolicy::FailFast;
    let report = fx.run(config, &Arc::new(CopyBundler::failing("demo")));

    assert!(!report.is_success());
    assert!(report
        .failed
        .iter()
        .any(|f| f.name == "demo" && f.code == "BUNDLE_FAILED"));
    // The sibling either finished first or was cancelled between stages.
    assert_eq!(report.failed.len() + report.succeeded.len(), 2);
    for failure in report.failed.iter().filter(|f| f.name == "left-pad") {
        assert_eq!(failure.code, "CANCELLED");
    }
}

#[test]
fn test_cancelled_before_start() {
    let fx = left_pad_fixture("1.3.0");
    let vendorer = Vendorer::new(fx.config(vec![runtime_only("demo"), runtime_only("left-pad")]))
        .with_bundler(Arc::new(CopyBundler::default()));
    vendorer.cancel_token().cancel();
    let report = vendorer.run().unwrap();

    assert!(report.succeeded.is_empty());
    assert!(report.failed.iter().all(|f| f.code == "CANCELLED"));
    assert!(!fx.out("demo").exists());
}

/// Digest over every file's root-relative path and contents, in sorted order.
fn tree_digest(root: &Path) -> String {
    let mut hasher = blake3::Hasher::new();
    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry.unwrap();
        if !entry.file_type().is_file() {
            continue;
        }
        let rel = entry.path().strip_prefix(root).unwrap();
        hasher.update(rel.to_string_lossy().replace('\\', "/").as_bytes());
        hasher.update(&[0]);
        hasher.update(&fs::read(entry.path()).unwrap());
        hasher.update(&[0]);
    }
    hasher.finalize().to_hex().to_string()
}

#[test]
fn test_clean_rerun_is_identical() {
    let fx = left_pad_fixture("1.3.0");
    let bundler = Arc::new(CopyBundler {
        assets: vec![Asset {
            path: PathBuf::from("bin/cli.sh"),
            contents: b"#!/bin/sh\n".to_vec(),
            permissions: Some(0o755),
        }],
        ..CopyBundler::default()
    });
    let config = fx.config(vec![runtime_only("demo"), runtime_only("left-pad")]);

    fx.run(config.clone(), &bundler);
    let first = tree_digest(&fx.out("demo"));
    write(&fx.out("demo/stale.js"), "stale");
    fx.run(config, &bundler);
    let second = tree_digest(&fx.out("demo"));

    assert_eq!(first, second);
    assert!(fx.out("demo/bin/cli.sh").is_file());
    assert!(!fx.out("demo/stale.js").exists());
}

#[test]
fn test_config_file_drives_the_run() {
    let fx = left_pad_fixture("1.3.0");
    write(
        &fx.root().join("stabilizer.config.json"),
        r#"{"out":"vendor","deps":[{"name":"left-pad","dts":false,"mode":"bundless"}]}"#,
    );
    let config = load_config(fx.root(), None).unwrap();
    assert_eq!(config.cwd, fx.root());

    let report = fx.run(config, &Arc::new(CopyBundler::default()));
    assert!(report.is_success(), "{:?}", report.failed);
    assert!(fx.root().join("vendor/left-pad/index.js").is_file());
    assert!(!fx.root().join("compiled").exists());
}
