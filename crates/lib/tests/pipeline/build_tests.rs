//! `build` from a fresh checkout.

use pmboot_lib::clean::clean;
use pmboot_lib::config::{BuildConfiguration, ConfigError};
use pmboot_lib::pipeline;
use pmboot_lib::stage::Stage;

use super::common::{RecordingRunner, Workspace, directory_layout, linux_host};

#[tokio::test]
async fn builds_five_stages_then_self_hosts() {
  let ws = Workspace::new();
  let runner = RecordingRunner::new();
  let config = ws.configure(&runner).await;

  let results = pipeline::build(&config, &runner).await.unwrap();

  assert_eq!(results.stages(), Stage::ALL.to_vec());
  let builds: Vec<String> = runner
    .programs()
    .into_iter()
    .filter(|p| p != "swiftc")
    .collect();
  let mut expected: Vec<String> = Stage::ALL.iter().flat_map(|_| ["cmake".to_string(), "ninja".to_string()]).collect();
  expected.push("swift-build".to_string());
  assert_eq!(builds, expected);

  let self_hosted = runner.calls().pop().unwrap();
  assert_eq!(self_hosted.cwd.as_deref(), Some(config.package_dir.as_path()));
  assert!(self_hosted.args.iter().any(|a| a == "$ORIGIN/../lib/swift/linux"));
}

#[tokio::test]
async fn clean_then_build_matches_fresh_build() {
  let ws = Workspace::new();
  let runner = RecordingRunner::new();
  let config = ws.configure(&runner).await;

  pipeline::build(&config, &runner).await.unwrap();
  let fresh = directory_layout(&config.build_root);

  assert!(clean(&config.build_root).await.unwrap());
  assert!(!config.build_root.exists());

  pipeline::build(&config, &runner).await.unwrap();
  assert_eq!(directory_layout(&config.build_root), fresh);
}

#[tokio::test]
async fn second_build_skips_generator() {
  let ws = Workspace::new();
  let first = RecordingRunner::new();
  let config = ws.configure(&first).await;
  pipeline::build(&config, &first).await.unwrap();

  let second = RecordingRunner::new();
  pipeline::build(&config, &second).await.unwrap();

  assert!(!second.programs().contains(&"cmake".to_string()));
  assert_eq!(second.programs().iter().filter(|p| *p == "ninja").count(), 5);
}

#[tokio::test]
async fn missing_llbuild_checkout_fails_before_any_generator() {
  let ws = Workspace::new();
  std::fs::remove_dir_all(ws.root().join("llbuild")).unwrap();
  let runner = RecordingRunner::new();

  let err = BuildConfiguration::resolve(&ws.options(), linux_host(), &runner)
    .await
    .unwrap_err();

  match err {
    ConfigError::MissingDependencySource { name, hint, .. } => {
      assert_eq!(name, "llbuild");
      assert!(hint.contains("--llbuild-build-dir"));
    }
    other => panic!("unexpected error: {other}"),
  }
  assert!(runner.calls().is_empty());
}
