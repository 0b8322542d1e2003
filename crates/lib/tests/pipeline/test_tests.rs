//! `test`: self-hosted build and test suite, in both driver modes.

use pmboot_lib::bootstrap::INTEGRATED_DRIVER_FLAG;
use pmboot_lib::pipeline::{self, TestOptions};

use super::common::{RecordingRunner, Workspace};

#[tokio::test]
async fn builds_and_tests_in_each_driver_mode() {
  let ws = Workspace::new();
  let runner = RecordingRunner::new();
  let config = ws.configure(&runner).await;
  let options = TestOptions {
    parallel: true,
    filters: vec!["PackageGraphTests".to_string()],
    package_dir: None,
  };

  pipeline::test(&config, &options, &runner).await.unwrap();

  let self_hosted: Vec<(String, bool)> = runner
    .calls()
    .into_iter()
    .filter(|c| matches!(c.program_name(), "swift-build" | "swift-test"))
    .map(|c| (c.program_name().to_string(), c.args.iter().any(|a| a == INTEGRATED_DRIVER_FLAG)))
    .collect();
  assert_eq!(
    self_hosted,
    vec![
      ("swift-build".to_string(), false),
      ("swift-test".to_string(), false),
      ("swift-build".to_string(), true),
      ("swift-test".to_string(), true),
    ]
  );

  let runs: Vec<_> = runner
    .calls()
    .into_iter()
    .filter(|c| c.program_name() == "swift-test")
    .collect();
  for run in &runs {
    assert!(run.args.windows(2).any(|w| w[0] == "--filter" && w[1] == "PackageGraphTests"));
  }
}
